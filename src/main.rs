use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::path::PathBuf;
use std::process::ExitCode;

use feedsniff::{conditional_headers, Config, FeedQuery, HttpFetcher, ParsedFeed, QueryOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "feedsniff",
    version,
    about = "Detect and parse RSS, Atom and JSON feeds"
)]
struct Args {
    /// Config file (default: ~/.config/feedsniff/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a URL and print the decoded feed
    Query {
        url: String,

        /// Also decode and print the feed's items
        #[arg(long)]
        items: bool,

        /// ETag from a previous query (sent as If-None-Match)
        #[arg(long, value_name = "ETAG")]
        etag: Option<String>,

        /// Last-Modified from a previous query (sent as If-Modified-Since)
        #[arg(long, value_name = "DATE")]
        last_modified: Option<String>,

        /// Extra request header, e.g. -H 'Accept-Language: en'
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Report whether a URL serves a feed (exit status 1 if not)
    Probe { url: String },
}

/// Parses a curl-style `Name: value` header argument.
fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header '{raw}' must look like 'Name: value'"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("Invalid header name in '{raw}'"))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("Invalid header value in '{raw}'"))?;
    Ok((name, value))
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path.or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from '{}'", path.display()))?,
        None => {
            tracing::debug!("HOME not set, using default configuration");
            Config::default()
        }
    };
    Ok(config.with_env_overrides())
}

fn print_feed(parsed: &ParsedFeed) {
    let feed = &parsed.feed;
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("Title:         {}", field(&feed.title));
    println!("Feed URL:      {}", field(&feed.url));
    println!("Site URL:      {}", field(&feed.site_url));
    println!("Description:   {}", field(&feed.description));
    println!("Icon:          {}", field(&feed.icon_url));
    println!("ETag:          {}", field(&feed.etag));
    println!("Last-Modified: {}", field(&feed.last_modified));

    if parsed.items.is_empty() {
        return;
    }
    println!();
    for item in &parsed.items {
        let date = item
            .pub_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "----------------".to_string());
        println!(
            "{}  {}",
            date,
            item.title.as_deref().unwrap_or("(untitled)")
        );
        if let Some(link) = &item.link {
            println!("                  {}", link);
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config)?;
    tracing::debug!(?config, "Using configuration");

    let fetcher = HttpFetcher::from_config(&config).context("Failed to build HTTP client")?;
    let query = FeedQuery::new(fetcher).with_sniff_limit(config.sniff_limit);

    match args.command {
        Command::Query {
            url,
            items,
            etag,
            last_modified,
            headers,
            json,
        } => {
            let mut request_headers: HeaderMap =
                conditional_headers(etag.as_deref(), last_modified.as_deref());
            for raw in &headers {
                let (name, value) = parse_header(raw)?;
                request_headers.insert(name, value);
            }

            let outcome = query
                .query_feed(&url, Some(&request_headers), items)
                .await
                .with_context(|| format!("Failed to query {url}"))?;

            match outcome {
                QueryOutcome::NotModified if json => println!("{{\"not_modified\":true}}"),
                QueryOutcome::NotModified => println!("Not modified"),
                QueryOutcome::Parsed(parsed) if json => {
                    let out = serde_json::to_string_pretty(&parsed)
                        .context("Failed to serialize feed")?;
                    println!("{out}");
                }
                QueryOutcome::Parsed(parsed) => print_feed(&parsed),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe { url } => {
            let is_feed = query
                .is_feed_url(&url)
                .await
                .with_context(|| format!("Failed to probe {url}"))?;
            if is_feed {
                println!("{url}: feed");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{url}: not a feed");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
