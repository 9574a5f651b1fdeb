use std::fmt;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use super::adapters::{FormatAdapter, ATOM_ADAPTER, JSON_FEED_ADAPTER, RSS_ADAPTER};

/// Default number of body bytes inspected by content-based sniffing.
pub const DEFAULT_SNIFF_LIMIT: usize = 64 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `version` prefixes that identify a JSON Feed document (1.0 and 1.1).
const JSON_FEED_VERSION_PREFIXES: [&str; 2] =
    ["https://jsonfeed.org/version/", "http://jsonfeed.org/version/"];

/// The feed formats the pipeline knows how to decode.
///
/// `Unknown` is a transient value between the two sniffing passes, and a
/// terminal failure if the content pass cannot resolve it either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RssType {
    Rss,
    Atom,
    JsonFeed,
    Unknown,
}

impl RssType {
    pub fn is_known(self) -> bool {
        self != RssType::Unknown
    }

    /// Resolves the parser for this format, `None` for [`RssType::Unknown`].
    pub fn adapter(self) -> Option<&'static dyn FormatAdapter> {
        match self {
            RssType::Rss => Some(&RSS_ADAPTER),
            RssType::Atom => Some(&ATOM_ADAPTER),
            RssType::JsonFeed => Some(&JSON_FEED_ADAPTER),
            RssType::Unknown => None,
        }
    }
}

impl fmt::Display for RssType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RssType::Rss => "RSS",
            RssType::Atom => "Atom",
            RssType::JsonFeed => "JSON Feed",
            RssType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Extracts the base MIME type from a `Content-Type` header value.
///
/// Parameters (`; charset=utf-8`) are dropped and the result is lowercased.
/// Returns `None` when the value has no `type/subtype` shape.
pub fn parse_content_type(header: &str) -> Option<String> {
    let base = header.split(';').next()?.trim();
    let (kind, subtype) = base.split_once('/')?;

    let valid_token =
        |token: &str| !token.is_empty() && !token.bytes().any(|b| b.is_ascii_whitespace() || b == b'/');
    if !valid_token(kind) || !valid_token(subtype) {
        return None;
    }

    Some(base.to_ascii_lowercase())
}

/// Maps an already-parsed base MIME type to a feed format.
pub fn rss_type_from_mime(mime: &str) -> RssType {
    match mime {
        "application/rss+xml" => RssType::Rss,
        "application/atom+xml" => RssType::Atom,
        "application/json" | "application/feed+json" => RssType::JsonFeed,
        _ => RssType::Unknown,
    }
}

/// First sniffing pass: classify a raw `Content-Type` header value.
///
/// Returns `None` if the header cannot be parsed as a content type at all;
/// generic or unrelated types classify as [`RssType::Unknown`].
pub fn rss_type_from_content_type(header: &str) -> Option<RssType> {
    parse_content_type(header).map(|mime| rss_type_from_mime(&mime))
}

/// Second sniffing pass: classify a body prefix by its structural markers.
///
/// Callers pass at most a bounded prefix of the body; a document cut off after
/// its root element still classifies correctly.
pub fn rss_type_from_content(prefix: &[u8]) -> RssType {
    let prefix = prefix.strip_prefix(UTF8_BOM).unwrap_or(prefix);
    let start = prefix
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(prefix.len());
    let trimmed = &prefix[start..];

    match trimmed.first() {
        Some(b'{') if has_json_feed_version(trimmed) => RssType::JsonFeed,
        Some(b'<') => xml_root_type(trimmed),
        _ => RssType::Unknown,
    }
}

/// Scans for a `"version"` key whose string value is a JSON Feed version URL.
///
/// Works on text rather than a full JSON parse so a truncated prefix still
/// classifies.
fn has_json_feed_version(bytes: &[u8]) -> bool {
    const KEY: &str = "\"version\"";

    let text = String::from_utf8_lossy(bytes);
    let mut rest: &str = &text;

    while let Some(pos) = rest.find(KEY) {
        rest = &rest[pos + KEY.len()..];

        let Some(value) = rest.trim_start().strip_prefix(':') else {
            continue;
        };
        let Some(value) = value.trim_start().strip_prefix('"') else {
            continue;
        };
        let Some(end) = value.find('"') else {
            continue;
        };

        // JSON allows "\/" for "/"
        let version = value[..end].replace("\\/", "/");
        if JSON_FEED_VERSION_PREFIXES
            .iter()
            .any(|p| version.starts_with(p))
        {
            return true;
        }
    }

    false
}

/// Reads XML events up to the root element and classifies its local name.
fn xml_root_type(bytes: &[u8]) -> RssType {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => RssType::Rss,
                    b"RDF" => RssType::Rss,
                    b"feed" => RssType::Atom,
                    _ => RssType::Unknown,
                };
            }
            Ok(Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_)) => {}
            Ok(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => {}
            Ok(Event::Eof) => return RssType::Unknown,
            Ok(_) => return RssType::Unknown,
            Err(e) => {
                tracing::trace!(error = %e, "Body prefix is not well-formed XML");
                return RssType::Unknown;
            }
        }
        buf.clear();
    }
}
