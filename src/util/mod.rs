//! Utilities shared by the fetch and parse layers.
//!
//! - **URL validation**: refuse URLs that would reach localhost or private networks
//! - **Text sanitizing**: strip terminal control sequences from feed-supplied text

mod text;
mod url_validator;

pub use text::strip_control_chars;
pub use url_validator::{validate_url, UrlValidationError};
