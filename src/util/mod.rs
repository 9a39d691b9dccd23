//! Utility functions for common operations.
//!
//! - **URL validation**: scheme and host checks for typed feed URLs and links
//! - **Text processing**: rune counting, padding and sanitizing of feed text
//!
//! # Examples
//!
//! ```
//! use skiff::util::{pad_right, truncate_runes, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.scheme(), "https");
//!
//! assert_eq!(pad_right("(1/3)", 8), "(1/3)   ");
//! assert_eq!(truncate_runes("Long article title", 4), "Long");
//! ```

mod text;
mod url_validator;

pub use text::{
    pad_left, pad_right, rune_count, single_line, strip_control_chars, truncate_runes,
};
pub use url_validator::{validate_url, validate_url_for_open, UrlValidationError};
