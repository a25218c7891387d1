//! Small helpers shared by the fetcher and the command handlers.
//!
//! - **HTML entities**: lenient decoding of feed titles and descriptions
//! - **Terminal text**: control-character stripping and width-aware truncation
//! - **URL validation**: the checks `addfeed` applies before storing a feed

mod feed_url;
mod html;
mod text;

pub use self::feed_url::{validate_feed_url, UrlValidationError};
pub use self::html::decode_html_entities;
pub use self::text::{one_line, strip_control_chars, truncate_to_width};
