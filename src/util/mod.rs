//! Utility functions shared by the scanner, renderer and command line.
//!
//! - **URL handling**: base URL validation and audio URL construction
//! - **Formatting**: RFC 2822 dates and `HH:MM:SS` durations for RSS output

mod format;
mod links;

pub use format::{format_duration, rfc2822};
pub use links::{audio_url, trim_trailing_slash, validate_base_url, UrlError};
