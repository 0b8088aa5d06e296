//! chopchoprss: a small catalog of RSS feeds and directory-backed podcasts,
//! rendered as RSS 2.0 and served over HTTP.

pub mod catalog;
pub mod config;
pub mod feed;
pub mod server;
pub mod util;
