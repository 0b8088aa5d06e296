//! RSS 2.0 rendering for feeds and podcasts.
//!
//! Podcasts get the iTunes namespace on `<rss>` and a fixed block of
//! `<itunes:*>` elements as the first children of `<channel>`, in this
//! order: category, explicit, author, owner, image, language. Podcast
//! directories already index feeds in that shape, so the order is part of
//! the output contract.

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use thiserror::Error;

use crate::catalog::{Episode, Feed, Item, Podcast};
use crate::util::{format_duration, rfc2822};

pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

/// Enclosure type for entry images. The image is never inspected, so PNGs
/// and GIFs are announced as JPEG too.
pub const IMAGE_ENCLOSURE_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write RSS: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generated RSS contains invalid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

// ============================================================================
// Public API
// ============================================================================

/// Render a plain feed as RSS 2.0.
pub fn render_feed(feed: &Feed) -> Result<String, RenderError> {
    let mut w = RssWriter::new();
    w.declaration()?;
    w.open("rss", &[("version", "2.0"), ("xmlns:content", CONTENT_NS)])?;
    w.open("channel", &[])?;

    w.text("title", &feed.title)?;
    w.text("link", &feed.link)?;
    w.text("description", &feed.description)?;
    if let Some(editor) = managing_editor(&feed.author, &feed.email) {
        w.text("managingEditor", &editor)?;
    }
    w.text("pubDate", &rfc2822(&feed.created))?;
    w.text("lastBuildDate", &rfc2822(&feed.updated))?;

    for item in &feed.items {
        write_item(&mut w, item)?;
    }

    w.close("channel")?;
    w.close("rss")?;
    w.finish()
}

/// Render a podcast as RSS 2.0 with iTunes extensions.
pub fn render_podcast(podcast: &Podcast) -> Result<String, RenderError> {
    let mut w = RssWriter::new();
    w.declaration()?;
    w.open(
        "rss",
        &[
            ("version", "2.0"),
            ("xmlns:content", CONTENT_NS),
            ("xmlns:itunes", ITUNES_NS),
        ],
    )?;
    w.open("channel", &[])?;

    write_itunes_channel(&mut w, podcast)?;

    w.text("title", &podcast.title)?;
    w.text("link", &podcast.link)?;
    w.text("description", &podcast.description)?;
    if let Some(editor) = managing_editor(&podcast.author, &podcast.email) {
        w.text("managingEditor", &editor)?;
    }
    if let Some(copyright) = podcast.copyright.as_deref() {
        w.text("copyright", copyright)?;
    }
    w.text("pubDate", &rfc2822(&podcast.created))?;
    w.text("lastBuildDate", &rfc2822(&podcast.updated))?;

    for episode in &podcast.episodes {
        write_episode(&mut w, episode)?;
    }

    w.close("channel")?;
    w.close("rss")?;
    w.finish()
}

/// Episode description as shown to readers: a `[Season N, Episode M]`
/// prefix when either number is set, then an inline image when the episode
/// has one.
pub fn episode_description(episode: &Episode) -> String {
    let mut labels = Vec::with_capacity(2);
    if let Some(season) = episode.season.filter(|n| *n > 0) {
        labels.push(format!("Season {season}"));
    }
    if let Some(number) = episode.episode.filter(|n| *n > 0) {
        labels.push(format!("Episode {number}"));
    }

    let mut description = match (labels.is_empty(), episode.description.is_empty()) {
        (true, _) => episode.description.clone(),
        (false, true) => format!("[{}]", labels.join(", ")),
        (false, false) => format!("[{}] {}", labels.join(", "), episode.description),
    };

    if let Some(image) = episode.image_url.as_deref().filter(|url| !url.is_empty()) {
        description.push_str(&format!("<br/><img src=\"{image}\" />"));
    }
    description
}

// ============================================================================
// Channel and Item Sections
// ============================================================================

fn write_itunes_channel(w: &mut RssWriter, podcast: &Podcast) -> Result<(), RenderError> {
    if let Some(category) = podcast.category.as_deref() {
        w.empty("itunes:category", &[("text", category)])?;
    }

    w.text("itunes:explicit", if podcast.explicit { "yes" } else { "no" })?;

    if !podcast.author.is_empty() {
        w.text("itunes:author", &podcast.author)?;
    }

    if !podcast.author.is_empty() || !podcast.email.is_empty() {
        w.open("itunes:owner", &[])?;
        if !podcast.author.is_empty() {
            w.text("itunes:name", &podcast.author)?;
        }
        if !podcast.email.is_empty() {
            w.text("itunes:email", &podcast.email)?;
        }
        w.close("itunes:owner")?;
    }

    if let Some(image) = podcast.image_url.as_deref() {
        w.empty("itunes:image", &[("href", image)])?;
    }

    if !podcast.language.is_empty() {
        w.text("language", &podcast.language)?;
    }

    Ok(())
}

fn write_item(w: &mut RssWriter, item: &Item) -> Result<(), RenderError> {
    w.open("item", &[])?;

    w.text("title", &item.title)?;
    if !item.link.is_empty() {
        w.text("link", &item.link)?;
    }
    w.text("description", &item.description)?;
    if !item.content.is_empty() {
        w.text("content:encoded", &item.content)?;
    }
    w.open("guid", &[("isPermaLink", "false")])?;
    w.raw_text(&item_guid(item))?;
    w.close("guid")?;
    w.text("pubDate", &rfc2822(&item.created))?;

    if let Some(image) = item.image_url.as_deref().filter(|url| !url.is_empty()) {
        w.empty(
            "enclosure",
            &[
                ("url", image),
                ("length", "0"),
                ("type", IMAGE_ENCLOSURE_TYPE),
            ],
        )?;
    }

    w.close("item")
}

fn write_episode(w: &mut RssWriter, episode: &Episode) -> Result<(), RenderError> {
    w.open("item", &[])?;

    w.text("title", &episode.title)?;
    w.text("description", &episode_description(episode))?;
    w.open("guid", &[("isPermaLink", "false")])?;
    w.raw_text(&episode.audio_url)?;
    w.close("guid")?;
    w.text("pubDate", &rfc2822(&episode.published))?;

    let length = episode.file_size.to_string();
    w.empty(
        "enclosure",
        &[
            ("url", episode.audio_url.as_str()),
            ("length", length.as_str()),
            ("type", episode.mime_type.as_str()),
        ],
    )?;

    if let Some(secs) = episode.duration {
        w.text("itunes:duration", &format_duration(secs))?;
    }
    if let Some(season) = episode.season.filter(|n| *n > 0) {
        w.text("itunes:season", &season.to_string())?;
    }
    if let Some(number) = episode.episode.filter(|n| *n > 0) {
        w.text("itunes:episode", &number.to_string())?;
    }
    if let Some(image) = episode.image_url.as_deref().filter(|url| !url.is_empty()) {
        w.empty("itunes:image", &[("href", image)])?;
    }

    w.close("item")
}

/// `email (name)` when both are known, otherwise whichever one is set.
fn managing_editor(author: &str, email: &str) -> Option<String> {
    match (author.is_empty(), email.is_empty()) {
        (false, false) => Some(format!("{email} ({author})")),
        (false, true) => Some(author.to_string()),
        (true, false) => Some(email.to_string()),
        (true, true) => None,
    }
}

/// Stable identifier for a feed entry: its link when it has one, otherwise a
/// SHA-256 over title and creation time.
fn item_guid(item: &Item) -> String {
    if !item.link.trim().is_empty() {
        return item.link.trim().to_string();
    }
    let input = format!(
        "{}|{}",
        item.title,
        item.created.timestamp_nanos_opt().unwrap_or_default()
    );
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

// ============================================================================
// Writer
// ============================================================================

/// Thin layer over the quick-xml writer with the handful of shapes RSS
/// needs.
struct RssWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl RssWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn declaration(&mut self) -> Result<(), RenderError> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.inner.write_event(Event::Start(start))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), RenderError> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn raw_text(&mut self, value: &str) -> Result<(), RenderError> {
        self.inner.write_event(Event::Text(BytesText::new(value)))?;
        Ok(())
    }

    /// `<name>value</name>`, with `value` escaped.
    fn text(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        self.open(name, &[])?;
        self.raw_text(value)?;
        self.close(name)
    }

    /// Self-closing element spelled `<name attr="value" />`, the form
    /// podcast directories have always been served.
    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let mut content = String::from(name);
        for (key, value) in attrs {
            content.push_str(&format!(" {key}=\"{}\"", escape(*value)));
        }
        content.push(' ');
        self.inner
            .write_event(Event::Empty(BytesStart::from_content(content, name.len())))?;
        Ok(())
    }

    fn finish(self) -> Result<String, RenderError> {
        let bytes = self.inner.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
