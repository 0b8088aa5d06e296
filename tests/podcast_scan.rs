//! Integration tests for podcast directory scans and podcast rendering.

use chopchoprss::catalog::{Catalog, NewPodcast};
use chopchoprss::feed::{
    render_podcast, resolve_audio_dir, scan, scan_with, AudioMetadata, MetadataExtractor,
    ScanError,
};
use pretty_assertions::assert_eq;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("chopchoprss_scan_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write `bytes` to `dir/relative` with a modification time `age_secs` in
/// the past.
fn write_aged(dir: &Path, relative: &str, bytes: &[u8], age_secs: u64) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
        .unwrap();
}

/// Populate a tree with five audio files (one nested two levels deep, one
/// with an upper-case extension, two behind leading dots) and some files the
/// scan must ignore.
fn audio_tree(name: &str) -> PathBuf {
    let dir = test_dir(name);
    write_aged(&dir, "newest.mp3", b"not really audio", 100);
    write_aged(&dir, "sub/dir/ep1.mp3", b"nested episode", 3_000);
    write_aged(&dir, "LOUD.MP3", b"shouting", 2_000);
    write_aged(&dir, "notes.txt", b"show notes", 500);
    write_aged(&dir, "cover.jpg", b"jpeg", 500);
    write_aged(&dir, ".hidden.mp3", b"dotfile", 500);
    write_aged(&dir, ".archive/old.wav", b"archived", 5_000);
    dir
}

// ============================================================================
// Scanning
// ============================================================================

#[test]
fn test_scan_finds_supported_files_oldest_first() {
    let dir = audio_tree("order");

    let report = scan(&dir, "http://x/y/").unwrap();

    let titles: Vec<&str> = report.episodes.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["old", "ep1", "LOUD", ".hidden", "newest"]);
    assert!(report
        .episodes
        .windows(2)
        .all(|pair| pair[0].published <= pair[1].published));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scan_builds_audio_urls_and_enclosure_facts() {
    let dir = audio_tree("urls");

    let report = scan(&dir, "http://x/y/").unwrap();
    let nested = report
        .episodes
        .iter()
        .find(|e| e.title == "ep1")
        .unwrap();

    assert_eq!(nested.audio_url, "http://x/y/audio/sub/dir/ep1.mp3");
    assert_eq!(nested.file_size, "nested episode".len() as u64);
    assert_eq!(nested.mime_type, "audio/mpeg");
    assert_eq!(nested.file_path, dir.join("sub/dir/ep1.mp3"));
    assert_eq!(nested.description, "");
    assert_eq!(nested.duration, None);

    let loud = report.episodes.iter().find(|e| e.title == "LOUD").unwrap();
    assert_eq!(loud.audio_url, "http://x/y/audio/LOUD.MP3");
    assert_eq!(loud.mime_type, "audio/mpeg");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scan_encodes_url_segments() {
    let dir = test_dir("encoding");
    write_aged(&dir, "My Show #1.ogg", b"ogg", 10);

    let report = scan(&dir, "https://pods.example.com").unwrap();
    assert_eq!(
        report.episodes[0].audio_url,
        "https://pods.example.com/audio/My%20Show%20%231.ogg"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scan_missing_directory() {
    let err = scan(Path::new("/nonexistent/chopchoprss/audio"), "http://x").unwrap_err();
    assert!(matches!(err, ScanError::DirectoryNotFound(_)));
}

#[test]
fn test_scan_file_instead_of_directory() {
    let dir = test_dir("not_a_dir");
    write_aged(&dir, "single.mp3", b"x", 1);

    let err = scan(&dir.join("single.mp3"), "http://x").unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory(_)));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scan_rejects_bad_base_url() {
    let dir = audio_tree("bad_base");
    let err = scan(&dir, "ftp://x").unwrap_err();
    assert!(matches!(err, ScanError::InvalidBaseUrl(_)));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_empty_directory_yields_no_episodes() {
    let dir = test_dir("empty");
    let report = scan(&dir, "http://x").unwrap();
    assert!(report.episodes.is_empty());
    assert!(report.skipped.is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_resolved_directory_prefixes_episode_paths() {
    let dir = test_dir("resolve");
    write_aged(&dir, "show/ep.mp3", b"ep", 10);
    std::fs::create_dir_all(dir.join("other")).unwrap();

    let roundabout = dir.join("other").join("..").join("show");
    let resolved = resolve_audio_dir(&roundabout);
    assert_eq!(resolved, dir.join("show").canonicalize().unwrap());

    let report = scan(&resolved, "http://x").unwrap();
    assert!(report.episodes[0].file_path.starts_with(&resolved));
    assert_eq!(report.episodes[0].file_path, resolved.join("ep.mp3"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_resolving_missing_directory_keeps_path() {
    let missing = Path::new("/nonexistent/chopchoprss/show");
    assert_eq!(resolve_audio_dir(missing), missing);
    assert!(matches!(
        scan(&resolve_audio_dir(missing), "http://x"),
        Err(ScanError::DirectoryNotFound(_))
    ));
}

#[cfg(unix)]
#[test]
fn test_unreadable_entries_are_skipped_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = test_dir("unreadable");
    write_aged(&dir, "good.mp3", b"fine", 10);
    write_aged(&dir, "locked.mp3", b"secret", 20);
    write_aged(&dir, "private/inner.mp3", b"hidden away", 30);

    let locked = dir.join("locked.mp3");
    let private = dir.join("private");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    std::fs::set_permissions(&private, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not bind root.
    let enforced = File::open(&locked).is_err() && std::fs::read_dir(&private).is_err();
    let result = enforced.then(|| scan(&dir, "http://x"));

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o644)).unwrap();
    std::fs::set_permissions(&private, std::fs::Permissions::from_mode(0o755)).unwrap();

    if let Some(result) = result {
        let report = result.unwrap();
        let titles: Vec<&str> = report.episodes.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["good"]);

        let mut skipped: Vec<PathBuf> = report.skipped.iter().map(|s| s.path.clone()).collect();
        skipped.sort();
        assert_eq!(skipped, vec![locked, private]);
        assert!(report.skipped.iter().all(|s| !s.reason.is_empty()));
    }

    std::fs::remove_dir_all(&dir).ok();
}

/// Hands out fixed tags so tag handling can be checked without real audio.
struct FixedTags;

impl MetadataExtractor for FixedTags {
    fn extract(&self, _file: File, path: &Path) -> AudioMetadata {
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
        AudioMetadata {
            title: Some(format!("Tagged {stem}")),
            comment: Some("Notes".to_string()),
            album: Some("The Album".to_string()),
            track: Some(5),
            disc: Some(2),
            duration: Some(Duration::from_secs(3_725)),
        }
    }
}

#[test]
fn test_scan_uses_tags_when_present() {
    let dir = test_dir("tags");
    write_aged(&dir, "pilot.flac", b"flac", 10);

    let report = scan_with(&FixedTags, &dir, "http://x").unwrap();
    let ep = &report.episodes[0];

    assert_eq!(ep.title, "Tagged pilot");
    assert_eq!(ep.description, "The Album - Notes");
    assert_eq!(ep.season, Some(2));
    assert_eq!(ep.episode, Some(5));
    assert_eq!(ep.duration, Some(3_725));
    assert_eq!(ep.mime_type, "audio/flac");

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Podcast Rendering
// ============================================================================

fn tech_podcast(audio_dir: &Path) -> NewPodcast {
    NewPodcast {
        title: "Tech Talk".to_string(),
        description: "Weekly chats".to_string(),
        link: "http://x/y".to_string(),
        author: "A".to_string(),
        email: "a@x.com".to_string(),
        image_url: Some("http://i/p.png".to_string()),
        category: Some("Tech".to_string()),
        language: "en".to_string(),
        copyright: Some("2024 A".to_string()),
        explicit: true,
        base_url: "http://x/y".to_string(),
        audio_dir: audio_dir.to_path_buf(),
    }
}

fn position(xml: &str, needle: &str) -> usize {
    xml.find(needle)
        .unwrap_or_else(|| panic!("missing {needle} in:\n{xml}"))
}

#[test]
fn test_podcast_channel_leads_with_itunes_block() {
    let dir = test_dir("itunes_block");
    let mut catalog = Catalog::new();
    let podcast = catalog
        .create_podcast("tech", tech_podcast(&dir), Vec::new())
        .unwrap();

    let xml = render_podcast(podcast).unwrap();

    assert!(xml.contains("xmlns:itunes=\"http://www.itunes.com/dtds/podcast-1.0.dtd\""));

    let after_channel = xml.split("<channel>").nth(1).unwrap().trim_start();
    assert!(after_channel.starts_with("<itunes:category text=\"Tech\" />"));

    let order = [
        "<itunes:category text=\"Tech\" />",
        "<itunes:explicit>yes</itunes:explicit>",
        "<itunes:author>A</itunes:author>",
        "<itunes:owner>",
        "<itunes:name>A</itunes:name>",
        "<itunes:email>a@x.com</itunes:email>",
        "</itunes:owner>",
        "<itunes:image href=\"http://i/p.png\" />",
        "<language>en</language>",
        "<title>Tech Talk</title>",
    ];
    let positions: Vec<usize> = order.iter().map(|n| position(&xml, n)).collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

    assert!(xml.contains("<managingEditor>a@x.com (A)</managingEditor>"));
    assert!(xml.contains("<copyright>2024 A</copyright>"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_podcast_without_optional_fields() {
    let dir = test_dir("itunes_minimal");
    let mut catalog = Catalog::new();
    let podcast = catalog
        .create_podcast(
            "bare",
            NewPodcast {
                title: "Bare".to_string(),
                base_url: "http://x".to_string(),
                audio_dir: dir.clone(),
                ..Default::default()
            },
            Vec::new(),
        )
        .unwrap();

    let xml = render_podcast(podcast).unwrap();
    assert!(!xml.contains("<itunes:category"));
    assert!(!xml.contains("<itunes:image"));
    assert!(!xml.contains("<itunes:owner>"));
    assert!(xml.contains("<itunes:explicit>no</itunes:explicit>"));
    assert!(xml.contains("<language>en</language>"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scanned_podcast_renders_episodes() {
    let dir = test_dir("episodes");
    write_aged(&dir, "pilot.flac", b"0123456789", 10);

    let report = scan_with(&FixedTags, &dir, "http://x/y").unwrap();
    let mut catalog = Catalog::new();
    let podcast = catalog
        .create_podcast("tech", tech_podcast(&dir), report.episodes)
        .unwrap();

    let xml = render_podcast(podcast).unwrap();

    assert!(xml.contains(
        "<enclosure url=\"http://x/y/audio/pilot.flac\" length=\"10\" type=\"audio/flac\" />"
    ));
    assert!(xml.contains("<description>[Season 2, Episode 5] The Album - Notes</description>"));
    assert!(xml.contains("<guid isPermaLink=\"false\">http://x/y/audio/pilot.flac</guid>"));
    assert!(xml.contains("<itunes:duration>01:02:05</itunes:duration>"));
    assert!(xml.contains("<itunes:season>2</itunes:season>"));
    assert!(xml.contains("<itunes:episode>5</itunes:episode>"));

    let parsed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].title.as_ref().unwrap().content, "Tagged pilot");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_rescan_replaces_episodes() {
    let dir = test_dir("rescan");
    write_aged(&dir, "one.mp3", b"1", 20);

    let mut catalog = Catalog::new();
    let first = scan(&dir, "http://x").unwrap();
    catalog
        .create_podcast("show", tech_podcast(&dir), first.episodes)
        .unwrap();

    write_aged(&dir, "two.mp3", b"22", 10);
    std::fs::remove_file(dir.join("one.mp3")).unwrap();

    let second = scan(&dir, "http://x").unwrap();
    let podcast = catalog.replace_episodes("show", second.episodes).unwrap();

    let titles: Vec<&str> = podcast.episodes.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["two"]);

    std::fs::remove_dir_all(&dir).ok();
}
