use thiserror::Error;
use url::Url;

/// Errors from podcast base URL handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// The URL string could not be parsed.
    #[error("Invalid URL '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL cannot carry path segments (e.g. `mailto:`).
    #[error("URL cannot be used as a base: {0}")]
    CannotBeABase(String),
}

/// Validates a podcast base URL.
///
/// Unlike feed subscriptions, base URLs routinely point at localhost or a
/// LAN address, so only the scheme is restricted.
///
/// # Examples
///
/// ```
/// use chopchoprss::util::validate_base_url;
///
/// assert!(validate_base_url("http://localhost:8090/show").is_ok());
/// assert!(validate_base_url("file:///srv/audio").is_err());
/// ```
pub fn validate_base_url(base_url: &str) -> Result<Url, UrlError> {
    let url = Url::parse(base_url).map_err(|source| UrlError::Invalid {
        url: base_url.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// `s` with every trailing `/` removed.
pub fn trim_trailing_slash(s: &str) -> &str {
    s.trim_end_matches('/')
}

/// Public URL of an audio file: `trim_trailing_slash(base_url) + "/audio/"`
/// followed by the file's path segments, each percent-encoded.
///
/// # Examples
///
/// ```
/// use chopchoprss::util::audio_url;
///
/// let segments = vec!["sub".to_string(), "dir".to_string(), "ep1.mp3".to_string()];
/// assert_eq!(
///     audio_url("http://x/y/", &segments).unwrap(),
///     "http://x/y/audio/sub/dir/ep1.mp3"
/// );
/// ```
pub fn audio_url(base_url: &str, segments: &[String]) -> Result<String, UrlError> {
    let prefix = format!("{}/audio/", trim_trailing_slash(base_url));
    let mut url = validate_base_url(&prefix)?;

    url.path_segments_mut()
        .map_err(|()| UrlError::CannotBeABase(base_url.to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url.into())
}
