use thiserror::Error;
use url::Url;

/// Reasons a feed URL is rejected by `addfeed`.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed source.
///
/// The URL must parse, use `http` or `https`, and name a host. The returned
/// [`Url`] is only used for the check; callers store the string they were given
/// so the dedup key stays byte-for-byte what the user typed.
///
/// ```
/// use gator::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://blog.boot.dev/index.xml").is_ok());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// assert!(validate_feed_url("not a url").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}
