use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Reasons a feed URL is refused at registration time.
#[derive(Error, Debug)]
pub enum FeedUrlError {
    #[error("Invalid feed URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    Scheme(String),
    #[error("Feed URL has no host")]
    MissingHost,
    /// Loopback, private, link-local or unspecified address while private hosts are disallowed.
    #[error("Internal host not allowed: {0}")]
    InternalHost(String),
}

/// Validates a URL before it is registered as a feed source.
///
/// Only `http` and `https` URLs with a host are accepted. Unless
/// `allow_private` is set, hosts that resolve syntactically to loopback or
/// private address space (including `localhost`) are rejected so the
/// scheduler never polls internal services.
///
/// ```
/// use feedmill::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://example.com/rss", false).is_ok());
/// assert!(validate_feed_url("http://10.0.0.1/rss", false).is_err());
/// assert!(validate_feed_url("http://10.0.0.1/rss", true).is_ok());
/// assert!(validate_feed_url("file:///etc/passwd", true).is_err());
/// ```
pub fn validate_feed_url(raw: &str, allow_private: bool) -> Result<Url, FeedUrlError> {
    let url = Url::parse(raw.trim())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FeedUrlError::Scheme(url.scheme().to_owned()));
    }

    let host = url.host_str().ok_or(FeedUrlError::MissingHost)?;
    if allow_private {
        return Ok(url);
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Err(FeedUrlError::InternalHost(host.to_owned()));
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_internal(&ip) {
            return Err(FeedUrlError::InternalHost(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_internal(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return true;
            }
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_feed_urls_accepted() {
        let url = validate_feed_url("https://example.com/rss", false).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(validate_feed_url("http://blog.example.org:8080/feed.xml", false).is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let url = validate_feed_url("  https://example.com/rss\n", false).unwrap();
        assert_eq!(url.as_str(), "https://example.com/rss");
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        assert!(matches!(
            validate_feed_url("ftp://example.com/rss", false),
            Err(FeedUrlError::Scheme(s)) if s == "ftp"
        ));
        assert!(validate_feed_url("file:///etc/passwd", true).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_feed_url("not a url", false),
            Err(FeedUrlError::Parse(_))
        ));
    }

    #[test]
    fn test_internal_hosts_rejected_by_default() {
        for raw in [
            "http://localhost/rss",
            "http://127.0.0.1/rss",
            "http://192.168.1.1:8080/rss",
            "http://169.254.1.1/rss",
            "http://0.0.0.0/rss",
            "http://[::1]/rss",
            "http://[fe80::1]/rss",
            "http://[fd00::1]/rss",
        ] {
            assert!(
                matches!(
                    validate_feed_url(raw, false),
                    Err(FeedUrlError::InternalHost(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_internal_hosts_allowed_when_opted_in() {
        assert!(validate_feed_url("http://127.0.0.1:9000/rss", true).is_ok());
        assert!(validate_feed_url("http://localhost/rss", true).is_ok());
    }
}
