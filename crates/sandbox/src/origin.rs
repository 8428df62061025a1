//! Origins and the embed origin allow-list.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Origins the embedded player is served from.
pub static DEFAULT_EMBED_ORIGINS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "https://www.youtube.com",
        "https://youtube.com",
        "https://www.youtube-nocookie.com",
        "https://m.youtube.com",
    ]
});

/// Represents an origin (scheme, host, port tuple).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    pub fn new(scheme: &str, host: &str, port: Option<u16>) -> Self {
        Self {
            scheme: scheme.to_lowercase(),
            host: host.to_lowercase(),
            port,
        }
    }

    /// Origin of a URL. Opaque origins (data:, file:, blob:, ...) yield `None`.
    pub fn from_url(url: &Url) -> Option<Self> {
        let scheme = url.scheme().to_lowercase();
        if matches!(scheme.as_str(), "data" | "file" | "blob" | "javascript" | "about") {
            return None;
        }

        let host = url.host_str()?.to_lowercase();
        let port = url.port_or_known_default();
        Some(Self { scheme, host, port })
    }

    /// Parse a serialized origin or any URL. `"null"` is opaque.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("null") {
            return None;
        }
        let url = Url::parse(s).ok()?;
        Self::from_url(&url)
    }

    pub fn is_same_origin(&self, other: &Origin) -> bool {
        self.scheme == other.scheme
            && self.host == other.host
            && self.effective_port() == other.effective_port()
    }

    pub fn is_same_origin_with_url(&self, url: &Url) -> bool {
        Origin::from_url(url).map_or(false, |other| self.is_same_origin(&other))
    }

    /// Port, falling back to the scheme default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.scheme.as_str() {
            "http" | "ws" => 80,
            "https" | "wss" => 443,
            _ => 0,
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_port = match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };

        match self.port {
            Some(port) if Some(port) != default_port => {
                write!(f, "{}://{}:{}", self.scheme, self.host, port)
            }
            _ => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

/// Set of origins whose messages are trusted.
#[derive(Clone, Debug, Default)]
pub struct AllowedOrigins {
    origins: HashSet<Origin>,
}

impl AllowedOrigins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from serialized origins. Unparsable entries are skipped with a warning.
    pub fn from_strs<'a>(origins: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::new();
        for origin in origins {
            if !set.insert(origin) {
                tracing::warn!("ignoring unparsable allowed origin '{}'", origin);
            }
        }
        set
    }

    /// Add an origin. Returns false if it could not be parsed.
    pub fn insert(&mut self, origin: &str) -> bool {
        match Origin::parse(origin) {
            Some(parsed) => {
                self.origins.insert(parsed);
                true
            }
            None => false,
        }
    }

    /// Whether a serialized message origin is on the list.
    pub fn allows(&self, origin: &str) -> bool {
        Origin::parse(origin).map_or(false, |o| {
            self.origins.iter().any(|allowed| allowed.is_same_origin(&o))
        })
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_from_url() {
        let origin = Origin::parse("https://www.youtube.com/embed/abc").unwrap();
        assert_eq!(origin.scheme, "https");
        assert_eq!(origin.host, "www.youtube.com");
        assert_eq!(origin.effective_port(), 443);
        assert_eq!(origin.to_string(), "https://www.youtube.com");
    }

    #[test]
    fn test_same_origin() {
        let a = Origin::parse("https://app.example/a").unwrap();
        let b = Origin::parse("https://app.example:443/b").unwrap();
        let c = Origin::parse("http://app.example/").unwrap();
        assert!(a.is_same_origin(&b));
        assert!(!a.is_same_origin(&c));
    }

    #[test]
    fn test_opaque_origins() {
        assert!(Origin::parse("null").is_none());
        assert!(Origin::parse("data:text/html,hi").is_none());
        assert!(Origin::parse("not a url").is_none());
    }

    #[test]
    fn test_allow_list() {
        let allowed = AllowedOrigins::from_strs(DEFAULT_EMBED_ORIGINS.iter().copied());
        assert_eq!(allowed.len(), 4);
        assert!(allowed.allows("https://www.youtube.com"));
        assert!(allowed.allows("https://WWW.YOUTUBE.COM"));
        assert!(!allowed.allows("https://evil.example"));
        assert!(!allowed.allows("http://www.youtube.com"));
        assert!(!allowed.allows("null"));
    }
}
