use crate::error::UrlError;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static AIRBNB_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|\.)airbnb\.(com|co\.uk|ca|de|fr|it|es|com\.au)$").expect("valid host regex")
});

/// Normalize an Airbnb listing URL to scheme + host + path.
///
/// Query strings and fragments are dropped so equivalent links share a cache key.
pub fn normalize_listing_url(raw: &str) -> Result<String, UrlError> {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| UrlError::Invalid(e.to_string()))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingHost)?
        .to_lowercase();

    if !AIRBNB_HOST.is_match(&host) {
        return Err(UrlError::UnsupportedHost(host));
    }

    let path = parsed.path().trim_end_matches('/');
    if !path.contains("/rooms/") {
        return Err(UrlError::NotARoom(path.to_string()));
    }

    Ok(format!("{}://{}{}", parsed.scheme(), host, path))
}

/// Deterministic cache key for a listing and request variant
pub fn build_cache_key(url: &str, variant: &str) -> Result<String, UrlError> {
    let normalized = normalize_listing_url(url)?;
    Ok(format!("{}::{}", normalized.to_lowercase(), variant.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_fragment_and_trailing_slash() {
        let url = normalize_listing_url("https://www.Airbnb.com/rooms/12345/?adults=2#photos").unwrap();
        assert_eq!(url, "https://www.airbnb.com/rooms/12345");
    }

    #[test]
    fn defaults_scheme_to_https() {
        let url = normalize_listing_url("airbnb.co.uk/rooms/42").unwrap();
        assert_eq!(url, "https://airbnb.co.uk/rooms/42");
    }

    #[test]
    fn rejects_foreign_hosts() {
        let err = normalize_listing_url("https://airbnb.com.evil.example/rooms/1").unwrap_err();
        assert!(matches!(err, UrlError::UnsupportedHost(_)));
    }

    #[test]
    fn rejects_non_room_paths() {
        let err = normalize_listing_url("https://www.airbnb.com/s/Lisbon/homes").unwrap_err();
        assert!(matches!(err, UrlError::NotARoom(_)));
    }

    #[test]
    fn cache_key_includes_variant() {
        let key = build_cache_key("https://www.airbnb.com/rooms/7?x=1", "Free").unwrap();
        assert_eq!(key, "https://www.airbnb.com/rooms/7::free");
    }
}
