//! Reading the MDSM cookie from requests and building `Set-Cookie` values.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::HeaderMap;
use http::header::COOKIE;
use httpdate::fmt_http_date;
use serde::{Deserialize, Serialize};

/// The name of the single cookie MDSM reads and writes.
pub const COOKIE_NAME: &str = "mdsm";

/// SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// SameSite=Strict
    Strict,
    /// SameSite=Lax
    Lax,
    /// SameSite=None
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes attached to the `mdsm` cookie when it is set or cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Cookie path.
    pub path: String,

    /// Optional cookie domain.
    pub domain: Option<String>,

    /// Send on HTTPS only. Default: `true`; turn it off when serving plain
    /// HTTP, or browsers will never send the cookie back.
    pub secure: bool,

    /// Not accessible to scripts.
    pub http_only: bool,

    /// SameSite attribute.
    pub same_site: SameSite,

    /// Max-Age in seconds. `None` makes it a browser-session cookie.
    pub max_age_seconds: Option<u64>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age_seconds: None,
        }
    }
}

/// Returns the value of the `mdsm` cookie, if the request carries one.
///
/// All `Cookie` headers are scanned (HTTP/2 clients may split them). An
/// empty value counts as absent.
pub fn extract_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == COOKIE_NAME)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn push_attributes(parts: &mut Vec<String>, opts: &CookieOptions) {
    parts.push(format!("Path={}", opts.path));

    if let Some(domain) = &opts.domain {
        parts.push(format!("Domain={domain}"));
    }

    if opts.secure {
        parts.push("Secure".to_string());
    }
    if opts.http_only {
        parts.push("HttpOnly".to_string());
    }

    parts.push(format!("SameSite={}", opts.same_site.as_str()));
}

/// Builds a `Set-Cookie` header value carrying a sealed cookie.
pub fn build_set_cookie(value: &str, opts: &CookieOptions) -> String {
    let mut parts = vec![format!("{COOKIE_NAME}={value}")];
    push_attributes(&mut parts, opts);

    if let Some(max_age) = opts.max_age_seconds {
        parts.push(format!("Max-Age={max_age}"));
        // Expires for older clients.
        let expires = SystemTime::now() + Duration::from_secs(max_age);
        parts.push(format!("Expires={}", fmt_http_date(expires)));
    }

    parts.join("; ")
}

/// Builds a `Set-Cookie` header value that makes the client drop the cookie.
pub fn build_clear_cookie(opts: &CookieOptions) -> String {
    let mut parts = vec![format!("{COOKIE_NAME}=")];
    push_attributes(&mut parts, opts);
    parts.push("Max-Age=0".to_string());
    parts.push(format!("Expires={}", fmt_http_date(UNIX_EPOCH)));
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(COOKIE, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_cookie_finds_mdsm_among_others() {
        let h = headers(&["theme=dark; mdsm=abc_DEF-1; lang=en"]);
        assert_eq!(extract_cookie(&h).as_deref(), Some("abc_DEF-1"));
    }

    #[test]
    fn test_extract_cookie_scans_every_header() {
        let h = headers(&["theme=dark", "mdsm=xyz"]);
        assert_eq!(extract_cookie(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_extract_cookie_ignores_similar_names() {
        let h = headers(&["mdsm_old=1; xmdsm=2"]);
        assert_eq!(extract_cookie(&h), None);
    }

    #[test]
    fn test_extract_cookie_missing_or_empty_is_none() {
        assert_eq!(extract_cookie(&HeaderMap::new()), None);
        assert_eq!(extract_cookie(&headers(&["mdsm="])), None);
    }

    #[test]
    fn test_build_set_cookie_defaults() {
        let sc = build_set_cookie("abc", &CookieOptions::default());
        assert_eq!(sc, "mdsm=abc; Path=/; Secure; HttpOnly; SameSite=Lax");
    }

    #[test]
    fn test_build_set_cookie_insecure_omits_secure() {
        let opts = CookieOptions {
            secure: false,
            ..CookieOptions::default()
        };
        let sc = build_set_cookie("abc", &opts);
        assert_eq!(sc, "mdsm=abc; Path=/; HttpOnly; SameSite=Lax");
    }

    #[test]
    fn test_build_set_cookie_with_max_age_adds_expires() {
        let opts = CookieOptions {
            max_age_seconds: Some(60),
            ..CookieOptions::default()
        };
        let sc = build_set_cookie("abc", &opts);
        assert!(sc.contains("Secure"));
        assert!(sc.contains("Max-Age=60"));
        assert!(sc.contains("Expires="));
    }

    #[test]
    fn test_build_clear_cookie_has_max_age_zero() {
        let sc = build_clear_cookie(&CookieOptions::default());
        assert!(sc.starts_with("mdsm=;"));
        assert!(sc.contains("Max-Age=0"));
        assert!(sc.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }
}
