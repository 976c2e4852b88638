use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use crate::error::AssemblyError;
use crate::state::request::{HttpMethod, RequestDocument};

/// What to do with an enabled header row whose name or value cannot go on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderPolicy {
    /// Fail assembly with the first offending row.
    #[default]
    Strict,
    /// Drop the row, log a warning and keep going.
    SkipInvalid,
}

/// URL produced by [`resolve_url`].
///
/// Displays a path-less base such as `https://example.com` without the `/` that
/// URL normalisation inserts, as long as no path segment was appended to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    url: Url,
    bare_root: bool,
}

impl ResolvedUrl {
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

impl fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bare_root {
            f.write_str(&self.url[..Position::BeforePath])?;
            f.write_str(&self.url[Position::AfterPath..])
        } else {
            f.write_str(self.url.as_str())
        }
    }
}

/// Method, URL and headers ready for a transport. The body is attached separately.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: ResolvedUrl,
    pub headers: HeaderMap,
}

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Fill in a scheme for a base URL typed without one. `:3000/api` means a local
/// port; loopback hosts get `http`, every other host `https`.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() || input.contains("://") {
        return input.to_string();
    }
    match input.strip_prefix(':') {
        Some(port_and_path) => format!("http://localhost:{port_and_path}"),
        None if LOOPBACK_HOSTS.iter().any(|host| input.starts_with(host)) => {
            format!("http://{input}")
        }
        None => format!("https://{input}"),
    }
}

/// Parse the base URL and append enabled query pairs and path segments, in list order.
pub fn resolve_url(doc: &RequestDocument) -> Result<ResolvedUrl, AssemblyError> {
    let raw = doc.base_url().trim();
    let invalid = |reason: String| AssemblyError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let mut url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;

    let params: Vec<_> = doc.query_params().enabled().collect();
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for param in params {
            pairs.append_pair(&param.key, &param.value);
        }
    }

    let segments: Vec<&str> = doc
        .path_segments()
        .enabled()
        .map(|segment| segment.value.as_str())
        .collect();
    if let Some(dot) = segments.iter().find(|s| matches!(**s, "." | "..")) {
        return Err(AssemblyError::InvalidPathSegment { value: dot.to_string() });
    }
    if !segments.is_empty() {
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot carry path segments".to_string()))?
            .pop_if_empty()
            .extend(&segments);
    }

    let raw_path = raw.split(['?', '#']).next().unwrap_or(raw);
    let bare_root = segments.is_empty() && url.path() == "/" && !raw_path.ends_with('/');

    Ok(ResolvedUrl { url, bare_root })
}

/// Assemble the wire request. Enabled headers are folded in list order, so a later
/// row with the same name replaces an earlier one.
pub fn build_wire_request(
    doc: &RequestDocument,
    policy: HeaderPolicy,
) -> Result<WireRequest, AssemblyError> {
    let url = resolve_url(doc)?;

    let mut headers = HeaderMap::new();
    for entry in doc.headers().enabled() {
        let name = match HeaderName::from_bytes(entry.key.as_bytes()) {
            Ok(name) => name,
            Err(_) if policy == HeaderPolicy::SkipInvalid => {
                tracing::warn!(event = "assembly.header_skipped", header = %entry.key, "invalid header name");
                continue;
            }
            Err(_) => return Err(AssemblyError::InvalidHeaderName { name: entry.key.clone() }),
        };
        let value = match HeaderValue::from_bytes(entry.value.as_bytes()) {
            Ok(value) => value,
            Err(_) if policy == HeaderPolicy::SkipInvalid => {
                tracing::warn!(event = "assembly.header_skipped", header = %entry.key, "invalid header value");
                continue;
            }
            Err(_) => return Err(AssemblyError::InvalidHeaderValue { name: entry.key.clone() }),
        };
        headers.insert(name, value);
    }

    tracing::debug!(
        event = "assembly.built",
        request = %doc.id(),
        method = doc.method().as_str(),
        url = %url,
        headers = headers.len(),
    );

    Ok(WireRequest {
        method: doc.method(),
        url,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::key_value::{KeyValueEntry, PathSegment};

    fn doc(base: &str) -> RequestDocument {
        RequestDocument::new("test").with_base_url(base)
    }

    #[test]
    fn test_plain_base_is_unchanged() {
        let mut d = doc("https://example.com");
        assert_eq!(resolve_url(&d).unwrap().to_string(), "https://example.com");

        d.edit_query_params(|q| q.push(KeyValueEntry::disabled("a", "1")));
        d.edit_path_segments(|p| {
            let id = p.push(PathSegment::new("users"));
            p.toggle(id);
        });
        assert_eq!(resolve_url(&d).unwrap().to_string(), "https://example.com");
    }

    #[test]
    fn test_trailing_slash_base_is_kept() {
        let d = doc("https://example.com/");
        assert_eq!(resolve_url(&d).unwrap().to_string(), "https://example.com/");
    }

    #[test]
    fn test_segments_and_query() {
        let mut d = doc("https://api.example.com");
        d.edit_path_segments(|p| p.push(PathSegment::new("users")));
        d.edit_query_params(|q| q.push(KeyValueEntry::new("Name1", "Value1")));
        assert_eq!(
            resolve_url(&d).unwrap().to_string(),
            "https://api.example.com/users?Name1=Value1"
        );
    }

    #[test]
    fn test_query_on_bare_base() {
        let mut d = doc("https://example.com");
        d.edit_query_params(|q| q.push(KeyValueEntry::new("q", "a b")));
        assert_eq!(resolve_url(&d).unwrap().to_string(), "https://example.com?q=a+b");
        assert_eq!(resolve_url(&d).unwrap().as_url().as_str(), "https://example.com/?q=a+b");
    }

    #[test]
    fn test_segment_slash_is_encoded() {
        let mut d = doc("https://example.com/v1/");
        d.edit_path_segments(|p| {
            p.push(PathSegment::new("a/b"));
            p.push(PathSegment::new("caf\u{e9}"));
        });
        assert_eq!(
            resolve_url(&d).unwrap().to_string(),
            "https://example.com/v1/a%2Fb/caf%C3%A9"
        );
    }

    #[test]
    fn test_duplicate_query_keys_are_kept() {
        let mut d = doc("https://example.com/search?lang=en");
        d.edit_query_params(|q| {
            q.push(KeyValueEntry::new("tag", "a"));
            q.push(KeyValueEntry::new("tag", "b"));
        });
        assert_eq!(
            resolve_url(&d).unwrap().to_string(),
            "https://example.com/search?lang=en&tag=a&tag=b"
        );
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        let mut d = doc("https://example.com/v1");
        d.edit_path_segments(|p| {
            p.push(PathSegment::new(".."));
            p.push(PathSegment::new("x"));
            p.push(PathSegment::new("."));
        });
        assert_eq!(
            resolve_url(&d).unwrap_err(),
            AssemblyError::InvalidPathSegment { value: "..".into() }
        );

        // Dots inside a longer segment are ordinary text.
        let mut d = doc("https://example.com/v1");
        d.edit_path_segments(|p| p.push(PathSegment::new("...")));
        assert_eq!(resolve_url(&d).unwrap().to_string(), "https://example.com/v1/...");

        let mut d = doc("https://example.com/v1");
        d.edit_path_segments(|p| {
            let id = p.push(PathSegment::new(".."));
            p.toggle(id);
        });
        assert_eq!(resolve_url(&d).unwrap().to_string(), "https://example.com/v1");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = resolve_url(&doc("not a url")).unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidBaseUrl { .. }));

        let mut d = doc("mailto:someone@example.com");
        d.edit_path_segments(|p| p.push(PathSegment::new("x")));
        assert!(matches!(resolve_url(&d), Err(AssemblyError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_toggle_round_trip_restores_request() {
        let mut d = doc("https://example.com");
        let (q, h, p) = (
            d.edit_query_params(|l| l.push(KeyValueEntry::new("page", "2"))),
            d.edit_headers(|l| l.push(KeyValueEntry::new("Accept", "text/plain"))),
            d.edit_path_segments(|l| l.push(PathSegment::new("items"))),
        );
        let all_on = build_wire_request(&d, HeaderPolicy::Strict).unwrap();

        d.edit_query_params(|l| l.toggle(q));
        d.edit_headers(|l| l.toggle(h));
        d.edit_path_segments(|l| l.toggle(p));
        let all_off = build_wire_request(&d, HeaderPolicy::Strict).unwrap();
        assert_eq!(all_off.url.to_string(), "https://example.com");
        assert!(all_off.headers.is_empty());

        d.edit_query_params(|l| l.toggle(q));
        d.edit_headers(|l| l.toggle(h));
        d.edit_path_segments(|l| l.toggle(p));
        assert_eq!(build_wire_request(&d, HeaderPolicy::Strict).unwrap(), all_on);
    }

    #[test]
    fn test_duplicate_headers_last_wins() {
        let mut d = doc("https://example.com");
        d.edit_headers(|h| {
            h.push(KeyValueEntry::new("X-Id", "1"));
            h.push(KeyValueEntry::new("X-Id", "2"));
        });
        let wire = build_wire_request(&d, HeaderPolicy::Strict).unwrap();
        assert_eq!(wire.headers.get("x-id").unwrap(), "2");
        assert_eq!(wire.headers.get_all("x-id").iter().count(), 1);
    }

    #[test]
    fn test_invalid_header_name_policy() {
        let mut d = doc("https://example.com");
        d.edit_headers(|h| {
            h.push(KeyValueEntry::new("Bad Name", "x"));
            h.push(KeyValueEntry::new("Accept", "*/*"));
        });
        assert_eq!(
            build_wire_request(&d, HeaderPolicy::Strict).unwrap_err(),
            AssemblyError::InvalidHeaderName { name: "Bad Name".into() }
        );
        let wire = build_wire_request(&d, HeaderPolicy::SkipInvalid).unwrap();
        assert_eq!(wire.headers.len(), 1);
        assert_eq!(wire.headers.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_empty_header_name_is_invalid() {
        let mut d = doc("https://example.com");
        d.edit_headers(|h| h.push(KeyValueEntry::new("", "x")));
        assert!(matches!(
            build_wire_request(&d, HeaderPolicy::Strict),
            Err(AssemblyError::InvalidHeaderName { .. })
        ));
    }

    #[test]
    fn test_invalid_header_value() {
        let mut d = doc("https://example.com");
        d.edit_headers(|h| h.push(KeyValueEntry::new("X-Note", "line\nbreak")));
        assert_eq!(
            build_wire_request(&d, HeaderPolicy::Strict).unwrap_err(),
            AssemblyError::InvalidHeaderValue { name: "X-Note".into() }
        );
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url(":3000/api"), "http://localhost:3000/api");
        assert_eq!(normalize_url("localhost/api"), "http://localhost/api");
        assert_eq!(normalize_url("api.example.com"), "https://api.example.com");
        assert_eq!(normalize_url("ftp://files.example.com"), "ftp://files.example.com");
        assert_eq!(normalize_url("  [::1]:8080/health "), "http://[::1]:8080/health");
        assert_eq!(normalize_url(""), "");
    }
}
