//! Fixed browser identity attached to outbound requests.
//!
//! The identity is deliberately stable for the lifetime of the process:
//! rotating user agents between requests is itself a fingerprint.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Chrome 120 on Windows.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    (
        "accept-language",
        "zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6",
    ),
    ("accept-encoding", "gzip, deflate, br"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
    (
        "sec-ch-ua",
        "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("user-agent", CHROME_USER_AGENT),
];

/// The full browser identity header set.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len());
    for (name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// Overlay caller-supplied headers on top of the identity.
///
/// Precedence is per field: any header name the caller sets replaces every
/// identity value for that name; all other identity headers are kept.
pub fn merge_headers(identity: &HeaderMap, caller: &HeaderMap) -> HeaderMap {
    let mut merged = identity.clone();
    for name in caller.keys() {
        merged.remove(name);
    }
    for (name, value) in caller {
        merged.append(name.clone(), value.clone());
    }
    merged
}
