//! The resource-loading contract and its default HTTP implementation.
//!
//! Parsing is synchronous and single-threaded per document; the only
//! blocking point in the whole pipeline is a [`ResourceClient`] callback.
//! The caller supplies the client, so embedding applications can route
//! fetches through their own stack (or refuse them entirely).

use std::time::Duration;

/// User-Agent header sent with all requests.
///
/// Mimics a common desktop browser to avoid basic bot detection.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes returned by a resource fetch, with enough metadata to decode them.
#[derive(Debug, Clone, Default)]
pub struct ResourcePayload {
    /// MIME type, e.g. `text/css` or `image/png`. May be empty when the
    /// client could not determine it; decoders then sniff the bytes.
    pub mime_type: String,
    /// Character encoding label for text resources (`utf-8`, `iso-8859-1`).
    pub text_encoding: String,
    /// The raw bytes.
    pub data: Vec<u8>,
}

/// Callback interface the embedding application provides for URL and font
/// loading.
///
/// Both calls are synchronous; `None` means "resource unavailable" and the
/// parse continues without it. No retries are attempted.
pub trait ResourceClient {
    /// Fetch the bytes behind `url`. `None` on any failure.
    fn load_url(&self, url: &str) -> Option<ResourcePayload>;

    /// Load a system font matching the description. `None` when no such
    /// font exists.
    fn load_font(
        &self,
        family: &str,
        italic: bool,
        small_caps: bool,
        weight: i32,
    ) -> Option<Vec<u8>>;
}

/// A client that refuses every request. Useful for tests and for callers
/// that want a pure in-memory parse with no subresource loading.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResourceClient;

impl ResourceClient for NullResourceClient {
    fn load_url(&self, _url: &str) -> Option<ResourcePayload> {
        None
    }

    fn load_font(
        &self,
        _family: &str,
        _italic: bool,
        _small_caps: bool,
        _weight: i32,
    ) -> Option<Vec<u8>> {
        None
    }
}

/// Blocking HTTP client for `http:`/`https:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpResourceClient;

impl ResourceClient for HttpResourceClient {
    fn load_url(&self, url: &str) -> Option<ResourcePayload> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .ok()?;

        let response = client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let mut mime_type = String::new();
        let mut text_encoding = String::new();
        if let Some(content_type) = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
        {
            for (index, part) in content_type.split(';').enumerate() {
                let part = part.trim();
                if index == 0 {
                    mime_type = part.to_ascii_lowercase();
                } else if let Some(charset) = part
                    .strip_prefix("charset=")
                    .or_else(|| part.strip_prefix("CHARSET="))
                {
                    text_encoding = charset.trim_matches('"').to_owned();
                }
            }
        }

        let data = response.bytes().ok()?.to_vec();
        Some(ResourcePayload {
            mime_type,
            text_encoding,
            data,
        })
    }

    fn load_font(
        &self,
        _family: &str,
        _italic: bool,
        _small_caps: bool,
        _weight: i32,
    ) -> Option<Vec<u8>> {
        // System font lookup is platform work the embedder owns; over HTTP
        // there is nothing sensible to do.
        None
    }
}
