//! Typed resources and the per-document resource cache.
//!
//! The cache memoizes fetched bytes by absolute URL (fragment excluded).
//! A fetch that fails - client refusal, undecodable bytes - is negative-cached
//! for the document's lifetime, so the pipeline asks the network at most once
//! per URL. No retries, no TTL; a document parse is a one-shot batch job.

use std::collections::HashMap;
use std::rc::Rc;

use crate::net::{ResourceClient, ResourcePayload};
use crate::url::Url;
use crate::warning::{warn_once, WarnKind};

/// Intrinsic metadata for a loaded image.
///
/// Only the header is examined here; pixel decoding belongs to the painter.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
    /// MIME type the image was served with (or sniffed).
    pub mime_type: String,
    /// The undecoded image bytes.
    pub bytes: Vec<u8>,
}

/// Raw bytes for a loaded font face.
#[derive(Debug, Clone)]
pub struct FontData {
    /// The undecoded font file bytes (TTF/OTF/WOFF).
    pub bytes: Vec<u8>,
}

/// A decoded resource, typed by what requested it.
#[derive(Debug, Clone)]
pub enum Resource {
    /// Stylesheet or other text payload, already character-decoded.
    Text(String),
    /// Image payload with intrinsic dimensions.
    Image(ImageData),
    /// Font payload.
    Font(FontData),
}

/// What the caller expects the fetched bytes to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Decode as text using the payload's encoding label.
    Text,
    /// Sniff image headers for intrinsic dimensions.
    Image,
    /// Keep the bytes as an opaque font file.
    Font,
}

/// Per-document resource cache.
///
/// Single-threaded by design: a document is parsed and styled on one thread,
/// so the cache needs no locking.
#[derive(Default)]
pub struct ResourceCache {
    entries: HashMap<String, Option<Rc<Resource>>>,
}

impl ResourceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `url` through `client`, decode it as `kind`, and memoize the
    /// result. Returns `None` for the null URL, a refused fetch, or a decode
    /// failure - all of which are negative-cached.
    pub fn fetch(
        &mut self,
        client: &dyn ResourceClient,
        url: &Url,
        kind: ResourceKind,
    ) -> Option<Rc<Resource>> {
        if url.is_null() {
            return None;
        }
        let key = url.base().to_owned();
        if let Some(entry) = self.entries.get(&key) {
            return entry.clone();
        }

        let payload = if url.protocol_is("data") {
            url.decode_data()
                .ok()
                .map(|(mime_type, text_encoding, data)| ResourcePayload {
                    mime_type,
                    text_encoding,
                    data,
                })
        } else {
            client.load_url(url.as_str())
        };

        let resource = payload.and_then(|payload| decode(&payload, kind));
        if resource.is_none() {
            warn_once(WarnKind::Resource, &format!("unavailable: {}", url.as_str()));
        }
        let entry = resource.map(Rc::new);
        let _ = self.entries.insert(key, entry.clone());
        entry
    }

    /// Number of cached entries, negative entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been fetched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode a payload into the requested resource type.
fn decode(payload: &ResourcePayload, kind: ResourceKind) -> Option<Resource> {
    match kind {
        ResourceKind::Text => Some(Resource::Text(decode_text(
            &payload.data,
            &payload.text_encoding,
        ))),
        ResourceKind::Image => {
            let (width, height) = sniff_image_dimensions(&payload.data)?;
            Some(Resource::Image(ImageData {
                width,
                height,
                mime_type: payload.mime_type.clone(),
                bytes: payload.data.clone(),
            }))
        }
        ResourceKind::Font => Some(Resource::Font(FontData {
            bytes: payload.data.clone(),
        })),
    }
}

/// Decode text bytes using the encoding label, defaulting to UTF-8 with a
/// Latin-1 fallback for undecodable sequences.
pub fn decode_text(data: &[u8], encoding: &str) -> String {
    // Strip a UTF-8 BOM regardless of the label.
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(data);

    if encoding.eq_ignore_ascii_case("iso-8859-1")
        || encoding.eq_ignore_ascii_case("latin1")
        || encoding.eq_ignore_ascii_case("windows-1252")
    {
        return data.iter().map(|&b| char::from(b)).collect();
    }

    // UTF-8, US-ASCII, unlabeled: try UTF-8 first, fall back byte-wise.
    match std::str::from_utf8(data) {
        Ok(text) => text.to_owned(),
        Err(_) => data.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Read intrinsic dimensions from PNG, GIF, or JPEG headers.
fn sniff_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    // PNG: 8-byte signature, then IHDR with big-endian width/height.
    if data.len() >= 24 && data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height));
    }

    // GIF: little-endian logical screen size at offset 6.
    if data.len() >= 10 && (data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")) {
        let width = u32::from(u16::from_le_bytes([data[6], data[7]]));
        let height = u32::from(u16::from_le_bytes([data[8], data[9]]));
        return Some((width, height));
    }

    // JPEG: scan segments for a start-of-frame marker.
    if data.len() >= 4 && data.starts_with(&[0xFF, 0xD8]) {
        let mut index = 2;
        while index + 9 < data.len() {
            if data[index] != 0xFF {
                return None;
            }
            let marker = data[index + 1];
            // SOF0..SOF15, excluding DHT/DNL/DAC.
            if (0xC0..=0xCF).contains(&marker)
                && marker != 0xC4
                && marker != 0xC8
                && marker != 0xCC
            {
                let height = u32::from(u16::from_be_bytes([data[index + 5], data[index + 6]]));
                let width = u32::from(u16::from_be_bytes([data[index + 7], data[index + 8]]));
                return Some((width, height));
            }
            let length = usize::from(u16::from_be_bytes([data[index + 2], data[index + 3]]));
            index += 2 + length;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NullResourceClient;
    use std::cell::Cell;

    struct CountingClient {
        calls: Cell<usize>,
        payload: Option<ResourcePayload>,
    }

    impl ResourceClient for CountingClient {
        fn load_url(&self, _url: &str) -> Option<ResourcePayload> {
            self.calls.set(self.calls.get() + 1);
            self.payload.clone()
        }

        fn load_font(&self, _f: &str, _i: bool, _s: bool, _w: i32) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn fetch_memoizes_success() {
        let client = CountingClient {
            calls: Cell::new(0),
            payload: Some(ResourcePayload {
                mime_type: "text/css".into(),
                text_encoding: String::new(),
                data: b"p{}".to_vec(),
            }),
        };
        let mut cache = ResourceCache::new();
        let url = Url::parse("http://example.com/a.css");
        let first = cache.fetch(&client, &url, ResourceKind::Text);
        let second = cache.fetch(&client, &url, ResourceKind::Text);
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn fetch_negative_caches_failure() {
        let client = CountingClient {
            calls: Cell::new(0),
            payload: None,
        };
        let mut cache = ResourceCache::new();
        let url = Url::parse("http://example.com/missing.png");
        assert!(cache.fetch(&client, &url, ResourceKind::Image).is_none());
        assert!(cache.fetch(&client, &url, ResourceKind::Image).is_none());
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn data_url_bypasses_client() {
        let mut cache = ResourceCache::new();
        let url = Url::parse("data:text/css,p%7B%7D");
        let resource = cache
            .fetch(&NullResourceClient, &url, ResourceKind::Text)
            .unwrap();
        match &*resource {
            Resource::Text(text) => assert_eq!(text, "p{}"),
            other => panic!("expected text resource, got {other:?}"),
        }
    }

    #[test]
    fn png_dimensions_are_sniffed() {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0, 0, 0, 13]);
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&64u32.to_be_bytes());
        png.extend_from_slice(&48u32.to_be_bytes());
        png.extend_from_slice(&[8, 6, 0, 0, 0]);
        assert_eq!(sniff_image_dimensions(&png), Some((64, 48)));
    }

    #[test]
    fn latin1_text_decodes_bytewise() {
        assert_eq!(decode_text(&[0xE9], "iso-8859-1"), "\u{e9}");
    }
}
