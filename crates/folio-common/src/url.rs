//! URL parsing, canonicalization, and relative-reference completion.
//!
//! A [`Url`] stores one canonical string plus byte offsets for each
//! component: `scheme : // user : password @ host : port path ? query # fragment`.
//! Canonicalization lowercases the scheme and host, percent-encodes reserved
//! bytes in the path/query/fragment, and collapses `.` / `..` path segments.
//! The canonical string is always pure ASCII, so the stored offsets are
//! always valid slice boundaries.
//!
//! An unparseable reference yields the *null URL* (empty canonical string);
//! callers treat properties referencing it as unset.

use base64::Engine;

use crate::FolioError;

const fn is_scheme_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'+' || c == b'-' || c == b'.'
}

const fn is_hostname_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'.' || c == b'-' || c == b'_'
}

const fn is_ipv6_byte(c: u8) -> bool {
    c.is_ascii_hexdigit() || c == b':' || c == b'%'
}

const fn is_path_end_byte(c: u8) -> bool {
    c == b'#' || c == b'?' || c == b'/' || c == 0
}

const fn is_mark_byte(c: u8) -> bool {
    matches!(
        c,
        b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')'
    )
}

const fn is_unreserved_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || is_mark_byte(c)
}

const fn is_userinfo_byte(c: u8) -> bool {
    is_unreserved_byte(c)
        || matches!(c, b'%' | b';' | b':' | b'&' | b'=' | b'+' | b'$' | b',')
}

/// Bytes that pass through path/query/fragment encoding unescaped,
/// in addition to alphanumerics.
const UNESCAPED: &[u8] = b";,/?@&=+$#-_.!~*'()";

/// A parsed, canonicalized URL.
///
/// The null URL (`Url::default()`) has an empty canonical string; every
/// accessor on it returns an empty slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Url {
    value: String,
    scheme_end: usize,
    user_begin: usize,
    user_end: usize,
    password_end: usize,
    host_end: usize,
    port_end: usize,
    path_end: usize,
    query_end: usize,
}

impl Url {
    /// Parse and canonicalize a reference. Returns the null URL when the
    /// reference has no valid `scheme:` prefix or a malformed authority.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let bytes = input.as_bytes();
        if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() {
            return Self::default();
        }
        let peek = |index: usize| -> u8 { bytes.get(index).copied().unwrap_or(0) };

        let mut scheme_end = 0;
        while is_scheme_byte(peek(scheme_end)) {
            scheme_end += 1;
        }
        if peek(scheme_end) != b':' {
            return Self::default();
        }

        let scheme = &input[..scheme_end];
        let is_http = scheme.eq_ignore_ascii_case("http");
        let is_https = scheme.eq_ignore_ascii_case("https");
        let is_file = scheme.eq_ignore_ascii_case("file");
        let special = is_http || is_https || is_file;

        let mut user_begin;
        let mut user_end;
        let mut password_begin;
        let mut password_end;
        let mut host_begin;
        let mut host_end;
        let mut port_begin;
        let mut port_end;

        let hierarchical = peek(scheme_end + 1) == b'/';
        if hierarchical && peek(scheme_end + 2) == b'/' {
            user_begin = scheme_end + 3;
            user_end = user_begin;

            let mut colon = 0;
            while is_userinfo_byte(peek(user_end)) {
                if colon == 0 && peek(user_end) == b':' {
                    colon = user_end;
                }
                user_end += 1;
            }

            if peek(user_end) == b'@' {
                if colon == 0 {
                    password_begin = user_end;
                    password_end = password_begin;
                } else {
                    password_begin = colon + 1;
                    password_end = user_end;
                    user_end = colon;
                }
                host_begin = password_end + 1;
            } else if peek(user_end) == b'[' || is_path_end_byte(peek(user_end)) {
                host_begin = user_begin;
                user_end = host_begin;
                password_begin = user_end;
                password_end = password_begin;
            } else {
                return Self::default();
            }

            host_end = host_begin;
            if peek(host_end) == b'[' {
                host_end += 1;
                while is_ipv6_byte(peek(host_end)) {
                    host_end += 1;
                }
                if peek(host_end) != b']' {
                    return Self::default();
                }
                host_end += 1;
            } else {
                while is_hostname_byte(peek(host_end)) {
                    host_end += 1;
                }
            }

            if peek(host_end) == b':' {
                port_begin = host_end + 1;
                port_end = port_begin;
                while peek(port_end).is_ascii_digit() {
                    port_end += 1;
                }
            } else {
                port_begin = host_end;
                port_end = port_begin;
            }

            if !is_path_end_byte(peek(port_end)) {
                return Self::default();
            }
            if user_begin == port_end && !special {
                // Empty authority on a non-special scheme reads as opaque.
                user_begin = scheme_end + 3;
                user_end = user_begin;
                password_begin = user_end;
                password_end = password_begin;
                host_begin = password_end;
                host_end = host_begin;
                port_begin = host_end;
                port_end = port_begin;
            }
        } else {
            user_begin = scheme_end + 1;
            user_end = user_begin;
            password_begin = user_end;
            password_end = password_begin;
            host_begin = password_end;
            host_end = host_begin;
            port_begin = host_end;
            port_end = port_begin;
        }

        let path_begin = port_end;
        let mut path_end = path_begin;
        while path_end < bytes.len() && bytes[path_end] != b'?' && bytes[path_end] != b'#' {
            path_end += 1;
        }

        let query_begin = path_end;
        let mut query_end = query_begin;
        if peek(query_begin) == b'?' {
            query_end += 1;
            while query_end < bytes.len() && bytes[query_end] != b'#' {
                query_end += 1;
            }
        }

        let mut fragment_begin = query_end;
        let fragment_end;
        if peek(fragment_begin) == b'#' {
            fragment_begin += 1;
            fragment_end = bytes.len();
        } else {
            fragment_end = fragment_begin;
        }

        // Rebuild the canonical form.
        let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
        out.extend(bytes[..scheme_end].iter().map(u8::to_ascii_lowercase));
        let out_scheme_end = out.len();
        out.push(b':');

        let has_authority = host_begin != host_end
            || (is_file && path_begin != path_end)
            || user_begin != user_end
            || password_begin != password_end
            || host_end != port_end;

        let out_user_begin;
        let out_user_end;
        let out_password_end;
        let out_host_end;
        let out_port_end;
        if has_authority {
            out.extend_from_slice(b"//");
            out_user_begin = out.len();
            out.extend_from_slice(&bytes[user_begin..user_end]);
            out_user_end = out.len();
            if password_begin != password_end {
                out.push(b':');
                out.extend_from_slice(&bytes[password_begin..password_end]);
            }
            out_password_end = out.len();
            if out_user_begin != out.len() {
                out.push(b'@');
            }
            out.extend(bytes[host_begin..host_end].iter().map(u8::to_ascii_lowercase));
            out_host_end = out.len();
            if host_end != port_begin {
                out.push(b':');
                out.extend_from_slice(&bytes[port_begin..port_end]);
            }
            out_port_end = out.len();
        } else {
            out_user_begin = out.len();
            out_user_end = out_user_begin;
            out_password_end = out_user_end;
            out_host_end = out_password_end;
            out_port_end = out_host_end;
        }

        if path_begin == path_end && hierarchical && special {
            out.push(b'/');
        }

        if hierarchical {
            let begin = out.len();
            escape_into(&mut out, &bytes[path_begin..path_end]);
            remove_dot_segments(&mut out, begin);
        } else {
            escape_into(&mut out, &bytes[path_begin..path_end]);
        }
        let out_path_end = out.len();

        escape_into(&mut out, &bytes[query_begin..query_end]);
        let out_query_end = out.len();

        if fragment_begin != query_end {
            out.push(b'#');
            escape_into(&mut out, &bytes[fragment_begin..fragment_end]);
        }

        // escape_into only ever emits ASCII.
        let value = String::from_utf8(out).unwrap_or_default();
        Self {
            value,
            scheme_end: out_scheme_end,
            user_begin: out_user_begin,
            user_end: out_user_end,
            password_end: out_password_end,
            host_end: out_host_end,
            port_end: out_port_end,
            path_end: out_path_end,
            query_end: out_query_end,
        }
    }

    /// Resolve `relative` against this URL.
    ///
    /// Leading/trailing spaces are trimmed and embedded CR/LF/TAB stripped
    /// first. An absolute reference (or any reference against the null URL)
    /// replaces everything; `""` and `#frag` reuse path and query; `?query`
    /// reuses the path; `/path` reuses the authority; anything else merges
    /// against the base directory.
    #[must_use]
    pub fn complete(&self, relative: &str) -> Self {
        let trimmed = relative.trim_matches(' ');
        let input: String = trimmed
            .chars()
            .filter(|&c| c != '\n' && c != '\t' && c != '\r')
            .collect();

        if self.value.is_empty() {
            return Self::parse(&input);
        }

        let hierarchical = self.scheme_end < self.user_begin
            && self.value.as_bytes().get(self.scheme_end + 1) == Some(&b'/');

        let mut input = input;
        if input.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            let bytes = input.as_bytes();
            let mut end = 1;
            while end < bytes.len() && is_scheme_byte(bytes[end]) {
                end += 1;
            }
            if end < bytes.len() && bytes[end] == b':' {
                let same_scheme = input[..end].eq_ignore_ascii_case(&self.value[..self.scheme_end]);
                let after = bytes.get(end + 1).copied();
                if after.is_none() || after == Some(b'/') || !hierarchical || !same_scheme {
                    return Self::parse(&input);
                }
                // Same-scheme relative reference: drop the redundant prefix.
                let _ = input.drain(..=end);
            }
        }

        if !hierarchical {
            if input.starts_with('#') {
                return Self::parse(&input);
            }
            return Self::default();
        }

        if input.is_empty() || input.starts_with('#') {
            return Self::parse(&format!("{}{input}", &self.value[..self.query_end]));
        }
        if input.starts_with('?') {
            return Self::parse(&format!("{}{input}", &self.value[..self.path_end]));
        }
        if input.starts_with('/') {
            if input.len() > 1 && input.as_bytes()[1] == b'/' {
                return Self::parse(&format!("{}{input}", &self.value[..=self.scheme_end]));
            }
            return Self::parse(&format!("{}{input}", &self.value[..self.port_end]));
        }

        let mut base = self.value[..self.path_end].to_owned();
        while self.port_end < base.len() && !base.ends_with('/') {
            let _ = base.pop();
        }
        if self.port_end == base.len() {
            base.push('/');
        }
        Self::parse(&format!("{base}{input}"))
    }

    /// Case-insensitive scheme comparison.
    #[must_use]
    pub fn protocol_is(&self, scheme: &str) -> bool {
        self.value[..self.scheme_end].eq_ignore_ascii_case(scheme)
    }

    /// Decode a `data:` URL into `(mime type, text encoding, payload)`.
    ///
    /// # Errors
    ///
    /// `UnsupportedScheme` for non-`data:` URLs; `Decode` when the payload
    /// is missing its comma separator or the base64 body is malformed.
    pub fn decode_data(&self) -> Result<(String, String, Vec<u8>), FolioError> {
        if !self.protocol_is("data") {
            return Err(FolioError::UnsupportedScheme(self.value.clone()));
        }
        let body = &self.value[self.scheme_end + 1..self.query_end];
        let comma = body
            .find(',')
            .ok_or_else(|| FolioError::Decode(format!("data url without payload: {}", self.value)))?;
        let (header, payload) = (&body[..comma], &body[comma + 1..]);

        let mut base64_encoded = false;
        let mut mime_type = String::from("text/plain");
        let mut text_encoding = String::from("US-ASCII");
        for (index, part) in header.split(';').enumerate() {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part.eq_ignore_ascii_case("base64") {
                base64_encoded = true;
            } else if let Some(charset) = part
                .strip_prefix("charset=")
                .or_else(|| part.strip_prefix("CHARSET="))
            {
                text_encoding = charset.to_owned();
            } else if index == 0 {
                mime_type = part.to_owned();
            }
        }

        let bytes = percent_decode(payload);
        if base64_encoded {
            let compact: Vec<u8> = bytes
                .into_iter()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| FolioError::Decode(format!("bad base64 payload: {e}")))?;
            return Ok((mime_type, text_encoding, decoded));
        }
        Ok((mime_type, text_encoding, bytes))
    }

    /// The full canonical form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// True for the null URL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_empty()
    }

    /// The lowercased scheme, without the trailing colon.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.value[..self.scheme_end]
    }

    /// The lowercased host, empty when the URL carries no authority.
    #[must_use]
    pub fn host(&self) -> &str {
        self.value[self.password_end..self.host_end].trim_start_matches('@')
    }

    /// The normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.value[self.port_end..self.path_end]
    }

    /// The query, including its leading `?` when present.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.value[self.path_end..self.query_end]
    }

    /// The fragment, without its `#`; empty when absent.
    #[must_use]
    pub fn fragment(&self) -> &str {
        if self.query_end < self.value.len() {
            &self.value[self.query_end + 1..]
        } else {
            ""
        }
    }

    /// The canonical form with the fragment removed; the cache key for
    /// fetched resources.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.value[..self.query_end]
    }
}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Percent-encode reserved bytes while copying into `out`.
fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &c in bytes {
        if c.is_ascii_alphanumeric() || UNESCAPED.contains(&c) {
            out.push(c);
        } else {
            out.push(b'%');
            out.push(HEX[usize::from(c >> 4)]);
            out.push(HEX[usize::from(c & 0xF)]);
        }
    }
}

/// Collapse `.` and `..` segments in `buf[begin..]`, in place.
fn remove_dot_segments(buf: &mut Vec<u8>, begin: usize) {
    let end = buf.len();
    let mut input = begin;
    let mut out = begin;
    let peek = |buf: &[u8], input: usize, offset: usize| -> u8 {
        buf.get(input + offset).copied().unwrap_or(0)
    };

    while input < end {
        if peek(buf, input, 0) == b'.' && peek(buf, input, 1) == b'/' {
            input += 2;
        } else if peek(buf, input, 0) == b'.'
            && peek(buf, input, 1) == b'.'
            && peek(buf, input, 2) == b'/'
        {
            input += 3;
        }

        if peek(buf, input, 0) == b'/'
            && peek(buf, input, 1) == b'.'
            && (peek(buf, input, 2) == b'/' || peek(buf, input, 2) == 0)
        {
            input += 2;
            if input < end {
                continue;
            }
            buf[out] = b'/';
            out += 1;
            break;
        }

        if peek(buf, input, 0) == b'/'
            && peek(buf, input, 1) == b'.'
            && peek(buf, input, 2) == b'.'
            && (peek(buf, input, 3) == b'/' || peek(buf, input, 3) == 0)
        {
            while out > begin {
                out -= 1;
                if buf[out] == b'/' {
                    break;
                }
            }
            input += 3;
            if input < end {
                if out == begin && buf.get(out).copied() != Some(b'/') {
                    input += 1;
                }
                continue;
            }
            if buf.get(out).copied() == Some(b'/') {
                out += 1;
            }
            break;
        }

        loop {
            buf[out] = buf[input];
            out += 1;
            input += 1;
            if input >= end || buf[input] == b'/' {
                break;
            }
        }
    }

    buf.truncate(out);
}

/// Decode `%XX` escapes; malformed escapes pass through untouched.
fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let hi = (bytes[index + 1] as char).to_digit(16);
            let lo = (bytes[index + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(u8::try_from(hi * 16 + lo).unwrap_or(0));
                index += 3;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_scheme_and_host() {
        let url = Url::parse("HTTP://Example.COM/Path/To/File");
        assert_eq!(url.as_str(), "http://example.com/Path/To/File");
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.path(), "/Path/To/File");
    }

    #[test]
    fn empty_path_gains_slash_for_special_schemes() {
        let url = Url::parse("https://example.com");
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn collapses_dot_segments() {
        let url = Url::parse("http://host/a/b/../c/./d");
        assert_eq!(url.path(), "/a/c/d");
    }

    #[test]
    fn absolute_reference_ignores_base() {
        let base = Url::parse("http://example.com/dir/page.html");
        let resolved = base.complete("https://other.net/x");
        assert_eq!(resolved.as_str(), "https://other.net/x");
    }

    #[test]
    fn empty_reference_returns_base_without_fragment() {
        let base = Url::parse("http://example.com/dir/page.html?q=1#top");
        let resolved = base.complete("");
        assert_eq!(resolved.as_str(), "http://example.com/dir/page.html?q=1");
    }

    #[test]
    fn relative_path_merges_with_base_directory() {
        let base = Url::parse("http://example.com/a/b/c.html");
        assert_eq!(base.complete("d.css").as_str(), "http://example.com/a/b/d.css");
        assert_eq!(base.complete("../up.css").as_str(), "http://example.com/a/up.css");
        assert_eq!(base.complete("/root.css").as_str(), "http://example.com/root.css");
        assert_eq!(base.complete("//cdn.net/x.css").as_str(), "http://cdn.net/x.css");
    }

    #[test]
    fn fragment_reference_reuses_path_and_query() {
        let base = Url::parse("http://example.com/p?x=1#old");
        assert_eq!(base.complete("#new").as_str(), "http://example.com/p?x=1#new");
        assert_eq!(base.complete("?y=2").as_str(), "http://example.com/p?y=2");
    }

    #[test]
    fn reference_whitespace_is_stripped() {
        let base = Url::parse("http://example.com/a/");
        let resolved = base.complete("  img\n\t.png  ");
        assert_eq!(resolved.as_str(), "http://example.com/a/img.png");
    }

    #[test]
    fn protocol_is_case_insensitive() {
        let url = Url::parse("DATA:text/plain,hi");
        assert!(url.protocol_is("data"));
        assert!(!url.protocol_is("http"));
    }

    #[test]
    fn decode_data_plain() {
        let url = Url::parse("data:text/css,p%7Bcolor:red%7D");
        let (mime, encoding, bytes) = url.decode_data().unwrap();
        assert_eq!(mime, "text/css");
        assert_eq!(encoding, "US-ASCII");
        assert_eq!(bytes, b"p{color:red}");
    }

    #[test]
    fn decode_data_base64() {
        let url = Url::parse("data:text/plain;base64,aGVsbG8=");
        let (mime, _, bytes) = url.decode_data().unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn decode_data_rejects_other_schemes() {
        let url = Url::parse("http://example.com/");
        assert!(matches!(
            url.decode_data(),
            Err(FolioError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn invalid_reference_is_null() {
        assert!(Url::parse("not a url").is_null());
        assert!(Url::parse("").is_null());
        assert!(Url::parse("1http://x/").is_null());
    }
}
