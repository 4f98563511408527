//! Common infrastructure for the Folio book compiler.
//!
//! This crate provides the shared plumbing used by every stage of the
//! pipeline:
//! - **Interned strings** - pointer-comparable handles for tag names,
//!   attribute names, and CSS identifiers
//! - **URL resolution** - parsing, canonicalization, and relative-reference
//!   completion, plus `data:` URL decoding
//! - **Resource loading** - the `ResourceClient` contract and the
//!   per-document resource cache
//! - **Warning system** - deduplicated terminal output for recoverable
//!   parse and style issues

pub mod intern;
pub mod net;
pub mod resource;
pub mod url;
pub mod warning;

use thiserror::Error;

/// Errors surfaced by the resource and URL layers.
///
/// Parsing itself never fails - the HTML and CSS front ends recover locally
/// and keep going. These errors cover the places where an external
/// collaborator (the network, a decoder) can genuinely refuse.
#[derive(Debug, Error)]
pub enum FolioError {
    /// The URL scheme is not one this operation supports
    /// (e.g. `decode_data` on a non-`data:` URL).
    #[error("unsupported scheme in '{0}'")]
    UnsupportedScheme(String),

    /// The reference could not be parsed as a URL at all.
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    /// The resource client reported failure; the caller treats the
    /// dependent property as unset.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Fetched bytes could not be decoded into the expected resource type.
    #[error("decode failure: {0}")]
    Decode(String),
}
