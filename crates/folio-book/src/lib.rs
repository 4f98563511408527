//! The Folio book compiler front end.
//!
//! [`Book`] is the public facade: configure a page geometry, load an HTML
//! document (from bytes or through the resource client), and hand the
//! styled DOM plus generated box fragments to the layout and paint stages.
//!
//! ```no_run
//! use folio_book::{Book, PageOrientation, PageMargins, PageSize};
//!
//! let mut book = Book::new(PageSize::A4, PageOrientation::Portrait, PageMargins::uniform(48.0));
//! book.set_title("The Annotated Folio");
//! let _ = book.load("<h1>Chapter One</h1>", "", "");
//! ```

pub mod content;
pub mod document;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use folio_common::net::{HttpResourceClient, ResourceClient};
use folio_common::resource::{Resource, ResourceCache, ResourceKind};
use folio_common::url::Url;

pub use content::{build_box_tree, BoxNode, Counters, ElementBox, ImageBox, TextBox};
pub use document::HtmlDocument;

/// A page size in CSS pixels at 96 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Width in CSS pixels.
    pub width: f32,
    /// Height in CSS pixels.
    pub height: f32,
}

const PX_PER_MM: f32 = 96.0 / 25.4;
const PX_PER_INCH: f32 = 96.0;

impl PageSize {
    /// ISO A3: 297 × 420 mm.
    pub const A3: Self = Self::from_mm(297.0, 420.0);
    /// ISO A4: 210 × 297 mm.
    pub const A4: Self = Self::from_mm(210.0, 297.0);
    /// ISO A5: 148 × 210 mm.
    pub const A5: Self = Self::from_mm(148.0, 210.0);
    /// ISO B4: 250 × 353 mm.
    pub const B4: Self = Self::from_mm(250.0, 353.0);
    /// ISO B5: 176 × 250 mm.
    pub const B5: Self = Self::from_mm(176.0, 250.0);
    /// US Letter: 8.5 × 11 in.
    pub const LETTER: Self = Self::from_inches(8.5, 11.0);
    /// US Legal: 8.5 × 14 in.
    pub const LEGAL: Self = Self::from_inches(8.5, 14.0);
    /// US Ledger: 11 × 17 in.
    pub const LEDGER: Self = Self::from_inches(11.0, 17.0);

    /// A page size in CSS pixels.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A page size from millimeters.
    #[must_use]
    pub const fn from_mm(width: f32, height: f32) -> Self {
        Self {
            width: width * PX_PER_MM,
            height: height * PX_PER_MM,
        }
    }

    /// A page size from inches.
    #[must_use]
    pub const fn from_inches(width: f32, height: f32) -> Self {
        Self {
            width: width * PX_PER_INCH,
            height: height * PX_PER_INCH,
        }
    }
}

/// Page margins in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageMargins {
    /// Top margin.
    pub top: f32,
    /// Right margin.
    pub right: f32,
    /// Bottom margin.
    pub bottom: f32,
    /// Left margin.
    pub left: f32,
}

impl PageMargins {
    /// The same margin on all four sides.
    #[must_use]
    pub const fn uniform(margin: f32) -> Self {
        Self {
            top: margin,
            right: margin,
            bottom: margin,
            left: margin,
        }
    }

    /// Vertical and horizontal margins.
    #[must_use]
    pub const fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Explicit margins per side.
    #[must_use]
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageOrientation {
    /// Height is the long edge.
    #[default]
    Portrait,
    /// Width is the long edge.
    Landscape,
}

/// PDF document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMetadata {
    /// The document title.
    pub title: String,
    /// The document subject.
    pub subject: String,
    /// The document author.
    pub author: String,
    /// The producing application.
    pub creator: String,
    /// Creation timestamp, as the caller formats it.
    pub creation_date: String,
    /// Modification timestamp, as the caller formats it.
    pub modification_date: String,
}

/// The book facade: page geometry, metadata, and the loaded document.
pub struct Book {
    page_size: PageSize,
    orientation: PageOrientation,
    margins: PageMargins,
    metadata: BookMetadata,
    client: Rc<dyn ResourceClient>,
    document: Option<HtmlDocument>,
}

impl Book {
    /// Create a book with the given page geometry and the default HTTP
    /// resource client.
    #[must_use]
    pub fn new(page_size: PageSize, orientation: PageOrientation, margins: PageMargins) -> Self {
        Self::with_client(page_size, orientation, margins, Rc::new(HttpResourceClient))
    }

    /// Create a book routing all fetches through `client`.
    #[must_use]
    pub fn with_client(
        page_size: PageSize,
        orientation: PageOrientation,
        margins: PageMargins,
        client: Rc<dyn ResourceClient>,
    ) -> Self {
        Self {
            page_size,
            orientation,
            margins,
            metadata: BookMetadata::default(),
            client,
            document: None,
        }
    }

    /// Replace the page size. Affects the next load's viewport.
    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
    }

    /// The configured page size.
    #[must_use]
    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// The configured margins.
    #[must_use]
    pub const fn margins(&self) -> PageMargins {
        self.margins
    }

    /// The configured orientation.
    #[must_use]
    pub const fn orientation(&self) -> PageOrientation {
        self.orientation
    }

    /// The document metadata.
    #[must_use]
    pub const fn metadata(&self) -> &BookMetadata {
        &self.metadata
    }

    /// Set the title recorded in the PDF metadata.
    pub fn set_title(&mut self, title: &str) {
        self.metadata.title = title.to_owned();
    }

    /// Set the subject recorded in the PDF metadata.
    pub fn set_subject(&mut self, subject: &str) {
        self.metadata.subject = subject.to_owned();
    }

    /// Set the author recorded in the PDF metadata.
    pub fn set_author(&mut self, author: &str) {
        self.metadata.author = author.to_owned();
    }

    /// Set the creator recorded in the PDF metadata.
    pub fn set_creator(&mut self, creator: &str) {
        self.metadata.creator = creator.to_owned();
    }

    /// Set the creation date recorded in the PDF metadata.
    pub fn set_creation_date(&mut self, creation_date: &str) {
        self.metadata.creation_date = creation_date.to_owned();
    }

    /// Set the modification date recorded in the PDF metadata.
    pub fn set_modification_date(&mut self, modification_date: &str) {
        self.metadata.modification_date = modification_date.to_owned();
    }

    /// The oriented page width in CSS pixels.
    #[must_use]
    pub fn page_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_size.width.min(self.page_size.height),
            PageOrientation::Landscape => self.page_size.width.max(self.page_size.height),
        }
    }

    /// The oriented page height in CSS pixels.
    #[must_use]
    pub fn page_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_size.width.max(self.page_size.height),
            PageOrientation::Landscape => self.page_size.width.min(self.page_size.height),
        }
    }

    /// Viewport width: the page content box, which `vw` units resolve
    /// against.
    #[must_use]
    pub fn viewport_width(&self) -> f32 {
        (self.page_width() - self.margins.left - self.margins.right).max(0.0)
    }

    /// Viewport height: the page content box, which `vh` units resolve
    /// against.
    #[must_use]
    pub fn viewport_height(&self) -> f32 {
        (self.page_height() - self.margins.top - self.margins.bottom).max(0.0)
    }

    /// Load a document from markup. Returns `true` when a document was
    /// produced (parsing itself never fails).
    pub fn load(&mut self, content: &str, base_url: &str, user_style: &str) -> bool {
        let document = HtmlDocument::parse(
            content,
            base_url,
            user_style,
            self.viewport_width(),
            self.viewport_height(),
            Rc::clone(&self.client),
        );
        // An empty title falls back to the document's <title>.
        if self.metadata.title.is_empty() {
            if let Some(title) = document.title() {
                self.metadata.title = title;
            }
        }
        self.document = Some(document);
        true
    }

    /// Load a document from raw bytes, honoring an explicit text-encoding
    /// label (UTF-8 assumed when empty).
    pub fn load_data(
        &mut self,
        data: &[u8],
        text_encoding: &str,
        base_url: &str,
        user_style: &str,
    ) -> bool {
        let content = folio_common::resource::decode_text(data, text_encoding);
        self.load(&content, base_url, user_style)
    }

    /// Fetch `url` through the resource client and load the response as the
    /// document. `false` when the fetch fails or yields no text.
    pub fn load_url(&mut self, url: &str, user_style: &str) -> bool {
        let parsed = Url::parse(url);
        if parsed.is_null() {
            return false;
        }
        let mut cache = ResourceCache::new();
        let Some(resource) = cache.fetch(&*self.client, &parsed, ResourceKind::Text) else {
            return false;
        };
        let Resource::Text(content) = &*resource else {
            return false;
        };
        let content = content.clone();
        self.load(&content, url, user_style)
    }

    /// Drop the loaded document.
    pub fn clear(&mut self) {
        self.document = None;
    }

    /// True when no document is loaded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.document.is_none()
    }

    /// The loaded document.
    #[must_use]
    pub const fn document(&self) -> Option<&HtmlDocument> {
        self.document.as_ref()
    }

    /// Serialize the loaded document's DOM back to markup.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.document
            .as_ref()
            .map(HtmlDocument::serialize)
            .unwrap_or_default()
    }

    /// Build the generated-content box tree for the loaded document.
    #[must_use]
    pub fn build_boxes(&self) -> Option<ElementBox> {
        self.document.as_ref().and_then(build_box_tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::net::NullResourceClient;

    fn test_book() -> Book {
        Book::with_client(
            PageSize::A4,
            PageOrientation::Portrait,
            PageMargins::uniform(50.0),
            Rc::new(NullResourceClient),
        )
    }

    #[test]
    fn page_size_table_is_in_css_pixels() {
        assert!((PageSize::A4.width - 793.70_f32).abs() < 0.1);
        assert!((PageSize::A4.height - 1122.52_f32).abs() < 0.1);
        assert!((PageSize::LETTER.width - 816.0).abs() < 0.01);
        assert!((PageSize::LETTER.height - 1056.0).abs() < 0.01);
        assert!((PageSize::LEDGER.height - 1632.0).abs() < 0.01);
    }

    #[test]
    fn viewport_subtracts_margins_and_honors_orientation() {
        let mut book = test_book();
        assert!((book.viewport_width() - (793.70079 - 100.0)).abs() < 0.01);
        book = Book::with_client(
            PageSize::A4,
            PageOrientation::Landscape,
            PageMargins::uniform(0.0),
            Rc::new(NullResourceClient),
        );
        assert!(book.viewport_width() > book.viewport_height());
    }

    #[test]
    fn load_produces_document_and_title() {
        let mut book = test_book();
        assert!(book.is_empty());
        assert!(book.load(
            "<html><head><title>  A  Book  </title></head><body><p>x</p></body></html>",
            "",
            "",
        ));
        assert!(!book.is_empty());
        assert_eq!(book.metadata().title, "A Book");
        book.clear();
        assert!(book.is_empty());
    }

    #[test]
    fn explicit_title_wins_over_document_title() {
        let mut book = test_book();
        book.set_title("Chosen");
        let _ = book.load("<title>Ignored</title>", "", "");
        assert_eq!(book.metadata().title, "Chosen");
    }

    #[test]
    fn load_data_honors_encoding() {
        let mut book = test_book();
        assert!(book.load_data("caf\u{e9}".as_bytes(), "utf-8", "", ""));
        assert!(book.serialize().contains("caf\u{e9}"));
        assert!(book.load_data(&[b'a', 0xE9], "iso-8859-1", "", ""));
        assert!(book.serialize().contains("a\u{e9}"));
    }

    #[test]
    fn load_url_fails_cleanly_without_network() {
        let mut book = test_book();
        assert!(!book.load_url("http://example.com/book.html", ""));
        assert!(!book.load_url("not a url", ""));
    }

    #[test]
    fn metadata_serializes() {
        let mut book = test_book();
        book.set_author("E. Author");
        let json = serde_json::to_string(book.metadata()).unwrap();
        assert!(json.contains("E. Author"));
    }
}
