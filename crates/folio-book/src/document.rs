//! The document pipeline: parse, collect style sheets, cascade.
//!
//! An [`HtmlDocument`] owns everything derived from one load: the DOM tree,
//! the installed style sheet (user-agent, then user, then author origins),
//! the computed style of every element, the resource cache, and the font
//! lookup. Parsing is single-threaded and synchronous; the only blocking
//! point is the [`ResourceClient`] callback.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use folio_common::intern::Atom;
use folio_common::net::ResourceClient;
use folio_common::resource::{FontData, Resource, ResourceCache, ResourceKind};
use folio_common::url::Url;
use folio_common::warning::clear_warnings;
use folio_css::cascade::{StyleBuilder, StyleSheet};
use folio_css::fontface::FontFaceSource;
use folio_css::selector::PseudoType;
use folio_css::style::ComputedStyle;
use folio_css::ua_stylesheet::UA_CSS;
use folio_dom::{DomTree, NodeId};
use folio_html::{HtmlParser, HtmlTokenizer};

/// Cache key for resolved fonts.
type FontKey = (String, bool, bool, i32);

/// A parsed, styled HTML document.
pub struct HtmlDocument {
    tree: DomTree,
    base_url: Url,
    viewport_width: f32,
    viewport_height: f32,
    quirks_mode: bool,
    sheet: StyleSheet,
    styles: HashMap<NodeId, Rc<ComputedStyle>>,
    root_style: Rc<ComputedStyle>,
    resources: RefCell<ResourceCache>,
    client: Rc<dyn ResourceClient>,
    fonts: RefCell<HashMap<FontKey, Option<Rc<FontData>>>>,
}

impl HtmlDocument {
    /// Parse `content` and run the full front-end pipeline: tree
    /// construction, sheet collection (`UA` → user → author, with `@import`
    /// inlining), and the cascade over every element.
    pub fn parse(
        content: &str,
        base_url: &str,
        user_style: &str,
        viewport_width: f32,
        viewport_height: f32,
        client: Rc<dyn ResourceClient>,
    ) -> Self {
        clear_warnings();

        let mut tokenizer = HtmlTokenizer::new(content);
        tokenizer.run();
        let outcome = HtmlParser::new(tokenizer.into_tokens()).finish();
        let tree = outcome.tree;
        let quirks_mode = outcome.quirks_mode;

        let base_url = Url::parse(base_url);
        let mut resources = ResourceCache::new();
        let mut sheet = StyleSheet::new();

        // Origin order: user-agent first, user second, author last; the
        // position counter encodes it.
        sheet.add_sheet(UA_CSS, &base_url, &mut resources, &*client);
        if !user_style.is_empty() {
            sheet.add_sheet(user_style, &base_url, &mut resources, &*client);
        }
        for css in collect_author_sheets(&tree, &base_url, &mut resources, &*client) {
            sheet.add_sheet(&css, &base_url, &mut resources, &*client);
        }

        // Cascade over the whole tree, parents before children.
        let initial = ComputedStyle::initial(viewport_width, viewport_height);
        let mut styles = HashMap::new();
        {
            let builder = StyleBuilder::new(&tree, &sheet);
            if let Some(root) = tree.document_element() {
                compute_styles(&builder, &tree, root, &initial, &mut styles);
            }
        }
        let root_style = tree
            .document_element()
            .and_then(|root| styles.get(&root).cloned())
            .unwrap_or_else(|| Rc::new(initial));

        Self {
            tree,
            base_url,
            viewport_width,
            viewport_height,
            quirks_mode,
            sheet,
            styles,
            root_style,
            resources: RefCell::new(resources),
            client,
            fonts: RefCell::new(HashMap::new()),
        }
    }

    /// The DOM tree.
    #[must_use]
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// The document's base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a missing or legacy DOCTYPE put the document into quirks
    /// mode.
    #[must_use]
    pub const fn quirks_mode(&self) -> bool {
        self.quirks_mode
    }

    /// The computed style of an element.
    #[must_use]
    pub fn style(&self, element: NodeId) -> Option<&Rc<ComputedStyle>> {
        self.styles.get(&element)
    }

    /// The root element's computed style; `rem` resolves against its font
    /// size.
    #[must_use]
    pub fn root_style(&self) -> &Rc<ComputedStyle> {
        &self.root_style
    }

    /// Viewport width in CSS pixels.
    #[must_use]
    pub const fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Viewport height in CSS pixels.
    #[must_use]
    pub const fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// Compute a pseudo-element's style on demand. `None` when no rule
    /// targets the pseudo.
    #[must_use]
    pub fn pseudo_style_for_element(
        &self,
        element: NodeId,
        parent_style: &ComputedStyle,
        pseudo: PseudoType,
    ) -> Option<ComputedStyle> {
        let builder = StyleBuilder::new(&self.tree, &self.sheet);
        builder.pseudo_style_for_element(element, parent_style, pseudo)
    }

    /// Compute the style for page `page_index`, optionally under a named
    /// `@page` rule.
    #[must_use]
    pub fn style_for_page(&self, page_name: Option<Atom>, page_index: usize) -> ComputedStyle {
        let builder = StyleBuilder::new(&self.tree, &self.sheet);
        builder.style_for_page(page_name, page_index, &self.root_style)
    }

    /// The document title from the first `<title>` element.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        let title = self.tree.iter_all().find(|&id| {
            self.tree
                .as_element(id)
                .is_some_and(|e| e.tag_name == "title" && e.is_html())
        })?;
        let text = self.tree.text_content(title);
        let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Fetch an image resource by (possibly relative) URL, through the
    /// memoizing cache. `None` stays `None` for the document's lifetime
    /// once a fetch fails.
    #[must_use]
    pub fn fetch_image(&self, href: &str) -> Option<Rc<Resource>> {
        let url = self.base_url.complete(href);
        self.resources
            .borrow_mut()
            .fetch(&*self.client, &url, ResourceKind::Image)
    }

    /// Resolve a font face by description: `@font-face` rules first, then
    /// the resource client's system lookup. Results (including misses) are
    /// memoized.
    #[must_use]
    pub fn font_face(
        &self,
        family: &str,
        italic: bool,
        small_caps: bool,
        weight: i32,
    ) -> Option<Rc<FontData>> {
        let key: FontKey = (family.to_ascii_lowercase(), italic, small_caps, weight);
        if let Some(cached) = self.fonts.borrow().get(&key) {
            return cached.clone();
        }

        let mut resolved = None;
        if let Some(entry) = self
            .sheet
            .font_faces()
            .get(family, italic, small_caps, weight)
        {
            for source in &entry.sources {
                match source {
                    FontFaceSource::Url(href) => {
                        let url = self.base_url.complete(href);
                        let resource = self.resources.borrow_mut().fetch(
                            &*self.client,
                            &url,
                            ResourceKind::Font,
                        );
                        if let Some(resource) = resource {
                            if let Resource::Font(font) = &*resource {
                                resolved = Some(Rc::new(font.clone()));
                                break;
                            }
                        }
                    }
                    FontFaceSource::Local(name) => {
                        if let Some(bytes) =
                            self.client.load_font(name, italic, small_caps, weight)
                        {
                            resolved = Some(Rc::new(FontData { bytes }));
                            break;
                        }
                    }
                }
            }
        }
        if resolved.is_none() {
            resolved = self
                .client
                .load_font(family, italic, small_caps, weight)
                .map(|bytes| Rc::new(FontData { bytes }));
        }

        let _ = self.fonts.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    /// Resolve the font for a computed style: walk its `font-family` list,
    /// caching the answer on the style object.
    #[must_use]
    pub fn font_face_for_style(&self, style: &ComputedStyle) -> Option<Rc<FontData>> {
        if let Some(cached) = style.font_face_slot().borrow().as_ref() {
            return cached.clone();
        }
        let italic = style.font_style != folio_css::style::FontStyle::Normal;
        let small_caps = style.font_variant == folio_css::style::FontVariant::SmallCaps;
        let mut resolved = None;
        for family in style.font_families() {
            resolved = self.font_face(&family, italic, small_caps, style.font_weight);
            if resolved.is_some() {
                break;
            }
        }
        *style.font_face_slot().borrow_mut() = Some(resolved.clone());
        resolved
    }

    /// Serialize the parsed DOM back to markup, for debugging and tests.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.tree.serialize(NodeId::ROOT)
    }
}

/// Compute styles recursively, parents before children.
fn compute_styles(
    builder: &StyleBuilder<'_>,
    tree: &DomTree,
    element: NodeId,
    parent_style: &ComputedStyle,
    styles: &mut HashMap<NodeId, Rc<ComputedStyle>>,
) {
    let style = Rc::new(builder.style_for_element(element, parent_style));
    let _ = styles.insert(element, Rc::clone(&style));
    let children: Vec<NodeId> = tree.children(element).to_vec();
    for child in children {
        if tree.as_element(child).is_some() {
            compute_styles(builder, tree, child, &style, styles);
        }
    }
}

/// Collect author sheet text in tree order: `<style>` contents and
/// `<link rel="stylesheet" href>` targets.
fn collect_author_sheets(
    tree: &DomTree,
    base_url: &Url,
    resources: &mut ResourceCache,
    client: &dyn ResourceClient,
) -> Vec<String> {
    let mut sheets = Vec::new();
    for node in tree.iter_all() {
        let Some(element) = tree.as_element(node) else {
            continue;
        };
        if !element.is_html() {
            continue;
        }
        if element.tag_name == "style" {
            sheets.push(tree.text_content(node));
        } else if element.tag_name == "link" {
            let is_stylesheet = element.attribute_str("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            });
            if !is_stylesheet {
                continue;
            }
            let Some(href) = element.attribute_str("href") else {
                continue;
            };
            let url = base_url.complete(href);
            if let Some(resource) = resources.fetch(client, &url, ResourceKind::Text) {
                if let Resource::Text(text) = &*resource {
                    sheets.push(text.clone());
                }
            }
        }
    }
    sheets
}
