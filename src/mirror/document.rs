//! In-memory HTML document
//!
//! Pages are parsed with html5ever into an `RcDom`, whose element handles
//! allow attributes to be read and rewritten in place before the whole tree
//! is serialized back to HTML.
//!
//! Raw page bytes are decoded with the charset announced by the server, or
//! failing that the one declared in a `<meta>` tag, or UTF-8. The page is
//! always written back as UTF-8, so declarations of another charset are
//! rewritten to match.
//!
//! Rewriting is done in two passes: [`Document::images`] collects the image
//! elements without touching the tree, and [`Document::set_image_source`]
//! later applies the new references one at a time.

use super::fetcher::header_charset;
use encoding_rs::{Encoding, UTF_8};
use html5ever::interface::{Attribute, QualName};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{format_tendril, TendrilSink};
use html5ever::{namespace_url, ns, parse_document, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::io;
use url::Url;

/// Alt texts longer than this are shortened in log lines
const ALT_EXCERPT_WIDTH: usize = 20;

/// A parsed page
pub struct Document {
    dom: RcDom,
    base_url: Url,
}

/// An `<img>` element carrying a `src` attribute
#[derive(Clone)]
pub struct ImageElement {
    node: Handle,
    /// The `src` attribute exactly as written in the page
    pub src: String,
    /// `src` resolved against the document base, if it is an http(s) URL
    pub absolute_src: Option<Url>,
    pub width: String,
    pub height: String,
    pub alt: String,
}

impl ImageElement {
    /// The URL handed to the downloader
    ///
    /// Falls back to the raw attribute when it cannot be resolved, so the
    /// failure is reported against what the page actually says.
    pub fn download_source(&self) -> String {
        self.absolute_src
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| self.src.clone())
    }

    /// Alt text shortened for log output
    pub fn alt_excerpt(&self) -> String {
        trim_excerpt(&self.alt, ALT_EXCERPT_WIDTH)
    }
}

impl std::fmt::Debug for ImageElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageElement")
            .field("src", &self.src)
            .field("absolute_src", &self.absolute_src)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("alt", &self.alt)
            .finish()
    }
}

impl Document {
    /// Decodes and parses a raw page body fetched from `page_url`
    ///
    /// # Arguments
    ///
    /// * `data` - The body bytes as received
    /// * `announced_charset` - Charset from the Content-Type header, if any
    /// * `page_url` - URL the body was fetched from
    pub fn decode(data: &[u8], announced_charset: Option<&str>, page_url: &Url) -> io::Result<Self> {
        let (html, encoding) = match announced_charset.and_then(lookup_encoding) {
            Some(encoding) => decode_with(data, encoding),
            None => {
                let (html, encoding) = decode_with(data, UTF_8);
                let sniffed = parse_dom(&html)?;
                match meta_charset(&sniffed.document).and_then(|label| lookup_encoding(&label)) {
                    Some(declared) if declared.output_encoding() != encoding => {
                        decode_with(data, declared.output_encoding())
                    }
                    _ => (html, encoding),
                }
            }
        };

        let document = Self::parse(&html, page_url)?;
        if encoding != UTF_8 {
            tracing::debug!("Decoded {} as {}", page_url, encoding.name());
            document.declare_utf8();
        }
        Ok(document)
    }

    /// Parses HTML text fetched from `page_url`
    ///
    /// Relative references resolve against the first `<base href>` of the
    /// document when present, otherwise against `page_url`.
    pub fn parse(html: &str, page_url: &Url) -> io::Result<Self> {
        let dom = parse_dom(html)?;

        let base_url = find_elements(&dom.document, "base")
            .iter()
            .find_map(|node| get_node_attr(node, "href"))
            .and_then(|href| page_url.join(href.trim()).ok())
            .unwrap_or_else(|| page_url.clone());

        Ok(Self { dom, base_url })
    }

    /// The URL relative references resolve against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Every `<img src>` element, in document order
    pub fn images(&self) -> Vec<ImageElement> {
        find_elements(&self.dom.document, "img")
            .into_iter()
            .filter_map(|node| {
                let src = get_node_attr(&node, "src")?;
                let absolute_src = resolve_source(&src, &self.base_url);
                Some(ImageElement {
                    src,
                    absolute_src,
                    width: get_node_attr(&node, "width").unwrap_or_default(),
                    height: get_node_attr(&node, "height").unwrap_or_default(),
                    alt: get_node_attr(&node, "alt").unwrap_or_default(),
                    node,
                })
            })
            .collect()
    }

    /// Points an image element at a new source
    pub fn set_image_source(&mut self, image: &ImageElement, src: &str) {
        set_node_attr(&image.node, "src", Some(src.to_string()));
    }

    /// Points `<meta>` charset declarations at UTF-8
    fn declare_utf8(&self) {
        for meta in find_elements(&self.dom.document, "meta") {
            if get_node_attr(&meta, "charset").is_some() {
                set_node_attr(&meta, "charset", Some("utf-8".to_string()));
            } else if is_content_type_meta(&meta) {
                set_node_attr(&meta, "content", Some("text/html; charset=utf-8".to_string()));
            }
        }
    }

    /// Serializes the whole document, doctype included, as UTF-8 HTML
    pub fn to_html(&self) -> io::Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        let serializable: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut buf, &serializable, SerializeOpts::default())?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Shortens text to `width` characters, marking the cut with a trailing `.`
pub fn trim_excerpt(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let mut excerpt: String = text.chars().take(width.saturating_sub(1)).collect();
        excerpt.push('.');
        excerpt
    } else {
        text.to_string()
    }
}

fn parse_dom(html: &str) -> io::Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
}

/// Decodes `data`, letting a byte order mark override `encoding`
///
/// Returns the text together with the encoding actually used.
fn decode_with(data: &[u8], encoding: &'static Encoding) -> (String, &'static Encoding) {
    let (text, used, _had_errors) = encoding.decode(data);
    (text.into_owned(), used)
}

fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label_no_replacement(label.trim().as_bytes())
}

/// Charset declared by the first `<meta charset>` or
/// `<meta http-equiv="content-type">` element
fn meta_charset(document: &Handle) -> Option<String> {
    find_elements(document, "meta").iter().find_map(|meta| {
        if let Some(charset) = get_node_attr(meta, "charset") {
            return Some(charset);
        }
        if is_content_type_meta(meta) {
            return get_node_attr(meta, "content").and_then(|content| header_charset(&content));
        }
        None
    })
}

fn is_content_type_meta(node: &Handle) -> bool {
    get_node_attr(node, "http-equiv")
        .unwrap_or_default()
        .eq_ignore_ascii_case("content-type")
}

/// Resolves an image source to an absolute http(s) URL
fn resolve_source(src: &str, base_url: &Url) -> Option<Url> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    base_url
        .join(src)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

/// Collects every element named `name` below `node`, in document order
fn find_elements(node: &Handle, name: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_elements(node, name, &mut found);
    found
}

fn collect_elements(node: &Handle, name: &str, found: &mut Vec<Handle>) {
    if let NodeData::Element {
        name: ref element_name,
        ..
    } = node.data
    {
        if &*element_name.local == name {
            found.push(node.clone());
        }
    }

    for child in node.children.borrow().iter() {
        collect_elements(child, name, found);
    }
}

/// Reads an attribute of an element node
fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Sets, adds or (with `None`) removes an attribute of an element node
fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();

        match attr_value {
            Some(value) => {
                if let Some(attr) = attrs.iter_mut().find(|a| &*a.name.local == attr_name) {
                    attr.value.clear();
                    attr.value.push_slice(&value);
                } else {
                    attrs.push(Attribute {
                        name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                        value: format_tendril!("{}", value),
                    });
                }
            }
            None => attrs.retain(|a| &*a.name.local != attr_name),
        }
    }
}
