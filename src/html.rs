//! Page DOM access on top of html5ever's reference tree.
//!
//! The transform needs four operations from an HTML tree: list `<img>`
//! elements in document order, read their attributes, swap one for a new
//! `<picture>` subtree, and serialise the result. [`Document`] provides
//! exactly that over [`markup5ever_rcdom`].
//!
//! Replacement nodes come from the fragment's Maud rendering, parsed back
//! with html5ever's fragment parser, so there is one definition of the
//! `<picture>` markup and its escaping.

use crate::picture::PictureFragment;
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName, parse_document, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::io;
use std::rc::Rc;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// A parsed page.
pub struct Document {
    dom: RcDom,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        Self { dom }
    }

    /// `<img>` elements in document order, skipping those already inside a
    /// `<picture>`.
    pub fn images(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        collect_images(&self.dom.document, &mut out);
        out
    }

    pub fn serialize(&self) -> io::Result<String> {
        let mut bytes = Vec::new();
        let document: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut bytes, &document, SerializeOpts::default())?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Value of attribute `name` on an element, `None` for non-elements.
pub fn attribute(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Replace `old` in its parent with a `<picture>` built from `fragment`.
///
/// Returns `false` when `old` has no parent (already detached).
pub fn replace_with_picture(old: &Handle, fragment: &PictureFragment) -> bool {
    let Some(parent) = old.parent.take().and_then(|weak| weak.upgrade()) else {
        return false;
    };

    let nodes = build_picture(fragment);
    for node in &nodes {
        node.parent.set(Some(Rc::downgrade(&parent)));
    }

    let mut children = parent.children.borrow_mut();
    match children.iter().position(|child| Rc::ptr_eq(child, old)) {
        Some(index) => {
            children.splice(index..=index, nodes).for_each(drop);
            true
        }
        None => false,
    }
}

fn collect_images(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if is_element(child, "picture") {
            continue;
        }
        if is_element(child, "img") {
            out.push(child.clone());
        }
        collect_images(child, out);
    }
}

fn is_element(node: &Handle, local: &str) -> bool {
    matches!(&node.data, NodeData::Element { name, .. } if &*name.local == local)
}

/// Parse the maud rendering of `fragment` in a `<body>` context and return
/// its top-level nodes, detached.
fn build_picture(fragment: &PictureFragment) -> Vec<Handle> {
    let markup = fragment.render().into_string();
    let context = QualName::new(None, Namespace::from(HTML_NS), LocalName::from("body"));
    let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .one(markup.as_str());

    // Fragment parsing wraps the result in a synthetic <html> root.
    let root = dom.document.children.borrow().first().cloned();
    let nodes = match root {
        Some(root) => root.children.take(),
        None => Vec::new(),
    };
    for node in &nodes {
        node.parent.set(None);
    }
    nodes
}
