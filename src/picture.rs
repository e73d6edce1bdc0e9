//! Responsive `<picture>` markup.
//!
//! The fragment is built from canonical variant URLs only. It does not look
//! at the cache, so the markup is identical whether or not the variants have
//! been rendered yet:
//!
//! ```html
//! <picture title="A cat">
//!   <source srcset="/img/cat_100w.avif 100w, /img/cat_200w.avif 200w" type="image/avif">
//!   <source srcset="/img/cat_100w.webp 100w, /img/cat_200w.webp 200w" type="image/webp">
//!   <img src="/img/cat_100w.avif" alt="A cat" width="100" sizes="100w" loading="lazy" decoding="async">
//! </picture>
//! ```
//!
//! Srcset entries follow the width order of the descriptor list, not numeric
//! order. The fallback `<img>` uses the first width in the first format.

use crate::format::Format;
use crate::variant::{SiteLayout, SourcePath};
use maud::{Markup, html};

/// A `<source>` child: every width of one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceElement {
    pub srcset: String,
    pub mime: &'static str,
}

/// The fallback `<img>` child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackImage {
    pub src: String,
    pub alt: Option<String>,
    pub width: u32,
    pub sizes: String,
}

impl FallbackImage {
    pub const LOADING: &'static str = "lazy";
    pub const DECODING: &'static str = "async";
}

/// Replacement for one `<img>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureFragment {
    /// Copied from the alt text, as a tooltip on the whole picture.
    pub title: Option<String>,
    pub sources: Vec<SourceElement>,
    pub img: FallbackImage,
}

/// Build the `<picture>` fragment for one image.
///
/// `formats` and `widths` must be non-empty; the configuration and the
/// descriptor parser guarantee both.
pub fn synthesize(
    layout: &SiteLayout,
    formats: &[Format],
    widths: &[u32],
    source: &SourcePath,
    alt: Option<&str>,
    declared_width: u32,
) -> PictureFragment {
    let sources = formats
        .iter()
        .map(|&format| SourceElement {
            srcset: widths
                .iter()
                .map(|&w| format!("{} {}w", layout.public_url(source, w, format), w))
                .collect::<Vec<_>>()
                .join(", "),
            mime: format.mime_type(),
        })
        .collect();

    let fallback_width = widths.first().copied().unwrap_or(declared_width);
    let fallback_format = formats.first().copied().unwrap_or(Format::Jpg);

    PictureFragment {
        title: alt.map(str::to_string),
        sources,
        img: FallbackImage {
            src: layout.public_url(source, fallback_width, fallback_format),
            alt: alt.map(str::to_string),
            width: declared_width,
            sizes: format!("{}w", declared_width),
        },
    }
}

impl PictureFragment {
    pub fn render(&self) -> Markup {
        html! {
            picture title=[self.title.as_deref()] {
                @for s in &self.sources {
                    source srcset=(s.srcset) type=(s.mime);
                }
                img src=(self.img.src)
                    alt=[self.img.alt.as_deref()]
                    width=(self.img.width)
                    sizes=(self.img.sizes)
                    loading=(FallbackImage::LOADING)
                    decoding=(FallbackImage::DECODING);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(formats: &[Format], widths: &[u32], alt: Option<&str>) -> PictureFragment {
        let layout = SiteLayout::default();
        let source = layout.source_path("/img/cat.jpg");
        synthesize(&layout, formats, widths, &source, alt, widths[0])
    }

    #[test]
    fn one_source_per_format_in_order() {
        let f = fragment(&[Format::Avif, Format::Webp], &[100, 200], Some("A cat"));
        assert_eq!(f.sources.len(), 2);
        assert_eq!(f.sources[0].mime, "image/avif");
        assert_eq!(f.sources[1].mime, "image/webp");
    }

    #[test]
    fn srcset_lists_every_width() {
        let f = fragment(&[Format::Avif, Format::Webp], &[100, 200], None);
        assert_eq!(
            f.sources[0].srcset,
            "/img/cat_100w.avif 100w, /img/cat_200w.avif 200w"
        );
        assert_eq!(
            f.sources[1].srcset,
            "/img/cat_100w.webp 100w, /img/cat_200w.webp 200w"
        );
    }

    #[test]
    fn srcset_keeps_descriptor_order() {
        let f = fragment(&[Format::Webp], &[800, 400], None);
        assert_eq!(
            f.sources[0].srcset,
            "/img/cat_800w.webp 800w, /img/cat_400w.webp 400w"
        );
    }

    #[test]
    fn fallback_uses_first_width_and_first_format() {
        let f = fragment(&[Format::Avif, Format::Webp], &[100, 200], Some("A cat"));
        assert_eq!(f.img.src, "/img/cat_100w.avif");
        assert_eq!(f.img.alt.as_deref(), Some("A cat"));
        assert_eq!(f.img.width, 100);
        assert_eq!(f.img.sizes, "100w");
    }

    #[test]
    fn title_mirrors_alt() {
        let f = fragment(&[Format::Avif], &[100], Some("A cat"));
        assert_eq!(f.title.as_deref(), Some("A cat"));
        assert_eq!(fragment(&[Format::Avif], &[100], None).title, None);
    }

    #[test]
    fn render_has_two_sources_and_one_img() {
        let html = fragment(&[Format::Avif, Format::Webp], &[100, 200], Some("A cat"))
            .render()
            .into_string();
        assert_eq!(html.matches("<source ").count(), 2);
        assert_eq!(html.matches("<img ").count(), 1);
        assert!(html.starts_with("<picture title=\"A cat\">"));
        assert!(html.contains("src=\"/img/cat_100w.avif\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(html.contains("decoding=\"async\""));
        assert!(html.ends_with("</picture>"));
    }

    #[test]
    fn render_escapes_alt_text() {
        let html = fragment(&[Format::Avif], &[100], Some("\"cats\" & <dogs>"))
            .render()
            .into_string();
        assert!(html.contains("alt=\"&quot;cats&quot; &amp; &lt;dogs&gt;\""));
    }

    #[test]
    fn render_omits_alt_when_absent() {
        let html = fragment(&[Format::Avif], &[100], None).render().into_string();
        assert!(!html.contains("alt="));
        assert!(html.starts_with("<picture>"));
    }
}
