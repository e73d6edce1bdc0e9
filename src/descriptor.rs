//! Layout-size descriptor parsing.
//!
//! Authors can pin the widths generated for an image with a `data-srcset`
//! attribute holding a comma-separated list of descriptors:
//!
//! ```text
//! data-srcset="320w, 480w, 640w"   → absolute widths
//! data-srcset="1x, 1.5x, 2x"       → multiples of the declared width
//! ```
//!
//! Without the attribute, the image gets the default triple of 1×, 1.5× and
//! 2× its declared width.
//!
//! ## Rounding
//!
//! Density multipliers can yield fractional widths (`1.5 × 333`). Widths end
//! up in canonical file names, so they are rounded to the nearest integer,
//! half away from zero, before anything else sees them.
//!
//! ## Duplicates
//!
//! Two descriptors can resolve to the same width (`"1x, 320w"` on a 320px
//! image). Only the first occurrence is kept, so a width is never rendered
//! or listed in a srcset twice.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("Invalid size descriptor '{token}' on image {image}")]
    InvalidDescriptor { token: String, image: String },
}

/// One parsed entry of a descriptor list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeDescriptor {
    /// `640w`: a width in pixels.
    AbsoluteWidth(u32),
    /// `1.5x`: a multiple of the declared width.
    DensityMultiplier(f64),
}

impl SizeDescriptor {
    /// Parse a single trimmed token.
    ///
    /// A token containing `w` is a width; otherwise a token containing `x` is
    /// a multiplier. The numeric part must be a leading, positive number.
    pub fn parse(token: &str) -> Option<Self> {
        if token.contains('w') {
            let digits = leading_digits(token);
            let px: u32 = digits.parse().ok()?;
            (px > 0).then_some(SizeDescriptor::AbsoluteWidth(px))
        } else if token.contains('x') {
            let factor: f64 = leading_decimal(token).parse().ok()?;
            (factor.is_finite() && factor > 0.0).then_some(SizeDescriptor::DensityMultiplier(factor))
        } else {
            None
        }
    }

    /// Concrete pixel width for an image declared `declared_width` wide.
    ///
    /// `None` when a multiplier rounds to zero or past `u32::MAX`.
    pub fn to_width(self, declared_width: u32) -> Option<u32> {
        match self {
            SizeDescriptor::AbsoluteWidth(px) => Some(px),
            SizeDescriptor::DensityMultiplier(factor) => scale(declared_width, factor),
        }
    }
}

/// Multiply a width, rounding half away from zero.
///
/// Returns `None` unless the result is a positive width that fits in `u32`.
pub fn scale(width: u32, factor: f64) -> Option<u32> {
    let scaled = (width as f64 * factor).round();
    (scaled >= 1.0 && scaled <= u32::MAX as f64).then_some(scaled as u32)
}

/// The widths used when an image carries no descriptor list.
///
/// Multiples that would overflow are left out.
pub fn default_widths(declared_width: u32) -> Vec<u32> {
    let mut widths = vec![declared_width];
    for factor in [1.5, 2.0] {
        if let Some(width) = scale(declared_width, factor) {
            if !widths.contains(&width) {
                widths.push(width);
            }
        }
    }
    widths
}

/// Resolve the ordered list of widths to generate for one image.
///
/// `source` is the image's `src` attribute, carried into errors so a broken
/// descriptor can be traced back to its page.
///
/// # Examples
/// ```
/// # use picturize::descriptor::resolve_widths;
/// assert_eq!(resolve_widths(Some("320w, 480w, 640w"), 320, "a.jpg").unwrap(), vec![320, 480, 640]);
/// assert_eq!(resolve_widths(Some("1x, 1.5x, 2x"), 300, "a.jpg").unwrap(), vec![300, 450, 600]);
/// assert_eq!(resolve_widths(None, 200, "a.jpg").unwrap(), vec![200, 300, 400]);
/// ```
pub fn resolve_widths(
    descriptors: Option<&str>,
    declared_width: u32,
    source: &str,
) -> Result<Vec<u32>, DescriptorError> {
    let list = match descriptors {
        Some(list) if !list.trim().is_empty() => list,
        _ => return Ok(default_widths(declared_width)),
    };

    let mut widths = Vec::new();
    for token in list.split(',').map(str::trim) {
        let width = SizeDescriptor::parse(token)
            .and_then(|d| d.to_width(declared_width))
            .ok_or_else(|| DescriptorError::InvalidDescriptor {
                token: token.to_string(),
                image: source.to_string(),
            })?;
        if !widths.contains(&width) {
            widths.push(width);
        }
    }
    Ok(widths)
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    &s[..end]
}

fn leading_decimal(s: &str) -> &str {
    let mut seen_dot = false;
    let end = s
        .char_indices()
        .find(|&(_, c)| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                false
            } else {
                !c.is_ascii_digit()
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}
