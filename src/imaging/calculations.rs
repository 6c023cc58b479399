//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output dimensions of a width-targeted variant.
///
/// The width is capped at the source width (never upscale) and the height
/// follows the source aspect ratio, rounded to the nearest pixel and never
/// below one.
///
/// # Arguments
/// * `original` - Source image dimensions (width, height)
/// * `target_width` - Requested variant width
///
/// # Returns
/// * `(width, height)` - Dimensions to resize to
pub fn calculate_variant_dimensions(original: (u32, u32), target_width: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || orig_h == 0 {
        return (orig_w, orig_h);
    }

    let width = target_width.min(orig_w).max(1);
    if width == orig_w {
        return (orig_w, orig_h);
    }

    let height = (orig_h as f64 * width as f64 / orig_w as f64).round() as u32;
    (width, height.max(1))
}
