//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take a variant spec, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_variant_dimensions;
use super::params::{Quality, ResizeParams, Tint};
use crate::cache::content_hash;
use crate::config::VariantSpec;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Extension of every generated variant.
pub const VARIANT_EXT: &str = "avif";

/// One encoded image variant, held in memory until the asset pipeline
/// writes it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedVariant {
    pub label: String,
    pub bytes: Vec<u8>,
    pub hash: String,
    pub width: u32,
    pub height: u32,
}

/// Derive a single variant from already-identified source bytes.
pub fn derive_variant(
    backend: &impl ImageBackend,
    source: &[u8],
    original: Dimensions,
    spec: &VariantSpec,
    tint: Option<Tint>,
) -> Result<DerivedVariant> {
    let (width, height) =
        calculate_variant_dimensions((original.width, original.height), spec.width);
    let bytes = backend.resize(&ResizeParams {
        source,
        width,
        height,
        quality: Quality::new(spec.quality),
        tint,
    })?;
    let hash = content_hash(&bytes);
    Ok(DerivedVariant {
        label: spec.label.clone(),
        bytes,
        hash,
        width,
        height,
    })
}

/// Derive every configured variant of one source image.
///
/// The source is identified once; variants come back in spec order.
pub fn derive_variants(
    backend: &impl ImageBackend,
    source: &[u8],
    specs: &[VariantSpec],
    tint: Option<Tint>,
) -> Result<Vec<DerivedVariant>> {
    let original = backend.identify(source)?;
    specs
        .iter()
        .map(|spec| derive_variant(backend, source, original, spec, tint))
        .collect()
}

/// File name of a variant: `<base>.<label>.<hash>.avif`.
pub fn variant_file_name(base: &str, label: &str, hash: &str) -> String {
    format!("{}.{}.{}.{}", base, label, hash, VARIANT_EXT)
}
