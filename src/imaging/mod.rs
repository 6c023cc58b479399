//! Responsive image variants, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3, never upscaling |
//! | **Tint** | luma + darken blend over a solid colour |
//! | **Encode** | AVIF via rav1e |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use operations::{DerivedVariant, derive_variant, derive_variants, variant_file_name};
pub use params::{Quality, Tint};
pub use rust_backend::RustBackend;
