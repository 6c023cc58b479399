//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and resize (which also encodes). Backends work on bytes,
//! not paths, so variant derivation never touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, statically
//! linked.

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be deterministic: identical params produce
/// byte-identical output. Content-hashed file names depend on it.
pub trait ImageBackend: Sync {
    /// Read the pixel dimensions of an encoded image.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, resize, post-process and encode. Returns the encoded bytes.
    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// `identify` reports the same dimensions for every source, and fails for
    /// empty input. `resize` returns a short description of its params
    /// followed by the source bytes, so output depends on every input.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify {
            source_len: usize,
        },
        Resize {
            width: u32,
            height: u32,
            quality: u32,
            tinted: bool,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_dimensions(Dimensions {
                width: 2000,
                height: 1000,
            })
        }

        pub fn with_dimensions(dimensions: Dimensions) -> Self {
            Self {
                dimensions,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Identify {
                source_len: source.len(),
            });
            if source.is_empty() {
                return Err(BackendError::Decode("empty source".to_string()));
            }
            Ok(self.dimensions)
        }

        fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
                tinted: params.tint.is_some(),
            });
            let mut out = format!(
                "mock:{}x{}:q{}:{:?}:",
                params.width,
                params.height,
                params.quality.value(),
                params.tint.map(|t| t.channels())
            )
            .into_bytes();
            out.extend_from_slice(params.source);
            Ok(out)
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 800,
            height: 600,
        });

        let result = backend.identify(b"fake").unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify { source_len: 4 }]);
    }

    #[test]
    fn mock_identify_fails_on_empty_source() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.identify(b""),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_resize() {
        let backend = MockBackend::new();

        backend
            .resize(&ResizeParams {
                source: b"src",
                width: 700,
                height: 350,
                quality: super::super::params::Quality::new(90),
                tint: None,
            })
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Resize {
                width: 700,
                height: 350,
                quality: 90,
                tinted: false,
            }
        ));
    }
}
