#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bg-matte
//!
//! Admission-controlled, content-addressed background removal processing
//! core: the worker path that takes raw image bytes, deduplicates
//! identical work through a content hash, bounds how many matting
//! operations run simultaneously, and persists results for reuse.
//!
//! The crate is the processing core of a larger image service; HTTP
//! routing, metadata persistence, and upload targets live outside it and
//! call the single [`MatteProcessor::process`] entry point.
//!
//! ## Design
//!
//! - **Content addressing**: results are cached under an identifier
//!   derived from the payload bytes (SHA-256), or one the caller supplies
//!   and vouches for. Repeated submissions cost a cache lookup, not a
//!   matting run.
//! - **Two-tier cache**: a bounded in-memory LRU tier backed by an
//!   optional durable file-per-identifier tier; durable hits are promoted
//!   into memory, and durable I/O failures degrade to misses rather than
//!   surfacing.
//! - **Admission control**: a counting gate with a fixed permit count
//!   bounds concurrent matting work; permits are RAII tokens released on
//!   every exit path.
//! - **Opaque matting**: the expensive transformation sits behind the
//!   [`MattingBackend`] trait and is injected at construction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bg_matte::{MatteConfig, MatteProcessor, MattingBackend, MattingOptions};
//! use std::sync::Arc;
//!
//! # struct MyEngine;
//! # impl MattingBackend for MyEngine {
//! #     fn matte(
//! #         &self,
//! #         image: &image::DynamicImage,
//! #         _options: &MattingOptions,
//! #     ) -> bg_matte::Result<image::DynamicImage> {
//! #         Ok(image.clone())
//! #     }
//! #     fn name(&self) -> &str { "my-engine" }
//! # }
//! # async fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
//! let config = MatteConfig::from_env()?;
//! let processor = MatteProcessor::new(config, Arc::new(MyEngine))?;
//!
//! // First call runs the matting engine; identical resubmissions are
//! // answered from the cache.
//! let png_bytes = processor.process(&upload_bytes, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod hasher;
pub mod matting;
pub mod processor;
pub mod tracing_config;

// Public API exports
pub use cache::{CacheStats, ResultCache};
pub use config::{default_cache_dir, MatteConfig, MatteConfigBuilder};
pub use error::{MatteError, Result};
pub use gate::{AdmissionGate, GateToken};
pub use hasher::{content_hash, random_identifier, ContentIdentifier};
pub use matting::{
    MattingBackend, MattingOptions, BACKGROUND_THRESHOLD, FOREGROUND_THRESHOLD,
};
pub use processor::MatteProcessor;
pub use tracing_config::{init_library_tracing, TracingConfig, TracingFormat};
