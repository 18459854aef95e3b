//! Background removal processing pipeline
//!
//! [`MatteProcessor`] orchestrates one `process` call end to end: resolve
//! the content identifier, consult the result cache, and on a miss run
//! the matting capability under an admission-gate permit, normalize the
//! output to a transparency-capable color mode, encode it canonically as
//! PNG, and populate both cache tiers.

use crate::{
    cache::ResultCache,
    config::MatteConfig,
    error::{MatteError, Result},
    gate::AdmissionGate,
    hasher,
    matting::{MattingBackend, MattingOptions},
};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use instant::Instant;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Admission-controlled, content-addressed background removal processor
///
/// Owns the process-wide cache and gate; construct one per process and
/// share it across request handlers. All methods take `&self`, so a
/// shared `Arc<MatteProcessor>` serves any number of concurrent callers.
pub struct MatteProcessor {
    config: MatteConfig,
    cache: Arc<ResultCache>,
    gate: Arc<AdmissionGate>,
    backend: Arc<dyn MattingBackend>,
}

impl MatteProcessor {
    /// Create a processor, building the cache and gate from configuration
    ///
    /// # Errors
    /// - Failed to create the durable cache directory
    pub fn new(config: MatteConfig, backend: Arc<dyn MattingBackend>) -> Result<Self> {
        let cache = Arc::new(ResultCache::from_config(&config)?);
        let gate = Arc::new(AdmissionGate::new(config.max_workers));
        Ok(Self::with_parts(config, backend, cache, gate))
    }

    /// Create a processor around an existing cache and gate
    ///
    /// Lets several processors (or other components) share one cache and
    /// one permit pool.
    #[must_use]
    pub fn with_parts(
        config: MatteConfig,
        backend: Arc<dyn MattingBackend>,
        cache: Arc<ResultCache>,
        gate: Arc<AdmissionGate>,
    ) -> Self {
        Self {
            config,
            cache,
            gate,
            backend,
        }
    }

    /// Remove the background from raw image bytes
    ///
    /// A caller-supplied identifier is trusted verbatim as the cache key:
    /// the caller asserts that equal identifiers mean equal requested
    /// work, and the pipeline never verifies it against the bytes. With
    /// no identifier, a stable one is derived from the payload content.
    ///
    /// Repeated submissions under the same identifier return the cached
    /// result without touching the gate or the matting engine. Two
    /// concurrent first submissions of the same identifier may both run
    /// the matting engine; the cache resolves the race as last writer
    /// wins.
    ///
    /// On any failure no cache state is mutated and the gate permit is
    /// released, so resubmitting the request is safe.
    ///
    /// # Errors
    /// - [`MatteError::Decode`] - the bytes are not a decodable image
    /// - [`MatteError::Matting`] - the matting engine failed
    /// - [`MatteError::Encode`] - canonical PNG encoding failed
    #[instrument(skip(self, bytes, identifier), fields(backend = %self.backend.name()))]
    pub async fn process(&self, bytes: &[u8], identifier: Option<&str>) -> Result<Vec<u8>> {
        let id = hasher::resolve_identifier(bytes, identifier);

        if let Some(cached) = self.cache.get(&id) {
            debug!(identifier = %id, "Cache hit, skipping matting");
            return Ok(cached);
        }

        // Miss: the gate bounds how many matting operations run at once.
        // The token is an RAII permit, released on every exit path below.
        let _token = self.gate.acquire().await?;

        let total_start = Instant::now();
        let image = image::load_from_memory(bytes).map_err(MatteError::decode)?;
        let (width, height) = (image.width(), image.height());

        let matting_start = Instant::now();
        let output = self.backend.matte(&image, &MattingOptions::default())?;
        let matting_ms = matting_start.elapsed().as_millis() as u64;

        // Normalize to a transparency-capable mode regardless of what the
        // engine produced.
        let rgba = output.into_rgba8();
        let encoded = encode_png(&rgba, self.config.output_quality)?;

        self.cache.put(&id, encoded.clone());

        info!(
            identifier = %id,
            width,
            height,
            matting_ms,
            total_ms = total_start.elapsed().as_millis() as u64,
            output_bytes = encoded.len(),
            "Processed image"
        );

        Ok(encoded)
    }

    /// The processor's configuration
    #[must_use]
    pub fn config(&self) -> &MatteConfig {
        &self.config
    }

    /// The shared result cache
    #[must_use]
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// The shared admission gate
    #[must_use]
    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }
}

/// Encode an RGBA image as canonical PNG
///
/// PNG is lossless; the configured quality selects compression effort.
fn encode_png(rgba: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let compression = match quality {
        90..=u8::MAX => CompressionType::Best,
        50..=89 => CompressionType::Default,
        _ => CompressionType::Fast,
    };

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut buffer),
        compression,
        FilterType::Adaptive,
    );
    encoder
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(MatteError::encode)?;

    Ok(buffer)
}
