//! Matting capability abstraction
//!
//! The pipeline treats matting as an opaque transformation from image to
//! image. Concrete engines (neural segmentation, external services, test
//! doubles) implement [`MattingBackend`] and are injected into the
//! processor at construction.

use crate::error::Result;
use image::DynamicImage;

/// Alpha-matting foreground threshold (0-255 scale)
pub const FOREGROUND_THRESHOLD: u8 = 240;
/// Alpha-matting background threshold (0-255 scale)
pub const BACKGROUND_THRESHOLD: u8 = 10;

/// Options passed to the matting capability
///
/// The processing core pins these to fixed policy constants; they are not
/// caller-tunable through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MattingOptions {
    /// Refine mask edges with alpha matting
    pub alpha_matting: bool,
    /// Pixels at or above this confidence are definite foreground
    pub foreground_threshold: u8,
    /// Pixels at or below this confidence are definite background
    pub background_threshold: u8,
}

impl Default for MattingOptions {
    fn default() -> Self {
        Self {
            alpha_matting: true,
            foreground_threshold: FOREGROUND_THRESHOLD,
            background_threshold: BACKGROUND_THRESHOLD,
        }
    }
}

/// Trait for matting engines
///
/// Implementations must be safe to share across tasks; the processor
/// invokes `matte` concurrently up to the admission gate's permit count.
pub trait MattingBackend: Send + Sync {
    /// Remove the background from a decoded image
    ///
    /// The returned image need not carry an alpha channel; the pipeline
    /// normalizes the color mode afterwards.
    ///
    /// # Errors
    /// - The engine failed or produced an invalid result
    fn matte(&self, image: &DynamicImage, options: &MattingOptions) -> Result<DynamicImage>;

    /// Short human-readable engine name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_carry_policy_thresholds() {
        let options = MattingOptions::default();
        assert!(options.alpha_matting);
        assert_eq!(options.foreground_threshold, 240);
        assert_eq!(options.background_threshold, 10);
    }
}
