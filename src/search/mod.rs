//! Template search and confidence scoring.
//!
//! The raw best match is the minimum of the normalized squared-difference
//! surface. Its confidence is how many standard deviations that minimum sits
//! below the surface mean:
//!
//! `confidence = |mean − min| / std`
//!
//! A pattern scores high when it stands out sharply from the rest of the
//! frame, independent of how low its absolute error is. A flat surface has
//! zero deviation and yields a non-finite confidence, which is never a hit.

mod surface;

pub use surface::ErrorSurface;

use crate::capture::Point;
use crate::image::ImageView;
use crate::kernel::{Kernel, SqdiffNormedScalar};
use crate::template::TemplatePattern;
use crate::trace::{trace_debug, trace_span};
use crate::util::{GrabError, GrabResult};

/// Best alignment of one template against one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// Top-left corner of the best-aligned window, frame-local.
    pub location: Point,
    /// Sigma-normalized confidence; NaN or infinite for a flat surface.
    pub confidence: f64,
    /// Normalized squared difference at `location`.
    pub raw_error: f64,
}

impl MatchResult {
    /// True when the confidence is not a finite number.
    pub fn is_degenerate(&self) -> bool {
        !self.confidence.is_finite()
    }

    /// True when the confidence is finite and strictly above `threshold`.
    pub fn is_hit(&self, threshold: f64) -> bool {
        self.confidence.is_finite() && self.confidence > threshold
    }
}

/// Computes the confidence score of a surface minimum.
pub fn sigma_confidence(mean: f64, min: f64, std: f64) -> f64 {
    (mean - min).abs() / std
}

/// Scores templates against canonical frames.
#[derive(Copy, Clone, Debug, Default)]
pub struct Matcher;

impl Matcher {
    pub fn new() -> Self {
        Self
    }

    /// Full error surface of `pattern` over `frame`.
    pub fn error_surface(
        &self,
        frame: ImageView<'_, u8>,
        pattern: &TemplatePattern,
    ) -> GrabResult<ErrorSurface> {
        check_preconditions(frame, pattern)?;
        SqdiffNormedScalar::error_surface(frame, pattern.plan())
    }

    /// Best location and confidence of `pattern` in `frame`.
    ///
    /// Fails if the template is larger than the frame or the channel modes
    /// differ; both are checked before any scanning happens.
    pub fn match_pattern(
        &self,
        frame: ImageView<'_, u8>,
        pattern: &TemplatePattern,
    ) -> GrabResult<MatchResult> {
        let _span = trace_span!(
            "match_pattern",
            role = pattern.role().name(),
            width = pattern.width(),
            height = pattern.height()
        )
        .entered();

        let surface = self.error_surface(frame, pattern)?;
        let (location, min) = surface.min_loc().unwrap_or((Point::default(), f32::NAN));
        let (mean, std) = surface.mean_std();
        let result = MatchResult {
            location,
            confidence: sigma_confidence(mean, min as f64, std),
            raw_error: min as f64,
        };
        trace_debug!(
            "match_scored",
            x = result.location.x,
            y = result.location.y,
            confidence = result.confidence,
            raw_error = result.raw_error
        );
        Ok(result)
    }
}

fn check_preconditions(frame: ImageView<'_, u8>, pattern: &TemplatePattern) -> GrabResult<()> {
    if pattern.width() > frame.width() || pattern.height() > frame.height() {
        return Err(GrabError::TemplateTooLarge {
            templ_width: pattern.width(),
            templ_height: pattern.height(),
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
    }
    if pattern.mode().channels() != frame.channels() {
        return Err(GrabError::ChannelMismatch {
            frame: frame.channels(),
            templ: pattern.mode().channels(),
        });
    }
    Ok(())
}
