//! Error-surface kernels.

use crate::image::ImageView;
use crate::search::ErrorSurface;
use crate::template::SqdiffPlan;
use crate::util::GrabResult;

/// Kernel trait for per-placement errors and full-surface scans.
pub trait Kernel {
    /// Normalized error at a single placement (top-left coordinates).
    ///
    /// Returns `f32::NAN` when the template does not fit at `(x, y)`.
    fn error_at(image: ImageView<'_, u8>, plan: &SqdiffPlan, x: usize, y: usize) -> f32;

    /// Errors for every placement where the template fits entirely.
    fn error_surface(image: ImageView<'_, u8>, plan: &SqdiffPlan) -> GrabResult<ErrorSurface>;
}

pub mod scalar;

pub use scalar::SqdiffNormedScalar;
