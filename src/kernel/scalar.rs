//! Scalar normalized squared-difference kernel.
//!
//! For a placement `(x, y)` the error is
//! `R = Σ(T − I)² / sqrt(ΣT² · ΣI²)` over every template sample and channel.
//! The numerator is expanded to `ΣI² − 2·ΣTI + ΣT²`; window energies `ΣI²`
//! come from a squared integral image and all sums are exact integers.
//! When the denominator is zero, or the ratio reaches 1, the error saturates
//! at 1: template and window share no energy to compare.

use crate::image::ImageView;
use crate::kernel::Kernel;
use crate::search::ErrorSurface;
use crate::template::SqdiffPlan;
use crate::util::{GrabError, GrabResult};

/// Scalar reference kernel.
pub struct SqdiffNormedScalar;

/// Squared integral image: `at(x, y)` is the energy of `[0, x) × [0, y)`.
struct SquaredIntegral {
    stride: usize,
    sums: Vec<u64>,
}

impl SquaredIntegral {
    fn build(image: ImageView<'_, u8>) -> Self {
        let width = image.width();
        let height = image.height();
        let channels = image.channels();
        let stride = width + 1;
        let mut sums = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let Some(row) = image.row(y) else {
                break;
            };
            let mut run = 0u64;
            for (x, px) in row.chunks_exact(channels).enumerate() {
                run += px.iter().map(|&v| (v as u64) * (v as u64)).sum::<u64>();
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + run;
            }
        }
        Self { stride, sums }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let s = self.stride;
        self.sums[(y + h) * s + x + w] + self.sums[y * s + x]
            - self.sums[y * s + x + w]
            - self.sums[(y + h) * s + x]
    }
}

#[inline]
fn cross(image: ImageView<'_, u8>, plan: &SqdiffPlan, x: usize, y: usize) -> u64 {
    let channels = plan.channels();
    let row_len = plan.width() * channels;
    let samples = plan.samples();
    let mut dot = 0u64;
    for ty in 0..plan.height() {
        let Some(img_row) = image.row(y + ty) else {
            break;
        };
        let start = x * channels;
        let window = &img_row[start..start + row_len];
        let tpl_row = &samples[ty * row_len..(ty + 1) * row_len];
        dot += window
            .iter()
            .zip(tpl_row)
            .map(|(&i, &t)| (i as u64) * (t as u64))
            .sum::<u64>();
    }
    dot
}

#[inline]
fn normalize(sum_i2: u64, sum_t2: u64, dot: u64) -> f32 {
    let num = (sum_i2 + sum_t2).saturating_sub(2 * dot) as f64;
    let denom = ((sum_i2 as f64) * (sum_t2 as f64)).sqrt();
    if denom > 0.0 && num < denom {
        (num / denom) as f32
    } else {
        1.0
    }
}

fn check_fit(image: &ImageView<'_, u8>, plan: &SqdiffPlan) -> GrabResult<()> {
    if image.channels() != plan.channels() {
        return Err(GrabError::ChannelMismatch {
            frame: image.channels(),
            templ: plan.channels(),
        });
    }
    if plan.width() > image.width() || plan.height() > image.height() {
        return Err(GrabError::TemplateTooLarge {
            templ_width: plan.width(),
            templ_height: plan.height(),
            frame_width: image.width(),
            frame_height: image.height(),
        });
    }
    Ok(())
}

impl Kernel for SqdiffNormedScalar {
    fn error_at(image: ImageView<'_, u8>, plan: &SqdiffPlan, x: usize, y: usize) -> f32 {
        if check_fit(&image, plan).is_err()
            || x > image.width() - plan.width()
            || y > image.height() - plan.height()
        {
            return f32::NAN;
        }
        let channels = plan.channels();
        let row_len = plan.width() * channels;
        let mut sum_i2 = 0u64;
        for ty in 0..plan.height() {
            if let Some(row) = image.row(y + ty) {
                sum_i2 += row[x * channels..x * channels + row_len]
                    .iter()
                    .map(|&v| (v as u64) * (v as u64))
                    .sum::<u64>();
            }
        }
        normalize(sum_i2, plan.sum_sq(), cross(image, plan, x, y))
    }

    fn error_surface(image: ImageView<'_, u8>, plan: &SqdiffPlan) -> GrabResult<ErrorSurface> {
        check_fit(&image, plan)?;

        let out_w = image.width() - plan.width() + 1;
        let out_h = image.height() - plan.height() + 1;
        let integral = SquaredIntegral::build(image);
        let sum_t2 = plan.sum_sq();

        let mut values = Vec::with_capacity(out_w * out_h);
        for y in 0..out_h {
            for x in 0..out_w {
                let sum_i2 = integral.window(x, y, plan.width(), plan.height());
                values.push(normalize(sum_i2, sum_t2, cross(image, plan, x, y)));
            }
        }
        ErrorSurface::new(values, out_w, out_h)
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize, SqdiffNormedScalar, SquaredIntegral};
    use crate::image::ImageView;
    use crate::kernel::Kernel;
    use crate::template::SqdiffPlan;

    #[test]
    fn integral_window_matches_direct_sum() {
        let data: Vec<u8> = (0u8..20).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();
        let integral = SquaredIntegral::build(view);
        let direct: u64 = [6u64, 7, 8, 11, 12, 13].iter().map(|v| v * v).sum();
        assert_eq!(integral.window(1, 1, 3, 2), direct);
    }

    #[test]
    fn normalize_saturates_without_shared_energy() {
        assert_eq!(normalize(0, 100, 0), 1.0);
        assert_eq!(normalize(100, 0, 0), 1.0);
        assert_eq!(normalize(100, 100, 50), 1.0);
        assert_eq!(normalize(100, 100, 100), 0.0);
    }

    #[test]
    fn surface_agrees_with_error_at() {
        let data: Vec<u8> = (0..64u32).map(|v| ((v * 37) % 251) as u8).collect();
        let image = ImageView::from_slice(&data, 8, 8).unwrap();
        let tpl_data = [10u8, 200, 30, 40, 90, 60];
        let plan = SqdiffPlan::from_view(ImageView::from_slice(&tpl_data, 3, 2).unwrap()).unwrap();

        let surface = SqdiffNormedScalar::error_surface(image, &plan).unwrap();
        assert_eq!((surface.width(), surface.height()), (6, 7));
        for y in 0..7 {
            for x in 0..6 {
                let direct = SqdiffNormedScalar::error_at(image, &plan, x, y);
                assert_eq!(surface.get(x, y), Some(direct));
            }
        }
        assert!(SqdiffNormedScalar::error_at(image, &plan, 6, 0).is_nan());
    }
}
