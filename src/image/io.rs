//! Template decoding and debug frame output via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use std::path::{Path, PathBuf};

use crate::capture::Point;
use crate::decision::DebugSink;
use crate::image::{ChannelMode, ImageView, OwnedImage};
use crate::search::MatchResult;
use crate::template::TemplatePattern;
use crate::util::{GrabError, GrabResult};

/// Creates an owned grayscale image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> GrabResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage::new(img.as_raw().clone(), width, height, ChannelMode::Grayscale)
}

/// Creates an owned color image, reordering RGB into capture component order.
pub fn owned_from_rgb_image(img: &image::RgbImage) -> GrabResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let mut data = Vec::with_capacity(width * height * 3);
    for px in img.pixels() {
        let [r, g, b] = px.0;
        data.extend_from_slice(&[b, g, r]);
    }
    OwnedImage::new(data, width, height, ChannelMode::Color)
}

/// Converts a decoded image into the requested channel mode.
pub fn owned_from_dynamic_image(
    img: &image::DynamicImage,
    mode: ChannelMode,
) -> GrabResult<OwnedImage> {
    match mode {
        ChannelMode::Grayscale => owned_from_gray_image(&img.to_luma8()),
        ChannelMode::Color => owned_from_rgb_image(&img.to_rgb8()),
    }
}

/// Loads a template image from disk in the requested channel mode.
pub fn load_template<P: AsRef<Path>>(path: P, mode: ChannelMode) -> GrabResult<OwnedImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| GrabError::TemplateLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img, mode).map_err(|err| GrabError::TemplateLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Renders `frame` as RGB with a one-pixel outline around the match window.
pub fn render_match(
    frame: ImageView<'_, u8>,
    location: Point,
    width: usize,
    height: usize,
) -> GrabResult<image::RgbImage> {
    let (fw, fh) = (frame.width() as u32, frame.height() as u32);
    let mut out = image::RgbImage::new(fw, fh);
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let px = frame.pixel(x, y).ok_or(GrabError::InvalidDimensions {
                width: frame.width(),
                height: frame.height(),
            })?;
            let rgb = match px {
                &[v] => [v, v, v],
                &[c0, c1, c2] => [c2, c1, c0],
                _ => {
                    return Err(GrabError::ChannelMismatch {
                        frame: px.len(),
                        templ: 3,
                    })
                }
            };
            out.put_pixel(x as u32, y as u32, image::Rgb(rgb));
        }
    }

    let outline = image::Rgb([255, 0, 0]);
    let x0 = location.x.max(0) as u32;
    let y0 = location.y.max(0) as u32;
    let x1 = (x0 + width.saturating_sub(1) as u32).min(fw.saturating_sub(1));
    let y1 = (y0 + height.saturating_sub(1) as u32).min(fh.saturating_sub(1));
    if x0 < fw && y0 < fh {
        for x in x0..=x1 {
            out.put_pixel(x, y0, outline);
            out.put_pixel(x, y1, outline);
        }
        for y in y0..=y1 {
            out.put_pixel(x0, y, outline);
            out.put_pixel(x1, y, outline);
        }
    }
    Ok(out)
}

/// Writes `render_match` output as a PNG.
pub fn save_debug_png<P: AsRef<Path>>(
    frame: ImageView<'_, u8>,
    location: Point,
    width: usize,
    height: usize,
    path: P,
) -> GrabResult<()> {
    let img = render_match(frame, location, width, height)?;
    img.save_with_format(path.as_ref(), image::ImageFormat::Png)
        .map_err(|err| GrabError::Output {
            reason: err.to_string(),
        })
}

/// Debug sink that overwrites `<dir>/<role>.png` on every cycle.
#[derive(Clone, Debug)]
pub struct PngDebugSink {
    dir: PathBuf,
}

impl PngDebugSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Output path for a pattern role.
    pub fn path_for(&self, pattern: &TemplatePattern) -> PathBuf {
        self.dir.join(format!("{}.png", pattern.role().name()))
    }
}

impl DebugSink for PngDebugSink {
    fn observe(
        &mut self,
        frame: ImageView<'_, u8>,
        pattern: &TemplatePattern,
        result: &MatchResult,
    ) -> GrabResult<()> {
        save_debug_png(
            frame,
            result.location,
            pattern.width(),
            pattern.height(),
            self.path_for(pattern),
        )
    }
}
