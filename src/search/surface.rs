//! Dense error surfaces produced by a kernel scan.

use crate::capture::Point;
use crate::util::math::{argmin, mean_std};
use crate::util::{GrabError, GrabResult};

/// Row-major errors for every valid placement; lower is better.
#[derive(Clone, Debug)]
pub struct ErrorSurface {
    values: Vec<f32>,
    width: usize,
    height: usize,
}

impl ErrorSurface {
    pub fn new(values: Vec<f32>, width: usize, height: usize) -> GrabResult<Self> {
        if width == 0 || height == 0 {
            return Err(GrabError::InvalidDimensions { width, height });
        }
        let needed = width * height;
        if values.len() != needed {
            return Err(GrabError::BufferTooSmall {
                needed,
                got: values.len(),
            });
        }
        Ok(Self {
            values,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width {
            return None;
        }
        self.values.get(y * self.width + x).copied()
    }

    /// First minimum in row-major order and its value.
    pub fn min_loc(&self) -> Option<(Point, f32)> {
        let idx = argmin(&self.values)?;
        let point = Point::new((idx % self.width) as i32, (idx / self.width) as i32);
        Some((point, self.values[idx]))
    }

    /// Mean and population standard deviation of the whole surface.
    pub fn mean_std(&self) -> (f64, f64) {
        mean_std(&self.values)
    }
}
