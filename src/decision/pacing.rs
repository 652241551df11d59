//! Timing and target-point helpers for the decision loop.

use std::ops::RangeInclusive;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::capture::Point;

/// Wall-clock and sleep collaborator.
pub trait Clock {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> u64;

    /// Blocks the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Clock backed by `SystemTime` and `thread::sleep`.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_unix(&self) -> u64 {
        (**self).now_unix()
    }

    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Random point in `[origin.x, origin.x + width) × [origin.y, origin.y + height)`.
pub fn jitter_point<R: Rng + ?Sized>(origin: Point, width: usize, height: usize, rng: &mut R) -> Point {
    let dx = rng.random_range(0..width.max(1)) as i32;
    let dy = rng.random_range(0..height.max(1)) as i32;
    origin.offset(dx, dy)
}

/// Center of a `width × height` window at `origin`, truncating.
pub fn center_point(origin: Point, width: usize, height: usize) -> Point {
    origin.offset((width / 2) as i32, (height / 2) as i32)
}

/// Uniform delay drawn from an inclusive millisecond range.
pub fn pick_delay<R: Rng + ?Sized>(range_ms: RangeInclusive<u64>, rng: &mut R) -> Duration {
    Duration::from_millis(rng.random_range(range_ms))
}
