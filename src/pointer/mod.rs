//! Synthetic pointer input.

use crate::capture::Point;
use crate::util::GrabResult;

#[cfg(feature = "x11")]
pub mod x11;

/// Pointer button to click.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Button {
    #[default]
    Left,
    Middle,
    Right,
}

impl Button {
    /// Core protocol button number.
    pub fn number(self) -> u8 {
        match self {
            Button::Left => 1,
            Button::Middle => 2,
            Button::Right => 3,
        }
    }
}

/// Pointer collaborator.
///
/// `warp_by` is relative, so absolute placement goes through `move_to`,
/// which reads the current position first.
pub trait Pointer {
    /// Current absolute pointer position.
    fn position(&mut self) -> GrabResult<Point>;

    /// Moves the pointer by `(dx, dy)` from wherever it is.
    fn warp_by(&mut self, dx: i32, dy: i32) -> GrabResult<()>;

    /// Presses and releases `button` at the current position.
    fn click(&mut self, button: Button) -> GrabResult<()>;

    /// Places the pointer at absolute `target`.
    fn move_to(&mut self, target: Point) -> GrabResult<()> {
        let current = self.position()?;
        self.warp_by(target.x - current.x, target.y - current.y)
    }
}

impl<P: Pointer + ?Sized> Pointer for &mut P {
    fn position(&mut self) -> GrabResult<Point> {
        (**self).position()
    }

    fn warp_by(&mut self, dx: i32, dy: i32) -> GrabResult<()> {
        (**self).warp_by(dx, dy)
    }

    fn click(&mut self, button: Button) -> GrabResult<()> {
        (**self).click(button)
    }

    fn move_to(&mut self, target: Point) -> GrabResult<()> {
        (**self).move_to(target)
    }
}
