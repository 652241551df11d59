//! X11 pointer backend: core warps plus XTEST button events.

use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::{
    ConnectionExt as _, Window, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT,
};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::capture::Point;
use crate::pointer::{Button, Pointer};
use crate::util::{GrabError, GrabResult};

fn input_err<E: std::fmt::Display>(err: E) -> GrabError {
    GrabError::Input {
        reason: err.to_string(),
    }
}

/// Pointer bound to its own display connection.
pub struct X11Pointer {
    conn: RustConnection,
    root: Window,
}

impl X11Pointer {
    pub fn connect() -> GrabResult<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(|e| GrabError::DisplayUnavailable {
            reason: e.to_string(),
        })?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| GrabError::DisplayUnavailable {
                reason: "no X11 screen for the default display".to_string(),
            })?;
        if conn
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(input_err)?
            .is_none()
        {
            return Err(GrabError::Input {
                reason: "XTEST extension not present".to_string(),
            });
        }
        Ok(Self { conn, root })
    }

    fn fake_button(&self, kind: u8, button: Button) -> GrabResult<()> {
        self.conn
            .xtest_fake_input(kind, button.number(), CURRENT_TIME, NONE, 0, 0, 0)
            .map_err(input_err)?;
        self.conn.sync().map_err(input_err)
    }
}

impl Pointer for X11Pointer {
    fn position(&mut self) -> GrabResult<Point> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .map_err(input_err)?
            .reply()
            .map_err(input_err)?;
        Ok(Point::new(reply.root_x as i32, reply.root_y as i32))
    }

    fn warp_by(&mut self, dx: i32, dy: i32) -> GrabResult<()> {
        let dx = dx.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let dy = dy.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        self.conn
            .warp_pointer(NONE, NONE, 0, 0, 0, 0, dx, dy)
            .map_err(input_err)?;
        self.conn.sync().map_err(input_err)
    }

    fn click(&mut self, button: Button) -> GrabResult<()> {
        self.fake_button(BUTTON_PRESS_EVENT, button)?;
        self.fake_button(BUTTON_RELEASE_EVENT, button)
    }
}
