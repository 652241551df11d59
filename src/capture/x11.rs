//! Live X11 capture through the MIT-SHM extension.
//!
//! The capture buffer is a SysV shared-memory segment attached to both this
//! process and the X server, so `shm_get_image` writes pixels straight into
//! memory we can read without copying through the socket.

use std::io;
use std::ptr;
use std::slice;

use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageEvent, ConnectionExt as _, EventMask, ImageFormat, ImageOrder, Window,
};
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;

use crate::capture::{ByteOrder, FrameSource, FrameView, PixelLayout, Point, Region};
use crate::trace::{trace_event, trace_span};
use crate::util::{GrabError, GrabResult};

fn display_err<E: std::fmt::Display>(err: E) -> GrabError {
    GrabError::DisplayUnavailable {
        reason: err.to_string(),
    }
}

fn capture_err<E: std::fmt::Display>(err: E) -> GrabError {
    GrabError::Capture {
        reason: err.to_string(),
    }
}

/// Shared-memory segment backing the frame buffer.
struct Segment {
    seg: shm::Seg,
    addr: *mut u8,
    len: usize,
}

/// Capture session bound to one named window.
pub struct X11Capture {
    conn: RustConnection,
    root: Window,
    window: Window,
    region: Region,
    layout: PixelLayout,
    stride: usize,
    segment: Segment,
    released: bool,
}

impl X11Capture {
    /// Finds and raises the window whose name starts with `window_name`, then
    /// allocates a shared buffer sized to its current geometry.
    pub fn initialize(window_name: &str) -> GrabResult<Self> {
        let _span = trace_span!("capture_init", window = window_name).entered();

        let (conn, screen_num) = x11rb::connect(None).map_err(display_err)?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| display_err("no X11 screen for the default display"))?;
        let root = screen.root;
        let root_depth = screen.root_depth;

        let window = window_with_name(&conn, root, window_name)?.ok_or_else(|| {
            GrabError::WindowNotFound {
                name: window_name.to_string(),
            }
        })?;
        raise_window(&conn, root, window)?;

        let geometry = conn
            .get_geometry(window)
            .map_err(display_err)?
            .reply()
            .map_err(display_err)?;
        let border = geometry.border_width as i16;
        let origin = conn
            .translate_coordinates(window, root, -border, -border)
            .map_err(display_err)?
            .reply()
            .map_err(display_err)?;
        let width = geometry.width as usize;
        let height = geometry.height as usize;
        if width == 0 || height == 0 {
            return Err(GrabError::InvalidDimensions { width, height });
        }

        if conn
            .extension_information(shm::X11_EXTENSION_NAME)
            .map_err(display_err)?
            .is_none()
        {
            return Err(GrabError::CaptureUnavailable {
                reason: "MIT-SHM extension not present".to_string(),
            });
        }
        let version = conn
            .shm_query_version()
            .map_err(|e| GrabError::CaptureUnavailable {
                reason: e.to_string(),
            })?
            .reply()
            .map_err(|e| GrabError::CaptureUnavailable {
                reason: e.to_string(),
            })?;
        trace_event!(
            "mit_shm",
            major = version.major_version,
            minor = version.minor_version,
            shared_pixmaps = version.shared_pixmaps
        );

        let (layout, stride) = zpixmap_layout(&conn, root_depth, width)?;
        let segment = attach_segment(&conn, stride * height)?;

        trace_event!(
            "capture_ready",
            x = origin.dst_x,
            y = origin.dst_y,
            width = width,
            height = height
        );
        Ok(Self {
            conn,
            root,
            window,
            region: Region {
                origin: Point::new(origin.dst_x as i32, origin.dst_y as i32),
                width,
                height,
            },
            layout,
            stride,
            segment,
            released: false,
        })
    }

    /// X11 id of the captured window.
    pub fn window_id(&self) -> u32 {
        self.window
    }

    /// Releases the shared buffer; consuming `self` makes a second call impossible.
    pub fn teardown(mut self) -> GrabResult<()> {
        self.release()
    }

    fn release(&mut self) -> GrabResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let detach = self
            .conn
            .shm_detach(self.segment.seg)
            .map_err(capture_err)
            .and_then(|cookie| cookie.check().map_err(capture_err));
        // SAFETY: `addr` came from a successful `shmat` and is detached once.
        unsafe {
            libc::shmdt(self.segment.addr as *const libc::c_void);
        }
        detach
    }
}

impl FrameSource for X11Capture {
    fn refresh(&mut self) -> GrabResult<()> {
        let _span = trace_span!("refresh").entered();
        let Region {
            origin,
            width,
            height,
        } = self.region;
        self.conn
            .shm_get_image(
                self.root,
                origin.x as i16,
                origin.y as i16,
                width as u16,
                height as u16,
                !0,
                ImageFormat::Z_PIXMAP.into(),
                self.segment.seg,
                0,
            )
            .map_err(capture_err)?
            .reply()
            .map_err(capture_err)?;
        Ok(())
    }

    fn frame(&self) -> FrameView<'_> {
        // SAFETY: the segment stays mapped until `release`, which needs `&mut
        // self`, and the server only writes during `refresh`, which also needs
        // `&mut self`, so no borrow of the frame can observe either.
        let data = unsafe { slice::from_raw_parts(self.segment.addr, self.segment.len) };
        FrameView {
            data,
            width: self.region.width,
            height: self.region.height,
            stride: self.stride,
            layout: self.layout,
        }
    }

    fn region(&self) -> Region {
        self.region
    }
}

impl Drop for X11Capture {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

fn window_with_name(conn: &RustConnection, top: Window, name: &str) -> GrabResult<Option<Window>> {
    let title = conn
        .get_property(false, top, AtomEnum::WM_NAME, AtomEnum::ANY, 0, u32::MAX)
        .map_err(display_err)?
        .reply()
        .ok();
    if let Some(title) = title {
        if title.format == 8 && title.value.starts_with(name.as_bytes()) {
            return Ok(Some(top));
        }
    }

    // A subtree that vanished mid-walk does not match.
    let Ok(tree) = conn.query_tree(top).map_err(display_err)?.reply() else {
        return Ok(None);
    };
    for child in tree.children {
        if let Some(found) = window_with_name(conn, child, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn raise_window(conn: &RustConnection, root: Window, window: Window) -> GrabResult<()> {
    let net_active = conn
        .intern_atom(false, b"_NET_ACTIVE_WINDOW")
        .map_err(display_err)?
        .reply()
        .map_err(display_err)?
        .atom;
    // Source indication 2: pager.
    let event = ClientMessageEvent::new(32, window, net_active, [2, CURRENT_TIME, 0, 0, 0]);
    conn.send_event(
        false,
        root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        event,
    )
    .map_err(display_err)?;
    conn.flush().map_err(display_err)?;
    Ok(())
}

fn zpixmap_layout(
    conn: &RustConnection,
    depth: u8,
    width: usize,
) -> GrabResult<(PixelLayout, usize)> {
    let setup = conn.setup();
    let format = setup
        .pixmap_formats
        .iter()
        .find(|f| f.depth == depth)
        .ok_or_else(|| GrabError::CaptureUnavailable {
            reason: format!("no pixmap format for depth {depth}"),
        })?;
    let bytes_per_pixel = match format.bits_per_pixel {
        24 => 3,
        32 => 4,
        other => {
            return Err(GrabError::CaptureUnavailable {
                reason: format!("unsupported {other} bits per pixel"),
            })
        }
    };
    let byte_order = if setup.image_byte_order == ImageOrder::MSB_FIRST {
        ByteOrder::MsbFirst
    } else {
        ByteOrder::LsbFirst
    };
    let pad = (format.scanline_pad as usize / 8).max(1);
    let stride = (width * bytes_per_pixel).div_ceil(pad) * pad;
    Ok((
        PixelLayout {
            bytes_per_pixel,
            byte_order,
        },
        stride,
    ))
}

fn attach_segment(conn: &RustConnection, len: usize) -> GrabResult<Segment> {
    let shm_err = |reason: String| GrabError::SharedMemory { reason };

    // SAFETY: plain SysV calls; every failure path below undoes what succeeded.
    let shmid = unsafe { libc::shmget(libc::IPC_PRIVATE, len, libc::IPC_CREAT | 0o600) };
    if shmid < 0 {
        return Err(shm_err(io::Error::last_os_error().to_string()));
    }
    let addr = unsafe { libc::shmat(shmid, ptr::null(), 0) };
    if addr as isize == -1 {
        let reason = io::Error::last_os_error().to_string();
        unsafe {
            libc::shmctl(shmid, libc::IPC_RMID, ptr::null_mut());
        }
        return Err(shm_err(reason));
    }

    let attached = conn
        .generate_id()
        .map_err(|e| e.to_string())
        .and_then(|seg| {
            conn.shm_attach(seg, shmid as u32, false)
                .map_err(|e| e.to_string())?
                .check()
                .map_err(|e| e.to_string())?;
            Ok(seg)
        });

    // The segment lives on until both sides detach.
    unsafe {
        libc::shmctl(shmid, libc::IPC_RMID, ptr::null_mut());
    }

    match attached {
        Ok(seg) => Ok(Segment {
            seg,
            addr: addr as *mut u8,
            len,
        }),
        Err(reason) => {
            unsafe {
                libc::shmdt(addr);
            }
            Err(shm_err(reason))
        }
    }
}
