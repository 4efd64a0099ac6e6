//! X11 backend for chameleon.
//!
//! [`X11Source`] grabs the pointer with a crosshair cursor, samples the
//! pixel under it and shows the live and picked colors in small swatches
//! next to the cursor.

mod pixel;
mod swatch;

pub use pixel::{XK_ESCAPE, keycodes_for, pixel_from_image};
pub use swatch::{SwatchLayout, border_rects, swatch_offset};

use chameleon_core::{PickError, PointerEvent, PointerSource, RawPixel, Rgb};
use swatch::Swatch;
use thiserror::Error;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    ConnectionExt as _, Cursor, EventMask, Font, GrabMode, GrabStatus, ImageFormat, Keycode, Window,
};
use x11rb::rust_connection::RustConnection;

/// Glyph of the crosshair in the standard cursor font.
const XC_TCROSS: u16 = 130;

const BUTTON_LEFT: u8 = 1;
const BUTTON_RIGHT: u8 = 3;

/// X11 backend errors.
#[derive(Debug, Error)]
pub enum X11Error {
    #[error("Cannot open display: {0}")]
    Connect(#[from] ConnectError),
    #[error("Connection to the X server failed: {0}")]
    Connection(#[from] ConnectionError),
    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),
    #[error("X resource allocation failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),
    #[error("Could not grab the {device}: {status:?}")]
    Grab { device: &'static str, status: GrabStatus },
    #[error("No pixmap format for depth {0}")]
    PixmapFormat(u8),
}

/// Result type for X11 operations.
pub type Result<T> = std::result::Result<T, X11Error>;

impl From<X11Error> for PickError {
    fn from(err: X11Error) -> Self {
        PickError::Backend(err.to_string())
    }
}

/// Pointer source backed by an X server connection.
pub struct X11Source {
    conn: RustConnection,
    root: Window,
    screen_size: (u16, u16),
    font: Font,
    cursor: Cursor,
    escape: Vec<Keycode>,
    layout: SwatchLayout,
    pointer: (i16, i16),
    live: Option<Swatch>,
    picked: Vec<Swatch>,
    grabbed: bool,
}

impl X11Source {
    /// Connect to `display`, or `$DISPLAY` when `None`.
    pub fn connect(display: Option<&str>, layout: SwatchLayout) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_size = (screen.width_in_pixels, screen.height_in_pixels);
        log::info!(
            "Connected to screen {} ({}x{}, depth {})",
            screen_num,
            screen_size.0,
            screen_size.1,
            screen.root_depth
        );

        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;
        let cursor = conn.generate_id()?;
        conn.create_glyph_cursor(cursor, font, font, XC_TCROSS, XC_TCROSS + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)?;

        let escape = Self::escape_keycodes(&conn)?;
        if escape.is_empty() {
            log::warn!("No key code maps to Escape, use the right mouse button to cancel");
        }

        Ok(Self {
            conn,
            root,
            screen_size,
            font,
            cursor,
            escape,
            layout,
            pointer: (0, 0),
            live: None,
            picked: Vec::new(),
            grabbed: false,
        })
    }

    fn escape_keycodes(conn: &RustConnection) -> Result<Vec<Keycode>> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let mapping = conn.get_keyboard_mapping(min, max.saturating_sub(min).saturating_add(1))?.reply()?;
        Ok(keycodes_for(min, mapping.keysyms_per_keycode, &mapping.keysyms, XK_ESCAPE))
    }

    /// Read the pixel at root coordinates `(x, y)`.
    pub fn sample(&self, x: i16, y: i16) -> Result<RawPixel> {
        let image = self.conn.get_image(ImageFormat::Z_PIXMAP, self.root, x, y, 1, 1, !0)?.reply()?;
        let setup = self.conn.setup();
        let format = setup
            .pixmap_formats
            .iter()
            .find(|f| f.depth == image.depth)
            .ok_or(X11Error::PixmapFormat(image.depth))?;
        Ok(pixel_from_image(&image.data, image.depth, format.bits_per_pixel, setup.image_byte_order))
    }

    /// Swatches currently on screen, live preview first.
    fn swatches(&self) -> impl Iterator<Item = &Swatch> {
        self.live.iter().chain(self.picked.iter())
    }

    fn follow_pointer(&self) -> Result<()> {
        for swatch in self.swatches() {
            swatch.follow(&self.conn, self.pointer, self.screen_size, &self.layout)?;
        }
        Ok(())
    }

    fn redraw(&self, window: Window) -> Result<()> {
        if let Some(swatch) = self.swatches().find(|s| s.window() == window) {
            swatch.draw(&self.conn, &self.layout)?;
        }
        Ok(())
    }

    fn show_preview(&mut self, color: Rgb) -> Result<()> {
        match &mut self.live {
            Some(swatch) => swatch.set_color(&self.conn, color, &self.layout)?,
            None => {
                let swatch = Swatch::create(&self.conn, self.root, 0, color, &self.layout)?;
                swatch.follow(&self.conn, self.pointer, self.screen_size, &self.layout)?;
                self.live = Some(swatch);
            }
        }
        self.conn.flush()?;
        Ok(())
    }

    fn add_picked(&mut self, color: Rgb) -> Result<()> {
        let slot = self.picked.len() + 1;
        let swatch = Swatch::create(&self.conn, self.root, slot, color, &self.layout)?;
        swatch.follow(&self.conn, self.pointer, self.screen_size, &self.layout)?;
        self.picked.push(swatch);
        self.conn.flush()?;
        Ok(())
    }

    fn try_grab(&mut self) -> Result<()> {
        let mask = EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE;
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                self.cursor,
                x11rb::CURRENT_TIME,
            )?
            .reply()?;
        if reply.status != GrabStatus::SUCCESS {
            return Err(X11Error::Grab {
                device: "pointer",
                status: reply.status,
            });
        }
        self.grabbed = true;

        let reply = self
            .conn
            .grab_keyboard(false, self.root, x11rb::CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        if reply.status != GrabStatus::SUCCESS {
            log::warn!("Could not grab the keyboard ({:?}), Escape will not cancel", reply.status);
        }
        self.conn.flush()?;
        Ok(())
    }

    fn try_release(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    fn wait_event(&mut self) -> Result<PointerEvent> {
        loop {
            match self.conn.wait_for_event()? {
                Event::MotionNotify(event) => {
                    self.pointer = (event.root_x, event.root_y);
                    self.follow_pointer()?;
                    return Ok(PointerEvent::Hover(self.sample(event.root_x, event.root_y)?));
                }
                Event::ButtonPress(event) if event.detail == BUTTON_LEFT => {
                    self.pointer = (event.root_x, event.root_y);
                    return Ok(PointerEvent::Click(self.sample(event.root_x, event.root_y)?));
                }
                Event::ButtonPress(event) if event.detail == BUTTON_RIGHT => return Ok(PointerEvent::Cancel),
                Event::KeyPress(event) if self.escape.contains(&event.detail) => return Ok(PointerEvent::Cancel),
                Event::Expose(event) if event.count == 0 => self.redraw(event.window)?,
                Event::Error(err) => log::warn!("X error: {:?}", err),
                event => log::trace!("Ignoring event {:?}", event),
            }
        }
    }
}

impl PointerSource for X11Source {
    fn grab(&mut self) -> std::result::Result<(), PickError> {
        self.try_grab().map_err(PickError::from)
    }

    fn next_event(&mut self) -> std::result::Result<PointerEvent, PickError> {
        self.wait_event().map_err(PickError::from)
    }

    fn release(&mut self) {
        if !self.grabbed {
            return;
        }
        self.grabbed = false;
        if let Err(err) = self.try_release() {
            log::warn!("Failed to release the pointer: {}", err);
        }
    }

    fn preview(&mut self, color: Rgb) {
        if let Err(err) = self.show_preview(color) {
            log::warn!("Failed to show preview: {}", err);
        }
    }

    fn selected(&mut self, color: Rgb) {
        if let Err(err) = self.add_picked(color) {
            log::warn!("Failed to show picked color: {}", err);
        }
    }
}

impl Drop for X11Source {
    fn drop(&mut self) {
        self.release();
        for swatch in self.live.take().into_iter().chain(self.picked.drain(..)) {
            if let Err(err) = swatch.destroy(&self.conn) {
                log::debug!("Failed to destroy swatch: {}", err);
            }
        }
        let _ = self.conn.free_cursor(self.cursor);
        let _ = self.conn.close_font(self.font);
        let _ = self.conn.flush();
    }
}
