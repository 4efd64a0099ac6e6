//! Preview swatches: small borderless windows following the pointer.

use crate::Result;
use chameleon_core::{Rgb, adjust_brightness};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ChangeGCAux, ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask, Gcontext,
    Rectangle, StackMode, Window, WindowClass,
};

/// Border brightness change relative to the swatch color, in percent.
const BORDER_CONTRAST: f64 = 45.0;

/// Geometry shared by all swatches, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwatchLayout {
    /// Distance between the pointer and the first swatch.
    pub margin: u16,
    /// Distance between consecutive swatches.
    pub separator: u16,
    pub size: u16,
    pub border: u16,
}

impl Default for SwatchLayout {
    fn default() -> Self {
        Self {
            margin: 50,
            separator: 20,
            size: 30,
            border: 4,
        }
    }
}

impl SwatchLayout {
    /// Distance from the pointer to the center of the swatch in `slot`.
    ///
    /// Slot 0 is the live preview, completed picks follow outwards.
    pub fn distance(&self, slot: usize) -> f64 {
        let step = f64::from(self.size) + f64::from(self.separator);
        slot as f64 * step + f64::from(self.margin) + f64::from(self.size / 2)
    }
}

/// Offset from the pointer to a swatch center `distance` pixels away.
///
/// Swatches are placed on the line from the pointer towards the screen
/// center, so they stay visible near the edges.
pub fn swatch_offset(pointer: (i16, i16), screen: (u16, u16), distance: f64) -> (i32, i32) {
    let dx = f64::from(pointer.0) - f64::from(screen.0) / 2.0;
    let dy = f64::from(pointer.1) - f64::from(screen.1) / 2.0;
    let angle = dy.atan2(-dx);
    ((distance * angle.cos()) as i32, (distance * -angle.sin()) as i32)
}

/// The four border strips of a `size` square swatch.
pub fn border_rects(size: u16, border: u16) -> [Rectangle; 4] {
    let border = border.min(size);
    let far = i16::try_from(size - border).unwrap_or(i16::MAX);
    [
        Rectangle { x: 0, y: 0, width: border, height: size },
        Rectangle { x: 0, y: 0, width: size, height: border },
        Rectangle { x: far, y: 0, width: border, height: size },
        Rectangle { x: 0, y: far, width: size, height: border },
    ]
}

/// Pixel value of `rgb` on a true color visual.
fn pixel(rgb: Rgb) -> u32 {
    0xff00_0000 | rgb.to_packed()
}

/// One swatch window. Call [`Swatch::destroy`] to free its resources.
#[derive(Debug)]
pub struct Swatch {
    window: Window,
    gc: Gcontext,
    slot: usize,
    color: Rgb,
}

impl Swatch {
    pub fn create<C: Connection>(conn: &C, root: Window, slot: usize, color: Rgb, layout: &SwatchLayout) -> Result<Self> {
        let window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            layout.size,
            layout.size,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1).event_mask(EventMask::EXPOSURE),
        )?;
        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new().foreground(pixel(color)))?;
        conn.map_window(window)?;
        log::debug!("Created swatch {} for slot {}", window, slot);
        Ok(Self { window, gc, slot, color })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn set_color<C: Connection>(&mut self, conn: &C, color: Rgb, layout: &SwatchLayout) -> Result<()> {
        self.color = color;
        self.draw(conn, layout)
    }

    pub fn draw<C: Connection>(&self, conn: &C, layout: &SwatchLayout) -> Result<()> {
        let size = layout.size;
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(pixel(self.color)))?;
        conn.poly_fill_rectangle(self.window, self.gc, &[Rectangle { x: 0, y: 0, width: size, height: size }])?;
        let border = adjust_brightness(BORDER_CONTRAST, self.color);
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(pixel(border)))?;
        conn.poly_fill_rectangle(self.window, self.gc, &border_rects(size, layout.border))?;
        Ok(())
    }

    /// Place the swatch relative to the pointer and keep it on top.
    pub fn follow<C: Connection>(
        &self,
        conn: &C,
        pointer: (i16, i16),
        screen: (u16, u16),
        layout: &SwatchLayout,
    ) -> Result<()> {
        let (dx, dy) = swatch_offset(pointer, screen, layout.distance(self.slot));
        let half = i32::from(layout.size / 2);
        let aux = ConfigureWindowAux::new()
            .x(i32::from(pointer.0) - half + dx)
            .y(i32::from(pointer.1) - half + dy)
            .stack_mode(StackMode::ABOVE);
        conn.configure_window(self.window, &aux)?;
        Ok(())
    }

    pub fn destroy<C: Connection>(self, conn: &C) -> Result<()> {
        conn.free_gc(self.gc)?;
        conn.destroy_window(self.window)?;
        Ok(())
    }
}
