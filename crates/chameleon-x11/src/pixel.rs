//! Reading pixels and key codes out of raw protocol replies.

use chameleon_core::RawPixel;
use x11rb::protocol::xproto::{ImageOrder, Keycode, Keysym};

/// Keysym of the Escape key.
pub const XK_ESCAPE: Keysym = 0xff1b;

/// Extract the first pixel of a Z-pixmap image.
///
/// `bits_per_pixel` comes from the pixmap format matching `depth`; only
/// the low `depth` bits of the pixel carry color.
pub fn pixel_from_image(data: &[u8], depth: u8, bits_per_pixel: u8, order: ImageOrder) -> RawPixel {
    let bytes = usize::from(bits_per_pixel).div_ceil(8).min(4).min(data.len());
    let data = &data[..bytes];
    let value = if order == ImageOrder::MSB_FIRST {
        data.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    } else {
        data.iter().rev().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    };
    let value = if depth >= 32 { value } else { value & ((1u32 << depth) - 1) };
    RawPixel::new(value, depth)
}

/// Key codes that produce `keysym` in a keyboard mapping starting at
/// `min_keycode`.
pub fn keycodes_for(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: &[Keysym], keysym: Keysym) -> Vec<Keycode> {
    if keysyms_per_keycode == 0 {
        return Vec::new();
    }
    keysyms
        .chunks(usize::from(keysyms_per_keycode))
        .enumerate()
        .filter(|(_, syms)| syms.contains(&keysym))
        .filter_map(|(i, _)| u8::try_from(i).ok().and_then(|i| min_keycode.checked_add(i)))
        .collect()
}
