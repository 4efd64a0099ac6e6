//! Chameleon Core Library
//!
//! Platform-agnostic color model, conversion expressions, output templates
//! and the pick driver of the chameleon color picker.

pub mod color;
pub mod expr;
pub mod format;
pub mod number;
pub mod pick;

pub use color::{Color, ColorSpace, DecodeError, RawPixel, Rgb, adjust_brightness, decode, parse_hex_list};
pub use expr::{CompiledExpression, Environment, ExprError, Value, evaluate, parse};
pub use format::{FormatError, Template, DEFAULT_TEMPLATE};
pub use number::Number;
pub use pick::{GrabGuard, PickError, PointerEvent, PointerSource, Selection, SelectionDriver};
