//! Interactive selection of screen colors.
//!
//! The [`SelectionDriver`] runs a fixed number of picks against a
//! [`PointerSource`], converting and formatting each picked color.

use crate::color::{Color, DecodeError, RawPixel, Rgb, decode};
use crate::expr::{CompiledExpression, Environment, ExprError};
use crate::format::{FormatError, Template};
use std::io::Write;
use thiserror::Error;

/// Errors ending a selection run.
#[derive(Debug, Error)]
pub enum PickError {
    #[error("Selection cancelled")]
    Cancelled,
    #[error("Pointer source error: {0}")]
    Backend(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pointer event while the pointer is grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// The pointer moved over this pixel.
    Hover(RawPixel),
    /// The pixel under the pointer was clicked.
    Click(RawPixel),
    /// The user aborted the selection.
    Cancel,
}

/// Source of pointer input, usually the display server.
pub trait PointerSource {
    /// Take exclusive control of the pointer.
    fn grab(&mut self) -> Result<(), PickError>;

    /// Block until the next relevant event.
    fn next_event(&mut self) -> Result<PointerEvent, PickError>;

    /// Give the pointer back. Must be safe to call when not grabbed.
    fn release(&mut self);

    /// Show the color the pointer is currently over.
    fn preview(&mut self, _color: Rgb) {}

    /// A pick completed with this color.
    fn selected(&mut self, _color: Rgb) {}
}

/// Holds the pointer grab for as long as it lives.
pub struct GrabGuard<'a, S: PointerSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: PointerSource + ?Sized> GrabGuard<'a, S> {
    pub fn acquire(source: &'a mut S) -> Result<Self, PickError> {
        source.grab()?;
        log::trace!("Pointer grabbed");
        Ok(Self { source })
    }

    pub fn source(&mut self) -> &mut S {
        &mut *self.source
    }
}

impl<S: PointerSource + ?Sized> Drop for GrabGuard<'_, S> {
    fn drop(&mut self) {
        self.source.release();
        log::trace!("Pointer released");
    }
}

/// One completed pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// 1-based position in the run.
    pub index: usize,
    pub color: Rgb,
}

/// Runs `count` picks and writes one formatted line per pick.
///
/// Reference colors are the seed colors followed by earlier selections. The
/// conversion is applied to every pick, except while the expression reads a
/// reference index that does not exist yet: `hls(h, l1, s)` without seeds
/// reports the first pick as sampled.
#[derive(Debug, Clone)]
pub struct SelectionDriver {
    count: usize,
    template: Template,
    conversion: Option<CompiledExpression>,
    seeds: Vec<Rgb>,
}

impl SelectionDriver {
    pub fn new(count: usize, template: Template, conversion: Option<CompiledExpression>, seeds: Vec<Rgb>) -> Self {
        Self {
            count,
            template,
            conversion,
            seeds,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Run all picks, streaming each line to `out` as soon as it is known.
    ///
    /// Lines of picks completed before an error have already been written.
    pub fn run<S, W>(&self, source: &mut S, out: &mut W) -> Result<Vec<Selection>, PickError>
    where
        S: PointerSource + ?Sized,
        W: Write + ?Sized,
    {
        let mut history: Vec<Selection> = Vec::with_capacity(self.count);

        for index in 1..=self.count {
            log::debug!("Awaiting pick {}/{}", index, self.count);
            let color = self.await_pick(source, &history)?;

            let line = self.template.render(&Color::from_rgb(color))?;
            writeln!(out, "{}", line)?;
            out.flush()?;

            log::info!("Pick {}/{}: {}", index, self.count, color);
            source.selected(color);
            history.push(Selection { index, color });
        }

        Ok(history)
    }

    fn await_pick<S>(&self, source: &mut S, history: &[Selection]) -> Result<Rgb, PickError>
    where
        S: PointerSource + ?Sized,
    {
        let mut guard = GrabGuard::acquire(source)?;
        loop {
            match guard.source().next_event()? {
                PointerEvent::Hover(raw) => {
                    let color = self.resolve(raw, history)?;
                    guard.source().preview(color);
                }
                PointerEvent::Click(raw) => return self.resolve(raw, history),
                PointerEvent::Cancel => {
                    log::info!("Selection cancelled by user");
                    return Err(PickError::Cancelled);
                }
            }
        }
    }

    /// Decode a sampled pixel and apply the conversion once every reference
    /// it reads is available.
    pub fn resolve(&self, raw: RawPixel, history: &[Selection]) -> Result<Rgb, PickError> {
        let sample = decode(raw)?;
        let Some(expr) = &self.conversion else {
            return Ok(sample);
        };
        let references: Vec<Rgb> = self.seeds.iter().copied().chain(history.iter().map(|s| s.color)).collect();
        if expr.references() > references.len() {
            return Ok(sample);
        }
        let env = Environment::for_sample(sample, &references, expr.spaces());
        log::trace!("{} variables bound", env.len());
        let color = expr.apply(&env)?;
        log::trace!("{} -> {}", sample, color);
        Ok(color.to_rgb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorSpace;
    use crate::expr::parse;
    use std::collections::VecDeque;

    /// Replays a fixed list of events.
    #[derive(Default)]
    struct ScriptedSource {
        events: VecDeque<PointerEvent>,
        grabbed: bool,
        grabs: usize,
        previews: Vec<Rgb>,
        selected: Vec<Rgb>,
    }

    impl ScriptedSource {
        fn new(events: impl IntoIterator<Item = PointerEvent>) -> Self {
            Self {
                events: events.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl PointerSource for ScriptedSource {
        fn grab(&mut self) -> Result<(), PickError> {
            assert!(!self.grabbed, "grabbed twice");
            self.grabbed = true;
            self.grabs += 1;
            Ok(())
        }

        fn next_event(&mut self) -> Result<PointerEvent, PickError> {
            assert!(self.grabbed, "event read without grab");
            self.events
                .pop_front()
                .ok_or_else(|| PickError::Backend("out of events".to_string()))
        }

        fn release(&mut self) {
            self.grabbed = false;
        }

        fn preview(&mut self, color: Rgb) {
            self.previews.push(color);
        }

        fn selected(&mut self, color: Rgb) {
            self.selected.push(color);
        }
    }

    fn click(packed: u32) -> PointerEvent {
        PointerEvent::Click(RawPixel::new(packed, 24))
    }

    fn hover(packed: u32) -> PointerEvent {
        PointerEvent::Hover(RawPixel::new(packed, 24))
    }

    fn driver(count: usize, conversion: Option<&str>, seeds: Vec<Rgb>) -> SelectionDriver {
        let conversion = conversion.map(|source| parse(source).unwrap());
        SelectionDriver::new(count, Template::default(), conversion, seeds)
    }

    fn lightness(rgb: Rgb) -> f64 {
        Color::from_rgb(rgb).convert(ColorSpace::Hls).channels()[1]
    }

    #[test]
    fn test_same_lightness_as_first_pick() {
        let mut source = ScriptedSource::new([click(0xc8c8c8), click(0xff0000), click(0x0000ff)]);
        let mut out: Vec<u8> = Vec::new();
        let picks = driver(3, Some("hls(h, l1, s)"), vec![]).run(&mut source, &mut out).unwrap();

        assert_eq!(picks.len(), 3);
        assert_eq!(picks[0].color, Rgb::new(200, 200, 200));
        for pick in &picks[1..] {
            assert!((lightness(pick.color) - lightness(picks[0].color)).abs() < 0.01);
        }
        assert_eq!(String::from_utf8(out).unwrap(), "#c8c8c8\n#ff9191\n#9191ff\n");
        assert_eq!(source.selected, picks.iter().map(|p| p.color).collect::<Vec<_>>());
        assert_eq!(source.grabs, 3);
        assert!(!source.grabbed);
    }

    #[test]
    fn test_cancel_releases_grab() {
        let mut source = ScriptedSource::new([click(0xff0000), PointerEvent::Cancel]);
        let mut out: Vec<u8> = Vec::new();
        let result = driver(3, None, vec![]).run(&mut source, &mut out);

        assert!(matches!(result, Err(PickError::Cancelled)));
        assert!(!source.grabbed);
        assert_eq!(source.grabs, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "#ff0000\n");
    }

    #[test]
    fn test_expression_error_releases_grab() {
        let mut source = ScriptedSource::new([click(0xff0000)]);
        let mut out: Vec<u8> = Vec::new();
        let result = driver(1, Some("hls(acos(2), l, s)"), vec![Rgb::BLACK]).run(&mut source, &mut out);

        assert!(matches!(result, Err(PickError::Expr(ExprError::Domain(_)))));
        assert!(!source.grabbed);
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_error() {
        let mut source = ScriptedSource::new([PointerEvent::Click(RawPixel::new(0x12, 8))]);
        let result = driver(1, None, vec![]).run(&mut source, &mut Vec::<u8>::new());
        assert!(matches!(result, Err(PickError::Decode(DecodeError::UnsupportedDepth(8)))));
        assert!(!source.grabbed);
    }

    #[test]
    fn test_seeds_convert_every_pick() {
        let mut source = ScriptedSource::new([click(0xff0000)]);
        let mut out: Vec<u8> = Vec::new();
        let picks = driver(1, Some("hls(h, l1, s)"), vec![Rgb::new(200, 200, 200)])
            .run(&mut source, &mut out)
            .unwrap();
        assert_eq!(picks[0].color, Rgb::new(255, 145, 145));
        assert_eq!(String::from_utf8(out).unwrap(), "#ff9191\n");
    }

    #[test]
    fn test_raw_until_references_exist() {
        let mut source = ScriptedSource::new([click(0x336699), click(0xffffff), click(0x000000)]);
        let mut out: Vec<u8> = Vec::new();
        let picks = driver(3, Some("rgb(r2, g2, b2)"), vec![]).run(&mut source, &mut out).unwrap();
        assert_eq!(picks[0].color, Rgb::new(0x33, 0x66, 0x99));
        assert_eq!(picks[1].color, Rgb::new(255, 255, 255));
        assert_eq!(picks[2].color, Rgb::new(255, 255, 255));
        assert_eq!(String::from_utf8(out).unwrap(), "#336699
#ffffff
#ffffff
");
    }

    #[test]
    fn test_self_contained_expression_converts_every_pick() {
        let mut source = ScriptedSource::new([click(0xff0000), click(0xff0000)]);
        let mut out: Vec<u8> = Vec::new();
        driver(2, Some("rgb(255 - r, 255 - g, 255 - b)"), vec![])
            .run(&mut source, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "#00ffff
#00ffff
");
    }

    #[test]
    fn test_constructor_space_differs_from_channels() {
        let mut source = ScriptedSource::new([hover(0x0000ff), click(0x0000ff)]);
        let mut out: Vec<u8> = Vec::new();
        let picks = driver(1, Some("rgb(h, l * 255, s * 255)"), vec![])
            .run(&mut source, &mut out)
            .unwrap();
        assert_eq!(source.previews, vec![Rgb::new(240, 128, 255)]);
        assert_eq!(picks[0].color, Rgb::new(240, 128, 255));
        assert_eq!(String::from_utf8(out).unwrap(), "#f080ff
");
    }

    #[test]
    fn test_hover_previews() {
        let mut source = ScriptedSource::new([hover(0xff0000), hover(0x00ff00), click(0x0000ff)]);
        let picks = driver(1, None, vec![]).run(&mut source, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(source.previews, vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0)]);
        assert_eq!(source.selected, vec![Rgb::new(0, 0, 255)]);
        assert_eq!(picks, vec![Selection { index: 1, color: Rgb::new(0, 0, 255) }]);
    }

    #[test]
    fn test_previews_are_converted() {
        let mut source = ScriptedSource::new([hover(0x00ff00), click(0x00ff00)]);
        let picks = driver(1, Some("rgb(r1, g, b)"), vec![Rgb::new(9, 0, 0)])
            .run(&mut source, &mut Vec::<u8>::new())
            .unwrap();
        assert_eq!(source.previews, vec![Rgb::new(9, 255, 0)]);
        assert_eq!(picks[0].color, Rgb::new(9, 255, 0));
    }

    #[test]
    fn test_backend_error_releases_grab() {
        let mut source = ScriptedSource::new([]);
        let result = driver(1, None, vec![]).run(&mut source, &mut Vec::<u8>::new());
        assert!(matches!(result, Err(PickError::Backend(_))));
        assert!(!source.grabbed);
    }
}
