//! Variable bindings visible to one evaluation.

use crate::color::{Color, ColorSpace, Rgb};
use crate::number::Number;
use std::collections::HashMap;

/// Immutable set of variables for one evaluation.
///
/// Channel variables follow the letters of their space. The current sample
/// is bound unsuffixed and with index 0 (`h`, `h0`); reference colors are
/// bound with indices starting at 1 (`h1`, `h2`, ...). Constants and
/// functions are not stored here, they come from the builtin table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    variables: HashMap<String, Number>,
}

impl Environment {
    /// Binding order of spaces the expression does not name. HLS comes last
    /// so an unnamed `s` is the HLS saturation, matching `l`.
    pub const FALLBACK_ORDER: [ColorSpace; 4] = [ColorSpace::Rgb, ColorSpace::Yiq, ColorSpace::Hsv, ColorSpace::Hls];

    /// An environment without any variables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind the channels of `current` and `references` in every space.
    ///
    /// Letters shared by two spaces (`h` and `s` in HLS and HSV) take the
    /// value of the space named last in `spaces`. Spaces the expression
    /// does not name are bound first, in [`Environment::FALLBACK_ORDER`], so
    /// `rgb(h, l * 255, s * 255)` still sees the HLS channels.
    pub fn for_sample(current: Rgb, references: &[Rgb], spaces: &[ColorSpace]) -> Self {
        let mut variables = HashMap::new();
        let colors: Vec<Rgb> = std::iter::once(current).chain(references.iter().copied()).collect();

        let unnamed = Self::FALLBACK_ORDER.into_iter().filter(|space| !spaces.contains(space));
        for space in unnamed.chain(spaces.iter().copied()) {
            for (index, rgb) in colors.iter().enumerate() {
                let values = Color::from_rgb(*rgb).convert(space).channel_values();
                for (letter, value) in space.channel_names().into_iter().zip(values) {
                    if index == 0 {
                        variables.insert(letter.to_string(), value);
                    }
                    variables.insert(format!("{}{}", letter, index), value);
                }
            }
        }

        Self { variables }
    }

    pub fn get(&self, name: &str) -> Option<Number> {
        self.variables.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_bindings() {
        let env = Environment::for_sample(Rgb::new(10, 20, 30), &[Rgb::new(1, 2, 3)], &[ColorSpace::Rgb]);
        assert_eq!(env.get("r"), Some(Number::Int(10)));
        assert_eq!(env.get("g0"), Some(Number::Int(20)));
        assert_eq!(env.get("b1"), Some(Number::Int(3)));
        assert_eq!(env.get("r2"), None);
        // r g b y i q h s v l, unsuffixed plus indices 0 and 1.
        assert_eq!(env.len(), 30);
    }

    #[test]
    fn test_unnamed_spaces_are_bound() {
        let env = Environment::for_sample(Rgb::new(255, 0, 0), &[], &[ColorSpace::Rgb]);
        assert_eq!(env.get("l"), Some(Number::Float(0.5)));
        assert_eq!(env.get("v0"), Some(Number::Float(1.0)));
        assert!(env.get("y").is_some());
        assert_eq!(env.get("r"), Some(Number::Int(255)));
    }

    #[test]
    fn test_unnamed_saturation_is_hls() {
        let rgb = Rgb::new(200, 100, 100);
        let named = Environment::for_sample(rgb, &[], &[ColorSpace::Hls]);
        let unnamed = Environment::for_sample(rgb, &[], &[]);
        assert_eq!(named.get("s"), unnamed.get("s"));
    }

    #[test]
    fn test_later_space_wins() {
        let rgb = Rgb::new(200, 100, 100);
        let hsv_last = Environment::for_sample(rgb, &[], &[ColorSpace::Hls, ColorSpace::Hsv]);
        let hls_last = Environment::for_sample(rgb, &[], &[ColorSpace::Hsv, ColorSpace::Hls]);
        let s = |env: &Environment| env.get("s").unwrap().as_f64();
        assert!((s(&hsv_last) - 0.5).abs() < 1e-9);
        assert!((s(&hls_last) - 0.5).abs() > 0.01);
        assert!(hsv_last.get("v").is_some() && hsv_last.get("l").is_some());
    }

    #[test]
    fn test_empty() {
        assert!(Environment::empty().is_empty());
        assert_eq!(Environment::empty().get("r"), None);
    }
}
