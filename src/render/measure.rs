//! Text measurement for label layout.

use crate::core::config::RenderConfig;

/// Size of a rendered piece of text
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextSize {
    /// Advance width
    pub width: f64,
    /// Line height
    pub height: f64,
}

/// Measures label text so bubbles and boxes can be sized around it
pub trait TextMeasurer {
    /// Size of `text` on a single line
    fn measure(&self, text: &str) -> TextSize;
}

/// Fixed advance per character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    char_width: f64,
    line_height: f64,
}

impl MonospaceMeasurer {
    /// Measurer with explicit metrics
    pub fn new(char_width: f64, line_height: f64) -> Self {
        Self {
            char_width,
            line_height,
        }
    }

    /// Measurer using the render configuration metrics
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.char_width, config.line_height)
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str) -> TextSize {
        if text.is_empty() {
            return TextSize::default();
        }
        TextSize {
            width: text.chars().count() as f64 * self.char_width,
            height: self.line_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_counts_chars_not_bytes() {
        let measurer = MonospaceMeasurer::new(7.0, 14.0);
        assert_eq!(measurer.measure("250ms").width, 35.0);
        assert_eq!(measurer.measure("µs").width, 14.0);
        assert_eq!(measurer.measure("").height, 0.0);
    }
}
