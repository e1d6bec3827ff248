//! Teaser artwork: per-theme background and centred text placement.
//!
//! Only the geometry is computed here; drawing is left to the host.

use crate::capsule::{Capsule, Theme};

const DEFAULT_FONT_SIZE: f32 = 24.0;
const FALLBACK_LINE: &str = "Default Line";

/// Image the teaser text is drawn over.
pub fn teaser_asset_path(theme: Option<Theme>) -> String {
    let name = theme.map_or_else(|| "default".to_owned(), Theme::slug);
    format!("/assets/teaser/{name}.jpg")
}

/// Lines drawn on a capsule's teaser image.
pub fn teaser_lines(capsule: &Capsule) -> Vec<String> {
    vec![
        capsule.title.clone(),
        format!("by u/{}", capsule.author_or_anonymous()),
        format!("Revealed on {}", capsule.reveal_date_string()),
    ]
}

/// Where one line of text goes. `x` is the horizontal centre.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub x: f32,
    /// Baseline.
    pub y: f32,
    /// Top edge of the glyph box.
    pub top: f32,
    pub font_size: f32,
}

/// Vertically centred text block over an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeaserLayout {
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

impl TeaserLayout {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            font_size: DEFAULT_FONT_SIZE,
        }
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    fn line_height(&self) -> f32 {
        self.font_size * 1.5
    }

    fn ascent(&self) -> f32 {
        0.8 * self.font_size
    }

    fn descent(&self) -> f32 {
        0.2 * self.font_size
    }

    /// Height of the whole block from the first ascent to the last descent.
    pub fn block_height(&self, lines: usize) -> f32 {
        let gaps = lines.saturating_sub(1) as f32;
        gaps * self.line_height() + self.ascent() + self.descent()
    }

    /// Place `lines` centred on the image. An empty input places one
    /// placeholder line.
    pub fn place<S: AsRef<str>>(&self, lines: &[S]) -> Vec<TextPlacement> {
        let texts: Vec<&str> = if lines.is_empty() {
            vec![FALLBACK_LINE]
        } else {
            lines.iter().map(|l| l.as_ref()).collect()
        };

        let start_y = (self.height - self.block_height(texts.len())) / 2.0 + self.ascent();
        let x = self.width / 2.0;
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let y = start_y + i as f32 * self.line_height();
                TextPlacement {
                    text: text.to_owned(),
                    x,
                    y,
                    top: y - self.ascent(),
                    font_size: self.font_size,
                }
            })
            .collect()
    }
}
