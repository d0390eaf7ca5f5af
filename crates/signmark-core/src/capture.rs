//! Mark capture: the ink pad and the text pad
//!
//! Both pads are scratch state owned by an open editor. Nothing reaches the
//! annotation set until the session commits a save; cancelling just drops
//! the pad.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::config::InkConfig;
use crate::error::ExportError;
use crate::raster::{decode_png, encode_png, to_data_uri, DataUri};

const INK: [u8; 3] = [0, 0, 0];

/// Drawing surface for signatures and initials
#[derive(Debug, Clone)]
pub struct InkPad {
    raster: RgbaImage,
    stroke_width: f64,
    /// Last pen position while the pointer is pressed
    pen: Option<(f64, f64)>,
    has_drawn: bool,
}

impl InkPad {
    pub fn new(config: &InkConfig) -> Self {
        Self {
            raster: RgbaImage::new(config.canvas_width, config.canvas_height),
            stroke_width: config.stroke_width,
            pen: None,
            has_drawn: false,
        }
    }

    /// Open the pad pre-loaded with a previously saved PNG, scaled to fill
    /// the canvas. The pad counts as drawn.
    pub fn with_prior(config: &InkConfig, prior: &str) -> Result<Self, ExportError> {
        let uri = DataUri::parse(prior)?;
        let prior = decode_png(&uri.bytes)?;
        let mut pad = Self::new(config);
        pad.raster = imageops::resize(
            &prior,
            config.canvas_width,
            config.canvas_height,
            FilterType::Triangle,
        );
        pad.has_drawn = true;
        Ok(pad)
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn is_pressed(&self) -> bool {
        self.pen.is_some()
    }

    /// Start a stroke at canvas-local pixel coordinates
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.pen = Some((x, y));
    }

    /// Extend the current stroke. Ignored unless the pointer is pressed.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some(from) = self.pen else {
            return;
        };
        self.stroke_segment(from, (x, y));
        self.pen = Some((x, y));
        self.has_drawn = true;
    }

    /// Pointer released or left the canvas
    pub fn pointer_up(&mut self) {
        self.pen = None;
    }

    pub fn clear(&mut self) {
        self.raster = RgbaImage::new(self.raster.width(), self.raster.height());
        self.pen = None;
        self.has_drawn = false;
    }

    pub fn can_save(&self) -> bool {
        self.has_drawn
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Encode the canvas as a `data:image/png;base64,...` URI
    pub fn save(&self) -> Result<String, ExportError> {
        let png = encode_png(&self.raster)?;
        Ok(to_data_uri("image/png", &png))
    }

    /// Stamp a round-capped segment with a one pixel antialiased edge
    fn stroke_segment(&mut self, from: (f64, f64), to: (f64, f64)) {
        let radius = self.stroke_width / 2.0;
        let reach = radius + 1.0;
        let (w, h) = (self.raster.width() as f64, self.raster.height() as f64);

        let min_x = (from.0.min(to.0) - reach).floor().max(0.0);
        let max_x = (from.0.max(to.0) + reach).ceil().min(w - 1.0);
        let min_y = (from.1.min(to.1) - reach).floor().max(0.0);
        let max_y = (from.1.max(to.1) + reach).ceil().min(h - 1.0);
        if min_x > max_x || min_y > max_y {
            return;
        }

        for py in min_y as u32..=max_y as u32 {
            for px in min_x as u32..=max_x as u32 {
                let centre = (px as f64 + 0.5, py as f64 + 0.5);
                let distance = distance_to_segment(centre, from, to);
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let alpha = (coverage * 255.0).round() as u8;
                let existing = self.raster.get_pixel(px, py)[3];
                if alpha > existing {
                    self.raster
                        .put_pixel(px, py, Rgba([INK[0], INK[1], INK[2], alpha]));
                }
            }
        }
    }
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// What an Enter keypress did in the text pad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterKey {
    /// Shift+Enter: a newline was inserted
    Newline,
    /// Plain Enter with savable text: commit
    Commit,
    /// Plain Enter on blank text: nothing happens
    Ignored,
}

/// Multi-line text editor state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPad {
    text: String,
}

impl TextPad {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: initial.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn can_save(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn enter(&mut self, shift: bool) -> EnterKey {
        if shift {
            self.text.push('\n');
            EnterKey::Newline
        } else if self.can_save() {
            EnterKey::Commit
        } else {
            EnterKey::Ignored
        }
    }
}
