// 2D drawing surface used by the comparative diagram

use std::fmt::Write as _;

/// Minimum backing resolution (device pixels)
pub const MIN_BACKING_WIDTH: u32 = 320;
pub const MIN_BACKING_HEIGHT: u32 = 220;

const BACKGROUND: &str = "#111827";

/// Immediate-mode canvas in device pixels
pub trait Canvas2d {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn pixel_ratio(&self) -> f64;
    fn clear(&mut self);
    fn stroke_circle(&mut self, cx: f64, cy: f64, r: f64, line_width: f64, color: &str);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_px: f64, color: &str);
}

/// Layout size of the canvas element and the display density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub css_width: f64,
    pub css_height: f64,
    pub pixel_ratio: f64,
}

impl CanvasSize {
    pub fn new(css_width: f64, css_height: f64, pixel_ratio: f64) -> Self {
        Self {
            css_width,
            css_height,
            pixel_ratio,
        }
    }

    /// Non-finite or non-positive ratios count as 1
    pub fn ratio(&self) -> f64 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        }
    }

    /// Device-pixel resolution so strokes stay crisp on dense displays
    pub fn backing(&self) -> (u32, u32) {
        let dpr = self.ratio();
        let scaled = |css: f64| {
            let px = (css * dpr).round();
            if px.is_finite() && px > 0.0 {
                px as u32
            } else {
                0
            }
        };
        (
            scaled(self.css_width).max(MIN_BACKING_WIDTH),
            scaled(self.css_height).max(MIN_BACKING_HEIGHT),
        )
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(640.0, 420.0, 1.0)
    }
}

// =============================================================================
// RECORDING CANVAS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        line_width: f64,
        color: String,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        font_px: f64,
        color: String,
    },
}

/// Keeps the display list; can be replayed or written out as SVG
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingCanvas {
    width: f64,
    height: f64,
    pixel_ratio: f64,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(size: CanvasSize) -> Self {
        let (w, h) = size.backing();
        Self {
            width: w as f64,
            height: h as f64,
            pixel_ratio: size.ratio(),
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Stroked circles in drawing order as `(radius, color)`
    pub fn circles(&self) -> Vec<(f64, &str)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Circle { r, color, .. } => Some((*r, color.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn replay(&self, target: &mut dyn Canvas2d) {
        target.clear();
        for op in &self.ops {
            match op {
                DrawOp::Circle {
                    cx,
                    cy,
                    r,
                    line_width,
                    color,
                } => target.stroke_circle(*cx, *cy, *r, *line_width, color),
                DrawOp::Rect { x, y, w, h, color } => target.fill_rect(*x, *y, *w, *h, color),
                DrawOp::Text {
                    text,
                    x,
                    y,
                    font_px,
                    color,
                } => target.fill_text(text, *x, *y, *font_px, color),
            }
        }
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(
            svg,
            r#"  <rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            self.width, self.height, BACKGROUND
        );
        for op in &self.ops {
            let _ = match op {
                DrawOp::Circle {
                    cx,
                    cy,
                    r,
                    line_width,
                    color,
                } => writeln!(
                    svg,
                    r#"  <circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                    cx, cy, r, color, line_width
                ),
                DrawOp::Rect { x, y, w, h, color } => writeln!(
                    svg,
                    r#"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
                    x, y, w, h, color
                ),
                DrawOp::Text {
                    text,
                    x,
                    y,
                    font_px,
                    color,
                } => writeln!(
                    svg,
                    r#"  <text x="{:.2}" y="{:.2}" font-size="{}" font-family="system-ui, Arial" fill="{}">{}</text>"#,
                    x,
                    y,
                    font_px,
                    color,
                    escape_xml(text)
                ),
            };
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Canvas2d for RecordingCanvas {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn clear(&mut self) {
        self.ops.clear();
    }

    fn stroke_circle(&mut self, cx: f64, cy: f64, r: f64, line_width: f64, color: &str) {
        self.ops.push(DrawOp::Circle {
            cx,
            cy,
            r,
            line_width,
            color: color.to_string(),
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            color: color.to_string(),
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_px: f64, color: &str) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font_px,
            color: color.to_string(),
        });
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
