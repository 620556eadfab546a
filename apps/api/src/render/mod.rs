//! Off-screen rasterization of redacted document markup.
//!
//! Parses the converter's markup subset back into styled lines, lays them out
//! at a fixed page width, and draws them into a PNG sized to the full content
//! height. Redacted spans become filled black rectangles. Text is drawn with
//! a system TrueType font discovered from well-known paths (overridable via
//! `FONT_PATH`).

use std::io::Cursor;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

const PAGE_WIDTH: u32 = 1240;
const MARGIN: i32 = 60;
const BODY_SCALE: f32 = 28.0;
const H1_SCALE: f32 = 48.0;
const H2_SCALE: f32 = 36.0;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([20, 20, 20, 255]);
const REDACTION: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Paths probed for a usable TrueType font, in order.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable font found; set FONT_PATH to a TrueType font")]
    FontUnavailable,

    #[error("malformed markup: {0}")]
    Markup(#[from] quick_xml::Error),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rendering seam between the pipeline and the rasterizer. Implemented by
/// [`RasterRenderer`]; tests substitute stubs.
pub trait MarkupRenderer: Send + Sync {
    /// Renders the markup at full-page height and returns PNG bytes.
    fn render_png(&self, markup: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct RasterRenderer {
    font: FontVec,
}

impl std::fmt::Debug for RasterRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterRenderer").finish_non_exhaustive()
    }
}

impl RasterRenderer {
    /// Probes the override path, then the well-known locations.
    pub fn from_system_fonts(override_path: Option<&str>) -> Result<Self, RenderError> {
        let candidates = override_path
            .into_iter()
            .chain(FONT_SEARCH_PATHS.iter().copied());
        for path in candidates {
            if let Ok(data) = std::fs::read(path) {
                if let Ok(font) = FontVec::try_from_vec(data) {
                    tracing::debug!(path, "loaded render font");
                    return Ok(Self { font });
                }
            }
        }
        Err(RenderError::FontUnavailable)
    }

    pub fn from_font_bytes(data: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontVec::try_from_vec(data).map_err(|_| RenderError::FontUnavailable)?;
        Ok(Self { font })
    }
}

impl MarkupRenderer for RasterRenderer {
    fn render_png(&self, markup: &str) -> Result<Vec<u8>, RenderError> {
        let lines = parse_markup(markup)?;
        let (ops, height) = layout(&lines, &self.font);

        let mut img = RgbaImage::from_pixel(PAGE_WIDTH, height, BACKGROUND);
        for op in &ops {
            if op.redacted {
                draw_filled_rect_mut(
                    &mut img,
                    Rect::at(op.x, op.y).of_size(op.width.max(1), op.height.max(1)),
                    REDACTION,
                );
            } else {
                draw_text_mut(
                    &mut img,
                    INK,
                    op.x,
                    op.y,
                    PxScale::from(op.scale),
                    &self.font,
                    &op.text,
                );
            }
        }

        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// One block-level line of the markup, with per-span redaction flags.
#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    scale: f32,
    spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq)]
struct Span {
    text: String,
    redacted: bool,
}

/// Parses the converter's markup subset (`div`/`h1`/`h2`/`p`/`strong`/`em`
/// and redaction `span`s) into styled lines.
fn parse_markup(markup: &str) -> Result<Vec<Line>, RenderError> {
    let mut reader = Reader::from_str(markup);
    let mut buf = Vec::new();

    let mut lines = Vec::new();
    let mut current: Option<Line> = None;
    let mut redact_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"h1" => current = Some(Line { scale: H1_SCALE, spans: Vec::new() }),
                b"h2" => current = Some(Line { scale: H2_SCALE, spans: Vec::new() }),
                b"p" => current = Some(Line { scale: BODY_SCALE, spans: Vec::new() }),
                b"span" => {
                    let class = e
                        .attributes()
                        .filter_map(Result::ok)
                        .find(|a| a.key.as_ref() == b"class")
                        .map(|a| String::from_utf8_lossy(&a.value).to_string());
                    if class.as_deref().is_some_and(|c| c.contains("redacted")) {
                        redact_depth += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(line) = current.as_mut() {
                    let text = t.unescape()?.to_string();
                    line.spans.push(Span {
                        text,
                        redacted: redact_depth > 0,
                    });
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"h1" | b"h2" | b"p" => {
                    if let Some(line) = current.take() {
                        lines.push(line);
                    }
                }
                b"span" => redact_depth = redact_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(RenderError::Markup(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(lines)
}

#[derive(Debug)]
struct DrawOp {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    scale: f32,
    text: String,
    redacted: bool,
}

/// Greedy word-wrap layout at the fixed page width. Returns the draw list
/// and the total content height.
fn layout(lines: &[Line], font: &FontVec) -> (Vec<DrawOp>, u32) {
    let max_x = PAGE_WIDTH as i32 - MARGIN;
    let mut ops = Vec::new();
    let mut y = MARGIN;

    for line in lines {
        let scale = PxScale::from(line.scale);
        let line_height = (line.scale * 1.4).ceil() as i32;
        let (space_width, _) = text_size(scale, font, " ");
        let mut x = MARGIN;

        for span in &line.spans {
            for word in span.text.split_whitespace() {
                let (word_width, word_height) = text_size(scale, font, word);
                if x > MARGIN && x + word_width as i32 > max_x {
                    x = MARGIN;
                    y += line_height;
                }
                ops.push(DrawOp {
                    x,
                    y,
                    width: word_width,
                    height: word_height.max(line.scale as u32),
                    scale: line.scale,
                    text: word.to_string(),
                    redacted: span.redacted,
                });
                x += (word_width + space_width) as i32;
            }
        }
        y += line_height;
    }

    let height = (y + MARGIN) as u32;
    (ops, height.max(1))
}
