//! Block rasterizer
//!
//! Converts each render block into a fixed-resolution RGB bitmap. Layout
//! runs in reference-canvas coordinates (a 794 px wide content column) and
//! drawing happens at a 2x oversampling factor for print sharpness. Blocks
//! without visible content are skipped entirely; any drawing failure is an
//! error that aborts the export rather than producing a partial bitmap.

use crate::fonts::FontSet;
use crate::snapshot::{BodyBlock, RenderBlock, TextRun, REPORT_FOOTER, REPORT_NAME, REPORT_TAGLINE};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use regex::Regex;
use std::fmt;
use thiserror::Error;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};
use ttf_parser::{Face, OutlineBuilder};

/// Reference content canvas width in pixels (A4 content column at 96 DPI).
pub const CONTENT_WIDTH_PX: f32 = 794.0;

/// Oversampling factor applied when drawing, for print-quality output.
pub const OVERSAMPLE: f32 = 2.0;

/// Horizontal padding inside a block, reference pixels.
const PAD: f32 = 16.0;

const INK: (u8, u8, u8) = (31, 41, 55);
const HEADING_INK: (u8, u8, u8) = (17, 24, 39);
const MUTED_INK: (u8, u8, u8) = (107, 114, 128);
const ACCENT: (u8, u8, u8) = (37, 99, 235);
const CODE_BG: (u8, u8, u8) = (243, 244, 246);
const RULE_GRAY: (u8, u8, u8) = (209, 213, 219);

/// Errors raised while rasterizing blocks or decoding screenshots.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("screenshot decode failed: {0}")]
    Image(String),

    #[error("unsupported screenshot data URL")]
    DataUrl,

    #[error("raster surface allocation failed ({width}x{height})")]
    Allocation { width: u32, height: u32 },
}

/// A decoded source screenshot.
///
/// Decoding happens once, up front, so later drawing can never fail on
/// image provenance: by the time the export pipeline runs the pixels are
/// plain RGBA in memory.
#[derive(Clone)]
pub struct Screenshot {
    image: RgbaImage,
}

impl fmt::Debug for Screenshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Screenshot({}x{})",
            self.image.width(),
            self.image.height()
        )
    }
}

impl Screenshot {
    /// Decode PNG or JPEG bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RasterError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| RasterError::Image(e.to_string()))?
            .to_rgba8();
        Ok(Self { image })
    }

    /// Decode a `data:image/...;base64,` URL as produced by a capture tab.
    pub fn from_data_url(url: &str) -> Result<Self, RasterError> {
        let pattern =
            Regex::new(r"^data:image/(?:png|jpe?g);base64,(.+)$").map_err(|_| RasterError::DataUrl)?;
        let captures = pattern.captures(url.trim()).ok_or(RasterError::DataUrl)?;
        let bytes = STANDARD
            .decode(&captures[1])
            .map_err(|e| RasterError::Image(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Copy into a premultiplied tiny-skia pixmap for drawing.
    fn to_pixmap(&self) -> Option<Pixmap> {
        let (w, h) = (self.image.width(), self.image.height());
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for pixel in self.image.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u16;
            data.push((r as u16 * alpha / 255) as u8);
            data.push((g as u16 * alpha / 255) as u8);
            data.push((b as u16 * alpha / 255) as u8);
            data.push(a);
        }
        Pixmap::from_vec(data, IntSize::from_wh(w, h)?)
    }
}

/// A rasterized block ready for pagination: tightly packed RGB rows.
#[derive(Debug, Clone)]
pub struct BlockBitmap {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl BlockBitmap {
    fn from_pixmap(pixmap: &Pixmap) -> Self {
        let mut rgb = Vec::with_capacity((pixmap.width() * pixmap.height() * 3) as usize);
        for pixel in pixmap.pixels() {
            let c = pixel.demultiply();
            rgb.push(c.red());
            rgb.push(c.green());
            rgb.push(c.blue());
        }
        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            rgb,
        }
    }

    /// Use the screenshot pixels directly, composited over white.
    pub fn from_screenshot(screenshot: &Screenshot) -> Self {
        let (w, h) = (screenshot.width(), screenshot.height());
        let mut rgb = Vec::with_capacity((w * h * 3) as usize);
        for pixel in screenshot.image.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u16;
            rgb.push(((r as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
            rgb.push(((g as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
            rgb.push(((b as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
        Self {
            width: w,
            height: h,
            rgb,
        }
    }
}

/// Which cut of the print family a piece of text uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontKind {
    Regular,
    Bold,
    Mono,
}

impl FontKind {
    fn for_run(run: &TextRun) -> Self {
        if run.code {
            FontKind::Mono
        } else if run.bold {
            FontKind::Bold
        } else {
            FontKind::Regular
        }
    }
}

/// Drawing primitives in reference-canvas coordinates.
#[derive(Debug)]
enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        text: String,
        kind: FontKind,
        size: f32,
        color: (u8, u8, u8),
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: (u8, u8, u8),
    },
    Thumbnail {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

struct FaceSet<'f> {
    regular: Face<'f>,
    bold: Face<'f>,
    mono: Face<'f>,
}

impl<'f> FaceSet<'f> {
    fn get(&self, kind: FontKind) -> &Face<'f> {
        match kind {
            FontKind::Regular => &self.regular,
            FontKind::Bold => &self.bold,
            FontKind::Mono => &self.mono,
        }
    }
}

fn advance_px(face: &Face<'_>, c: char, size: f32) -> f32 {
    let upem = face.units_per_em() as f32;
    let units = face
        .glyph_index(c)
        .and_then(|gid| face.glyph_hor_advance(gid))
        .unwrap_or(face.units_per_em() / 2) as f32;
    units * size / upem
}

fn text_width_px(face: &Face<'_>, text: &str, size: f32) -> f32 {
    text.chars().map(|c| advance_px(face, c, size)).sum()
}

fn ascent_px(face: &Face<'_>, size: f32) -> f32 {
    size * face.ascender() as f32 / face.units_per_em() as f32
}

/// Accumulates draw ops while tracking the growing block height.
struct Layout<'f> {
    faces: &'f FaceSet<'f>,
    ops: Vec<DrawOp>,
    y: f32,
}

impl<'f> Layout<'f> {
    fn new(faces: &'f FaceSet<'f>) -> Self {
        Self {
            faces,
            ops: Vec::new(),
            y: 0.0,
        }
    }

    fn space(&mut self, height: f32) {
        self.y += height;
    }

    fn hline(&mut self, thickness: f32, color: (u8, u8, u8)) {
        self.ops.push(DrawOp::Rect {
            x: PAD,
            y: self.y,
            width: CONTENT_WIDTH_PX - 2.0 * PAD,
            height: thickness,
            color,
        });
        self.y += thickness;
    }

    /// Lay out styled runs with greedy word wrapping between `x0` and the
    /// right padding edge. Words wider than a whole line are broken at
    /// character granularity instead of overflowing.
    fn wrapped_runs(
        &mut self,
        runs: &[TextRun],
        size: f32,
        line_height: f32,
        color: (u8, u8, u8),
        x0: f32,
    ) {
        let max_x = CONTENT_WIDTH_PX - PAD;
        let mut words: Vec<(String, FontKind)> = Vec::new();
        for run in runs {
            let kind = FontKind::for_run(run);
            for word in run.text.split_whitespace() {
                words.push((word.to_string(), kind));
            }
        }
        if words.is_empty() {
            return;
        }

        let space_w = advance_px(self.faces.get(FontKind::Regular), ' ', size);
        let mut pen = x0;
        let mut line_top = self.y;

        for (word, kind) in words {
            let face = self.faces.get(kind);
            let width = text_width_px(face, &word, size);
            let lead = if pen > x0 { space_w } else { 0.0 };

            if pen > x0 && pen + lead + width > max_x {
                line_top += line_height;
                pen = x0;
            } else {
                pen += lead;
            }

            if width > max_x - x0 {
                // Break an unbreakable token (long URL, hash) by character.
                for c in word.chars() {
                    let cw = advance_px(face, c, size);
                    if pen + cw > max_x && pen > x0 {
                        line_top += line_height;
                        pen = x0;
                    }
                    self.ops.push(DrawOp::Text {
                        x: pen,
                        baseline: line_top + ascent_px(face, size),
                        text: c.to_string(),
                        kind,
                        size,
                        color,
                    });
                    pen += cw;
                }
                continue;
            }

            self.ops.push(DrawOp::Text {
                x: pen,
                baseline: line_top + ascent_px(face, size),
                text: word,
                kind,
                size,
                color,
            });
            pen += width;
        }

        self.y = line_top + line_height;
    }

    fn wrapped_text(
        &mut self,
        text: &str,
        kind: FontKind,
        size: f32,
        line_height: f32,
        color: (u8, u8, u8),
    ) {
        let run = TextRun {
            text: text.to_string(),
            bold: kind == FontKind::Bold,
            italic: false,
            code: kind == FontKind::Mono,
        };
        self.wrapped_runs(&[run], size, line_height, color, PAD);
    }

    /// Monospace code lines over a tinted background, line breaks kept.
    fn code_block(&mut self, code: &str) {
        const SIZE: f32 = 12.0;
        const LINE: f32 = 16.0;
        const INSET: f32 = 10.0;

        let face = self.faces.get(FontKind::Mono);
        let max_x = CONTENT_WIDTH_PX - PAD - INSET;

        // Pre-wrap lines at character granularity to size the background.
        let mut lines: Vec<String> = Vec::new();
        for raw in code.split('\n') {
            let mut current = String::new();
            let mut pen = PAD + INSET;
            for c in raw.chars() {
                let cw = advance_px(face, c, SIZE);
                if pen + cw > max_x && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    pen = PAD + INSET;
                }
                current.push(c);
                pen += cw;
            }
            lines.push(current);
        }

        let height = lines.len() as f32 * LINE + 2.0 * INSET;
        self.ops.push(DrawOp::Rect {
            x: PAD,
            y: self.y,
            width: CONTENT_WIDTH_PX - 2.0 * PAD,
            height,
            color: CODE_BG,
        });

        let mut line_top = self.y + INSET;
        for line in lines {
            if !line.is_empty() {
                self.ops.push(DrawOp::Text {
                    x: PAD + INSET,
                    baseline: line_top + ascent_px(face, SIZE),
                    text: line,
                    kind: FontKind::Mono,
                    size: SIZE,
                    color: HEADING_INK,
                });
            }
            line_top += LINE;
        }
        self.y += height;
    }

    fn thumbnail(&mut self, screenshot: &Screenshot) {
        const MAX_HEIGHT: f32 = 220.0;
        let max_width = CONTENT_WIDTH_PX - 2.0 * PAD;
        let (w, h) = (screenshot.width() as f32, screenshot.height() as f32);
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let scale = (max_width / w).min(MAX_HEIGHT / h).min(1.0);
        let width = w * scale;
        let height = h * scale;
        self.ops.push(DrawOp::Thumbnail {
            x: PAD + (max_width - width) / 2.0,
            y: self.y,
            width,
            height,
        });
        self.y += height;
    }
}

/// Rasterizes render blocks against a fixed font set.
pub struct Rasterizer<'a> {
    fonts: &'a FontSet,
}

impl<'a> Rasterizer<'a> {
    pub fn new(fonts: &'a FontSet) -> Self {
        Self { fonts }
    }

    /// Rasterize one block. `Ok(None)` means the block has no visible
    /// content and must be skipped without affecting page flow.
    pub fn rasterize(&self, block: &RenderBlock) -> Result<Option<BlockBitmap>, RasterError> {
        if !block.has_visible_content() {
            log::debug!("skipping empty render block");
            return Ok(None);
        }

        let faces = FaceSet {
            regular: self.fonts.regular.face(),
            bold: self.fonts.bold.face(),
            mono: self.fonts.mono.face(),
        };

        let mut layout = Layout::new(&faces);
        let thumbnail = layout_block(&mut layout, block);
        let height = layout.y.ceil().max(1.0);

        let width_px = (CONTENT_WIDTH_PX * OVERSAMPLE) as u32;
        let height_px = (height * OVERSAMPLE) as u32;
        let mut pixmap =
            Pixmap::new(width_px, height_px).ok_or(RasterError::Allocation {
                width: width_px,
                height: height_px,
            })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let oversample = Transform::from_scale(OVERSAMPLE, OVERSAMPLE);
        for op in &layout.ops {
            match op {
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let Some(rect) = tiny_skia::Rect::from_xywh(*x, *y, *width, *height) else {
                        continue;
                    };
                    let mut paint = Paint::default();
                    paint.set_color_rgba8(color.0, color.1, color.2, 255);
                    paint.anti_alias = false;
                    pixmap.fill_rect(rect, &paint, oversample, None);
                }
                DrawOp::Text {
                    x,
                    baseline,
                    text,
                    kind,
                    size,
                    color,
                } => {
                    draw_text(
                        &mut pixmap,
                        faces.get(*kind),
                        text,
                        *x,
                        *baseline,
                        *size,
                        *color,
                        oversample,
                    );
                }
                DrawOp::Thumbnail {
                    x,
                    y,
                    width,
                    height,
                } => {
                    let Some(source) = thumbnail.and_then(Screenshot::to_pixmap) else {
                        continue;
                    };
                    let sx = *width / source.width() as f32 * OVERSAMPLE;
                    let sy = *height / source.height() as f32 * OVERSAMPLE;
                    let transform =
                        Transform::from_row(sx, 0.0, 0.0, sy, x * OVERSAMPLE, y * OVERSAMPLE);
                    let paint = PixmapPaint {
                        quality: FilterQuality::Bilinear,
                        ..PixmapPaint::default()
                    };
                    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
                }
            }
        }

        Ok(Some(BlockBitmap::from_pixmap(&pixmap)))
    }
}

/// Lay out one block, returning its thumbnail source if it has one.
fn layout_block<'b>(layout: &mut Layout<'_>, block: &'b RenderBlock) -> Option<&'b Screenshot> {
    match block {
        RenderBlock::Branding => {
            layout.space(18.0);
            layout.wrapped_text(REPORT_NAME, FontKind::Bold, 26.0, 34.0, HEADING_INK);
            layout.wrapped_text(REPORT_TAGLINE, FontKind::Regular, 13.0, 20.0, MUTED_INK);
            layout.space(6.0);
            layout.hline(2.0, ACCENT);
            layout.space(10.0);
            None
        }
        RenderBlock::Cover {
            task,
            page_url,
            thumbnail,
        } => {
            layout.space(24.0);
            layout.wrapped_text("Analysis Report", FontKind::Bold, 22.0, 30.0, HEADING_INK);
            layout.space(10.0);
            layout.wrapped_text("Task", FontKind::Bold, 12.0, 18.0, MUTED_INK);
            layout.wrapped_text(task, FontKind::Regular, 13.0, 19.0, INK);
            if let Some(url) = page_url {
                layout.space(6.0);
                layout.wrapped_text("Source", FontKind::Bold, 12.0, 18.0, MUTED_INK);
                layout.wrapped_text(url, FontKind::Regular, 12.0, 18.0, ACCENT);
            }
            if let Some(shot) = thumbnail {
                layout.space(12.0);
                layout.thumbnail(shot);
            }
            layout.space(16.0);
            thumbnail.as_ref()
        }
        RenderBlock::Section { title, body } => {
            layout.space(14.0);
            if !title.trim().is_empty() {
                layout.wrapped_text(title, FontKind::Bold, 17.0, 24.0, HEADING_INK);
                layout.space(2.0);
                layout.hline(1.0, RULE_GRAY);
                layout.space(8.0);
            }
            for (index, item) in body.iter().enumerate() {
                if index > 0 {
                    layout.space(8.0);
                }
                match item {
                    BodyBlock::Paragraph(runs) => {
                        layout.wrapped_runs(runs, 13.0, 19.5, INK, PAD);
                    }
                    BodyBlock::Subheading(runs) => {
                        layout.wrapped_runs(runs, 15.0, 22.0, HEADING_INK, PAD);
                    }
                    BodyBlock::ListItem { marker, runs } => {
                        let marker_run = TextRun::plain(marker.clone());
                        layout.wrapped_runs(&[marker_run], 13.0, 0.0, INK, PAD + 6.0);
                        let before = layout.y;
                        layout.wrapped_runs(runs, 13.0, 19.5, INK, PAD + 26.0);
                        // An item with no body text still used up a line
                        // for its marker.
                        if layout.y == before {
                            layout.space(19.5);
                        }
                    }
                    BodyBlock::Code(code) => layout.code_block(code),
                    BodyBlock::Rule => {
                        layout.space(4.0);
                        layout.hline(1.0, RULE_GRAY);
                        layout.space(4.0);
                    }
                }
            }
            layout.space(6.0);
            None
        }
        RenderBlock::Footer => {
            layout.space(12.0);
            layout.hline(1.0, RULE_GRAY);
            layout.space(8.0);
            layout.wrapped_text(REPORT_FOOTER, FontKind::Regular, 11.0, 16.0, MUTED_INK);
            layout.space(8.0);
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_text(
    pixmap: &mut Pixmap,
    face: &Face<'_>,
    text: &str,
    x: f32,
    baseline: f32,
    size: f32,
    color: (u8, u8, u8),
    transform: Transform,
) {
    let upem = face.units_per_em() as f32;
    let scale = size / upem;
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.0, color.1, color.2, 255);
    paint.anti_alias = true;

    let mut pen = x;
    for c in text.chars() {
        let Some(gid) = face.glyph_index(c) else {
            pen += advance_px(face, c, size);
            continue;
        };
        let mut builder = GlyphPathBuilder::new(pen, baseline, scale);
        if face.outline_glyph(gid, &mut builder).is_some() {
            if let Some(path) = builder.finish() {
                pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
            }
        }
        pen += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
    }
}

/// Maps y-up glyph outlines into the y-down canvas at a pen position.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.origin_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
