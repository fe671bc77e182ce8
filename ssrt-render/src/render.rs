use ab_glyph::{point, Font, FontArc, Glyph, PxScale, ScaleFont};
use anyhow::{bail, Context, Result};
use ssrt_core::StimulusStyle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tiny_skia::{Color, IntRect, Pixmap};

use crate::scene::Scene;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const RED: [u8; 4] = [255, 0, 0, 255];
const TEXT_CACHE_LIMIT: usize = 256;

pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontArc::try_from_vec(bytes).with_context(|| format!("parsing font {}", path.display()))
}

/// Rasterize a single line of `text` into a tight, premultiplied pixmap.
///
/// Returns `None` when nothing in the line has an outline (spaces only,
/// missing glyphs).
pub fn render_text_pixmap(text: &str, font_size: f32, font: &FontArc, rgba: [u8; 4]) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        tracing::debug!(text, "no outlined glyphs to rasterize");
        return None;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.data_mut();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = (iy as usize * stride + ix as usize) * 4;

            // Premultiply source by coverage * alpha, then src-over.
            let a = (cov * rgba[3] as f32 / 255.0).clamp(0.0, 1.0);
            let src = [
                (rgba[0] as f32 * a) as u8,
                (rgba[1] as f32 * a) as u8,
                (rgba[2] as f32 * a) as u8,
                (a * 255.0) as u8,
            ];
            let inv = 1.0 - a;
            for c in 0..4 {
                dst[i + c] = src[c].saturating_add((dst[i + c] as f32 * inv) as u8);
            }
        });
    }

    Some(pm)
}

/// Premultiplied src-over of `src` centered on `center`, clipped to `canvas`.
/// Returns the touched region.
pub fn blit_centered(canvas: &mut Pixmap, src: &Pixmap, center: (f32, f32)) -> Option<IntRect> {
    let w = src.width() as i32;
    let h = src.height() as i32;
    let x0 = (center.0 - w as f32 * 0.5).floor() as i32;
    let y0 = (center.1 - h as f32 * 0.5).floor() as i32;

    let dst_x_start = x0.max(0);
    let dst_y_start = y0.max(0);
    let dst_x_end = (x0 + w).min(canvas.width() as i32);
    let dst_y_end = (y0 + h).min(canvas.height() as i32);
    if dst_x_end <= dst_x_start || dst_y_end <= dst_y_start {
        return None;
    }

    let src_x_start = (dst_x_start - x0) as usize;
    let src_y_start = (dst_y_start - y0) as usize;
    let max_w = (dst_x_end - dst_x_start) as usize;
    let max_h = (dst_y_end - dst_y_start) as usize;
    let (dst_x_start, dst_y_start) = (dst_x_start as usize, dst_y_start as usize);

    let src_stride = src.width() as usize;
    let canvas_stride = canvas.width() as usize;
    let src_data = src.data();
    let dst_data = canvas.data_mut();

    for y in 0..max_h {
        for x in 0..max_w {
            let s = ((src_y_start + y) * src_stride + src_x_start + x) * 4;
            let d = ((dst_y_start + y) * canvas_stride + dst_x_start + x) * 4;
            let inv_a = 255 - src_data[s + 3] as u32;
            if inv_a == 0 {
                dst_data[d..d + 4].copy_from_slice(&src_data[s..s + 4]);
                continue;
            }
            for c in 0..4 {
                let blended = src_data[s + c] as u32 + (dst_data[d + c] as u32 * inv_a + 127) / 255;
                dst_data[d + c] = blended.min(255) as u8;
            }
        }
    }

    IntRect::from_xywh(dst_x_start as i32, dst_y_start as i32, max_w as u32, max_h as u32)
}

/// Top edge of each line of a block of `count` lines centered on `center_y`.
pub fn line_tops(count: usize, line_height: f32, center_y: f32) -> Vec<f32> {
    let top = center_y - count as f32 * line_height * 0.5;
    (0..count).map(|i| top + i as f32 * line_height).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub text_px: f32,
    pub stimulus_px: f32,
    /// Line height as a multiple of `text_px`.
    pub line_spacing: f32,
    /// Distance from the bottom edge to the reminder's center.
    pub reminder_margin: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            text_px: 28.0,
            stimulus_px: 140.0,
            line_spacing: 1.4,
            reminder_margin: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextKey {
    size_bits: u32,
    rgba: [u8; 4],
}

struct TextCache {
    font: FontArc,
    map: HashMap<(String, TextKey), Option<Arc<Pixmap>>>,
}

impl TextCache {
    fn new(font: FontArc) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, text: &str, size_px: f32, rgba: [u8; 4]) -> Option<Arc<Pixmap>> {
        let key = TextKey {
            size_bits: size_px.to_bits(),
            rgba,
        };
        if let Some(hit) = self.map.get(&(text.to_string(), key)) {
            return hit.clone();
        }
        evict_if_full(&mut self.map, TEXT_CACHE_LIMIT);
        let pm = render_text_pixmap(text, size_px, &self.font, rgba).map(Arc::new);
        self.map.insert((text.to_string(), key), pm.clone());
        pm
    }
}

/// Drops every entry once `limit` is reached. Returns whether it did.
fn evict_if_full<K, V>(map: &mut HashMap<K, V>, limit: usize) -> bool {
    if map.len() < limit {
        return false;
    }
    tracing::debug!(entries = map.len(), "text cache full, clearing");
    map.clear();
    true
}

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub blits: usize,
}

/// Draws a [`Scene`] on a black canvas and copies it into an RGBA8 frame.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    layout: Layout,
    canvas: Pixmap,
    text_cache: TextCache,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontArc) -> Result<Self> {
        let canvas = new_canvas(width, height)?;
        Ok(Self {
            width,
            height,
            layout: Layout::default(),
            canvas,
            text_cache: TextCache::new(font),
        })
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = new_canvas(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn render(&mut self, scene: &Scene, frame: &mut [u8]) -> Result<FrameStats> {
        let expected = self.width as usize * self.height as usize * 4;
        if frame.len() != expected {
            bail!("frame is {} bytes, expected {expected}", frame.len());
        }

        let start = Instant::now();
        self.canvas.fill(Color::BLACK);
        let mut blits = 0;

        let w = self.width as f32;
        let h = self.height as f32;
        let (text_y, stimulus_y) = match (scene.instructions(), scene.stimulus()) {
            (Some(_), Some(_)) => (h * 0.38, h * 0.68),
            _ => (h * 0.5, h * 0.5),
        };

        if let Some(text) = scene.instructions() {
            let lines: Vec<&str> = text.lines().collect();
            let line_height = self.layout.text_px * self.layout.line_spacing;
            for (line, top) in lines.iter().zip(line_tops(lines.len(), line_height, text_y)) {
                let center = (w * 0.5, top + line_height * 0.5);
                blits += self.draw_text(line, self.layout.text_px, WHITE, center);
            }
        }

        if let Some((glyph, style)) = scene.stimulus() {
            let rgba = match style {
                StimulusStyle::Normal => WHITE,
                StimulusStyle::StopCue => RED,
            };
            blits += self.draw_text(glyph, self.layout.stimulus_px, rgba, (w * 0.5, stimulus_y));
        }

        if let Some(reminder) = scene.reminder() {
            let center = (w * 0.5, h - self.layout.reminder_margin);
            blits += self.draw_text(reminder, self.layout.text_px, WHITE, center);
        }
        let draw = start.elapsed();

        let copy_start = Instant::now();
        frame.copy_from_slice(self.canvas.data());
        Ok(FrameStats {
            draw,
            copy: copy_start.elapsed(),
            blits,
        })
    }

    fn draw_text(&mut self, text: &str, size_px: f32, rgba: [u8; 4], center: (f32, f32)) -> usize {
        match self.text_cache.get_or_render(text, size_px, rgba) {
            Some(pm) => usize::from(blit_centered(&mut self.canvas, &pm, center).is_some()),
            None => 0,
        }
    }
}

fn new_canvas(width: u32, height: u32) -> Result<Pixmap> {
    let mut canvas = Pixmap::new(width, height)
        .with_context(|| format!("cannot allocate {width}x{height} canvas"))?;
    canvas.fill(Color::BLACK);
    Ok(canvas)
}
