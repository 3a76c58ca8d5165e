//! # Raster Sink
//!
//! Paints an arranged page (or a bare visual) into an RGBA buffer at the
//! target device's DPI and encodes it as PNG, BMP, or JPEG (quality 100).
//! Pixel dimensions follow the original exporter's rule: DIU size divided by
//! 96, multiplied by the device-reported DPI.
//!
//! Text is painted as approximate glyph boxes using the same advance
//! estimate the rest of the crate uses — preview-grade output. The PDF and
//! package sinks carry real text; the raster sink's job is pixels at the
//! right geometry.

use std::io::Cursor;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, Rgba, RgbaImage};
use tracing::debug;

use crate::error::FolioError;
use crate::layout::ArrangedPage;
use crate::model::{approx_text_width, Color, DeviceProfile, DrawCommand, Stroke, DIU_PER_INCH};

/// Raster output formats. JPEG is always written at quality 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Bmp,
    Jpeg,
}

impl RasterFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Bmp => "bmp",
            RasterFormat::Jpeg => "jpg",
        }
    }
}

/// Paint one arranged page at the device's DPI. White background, opaque.
pub fn render_page(page: &ArrangedPage, device: &DeviceProfile) -> Result<RgbaImage, FolioError> {
    let scale_x = device.dpi_x as f64 / DIU_PER_INCH;
    let scale_y = device.dpi_y as f64 / DIU_PER_INCH;
    let width_px = ((page.width * scale_x).round() as u32).max(1);
    let height_px = ((page.height * scale_y).round() as u32).max(1);

    let mut canvas = RgbaImage::from_pixel(width_px, height_px, Rgba([255, 255, 255, 255]));

    for command in &page.commands {
        paint_command(&mut canvas, command, scale_x, scale_y)?;
    }

    debug!(
        page = page.number,
        width_px, height_px, "rasterized page"
    );
    Ok(canvas)
}

/// Encode a painted canvas into the requested format.
pub fn encode(canvas: &RgbaImage, format: RasterFormat) -> Result<Vec<u8>, FolioError> {
    let (width, height) = canvas.dimensions();
    let mut buf = Vec::new();
    let result = match format {
        RasterFormat::Png => {
            PngEncoder::new(&mut buf).write_image(canvas.as_raw(), width, height, ColorType::Rgba8)
        }
        RasterFormat::Bmp => {
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            BmpEncoder::new(&mut buf).write_image(rgb.as_raw(), width, height, ColorType::Rgb8)
        }
        RasterFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, 100).write_image(
                rgb.as_raw(),
                width,
                height,
                ColorType::Rgb8,
            )
        }
    };
    result.map_err(|e| FolioError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Load the pixels behind an image draw command.
///
/// Supported `src` forms, same as the package and PDF sinks:
/// - `data:image/...;base64,...` — data URI
/// - explicit file path (`/`, `./`, `../` prefixes)
/// - raw base64-encoded image data
pub fn load_image_rgba(src: &str) -> Result<RgbaImage, FolioError> {
    let raw = read_source_bytes(src)?;
    let reader = image::io::Reader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| FolioError::Image(format!("format detection error: {e}")))?;
    let img = reader
        .decode()
        .map_err(|e| FolioError::Image(format!("decode error: {e}")))?;
    Ok(img.to_rgba8())
}

fn read_source_bytes(src: &str) -> Result<Vec<u8>, FolioError> {
    if src.starts_with("data:image/") {
        let comma = src
            .find(',')
            .ok_or_else(|| FolioError::Image("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma + 1..]);
    }

    // Only explicit path prefixes count as paths; base64 also contains '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| FolioError::Image(format!("failed to read image file '{src}': {e}")));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, FolioError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| FolioError::Image(format!("base64 decode error: {e}")))
}

fn paint_command(
    canvas: &mut RgbaImage,
    command: &DrawCommand,
    scale_x: f64,
    scale_y: f64,
) -> Result<(), FolioError> {
    match command {
        DrawCommand::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        } => {
            let px = (x * scale_x).round() as i64;
            let py = (y * scale_y).round() as i64;
            let pw = (width * scale_x).ceil() as i64;
            let ph = (height * scale_y).ceil() as i64;
            if let Some(fill) = fill {
                fill_rect(canvas, px, py, pw, ph, *fill);
            }
            if let Some(stroke) = stroke {
                let sw = ((stroke.width * scale_x).round() as i64).max(1);
                fill_rect(canvas, px, py, pw, sw, stroke.color);
                fill_rect(canvas, px, py + ph - sw, pw, sw, stroke.color);
                fill_rect(canvas, px, py, sw, ph, stroke.color);
                fill_rect(canvas, px + pw - sw, py, sw, ph, stroke.color);
            }
        }
        DrawCommand::Text {
            x,
            y,
            content,
            font_size,
            color,
        } => {
            paint_text_blocks(canvas, *x, *y, content, *font_size, *color, scale_x, scale_y);
        }
        DrawCommand::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
        } => {
            paint_line(canvas, *x1, *y1, *x2, *y2, stroke, scale_x, scale_y);
        }
        DrawCommand::Image {
            x,
            y,
            width,
            height,
            src,
        } => {
            let pixels = load_image_rgba(src)?;
            let pw = ((width * scale_x).round() as u32).max(1);
            let ph = ((height * scale_y).round() as u32).max(1);
            let resized =
                image::imageops::resize(&pixels, pw, ph, image::imageops::FilterType::Triangle);
            let px = (x * scale_x).round() as i64;
            let py = (y * scale_y).round() as i64;
            blit_over(canvas, &resized, px, py);
        }
    }
    Ok(())
}

/// Per-character glyph boxes: right geometry, approximate ink.
#[allow(clippy::too_many_arguments)]
fn paint_text_blocks(
    canvas: &mut RgbaImage,
    x: f64,
    y: f64,
    content: &str,
    font_size: f64,
    color: Color,
    scale_x: f64,
    scale_y: f64,
) {
    let advance = approx_text_width("M", font_size);
    let glyph_height = font_size;
    let mut cursor = x;
    for ch in content.chars() {
        if !ch.is_whitespace() {
            let px = (cursor * scale_x).round() as i64;
            let py = (y * scale_y).round() as i64;
            let pw = ((advance * 0.8 * scale_x).round() as i64).max(1);
            let ph = ((glyph_height * scale_y).round() as i64).max(1);
            fill_rect(canvas, px, py, pw, ph, color);
        }
        cursor += advance;
    }
}

fn paint_line(
    canvas: &mut RgbaImage,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    stroke: &Stroke,
    scale_x: f64,
    scale_y: f64,
) {
    let px1 = x1 * scale_x;
    let py1 = y1 * scale_y;
    let px2 = x2 * scale_x;
    let py2 = y2 * scale_y;
    let thickness = ((stroke.width * scale_x).round() as i64).max(1);

    let dx = px2 - px1;
    let dy = py2 - py1;
    let steps = dx.abs().max(dy.abs()).ceil() as i64;
    if steps == 0 {
        fill_rect(
            canvas,
            px1.round() as i64,
            py1.round() as i64,
            thickness,
            thickness,
            stroke.color,
        );
        return;
    }
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = (px1 + dx * t).round() as i64;
        let y = (py1 + dy * t).round() as i64;
        fill_rect(canvas, x, y, thickness, thickness, stroke.color);
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: i64, y: i64, width: i64, height: i64, color: Color) {
    if width <= 0 || height <= 0 {
        return;
    }
    let cw = canvas.width() as i64;
    let ch = canvas.height() as i64;
    let x0 = x.clamp(0, cw);
    let y0 = y.clamp(0, ch);
    let x1 = (x + width).clamp(0, cw);
    let y1 = (y + height).clamp(0, ch);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let rgba = color_to_rgba(color);
    let alpha = color.a.clamp(0.0, 1.0);
    for yy in y0..y1 {
        for xx in x0..x1 {
            if alpha >= 1.0 {
                canvas.put_pixel(xx as u32, yy as u32, rgba);
            } else {
                let dst = *canvas.get_pixel(xx as u32, yy as u32);
                canvas.put_pixel(xx as u32, yy as u32, blend(rgba, dst, alpha));
            }
        }
    }
}

fn blit_over(canvas: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let dx = x + sx as i64;
        let dy = y + sy as i64;
        if dx < 0 || dy < 0 || dx >= canvas.width() as i64 || dy >= canvas.height() as i64 {
            continue;
        }
        let alpha = pixel[3] as f64 / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        if alpha >= 1.0 {
            canvas.put_pixel(dx as u32, dy as u32, *pixel);
        } else {
            let dst = *canvas.get_pixel(dx as u32, dy as u32);
            canvas.put_pixel(dx as u32, dy as u32, blend(*pixel, dst, alpha));
        }
    }
}

fn blend(src: Rgba<u8>, dst: Rgba<u8>, alpha: f64) -> Rgba<u8> {
    let mix = |s: u8, d: u8| (s as f64 * alpha + d as f64 * (1.0 - alpha)).round() as u8;
    Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        255,
    ])
}

fn color_to_rgba(color: Color) -> Rgba<u8> {
    let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([
        to_byte(color.r),
        to_byte(color.g),
        to_byte(color.b),
        to_byte(color.a),
    ])
}
