//! # PDF Serializer
//!
//! Takes arranged report pages and writes a valid PDF file. This is a
//! from-scratch PDF 1.7 writer: writing the raw bytes ourselves keeps the
//! crate self-contained, and the subset a report sink needs — rectangles,
//! lines, Helvetica text, embedded images — is manageable.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (catalog, pages, fonts, streams, images)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Content streams are FlateDecode-compressed. Images are decoded to RGB
//! and embedded as compressed XObjects. Text uses the Helvetica base font,
//! so no font embedding is needed.

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::debug;

use crate::error::FolioError;
use crate::layout::ArrangedPage;
use crate::model::{Color, DrawCommand, Metadata};
use crate::render::load_image_rgba;

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        // Object 0 is the PDF's reserved free entry; 1 = Catalog, 2 = Pages
        // tree, 3 = the shared Helvetica font. All filled in later.
        Self {
            objects: vec![
                PdfObject { data: vec![] },
                PdfObject { data: vec![] },
                PdfObject { data: vec![] },
                PdfObject { data: vec![] },
            ],
        }
    }

    fn add(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn add_stream(&mut self, dict: &str, stream: &[u8]) -> usize {
        let mut data = Vec::with_capacity(dict.len() + stream.len() + 32);
        let _ = write!(data, "{dict}\nstream\n");
        data.extend_from_slice(stream);
        data.extend_from_slice(b"\nendstream");
        self.add(data)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Serialize arranged pages into PDF bytes.
    pub fn write(&self, pages: &[ArrangedPage], metadata: &Metadata) -> Result<Vec<u8>, FolioError> {
        let mut builder = PdfBuilder::new();
        let mut page_obj_ids = Vec::with_capacity(pages.len());

        for page in pages {
            // Embed this page's images first so the content stream can
            // reference them as /Im0, /Im1, ... in page-local order.
            let mut image_ids = Vec::new();
            for command in &page.commands {
                if let DrawCommand::Image { src, .. } = command {
                    image_ids.push(embed_image(&mut builder, src)?);
                }
            }

            let content = build_content_stream(page);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_id = builder.add_stream(
                &format!(
                    "<< /Length {} /Filter /FlateDecode >>",
                    compressed.len()
                ),
                &compressed,
            );

            let mut resources = String::from("/Font << /F1 3 0 R >>");
            if !image_ids.is_empty() {
                let xobjects: String = image_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| format!("/Im{i} {id} 0 R"))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, " /XObject << {xobjects} >>");
            }

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_id, resources
            );
            page_obj_ids.push(builder.add(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            page_obj_ids.len()
        )
        .into_bytes();

        builder.objects[3].data =
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec();

        let info_id = write_info_dict(&mut builder, metadata);

        let bytes = finish(builder, info_id);
        debug!(pages = pages.len(), bytes = bytes.len(), "pdf written");
        Ok(bytes)
    }
}

/// Decode an image source to RGB and add it as a FlateDecode XObject.
fn embed_image(builder: &mut PdfBuilder, src: &str) -> Result<usize, FolioError> {
    let rgba = load_image_rgba(src)?;
    let (width, height) = rgba.dimensions();

    // Composite over white; the PDF XObject carries no alpha channel.
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in rgba.pixels() {
        let a = pixel[3] as u32;
        for channel in 0..3 {
            let v = (pixel[channel] as u32 * a + 255 * (255 - a)) / 255;
            rgb.push(v as u8);
        }
    }
    let compressed = compress_to_vec_zlib(&rgb, 6);

    let dict = format!(
        "<< /Type /XObject /Subtype /Image /Width {width} /Height {height} \
         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode \
         /Length {} >>",
        compressed.len()
    );
    Ok(builder.add_stream(&dict, &compressed))
}

/// Build the uncompressed content stream for one page. PDF's coordinate
/// origin is bottom-left, so every y is flipped against the page height.
fn build_content_stream(page: &ArrangedPage) -> String {
    let height = page.height;
    let mut stream = String::new();
    let mut image_index = 0usize;

    for command in &page.commands {
        match command {
            DrawCommand::Rect {
                x,
                y,
                width,
                height: h,
                fill,
                stroke,
            } => {
                let flipped = height - y - h;
                if let Some(fill) = fill {
                    let _ = writeln!(
                        stream,
                        "{} rg\n{:.3} {:.3} {:.3} {:.3} re f",
                        rgb_triplet(*fill),
                        x,
                        flipped,
                        width,
                        h
                    );
                }
                if let Some(stroke) = stroke {
                    let _ = writeln!(
                        stream,
                        "{} RG\n{:.3} w\n{:.3} {:.3} {:.3} {:.3} re S",
                        rgb_triplet(stroke.color),
                        stroke.width,
                        x,
                        flipped,
                        width,
                        h
                    );
                }
            }
            DrawCommand::Text {
                x,
                y,
                content,
                font_size,
                color,
            } => {
                // `y` is the top of the line box; drop to an approximate
                // baseline one em below it.
                let baseline = height - y - font_size;
                let _ = writeln!(
                    stream,
                    "{} rg\nBT\n/F1 {:.3} Tf\n1 0 0 1 {:.3} {:.3} Tm\n({}) Tj\nET",
                    rgb_triplet(*color),
                    font_size,
                    x,
                    baseline,
                    escape_pdf_string(content)
                );
            }
            DrawCommand::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
            } => {
                let _ = writeln!(
                    stream,
                    "{} RG\n{:.3} w\n{:.3} {:.3} m {:.3} {:.3} l S",
                    rgb_triplet(stroke.color),
                    stroke.width,
                    x1,
                    height - y1,
                    x2,
                    height - y2
                );
            }
            DrawCommand::Image {
                x,
                y,
                width,
                height: h,
                ..
            } => {
                let flipped = height - y - h;
                let _ = writeln!(
                    stream,
                    "q\n{:.3} 0 0 {:.3} {:.3} {:.3} cm\n/Im{} Do\nQ",
                    width, h, x, flipped, image_index
                );
                image_index += 1;
            }
        }
    }
    stream
}

fn write_info_dict(builder: &mut PdfBuilder, metadata: &Metadata) -> Option<usize> {
    if metadata.title.is_none() && metadata.author.is_none() && metadata.subject.is_none() {
        return None;
    }
    let mut info = String::from("<< ");
    if let Some(title) = &metadata.title {
        let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
    }
    if let Some(author) = &metadata.author {
        let _ = write!(info, "/Author ({}) ", escape_pdf_string(author));
    }
    if let Some(subject) = &metadata.subject {
        let _ = write!(info, "/Subject ({}) ", escape_pdf_string(subject));
    }
    let _ = write!(info, "/Producer (folio) >>");
    Some(builder.add(info.into_bytes()))
}

fn finish(builder: PdfBuilder, info_id: Option<usize>) -> Vec<u8> {
    let mut output = Vec::new();
    output.extend_from_slice(b"%PDF-1.7\n%\xFF\xFF\xFF\xFF\n");

    let mut offsets = vec![0usize; builder.objects.len()];
    for (id, object) in builder.objects.iter().enumerate().skip(1) {
        offsets[id] = output.len();
        let _ = write!(output, "{id} 0 obj\n");
        output.extend_from_slice(&object.data);
        output.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = output.len();
    let _ = write!(output, "xref\n0 {}\n0000000000 65535 f \n", builder.objects.len());
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{offset:010} 00000 n \n");
    }

    let mut trailer = format!(
        "trailer\n<< /Size {} /Root 1 0 R",
        builder.objects.len()
    );
    if let Some(info_id) = info_id {
        let _ = write!(trailer, " /Info {info_id} 0 R");
    }
    let _ = write!(trailer, " >>\nstartxref\n{xref_start}\n%%EOF\n");
    output.extend_from_slice(trailer.as_bytes());
    output
}

fn rgb_triplet(color: Color) -> String {
    format!(
        "{:.3} {:.3} {:.3}",
        color.r.clamp(0.0, 1.0),
        color.g.clamp(0.0, 1.0),
        color.b.clamp(0.0, 1.0)
    )
}

fn escape_pdf_string(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '(' | ')' | '\\' => {
                output.push('\\');
                output.push(ch);
            }
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            _ => output.push(ch),
        }
    }
    output
}
