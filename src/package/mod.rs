//! # Fixed-Page Document Package
//!
//! The document sink writes an OPC-style zip package: a content-types part,
//! package relationships, a fixed document sequence, a fixed document
//! listing its pages, and one XML `FixedPage` part per arranged page. Image
//! content is stored as PNG parts under `Resources/Images/` and referenced
//! from the page markup. Core properties (title/author/subject) live in
//! `docProps/core.xml`.
//!
//! The package is also the intermediate format for PDF export: the report is
//! first written into an in-memory package, then [`convert_to_pdf`] reads
//! the page parts back and replays them through the PDF writer. Keeping the
//! conversion a real two-step path means anything expressible in a saved
//! package converts identically.
//!
//! Page markup is a compact fixed-page dialect (`Path`, `Glyphs`, `Line`,
//! `ImageRef`), parsed back with a streaming XML reader.

use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Read, Write as IoWrite};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::FolioError;
use crate::layout::{arrange_visual, ArrangedPage};
use crate::model::{Color, DrawCommand, Metadata, Stroke, Visual};
use crate::pdf::PdfWriter;
use crate::render::load_image_rgba;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const RELS_PART: &str = "_rels/.rels";
const SEQUENCE_PART: &str = "FixedDocumentSequence.fdseq";
const DOCUMENT_PART: &str = "Documents/1/FixedDocument.fdoc";
const CORE_PROPS_PART: &str = "docProps/core.xml";

/// Write arranged pages into a fixed-page document package.
pub fn write_package(pages: &[ArrangedPage], metadata: &Metadata) -> Result<Vec<u8>, FolioError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let start_part = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, bytes: &[u8]| {
        zip.start_file(name, options)
            .and_then(|_| zip.write_all(bytes).map_err(Into::into))
            .map_err(|e| FolioError::Package(format!("failed to write part '{name}': {e}")))
    };

    start_part(&mut zip, CONTENT_TYPES_PART, content_types_xml().as_bytes())?;
    start_part(&mut zip, RELS_PART, rels_xml().as_bytes())?;
    start_part(&mut zip, SEQUENCE_PART, sequence_xml().as_bytes())?;
    start_part(&mut zip, DOCUMENT_PART, document_xml(pages).as_bytes())?;
    start_part(&mut zip, CORE_PROPS_PART, core_props_xml(metadata).as_bytes())?;

    let mut image_counter = 0usize;
    for page in pages {
        let (markup, images) = fixed_page_xml(page, &mut image_counter)?;
        let part = format!("Documents/1/Pages/{}.fpage", page.number);
        start_part(&mut zip, &part, markup.as_bytes())?;
        for (name, bytes) in images {
            start_part(&mut zip, &name, &bytes)?;
        }
    }

    let cursor = zip
        .finish()
        .map_err(|e| FolioError::Package(format!("failed to finalize package: {e}")))?;
    let bytes = cursor.into_inner();
    debug!(
        pages = pages.len(),
        bytes = bytes.len(),
        "document package written"
    );
    Ok(bytes)
}

/// Wrap one visual as a single-page package of its own size.
pub fn write_visual_package(visual: &Visual, metadata: &Metadata) -> Result<Vec<u8>, FolioError> {
    write_package(&[arrange_visual(visual)], metadata)
}

/// Read a package back into arranged pages plus its core properties.
pub fn read_package(bytes: &[u8]) -> Result<(Vec<ArrangedPage>, Metadata), FolioError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| FolioError::Package(format!("not a document package: {e}")))?;

    let document = read_part(&mut archive, DOCUMENT_PART)?;
    let sources = parse_document_sources(&document)?;

    let mut pages = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        let part_name = source.trim_start_matches('/');
        let markup = read_part(&mut archive, part_name)?;
        let page = parse_fixed_page(&markup, index as u32 + 1, &mut archive)?;
        pages.push(page);
    }

    let metadata = match read_part(&mut archive, CORE_PROPS_PART) {
        Ok(xml) => parse_core_props(&xml)?,
        Err(_) => Metadata::default(),
    };

    Ok((pages, metadata))
}

/// Convert a fixed-page document package to PDF bytes — the external-converter
/// hop of the export pipeline, kept in-process.
pub fn convert_to_pdf(bytes: &[u8]) -> Result<Vec<u8>, FolioError> {
    let (pages, metadata) = read_package(bytes)?;
    if pages.is_empty() {
        return Err(FolioError::Package(
            "package contains no pages to convert".to_string(),
        ));
    }
    PdfWriter::new().write(&pages, &metadata)
}

// ── Part writers ──────────────────────────────────────────────────

fn content_types_xml() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n",
        "  <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\n",
        "  <Default Extension=\"fdseq\" ContentType=\"application/vnd.fixeddocumentsequence+xml\"/>\n",
        "  <Default Extension=\"fdoc\" ContentType=\"application/vnd.fixeddocument+xml\"/>\n",
        "  <Default Extension=\"fpage\" ContentType=\"application/vnd.fixedpage+xml\"/>\n",
        "  <Default Extension=\"png\" ContentType=\"image/png\"/>\n",
        "  <Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\n",
        "</Types>\n"
    )
    .to_string()
}

fn rels_xml() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
        "  <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"/docProps/core.xml\"/>\n",
        "  <Relationship Id=\"rId2\" Type=\"http://schemas.microsoft.com/xps/2005/06/fixedrepresentation\" Target=\"/FixedDocumentSequence.fdseq\"/>\n",
        "</Relationships>\n"
    )
    .to_string()
}

fn sequence_xml() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<FixedDocumentSequence>\n",
        "  <DocumentReference Source=\"/Documents/1/FixedDocument.fdoc\"/>\n",
        "</FixedDocumentSequence>\n"
    )
    .to_string()
}

fn document_xml(pages: &[ArrangedPage]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<FixedDocument>\n");
    for page in pages {
        let _ = writeln!(
            xml,
            "  <PageContent Source=\"/Documents/1/Pages/{}.fpage\" Width=\"{:.2}\" Height=\"{:.2}\"/>",
            page.number, page.width, page.height
        );
    }
    xml.push_str("</FixedDocument>\n");
    xml
}

fn core_props_xml(metadata: &Metadata) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<coreProperties>\n");
    if let Some(title) = &metadata.title {
        let _ = writeln!(xml, "  <title>{}</title>", escape_xml(title));
    }
    if let Some(author) = &metadata.author {
        let _ = writeln!(xml, "  <creator>{}</creator>", escape_xml(author));
    }
    if let Some(subject) = &metadata.subject {
        let _ = writeln!(xml, "  <subject>{}</subject>", escape_xml(subject));
    }
    xml.push_str("</coreProperties>\n");
    xml
}

/// Serialize one page's display list. Images are returned separately as
/// (part name, PNG bytes) pairs so the caller can store them as parts.
fn fixed_page_xml(
    page: &ArrangedPage,
    image_counter: &mut usize,
) -> Result<(String, Vec<(String, Vec<u8>)>), FolioError> {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<FixedPage Width=\"{:.2}\" Height=\"{:.2}\">",
        page.width, page.height
    );

    let mut images = Vec::new();
    for command in &page.commands {
        match command {
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let _ = write!(
                    xml,
                    "  <Path X=\"{x:.2}\" Y=\"{y:.2}\" Width=\"{width:.2}\" Height=\"{height:.2}\""
                );
                if let Some(fill) = fill {
                    let _ = write!(xml, " Fill=\"{}\"", fill.to_hex());
                    if fill.a < 1.0 {
                        let _ = write!(xml, " FillOpacity=\"{:.3}\"", fill.a);
                    }
                }
                if let Some(stroke) = stroke {
                    let _ = write!(
                        xml,
                        " Stroke=\"{}\" StrokeThickness=\"{:.2}\"",
                        stroke.color.to_hex(),
                        stroke.width
                    );
                }
                xml.push_str("/>\n");
            }
            DrawCommand::Text {
                x,
                y,
                content,
                font_size,
                color,
            } => {
                let _ = writeln!(
                    xml,
                    "  <Glyphs OriginX=\"{x:.2}\" OriginY=\"{y:.2}\" FontRenderingEmSize=\"{font_size:.2}\" Fill=\"{}\" UnicodeString=\"{}\"/>",
                    color.to_hex(),
                    escape_xml(content)
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
                    xml,
                    "  <Line X1=\"{x1:.2}\" Y1=\"{y1:.2}\" X2=\"{x2:.2}\" Y2=\"{y2:.2}\" Stroke=\"{}\" StrokeThickness=\"{:.2}\"/>",
                    stroke.color.to_hex(),
                    stroke.width
                );
            }
            DrawCommand::Image {
                x,
                y,
                width,
                height,
                src,
            } => {
                *image_counter += 1;
                let part = format!("Resources/Images/{image_counter}.png");
                images.push((part.clone(), reencode_png(src)?));
                let _ = writeln!(
                    xml,
                    "  <ImageRef Source=\"/{part}\" X=\"{x:.2}\" Y=\"{y:.2}\" Width=\"{width:.2}\" Height=\"{height:.2}\"/>"
                );
            }
        }
    }

    xml.push_str("</FixedPage>\n");
    Ok((xml, images))
}

/// Normalize any image source to PNG bytes for storage as a package part.
fn reencode_png(src: &str) -> Result<Vec<u8>, FolioError> {
    use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};

    let rgba = load_image_rgba(src)?;
    let (width, height) = rgba.dimensions();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(rgba.as_raw(), width, height, ColorType::Rgba8)
        .map_err(|e| FolioError::Encode(e.to_string()))?;
    Ok(buf)
}

// ── Part readers ──────────────────────────────────────────────────

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, FolioError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| FolioError::Package(format!("missing part '{name}': {e}")))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| FolioError::Package(format!("unreadable part '{name}': {e}")))?;
    Ok(content)
}

fn read_binary_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, FolioError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| FolioError::Package(format!("missing part '{name}': {e}")))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| FolioError::Package(format!("unreadable part '{name}': {e}")))?;
    Ok(content)
}

/// Pull the ordered page part sources out of the fixed document markup.
fn parse_document_sources(xml: &str) -> Result<Vec<String>, FolioError> {
    let mut reader = Reader::from_str(xml);
    let mut sources = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"PageContent" {
                    if let Some(source) = get_attr(&e, "Source") {
                        sources.push(source);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FolioError::Package(format!(
                    "malformed fixed document markup: {e}"
                )))
            }
            _ => {}
        }
    }
    Ok(sources)
}

/// Parse one FixedPage part back into an arranged page. Image parts are
/// resolved against the archive and re-inlined as data URIs so the page is
/// self-contained again.
fn parse_fixed_page(
    xml: &str,
    number: u32,
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<ArrangedPage, FolioError> {
    let mut reader = Reader::from_str(xml);

    let mut width = 0.0;
    let mut height = 0.0;
    let mut commands = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                b"FixedPage" => {
                    width = get_attr_f64(&e, "Width").unwrap_or(0.0);
                    height = get_attr_f64(&e, "Height").unwrap_or(0.0);
                }
                b"Path" => {
                    let fill = get_attr(&e, "Fill").map(|hex| {
                        let mut c = Color::hex(&hex);
                        if let Some(a) = get_attr_f64(&e, "FillOpacity") {
                            c.a = a;
                        }
                        c
                    });
                    let stroke = get_attr(&e, "Stroke").map(|hex| Stroke {
                        color: Color::hex(&hex),
                        width: get_attr_f64(&e, "StrokeThickness").unwrap_or(1.0),
                    });
                    commands.push(DrawCommand::Rect {
                        x: get_attr_f64(&e, "X").unwrap_or(0.0),
                        y: get_attr_f64(&e, "Y").unwrap_or(0.0),
                        width: get_attr_f64(&e, "Width").unwrap_or(0.0),
                        height: get_attr_f64(&e, "Height").unwrap_or(0.0),
                        fill,
                        stroke,
                    });
                }
                b"Glyphs" => {
                    commands.push(DrawCommand::Text {
                        x: get_attr_f64(&e, "OriginX").unwrap_or(0.0),
                        y: get_attr_f64(&e, "OriginY").unwrap_or(0.0),
                        content: get_attr(&e, "UnicodeString").unwrap_or_default(),
                        font_size: get_attr_f64(&e, "FontRenderingEmSize").unwrap_or(10.0),
                        color: get_attr(&e, "Fill")
                            .map(|hex| Color::hex(&hex))
                            .unwrap_or(Color::BLACK),
                    });
                }
                b"Line" => {
                    commands.push(DrawCommand::Line {
                        x1: get_attr_f64(&e, "X1").unwrap_or(0.0),
                        y1: get_attr_f64(&e, "Y1").unwrap_or(0.0),
                        x2: get_attr_f64(&e, "X2").unwrap_or(0.0),
                        y2: get_attr_f64(&e, "Y2").unwrap_or(0.0),
                        stroke: Stroke {
                            color: get_attr(&e, "Stroke")
                                .map(|hex| Color::hex(&hex))
                                .unwrap_or(Color::BLACK),
                            width: get_attr_f64(&e, "StrokeThickness").unwrap_or(1.0),
                        },
                    });
                }
                b"ImageRef" => {
                    let source = get_attr(&e, "Source").ok_or_else(|| {
                        FolioError::Package("ImageRef without Source attribute".to_string())
                    })?;
                    let part = source.trim_start_matches('/');
                    let bytes = read_binary_part(archive, part)?;
                    commands.push(DrawCommand::Image {
                        x: get_attr_f64(&e, "X").unwrap_or(0.0),
                        y: get_attr_f64(&e, "Y").unwrap_or(0.0),
                        width: get_attr_f64(&e, "Width").unwrap_or(0.0),
                        height: get_attr_f64(&e, "Height").unwrap_or(0.0),
                        src: png_data_uri(&bytes),
                    });
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FolioError::Package(format!(
                    "malformed fixed page markup: {e}"
                )))
            }
            _ => {}
        }
    }

    Ok(ArrangedPage {
        number,
        width,
        height,
        commands,
    })
}

fn parse_core_props(xml: &str) -> Result<Metadata, FolioError> {
    let mut reader = Reader::from_str(xml);
    let mut metadata = Metadata::default();
    let mut current: Option<&'static str> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = match e.name().as_ref() {
                    b"title" => Some("title"),
                    b"creator" => Some("creator"),
                    b"subject" => Some("subject"),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = current {
                    let value = t
                        .unescape()
                        .map_err(|e| FolioError::Package(format!("bad core properties: {e}")))?
                        .into_owned();
                    match field {
                        "title" => metadata.title = Some(value),
                        "creator" => metadata.author = Some(value),
                        "subject" => metadata.subject = Some(value),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FolioError::Package(format!("bad core properties: {e}")));
            }
            _ => {}
        }
    }
    Ok(metadata)
}

fn png_data_uri(bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn get_attr_f64(e: &BytesStart, name: &str) -> Option<f64> {
    get_attr(e, name).and_then(|v| v.parse().ok())
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
