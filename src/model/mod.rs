//! # Report Model
//!
//! The input representation for the pagination pipeline. A report is a
//! vertical stack of **elements**; each element wraps one **visual** — an
//! opaque, pre-measured unit of content with a display list describing what
//! it draws. The paginator never looks inside a visual: it only needs the
//! element's outer height. Sinks replay the display list.
//!
//! Identity matters: elements are *moved* between the container and the
//! pages, never copied. A visual has exactly one owning container at a time,
//! which is why [`ReportContainer::detach_elements`] exists at all.
//!
//! Everything here is serde-serializable so a whole report can be described
//! as JSON and driven from the CLI.

use serde::{Deserialize, Serialize};

/// Device-independent units per inch. Visual coordinates, page sizes, and
/// margins are all expressed in DIU (1/96 inch).
pub const DIU_PER_INCH: f64 = 96.0;

/// Edge values (top, right, bottom, left) used for page and element margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Page orientation. Controls which way the device's printable aspect ratio
/// is applied when deriving the report page height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// An RGBA color with components in 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb` or `#rrggbb`. Unparseable channels fall back to 0.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }

    /// Format as `#rrggbb`, dropping alpha.
    pub fn to_hex(&self) -> String {
        let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b)
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Stroke properties for lines and rectangle outlines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: f64,
    pub color: Color,
}

/// One drawing primitive inside a visual's display list. Coordinates are
/// relative to the visual origin (top-left, y grows downward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DrawCommand {
    /// A filled and/or outlined rectangle.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        fill: Option<Color>,
        #[serde(default)]
        stroke: Option<Stroke>,
    },
    /// A single text run. `y` is the top of the line box; the run advances
    /// with the crate-wide approximate metrics (see [`approx_text_width`]).
    Text {
        x: f64,
        y: f64,
        content: String,
        font_size: f64,
        #[serde(default)]
        color: Color,
    },
    /// A straight line segment.
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Stroke,
    },
    /// An image scaled into the given rectangle. `src` is a data URI, raw
    /// base64, or a file path (same source forms the image loader accepts).
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        src: String,
    },
}

impl DrawCommand {
    /// The same command translated by (dx, dy). Used by the arrange pass to
    /// lift visual-relative coordinates onto the page.
    pub fn offset(&self, dx: f64, dy: f64) -> DrawCommand {
        let mut out = self.clone();
        match &mut out {
            DrawCommand::Rect { x, y, .. }
            | DrawCommand::Text { x, y, .. }
            | DrawCommand::Image { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            DrawCommand::Line { x1, y1, x2, y2, .. } => {
                *x1 += dx;
                *y1 += dy;
                *x2 += dx;
                *y2 += dy;
            }
        }
        out
    }
}

/// An opaque, pre-measured visual unit: intrinsic size plus the display list
/// that draws it. The rendered size is known before pagination ever runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Visual {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub commands: Vec<DrawCommand>,
}

impl Visual {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// A single left-aligned text line sized to its content.
    pub fn text_line(content: &str, font_size: f64, color: Color) -> Self {
        let width = approx_text_width(content, font_size);
        let height = font_size * 1.4;
        Self {
            width,
            height,
            commands: vec![DrawCommand::Text {
                x: 0.0,
                y: font_size * 0.2,
                content: content.to_string(),
                font_size,
                color,
            }],
        }
    }
}

/// Approximate advance width of a text run. The whole crate uses the same
/// estimate (0.6 em per character), so text placement agrees across the
/// raster, PDF, and package sinks.
pub fn approx_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.6
}

/// One unit of report content to be placed on a page: a visual plus its
/// vertical spacing. Elements are moved between containers, never copied —
/// the `id` exists so callers can recognize an element after the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportElement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub margin: Edges,
    pub visual: Visual,
}

impl ReportElement {
    pub fn new(visual: Visual) -> Self {
        Self {
            id: None,
            margin: Edges::default(),
            visual,
        }
    }

    pub fn with_margin(visual: Visual, margin: Edges) -> Self {
        Self {
            id: None,
            margin,
            visual,
        }
    }

    /// Height this element consumes in the page content flow: the visual's
    /// rendered height plus its own top and bottom margin.
    pub fn outer_height(&self) -> f64 {
        self.visual.height + self.margin.top + self.margin.bottom
    }
}

/// The caller's vertical stack of report elements. Pagination temporarily
/// empties it (a visual can only belong to one container at a time) and the
/// restore step refills it in original order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportContainer {
    /// Rendered width of the stack, in DIU. Drives the report page width.
    pub width: f64,
    #[serde(default)]
    elements: Vec<ReportElement>,
}

impl ReportContainer {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: ReportElement) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[ReportElement] {
        &self.elements
    }

    /// Move every element out of the container, leaving it empty for the
    /// duration of pagination and rendering.
    pub fn detach_elements(&mut self) -> Vec<ReportElement> {
        std::mem::take(&mut self.elements)
    }

    /// Reattach elements in the order given. The restore step feeds this the
    /// original sequence.
    pub fn attach_elements(&mut self, elements: impl IntoIterator<Item = ReportElement>) {
        self.elements.extend(elements);
    }
}

/// Printable-area descriptor for a target device. Replaces the original
/// design's reflection into non-public platform state: DPI and printable
/// dimensions are plain injected values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    /// Printable area width in DIU, portrait orientation.
    pub area_width: f64,
    /// Printable area height in DIU, portrait orientation.
    pub area_height: f64,
    pub dpi_x: u32,
    pub dpi_y: u32,
}

impl DeviceProfile {
    /// US Letter (8.5×11") at 96 DPI.
    pub fn letter() -> Self {
        Self {
            name: "Letter".to_string(),
            area_width: 8.5 * DIU_PER_INCH,
            area_height: 11.0 * DIU_PER_INCH,
            dpi_x: 96,
            dpi_y: 96,
        }
    }

    /// ISO A4 (210×297 mm) at 96 DPI.
    pub fn a4() -> Self {
        const MM_PER_INCH: f64 = 25.4;
        Self {
            name: "A4".to_string(),
            area_width: 210.0 / MM_PER_INCH * DIU_PER_INCH,
            area_height: 297.0 / MM_PER_INCH * DIU_PER_INCH,
            dpi_x: 96,
            dpi_y: 96,
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::letter()
    }
}

/// Document metadata carried into the package and PDF outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_sums() {
        let e = Edges::symmetric(10.0, 4.0);
        assert_eq!(e.vertical(), 20.0);
        assert_eq!(e.horizontal(), 8.0);
    }

    #[test]
    fn color_hex_round_trip() {
        let c = Color::hex("#3366cc");
        assert_eq!(c.to_hex(), "#3366cc");
        let short = Color::hex("#fff");
        assert_eq!(short.to_hex(), "#ffffff");
    }

    #[test]
    fn text_line_sizes_to_content() {
        let v = Visual::text_line("report", 10.0, Color::BLACK);
        assert_eq!(v.width, approx_text_width("report", 10.0));
        assert!(v.height > 10.0);
        assert_eq!(v.commands.len(), 1);
    }

    #[test]
    fn outer_height_includes_margins() {
        let el = ReportElement::with_margin(Visual::new(100.0, 40.0), Edges::symmetric(5.0, 0.0));
        assert_eq!(el.outer_height(), 50.0);
    }

    #[test]
    fn detach_and_attach_preserve_order() {
        let mut container = ReportContainer::new(600.0);
        for i in 0..4 {
            let mut el = ReportElement::new(Visual::new(600.0, 20.0));
            el.id = Some(format!("el-{i}"));
            container.push(el);
        }
        let taken = container.detach_elements();
        assert!(container.is_empty());
        assert_eq!(taken.len(), 4);
        container.attach_elements(taken);
        let ids: Vec<_> = container
            .elements()
            .iter()
            .map(|e| e.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["el-0", "el-1", "el-2", "el-3"]);
    }

    #[test]
    fn command_offset_translates_all_points() {
        let line = DrawCommand::Line {
            x1: 0.0,
            y1: 1.0,
            x2: 2.0,
            y2: 3.0,
            stroke: Stroke {
                width: 1.0,
                color: Color::BLACK,
            },
        };
        match line.offset(10.0, 20.0) {
            DrawCommand::Line { x1, y1, x2, y2, .. } => {
                assert_eq!((x1, y1, x2, y2), (10.0, 21.0, 12.0, 23.0));
            }
            _ => panic!("offset changed the variant"),
        }
    }

    #[test]
    fn model_round_trips_through_json() {
        let mut visual = Visual::new(200.0, 50.0);
        visual.push(DrawCommand::Text {
            x: 0.0,
            y: 0.0,
            content: "Quarterly totals".to_string(),
            font_size: 12.0,
            color: Color::BLACK,
        });
        let el = ReportElement::with_margin(visual, Edges::uniform(2.0));
        let json = serde_json::to_string(&el).unwrap();
        let back: ReportElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, el);
    }
}
