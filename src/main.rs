//! # Folio CLI
//!
//! Usage:
//!   folio report.json -o report.pdf
//!   folio report.json -o report.fpkg --format package
//!   folio report.json -o report.png --format png
//!   echo '{ ... }' | folio -o report.pdf
//!   folio --example > report.json

use std::env;
use std::fs;
use std::io::{self, Read};

use serde::Deserialize;

use folio::layout::{arrange, paginate, report_size};
use folio::render::{encode, render_page, RasterFormat};
use folio::template::TextTemplate;
use folio::{DeviceProfile, Edges, Metadata, Orientation, ReportContainer, ReportOptions};

/// The CLI's input schema: a container plus the report configuration that
/// the library normally takes as [`ReportOptions`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportFile {
    container: ReportContainer,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    margin: Edges,
    #[serde(default)]
    orientation: Orientation,
    /// Header pattern for [`TextTemplate`], e.g. "{data.title}".
    #[serde(default)]
    header: Option<String>,
    /// Footer pattern, e.g. "Page {page} of {pages}".
    #[serde(default)]
    footer: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_report_json());
        return;
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read input file")
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .expect("Failed to read stdin");
        buf
    };

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "report.pdf".to_string());

    let format = args
        .windows(2)
        .find(|w| w[0] == "--format")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "pdf".to_string());

    let report: ReportFile = match serde_json::from_str(&input) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("✗ Failed to parse report: {e}");
            std::process::exit(1);
        }
    };

    let mut options = ReportOptions {
        margin: report.margin,
        orientation: report.orientation,
        metadata: report.metadata,
        data: report.data,
        ..Default::default()
    };
    if let Some(pattern) = &report.header {
        options.header = Some(Box::new(TextTemplate::new(pattern.clone())));
    }
    if let Some(pattern) = &report.footer {
        options.footer = Some(Box::new(TextTemplate::new(pattern.clone())));
    }

    let mut container = report.container;
    let result = match format.as_str() {
        "pdf" => folio::render_report_pdf(&mut container, &options, None)
            .map(|bytes| vec![(output_path.clone(), bytes)]),
        "package" => folio::render_report_package(&mut container, &options, None)
            .map(|bytes| vec![(output_path.clone(), bytes)]),
        "png" => render_pages_png(&mut container, &options, &output_path),
        other => {
            eprintln!("✗ Unknown format '{other}' (expected pdf, package, or png)");
            std::process::exit(1);
        }
    };

    match result {
        Ok(outputs) => {
            for (path, bytes) in outputs {
                fs::write(&path, &bytes).expect("Failed to write output");
                eprintln!("✓ Written {} bytes to {}", bytes.len(), path);
            }
        }
        Err(e) => {
            eprintln!("✗ {e}");
            std::process::exit(1);
        }
    }
}

/// Rasterize every page. A single page goes to the given path; multiple
/// pages get a numbered suffix before the extension.
fn render_pages_png(
    container: &mut ReportContainer,
    options: &ReportOptions,
    output_path: &str,
) -> Result<Vec<(String, Vec<u8>)>, folio::FolioError> {
    let device = DeviceProfile::default();
    let size = report_size(container.width, options.margin, options.orientation, Some(&device));
    let pages = paginate(
        container.detach_elements(),
        options.margin,
        size,
        options.header.as_deref(),
        options.footer.as_deref(),
        &options.data,
    );

    let mut outputs = Vec::with_capacity(pages.len());
    for page in &pages {
        let arranged = arrange(page);
        let canvas = render_page(&arranged, &device)?;
        let bytes = encode(&canvas, RasterFormat::Png)?;
        let path = if pages.len() == 1 {
            output_path.to_string()
        } else {
            numbered_path(output_path, page.number)
        };
        outputs.push((path, bytes));
    }
    Ok(outputs)
}

fn numbered_path(path: &str, number: u32) -> String {
    match path.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{number}.{ext}"),
        None => format!("{path}-{number}"),
    }
}

fn example_report_json() -> &'static str {
    r##"{
  "metadata": {
    "title": "Site Inspection Report",
    "author": "folio"
  },
  "margin": { "top": 48, "right": 48, "bottom": 48, "left": 48 },
  "orientation": "Portrait",
  "header": "{data.site} — inspection",
  "footer": "Page {page} of {pages}",
  "data": { "site": "North Plant" },
  "container": {
    "width": 720,
    "elements": [
      {
        "id": "title-block",
        "margin": { "top": 0, "right": 0, "bottom": 12, "left": 0 },
        "visual": {
          "width": 720,
          "height": 60,
          "commands": [
            { "type": "Rect", "x": 0, "y": 0, "width": 720, "height": 60,
              "fill": { "r": 0.12, "g": 0.12, "b": 0.18, "a": 1.0 } },
            { "type": "Text", "x": 16, "y": 18, "content": "SITE INSPECTION",
              "font_size": 24, "color": { "r": 1, "g": 1, "b": 1, "a": 1 } }
          ]
        }
      },
      {
        "id": "summary",
        "margin": { "top": 0, "right": 0, "bottom": 8, "left": 0 },
        "visual": {
          "width": 720,
          "height": 120,
          "commands": [
            { "type": "Text", "x": 0, "y": 4, "content": "Findings summary",
              "font_size": 14, "color": { "r": 0, "g": 0, "b": 0, "a": 1 } },
            { "type": "Line", "x1": 0, "y1": 28, "x2": 720, "y2": 28,
              "stroke": { "width": 0.5, "color": { "r": 0.5, "g": 0.5, "b": 0.5, "a": 1 } } },
            { "type": "Text", "x": 0, "y": 40, "content": "All perimeter checks passed.",
              "font_size": 11, "color": { "r": 0.2, "g": 0.2, "b": 0.2, "a": 1 } }
          ]
        }
      },
      {
        "id": "readings",
        "visual": {
          "width": 720,
          "height": 480,
          "commands": [
            { "type": "Rect", "x": 0, "y": 0, "width": 720, "height": 480,
              "stroke": { "width": 1, "color": { "r": 0.7, "g": 0.7, "b": 0.7, "a": 1 } } },
            { "type": "Text", "x": 12, "y": 12, "content": "Sensor readings",
              "font_size": 12, "color": { "r": 0, "g": 0, "b": 0, "a": 1 } }
          ]
        }
      }
    ]
  }
}"##
}
