//! Integration tests for the folio export pipeline.
//!
//! These tests exercise the full path from a report container to the three
//! sinks. They verify:
//! - pagination assigns every element to exactly one page, in order
//! - page content stays within the usable height (oversized excepted)
//! - the restore discipline holds on success, cancellation, and failure
//! - package and PDF output are structurally valid
//! - raster output honors the device DPI

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use folio::dialog::{FixedPathDialog, FixedTicketDialog, NullDialog, PrintTicket};
use folio::layout::{arrange, paginate, report_size, Size};
use folio::print::{FailingAdapter, PageRange, RecordingAdapter};
use folio::render::{encode, render_page, RasterFormat};
use folio::template::TextTemplate;
use folio::{
    Color, DeviceProfile, DrawCommand, Edges, ExportOutcome, Metadata, Orientation,
    ReportContainer, ReportElement, ReportOptions, Visual,
};

// ─── Helpers ────────────────────────────────────────────────────

fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("folio-it-{}-{n}-{name}", std::process::id()))
}

fn block(height: f64, id: &str) -> ReportElement {
    let mut visual = Visual::new(400.0, height);
    visual.push(DrawCommand::Rect {
        x: 0.0,
        y: 0.0,
        width: 400.0,
        height,
        fill: Some(Color::rgb(0.9, 0.9, 0.95)),
        stroke: None,
    });
    let mut el = ReportElement::new(visual);
    el.id = Some(id.to_string());
    el
}

fn container_with_heights(heights: &[f64]) -> ReportContainer {
    let mut container = ReportContainer::new(400.0);
    for (i, &h) in heights.iter().enumerate() {
        container.push(block(h, &format!("el-{i}")));
    }
    container
}

fn ids(container: &ReportContainer) -> Vec<String> {
    container
        .elements()
        .iter()
        .map(|e| e.id.clone().unwrap())
        .collect()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "missing PDF header");
    assert!(bytes.windows(5).any(|w| w == b"%%EOF"), "missing %%EOF");
    assert!(bytes.windows(4).any(|w| w == b"xref"), "missing xref");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "missing trailer");
}

// ─── Pagination Properties ──────────────────────────────────────

#[test]
fn every_element_on_exactly_one_page_in_order() {
    let heights = [80.0, 120.0, 40.0, 200.0, 60.0, 60.0, 90.0, 30.0];
    let mut container = container_with_heights(&heights);
    let pages = paginate(
        container.detach_elements(),
        Edges::default(),
        Size {
            width: 400.0,
            height: 250.0,
        },
        None,
        None,
        &serde_json::Value::Null,
    );

    let placed: Vec<String> = pages
        .iter()
        .flat_map(|p| p.elements().iter())
        .map(|e| e.id.clone().unwrap())
        .collect();
    let expected: Vec<String> = (0..heights.len()).map(|i| format!("el-{i}")).collect();
    assert_eq!(placed, expected);

    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.number, i as u32 + 1);
    }
}

#[test]
fn five_hundreds_over_two_fifty_gives_two_two_one() {
    let mut container = container_with_heights(&[100.0; 5]);
    let pages = paginate(
        container.detach_elements(),
        Edges::default(),
        Size {
            width: 400.0,
            height: 250.0,
        },
        None,
        None,
        &serde_json::Value::Null,
    );
    let counts: Vec<usize> = pages.iter().map(|p| p.elements().len()).collect();
    assert_eq!(counts, vec![2, 2, 1]);
}

#[test]
fn oversized_element_accepted_overflow() {
    let mut container = container_with_heights(&[500.0]);
    let pages = paginate(
        container.detach_elements(),
        Edges::default(),
        Size {
            width: 400.0,
            height: 250.0,
        },
        None,
        None,
        &serde_json::Value::Null,
    );
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].elements().len(), 1);
    assert!(pages[0].content_height() > 250.0);
}

#[test]
fn content_height_bounded_by_usable_height() {
    let heights = [70.0, 70.0, 70.0, 320.0, 10.0, 240.0, 55.0, 55.0, 55.0, 55.0];
    let margin = Edges::uniform(15.0);
    let size = Size {
        width: 430.0,
        height: 280.0,
    };
    let usable = size.height - margin.vertical();
    let mut container = container_with_heights(&heights);
    let pages = paginate(
        container.detach_elements(),
        margin,
        size,
        None,
        None,
        &serde_json::Value::Null,
    );

    for page in &pages {
        let oversized_alone =
            page.elements().len() == 1 && page.elements()[0].outer_height() > usable;
        if !oversized_alone {
            assert!(
                page.content_height() <= usable,
                "page {} exceeds usable height",
                page.number
            );
        }
    }
}

#[test]
fn report_size_matches_device_ratio() {
    let device = DeviceProfile {
        name: "ratio-test".into(),
        area_width: 600.0,
        area_height: 900.0,
        dpi_x: 96,
        dpi_y: 96,
    };
    let margin = Edges::uniform(10.0);
    let width = 380.0 + margin.horizontal();

    let portrait = report_size(380.0, margin, Orientation::Portrait, Some(&device));
    assert!((portrait.height - width * (900.0 / 600.0)).abs() < 1e-9);

    let landscape = report_size(380.0, margin, Orientation::Landscape, Some(&device));
    assert!((landscape.height - width * (600.0 / 900.0)).abs() < 1e-9);
}

// ─── Restore Discipline ─────────────────────────────────────────

#[test]
fn print_success_restores_original_contents() {
    let mut container = container_with_heights(&[100.0; 5]);
    let before = ids(&container);
    let adapter = RecordingAdapter::new();

    let outcome = folio::print_report(
        &mut container,
        &ReportOptions::default(),
        &FixedTicketDialog::default(),
        &adapter,
    )
    .unwrap();

    assert_eq!(outcome, ExportOutcome::Completed);
    assert_eq!(ids(&container), before);
    assert_eq!(adapter.jobs().len(), 1);
}

#[test]
fn print_failure_still_restores() {
    let mut container = container_with_heights(&[100.0; 5]);
    let before = ids(&container);
    let adapter = FailingAdapter { fail_on_page: 2 };

    let err = folio::print_report(
        &mut container,
        &ReportOptions::default(),
        &FixedTicketDialog::default(),
        &adapter,
    )
    .unwrap_err();

    assert!(err.to_string().contains("device rejected page 2"));
    assert_eq!(ids(&container), before, "restore must run on the error path");
}

#[test]
fn cancelled_save_dialog_writes_nothing() {
    let mut container = container_with_heights(&[100.0; 3]);
    let before = ids(&container);

    let outcome =
        folio::export_report_as_pdf(&mut container, &ReportOptions::default(), &NullDialog)
            .unwrap();

    assert_eq!(outcome, ExportOutcome::Cancelled);
    assert_eq!(ids(&container), before);
}

#[test]
fn cancelled_print_dialog_spools_nothing() {
    let mut container = container_with_heights(&[100.0; 3]);
    let adapter = RecordingAdapter::new();

    let outcome = folio::print_report(
        &mut container,
        &ReportOptions::default(),
        &NullDialog,
        &adapter,
    )
    .unwrap();

    assert_eq!(outcome, ExportOutcome::Cancelled);
    assert!(adapter.jobs().is_empty());
    assert_eq!(container.len(), 3);
}

// ─── Sinks ──────────────────────────────────────────────────────

#[test]
fn pdf_export_end_to_end() {
    let mut container = container_with_heights(&[100.0; 5]);
    let path = temp_path("report.pdf");

    let mut options = ReportOptions::default();
    options.metadata.title = Some("Integration Report".to_string());
    options.header = Some(Box::new(TextTemplate::new("Integration Report")));
    options.footer = Some(Box::new(TextTemplate::new("Page {page} of {pages}")));

    let outcome =
        folio::export_report_as_pdf(&mut container, &options, &FixedPathDialog::new(&path))
            .unwrap();
    assert_eq!(outcome, ExportOutcome::Completed);

    let bytes = std::fs::read(&path).unwrap();
    assert_valid_pdf(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Title (Integration Report)"));
    std::fs::remove_file(&path).ok();

    assert_eq!(container.len(), 5);
}

#[test]
fn package_pipeline_keeps_page_count() {
    let mut container = container_with_heights(&[100.0; 5]);
    // Default letter sizing: height ≈ width × 11 / 8.5, so all five fit
    // differently than the 250-height scenarios; count pages explicitly.
    let size = report_size(
        container.width,
        Edges::default(),
        Orientation::Portrait,
        None,
    );
    let expected_pages = {
        let pages = paginate(
            container.detach_elements(),
            Edges::default(),
            size,
            None,
            None,
            &serde_json::Value::Null,
        );
        let count = pages.len();
        // Put the elements back for the real export below.
        for mut page in pages {
            container.attach_elements(page.take_elements());
        }
        count
    };

    let package =
        folio::render_report_package(&mut container, &ReportOptions::default(), None).unwrap();
    let (pages, _) = folio::package::read_package(&package).unwrap();
    assert_eq!(pages.len(), expected_pages);

    let pdf = folio::package::convert_to_pdf(&package).unwrap();
    assert_valid_pdf(&pdf);
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains(&format!("/Count {expected_pages}")));
}

#[test]
fn print_respects_page_range_and_labels() {
    let mut container = container_with_heights(&[100.0; 5]);
    let adapter = RecordingAdapter::new();
    let ticket = FixedTicketDialog::new(PrintTicket {
        target: "Test Printer".to_string(),
        device: DeviceProfile {
            name: "narrow".into(),
            // 400-wide container on a 400×250 printable area → 250-tall
            // pages, so the 5×100 stack splits [2, 2, 1].
            area_width: 400.0,
            area_height: 250.0,
            dpi_x: 96,
            dpi_y: 96,
        },
    });

    let mut options = ReportOptions::default();
    options.page_label = "Sheet".to_string();
    options.page_range = PageRange::Range { start: 2, end: 3 };

    folio::print_report(&mut container, &options, &ticket, &adapter).unwrap();

    let jobs = adapter.jobs();
    assert_eq!(jobs.len(), 1);
    let labels: Vec<String> = jobs[0].pages.iter().map(|p| p.label.clone()).collect();
    assert_eq!(labels, vec!["Sheet 2", "Sheet 3"]);
}

#[test]
fn header_footer_rendered_on_every_page() {
    let mut container = container_with_heights(&[100.0; 5]);
    let mut options = ReportOptions::default();
    options.footer = Some(Box::new(TextTemplate::new("Page {page} of {pages}")));
    options.data = serde_json::json!({"title": "Plant A"});
    options.header = Some(Box::new(TextTemplate::new("{data.title}")));

    let device = DeviceProfile {
        name: "narrow".into(),
        area_width: 400.0,
        area_height: 250.0,
        dpi_x: 96,
        dpi_y: 96,
    };
    let size = report_size(
        container.width,
        options.margin,
        options.orientation,
        Some(&device),
    );
    let pages = paginate(
        container.detach_elements(),
        options.margin,
        size,
        options.header.as_deref(),
        options.footer.as_deref(),
        &options.data,
    );
    assert_eq!(pages.len(), 3);

    for page in &pages {
        let arranged = arrange(page);
        let texts: Vec<String> = arranged
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"Plant A".to_string()));
        assert!(texts.contains(&format!("Page {} of 3", page.number)));
    }
}

#[test]
fn raster_export_scales_with_dpi() {
    let mut visual = Visual::new(96.0, 192.0);
    visual.push(DrawCommand::Rect {
        x: 0.0,
        y: 0.0,
        width: 96.0,
        height: 192.0,
        fill: Some(Color::rgb(0.0, 0.0, 0.0)),
        stroke: None,
    });

    let device = DeviceProfile {
        name: "hidpi".into(),
        area_width: 816.0,
        area_height: 1056.0,
        dpi_x: 192,
        dpi_y: 192,
    };
    let page = folio::layout::arrange_visual(&visual);
    let canvas = render_page(&page, &device).unwrap();
    assert_eq!(canvas.dimensions(), (192, 384));

    let png = encode(&canvas, RasterFormat::Png).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.width(), 192);
    assert_eq!(decoded.height(), 384);
}

#[test]
fn visual_image_exports_write_all_three_formats() {
    let mut visual = Visual::new(50.0, 50.0);
    visual.push(DrawCommand::Rect {
        x: 10.0,
        y: 10.0,
        width: 30.0,
        height: 30.0,
        fill: Some(Color::rgb(0.8, 0.1, 0.1)),
        stroke: None,
    });
    let device = DeviceProfile::default();

    let png = temp_path("v.png");
    folio::export_visual_as_png(&visual, &device, &FixedPathDialog::new(&png)).unwrap();
    assert!(std::fs::read(&png).unwrap().starts_with(&[0x89, 0x50]));
    std::fs::remove_file(&png).ok();

    let jpg = temp_path("v.jpg");
    folio::export_visual_as_jpeg(&visual, &device, &FixedPathDialog::new(&jpg)).unwrap();
    assert!(std::fs::read(&jpg).unwrap().starts_with(&[0xFF, 0xD8]));
    std::fs::remove_file(&jpg).ok();

    let bmp = temp_path("v.bmp");
    folio::export_visual_as_bmp(&visual, &device, &FixedPathDialog::new(&bmp)).unwrap();
    assert!(std::fs::read(&bmp).unwrap().starts_with(b"BM"));
    std::fs::remove_file(&bmp).ok();
}

#[test]
fn visual_package_and_pdf_exports() {
    let mut visual = Visual::new(300.0, 150.0);
    visual.push(DrawCommand::Text {
        x: 10.0,
        y: 10.0,
        content: "standalone visual".to_string(),
        font_size: 14.0,
        color: Color::BLACK,
    });

    let pkg = temp_path("v.fpkg");
    folio::export_visual_as_package(&visual, &Metadata::default(), &FixedPathDialog::new(&pkg))
        .unwrap();
    let bytes = std::fs::read(&pkg).unwrap();
    assert!(bytes.starts_with(b"PK"));
    let (pages, _) = folio::package::read_package(&bytes).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].width, 300.0);
    std::fs::remove_file(&pkg).ok();

    let pdf = temp_path("v.pdf");
    folio::export_visual_as_pdf(&visual, &Metadata::default(), &FixedPathDialog::new(&pdf))
        .unwrap();
    assert_valid_pdf(&std::fs::read(&pdf).unwrap());
    std::fs::remove_file(&pdf).ok();
}

// ─── CLI Schema ─────────────────────────────────────────────────

#[test]
fn report_container_deserializes_from_json() {
    let json = r##"{
        "width": 500,
        "elements": [
            {
                "id": "a",
                "visual": {
                    "width": 500, "height": 80,
                    "commands": [
                        { "type": "Text", "x": 0, "y": 0, "content": "hello",
                          "font_size": 12,
                          "color": { "r": 0, "g": 0, "b": 0, "a": 1 } }
                    ]
                }
            }
        ]
    }"##;
    let container: ReportContainer = serde_json::from_str(json).unwrap();
    assert_eq!(container.width, 500.0);
    assert_eq!(container.len(), 1);
    assert_eq!(container.elements()[0].visual.height, 80.0);
}
