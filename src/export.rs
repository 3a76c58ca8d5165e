//! Caller-facing export and print operations.
//!
//! Every operation here blocks until complete. The paginated entry points
//! follow one shape: prompt → derive the report size → detach the
//! container's elements → paginate → arrange → hand pages to a sink →
//! restore. Restoration is owned by [`RestoreGuard`], a drop guard that
//! dismantles the pages and reattaches the original elements in original
//! order on *every* exit path — normal return, cancellation, or a sink
//! error propagating through `?`. A visual belongs to exactly one container
//! at a time; the guard is what makes that invariant survive failures.

use std::path::Path;

use tracing::debug;

use crate::dialog::{FileFilter, PrintDialog, SaveDialog};
use crate::error::FolioError;
use crate::layout::{arrange, paginate, report_size, summarize, ArrangedPage, ReportPage};
use crate::model::{DeviceProfile, Edges, Metadata, Orientation, ReportContainer, Visual};
use crate::package::{convert_to_pdf, write_package, write_visual_package};
use crate::pdf::PdfWriter;
use crate::print::{spool_pages, PageRange, PrintAdapter};
use crate::render::{encode, render_page, RasterFormat};
use crate::template::PageTemplate;

/// How a blocking operation ended. Cancelling a prompt is normal control
/// flow: nothing was written, nothing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed,
    Cancelled,
}

/// Configuration for the paginated entry points.
pub struct ReportOptions {
    /// Page content inset on all four sides.
    pub margin: Edges,
    /// Controls the width/height ratio derivation.
    pub orientation: Orientation,
    /// Optional per-page leading content.
    pub header: Option<Box<dyn PageTemplate>>,
    /// Optional per-page trailing content.
    pub footer: Option<Box<dyn PageTemplate>>,
    /// Prefix for per-page print labels ("{prefix} {n}").
    pub page_label: String,
    /// Which pages a print job spools.
    pub page_range: PageRange,
    /// Opaque data context, passed through to templates only.
    pub data: serde_json::Value,
    pub metadata: Metadata,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            margin: Edges::default(),
            orientation: Orientation::Portrait,
            header: None,
            footer: None,
            page_label: "Page".to_string(),
            page_range: PageRange::All,
            data: serde_json::Value::Null,
            metadata: Metadata::default(),
        }
    }
}

/// Holds the pages built from a container's detached elements and guarantees
/// the elements return home. Dropping the guard drains every page in order
/// and reattaches the elements to the source container.
struct RestoreGuard<'a> {
    container: &'a mut ReportContainer,
    pages: Vec<ReportPage>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        for page in &mut self.pages {
            self.container.attach_elements(page.take_elements());
        }
        self.pages.clear();
    }
}

/// Detach, paginate, and wrap in a restore guard.
fn paginate_detached<'a>(
    container: &'a mut ReportContainer,
    options: &ReportOptions,
    size: crate::layout::Size,
) -> RestoreGuard<'a> {
    let elements = container.detach_elements();
    let pages = paginate(
        elements,
        options.margin,
        size,
        options.header.as_deref(),
        options.footer.as_deref(),
        &options.data,
    );
    RestoreGuard { container, pages }
}

/// Paginate and render a report to PDF bytes without any prompt. The
/// container is emptied for the duration of the call and restored before it
/// returns. This is the path the CLI drives.
pub fn render_report_pdf(
    container: &mut ReportContainer,
    options: &ReportOptions,
    device: Option<&DeviceProfile>,
) -> Result<Vec<u8>, FolioError> {
    let package = render_report_package(container, options, device)?;
    convert_to_pdf(&package)
}

/// Paginate and render a report into fixed-page document package bytes.
pub fn render_report_package(
    container: &mut ReportContainer,
    options: &ReportOptions,
    device: Option<&DeviceProfile>,
) -> Result<Vec<u8>, FolioError> {
    let size = report_size(container.width, options.margin, options.orientation, device);
    let guard = paginate_detached(container, options, size);
    let arranged: Vec<ArrangedPage> = guard.pages.iter().map(arrange).collect();
    debug!(summary = ?summarize(&guard.pages), "report paginated");
    write_package(&arranged, &options.metadata)
}

/// Divide a container's elements into pages and submit them to a printer.
///
/// Opens the printer prompt; cancellation is a no-op. The chosen ticket's
/// device drives the page aspect ratio. Each page is submitted with the
/// label `"{page_label} {n}"`.
pub fn print_report<A: PrintAdapter>(
    container: &mut ReportContainer,
    options: &ReportOptions,
    dialog: &dyn PrintDialog,
    adapter: &A,
) -> Result<ExportOutcome, FolioError> {
    let Some(ticket) = dialog.choose_printer() else {
        return Ok(ExportOutcome::Cancelled);
    };
    let size = report_size(
        container.width,
        options.margin,
        options.orientation,
        Some(&ticket.device),
    );
    let document_name = options
        .metadata
        .title
        .clone()
        .unwrap_or_else(|| "Report".to_string());

    let guard = paginate_detached(container, options, size);
    let arranged: Vec<ArrangedPage> = guard.pages.iter().map(arrange).collect();
    spool_pages(
        adapter,
        &document_name,
        &options.page_label,
        &options.page_range,
        &arranged,
    )?;
    Ok(ExportOutcome::Completed)
}

/// Divide a container's elements into pages and export them as a PDF file.
///
/// Opens the save prompt; cancellation is a no-op. Sizing uses the default
/// device profile. The report is written into an in-memory package first,
/// then converted — the same two-step path a saved package would take.
pub fn export_report_as_pdf(
    container: &mut ReportContainer,
    options: &ReportOptions,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    let Some(path) = dialog.choose_save_path(&FileFilter::PDF) else {
        return Ok(ExportOutcome::Cancelled);
    };
    let size = report_size(container.width, options.margin, options.orientation, None);
    let guard = paginate_detached(container, options, size);
    let arranged: Vec<ArrangedPage> = guard.pages.iter().map(arrange).collect();
    let package = write_package(&arranged, &options.metadata)?;
    let pdf = convert_to_pdf(&package)?;
    write_file(&path, &pdf)?;
    Ok(ExportOutcome::Completed)
}

/// Export one visual tree as a fixed-page document package file.
pub fn export_visual_as_package(
    visual: &Visual,
    metadata: &Metadata,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    let Some(path) = dialog.choose_save_path(&FileFilter::PACKAGE) else {
        return Ok(ExportOutcome::Cancelled);
    };
    let bytes = write_visual_package(visual, metadata)?;
    write_file(&path, &bytes)?;
    Ok(ExportOutcome::Completed)
}

/// Export one visual tree as a single-page PDF file.
pub fn export_visual_as_pdf(
    visual: &Visual,
    metadata: &Metadata,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    let Some(path) = dialog.choose_save_path(&FileFilter::PDF) else {
        return Ok(ExportOutcome::Cancelled);
    };
    let page = crate::layout::arrange_visual(visual);
    let pdf = PdfWriter::new().write(&[page], metadata)?;
    write_file(&path, &pdf)?;
    Ok(ExportOutcome::Completed)
}

/// Export one visual tree as a PNG at the device's reported DPI.
pub fn export_visual_as_png(
    visual: &Visual,
    device: &DeviceProfile,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    save_visual_image(visual, device, RasterFormat::Png, &FileFilter::PNG, dialog)
}

/// Export one visual tree as a JPEG (quality 100) at the device's DPI.
pub fn export_visual_as_jpeg(
    visual: &Visual,
    device: &DeviceProfile,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    save_visual_image(visual, device, RasterFormat::Jpeg, &FileFilter::JPEG, dialog)
}

/// Export one visual tree as a BMP at the device's DPI.
pub fn export_visual_as_bmp(
    visual: &Visual,
    device: &DeviceProfile,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    save_visual_image(visual, device, RasterFormat::Bmp, &FileFilter::BMP, dialog)
}

fn save_visual_image(
    visual: &Visual,
    device: &DeviceProfile,
    format: RasterFormat,
    filter: &FileFilter,
    dialog: &dyn SaveDialog,
) -> Result<ExportOutcome, FolioError> {
    let Some(path) = dialog.choose_save_path(filter) else {
        return Ok(ExportOutcome::Cancelled);
    };
    let page = crate::layout::arrange_visual(visual);
    let canvas = render_page(&page, device)?;
    let bytes = encode(&canvas, format)?;
    write_file(&path, &bytes)?;
    Ok(ExportOutcome::Completed)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), FolioError> {
    std::fs::write(path, bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "export written");
    Ok(())
}
