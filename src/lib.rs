//! # Folio
//!
//! A page-native report pagination and export engine.
//!
//! A report starts life as a vertical stack of pre-measured visual elements.
//! Folio partitions that stack into discrete pages sized to a target medium
//! (a printer's printable area or an export canvas), wraps each page with
//! optional header/footer content, and renders the pages to one of three
//! sinks: a print adapter, a fixed-page document package (convertible to
//! PDF), or raster images.
//!
//! The page is the unit of output: the paginator makes one greedy pass and
//! every placement decision is made against the page boundary. Elements are
//! *moved* into pages — a visual belongs to exactly one container at a time —
//! and a drop guard moves them back to the source container on every exit
//! path, including sink failures.
//!
//! ## Architecture
//!
//! ```text
//! Caller (elements + options)
//!       ↓
//!   [model]    — visuals, elements, containers, device profiles
//!       ↓
//!   [layout]   — page sizing, greedy pagination, arrange pass
//!       ↓
//!   [export]   — prompt, detach, paginate, sink, restore
//!      ↙ ↓ ↘
//! [print] [package → pdf] [render]
//! ```

pub mod dialog;
pub mod error;
pub mod export;
pub mod layout;
pub mod model;
pub mod package;
pub mod pdf;
pub mod print;
pub mod render;
pub mod template;

pub use dialog::{FileFilter, PrintDialog, PrintTicket, SaveDialog};
pub use error::FolioError;
pub use export::{
    export_report_as_pdf, export_visual_as_bmp, export_visual_as_jpeg, export_visual_as_package,
    export_visual_as_pdf, export_visual_as_png, print_report, render_report_package,
    render_report_pdf, ExportOutcome, ReportOptions,
};
pub use layout::{paginate, report_size, ArrangedPage, ReportPage, Size};
pub use model::{
    Color, DeviceProfile, DrawCommand, Edges, Metadata, Orientation, ReportContainer,
    ReportElement, Visual,
};
pub use print::{PageRange, PrintAdapter, RecordingAdapter};
pub use template::{PageTemplate, TemplateAlign, TemplateContext, TextTemplate};
