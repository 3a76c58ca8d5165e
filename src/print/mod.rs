//! # Print Sink
//!
//! Abstraction over platform print APIs. The pipeline hands each arranged
//! page to a [`PrintAdapter`] synchronously, one `submit_page` call per page
//! with a formatted page label. Platform bindings live outside this crate;
//! [`RecordingAdapter`] is the in-memory reference implementation used by
//! tests and headless runs.

use tracing::debug;

use crate::error::FolioError;
use crate::layout::ArrangedPage;

/// Inclusive selection of pages to spool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageRange {
    #[default]
    All,
    Range {
        start: u32,
        end: u32,
    },
}

impl PageRange {
    pub fn contains(&self, page: u32) -> bool {
        match self {
            PageRange::All => true,
            PageRange::Range { start, end } => *start <= page && page <= *end,
        }
    }
}

/// Handle for one print job in progress.
pub trait PrintJobHandle {
    type Error;

    fn submit_page(&mut self, label: &str, page: &ArrangedPage) -> Result<(), Self::Error>;
    fn finish(self) -> Result<(), Self::Error>;
}

/// Abstraction over platform-specific print APIs.
pub trait PrintAdapter {
    type Error: std::fmt::Display;
    type JobHandle: PrintJobHandle<Error = Self::Error>;

    fn begin_job(&self, document_name: &str) -> Result<Self::JobHandle, Self::Error>;
}

/// Submit arranged pages to an adapter, labelling each as
/// `"{label_prefix} {number}"`. Pages outside `range` are skipped.
pub fn spool_pages<A: PrintAdapter>(
    adapter: &A,
    document_name: &str,
    label_prefix: &str,
    range: &PageRange,
    pages: &[ArrangedPage],
) -> Result<(), FolioError> {
    let mut handle = adapter
        .begin_job(document_name)
        .map_err(|e| FolioError::Print(e.to_string()))?;

    let mut submitted = 0u32;
    for page in pages {
        if !range.contains(page.number) {
            continue;
        }
        let label = format!("{label_prefix} {}", page.number);
        handle
            .submit_page(&label, page)
            .map_err(|e| FolioError::Print(e.to_string()))?;
        submitted += 1;
    }

    handle
        .finish()
        .map_err(|e| FolioError::Print(e.to_string()))?;
    debug!(document = document_name, submitted, "print job spooled");
    Ok(())
}

/// A page captured by the [`RecordingAdapter`].
#[derive(Debug, Clone)]
pub struct RecordedPage {
    pub label: String,
    pub number: u32,
    pub command_count: usize,
}

/// A completed job captured by the [`RecordingAdapter`].
#[derive(Debug, Clone)]
pub struct RecordedJob {
    pub document_name: String,
    pub pages: Vec<RecordedPage>,
}

/// In-memory print adapter: records every submitted page. Doubles as the
/// reference implementation for platform bindings.
#[derive(Debug, Clone, Default)]
pub struct RecordingAdapter {
    jobs: std::sync::Arc<std::sync::Mutex<Vec<RecordedJob>>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<RecordedJob> {
        self.jobs.lock().expect("lock poisoned").clone()
    }
}

pub struct RecordingJobHandle {
    document_name: String,
    pages: Vec<RecordedPage>,
    sink: std::sync::Arc<std::sync::Mutex<Vec<RecordedJob>>>,
}

impl PrintAdapter for RecordingAdapter {
    type Error = String;
    type JobHandle = RecordingJobHandle;

    fn begin_job(&self, document_name: &str) -> Result<Self::JobHandle, Self::Error> {
        Ok(RecordingJobHandle {
            document_name: document_name.to_string(),
            pages: Vec::new(),
            sink: self.jobs.clone(),
        })
    }
}

impl PrintJobHandle for RecordingJobHandle {
    type Error = String;

    fn submit_page(&mut self, label: &str, page: &ArrangedPage) -> Result<(), Self::Error> {
        self.pages.push(RecordedPage {
            label: label.to_string(),
            number: page.number,
            command_count: page.commands.len(),
        });
        Ok(())
    }

    fn finish(self) -> Result<(), Self::Error> {
        let mut guard = self.sink.lock().expect("lock poisoned");
        guard.push(RecordedJob {
            document_name: self.document_name,
            pages: self.pages,
        });
        Ok(())
    }
}

/// Adapter that fails on a chosen page. Exists so the restore-on-failure
/// contract can be exercised end to end.
#[derive(Debug, Clone)]
pub struct FailingAdapter {
    pub fail_on_page: u32,
}

pub struct FailingJobHandle {
    fail_on_page: u32,
}

impl PrintAdapter for FailingAdapter {
    type Error = String;
    type JobHandle = FailingJobHandle;

    fn begin_job(&self, _document_name: &str) -> Result<Self::JobHandle, Self::Error> {
        Ok(FailingJobHandle {
            fail_on_page: self.fail_on_page,
        })
    }
}

impl PrintJobHandle for FailingJobHandle {
    type Error = String;

    fn submit_page(&mut self, _label: &str, page: &ArrangedPage) -> Result<(), Self::Error> {
        if page.number == self.fail_on_page {
            Err(format!("device rejected page {}", page.number))
        } else {
            Ok(())
        }
    }

    fn finish(self) -> Result<(), Self::Error> {
        Ok(())
    }
}
