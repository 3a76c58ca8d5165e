//! Interactive prompt seam.
//!
//! Every export that writes to disk asks a [`SaveDialog`] for a location;
//! every print asks a [`PrintDialog`] for a target. Cancellation is `None`
//! and makes the whole operation a silent no-op — it is never an error.
//! Interactive front-ends implement these traits; the fixed implementations
//! here cover headless use and tests.

use std::path::PathBuf;

use crate::model::DeviceProfile;

/// Extension filter for a save prompt.
#[derive(Debug, Clone, Copy)]
pub struct FileFilter {
    pub extension: &'static str,
    pub description: &'static str,
}

impl FileFilter {
    pub const PDF: FileFilter = FileFilter {
        extension: "pdf",
        description: "PDF Documents",
    };
    pub const PACKAGE: FileFilter = FileFilter {
        extension: "fpkg",
        description: "Fixed-Page Document Packages",
    };
    pub const PNG: FileFilter = FileFilter {
        extension: "png",
        description: "PNG Images",
    };
    pub const JPEG: FileFilter = FileFilter {
        extension: "jpg",
        description: "JPEG Images",
    };
    pub const BMP: FileFilter = FileFilter {
        extension: "bmp",
        description: "BMP Images",
    };
}

/// Where a print job should go: a named target plus its printable area.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintTicket {
    pub target: String,
    pub device: DeviceProfile,
}

impl Default for PrintTicket {
    fn default() -> Self {
        let device = DeviceProfile::default();
        Self {
            target: device.name.clone(),
            device,
        }
    }
}

/// Save-location prompt. `None` means the user cancelled.
pub trait SaveDialog {
    fn choose_save_path(&self, filter: &FileFilter) -> Option<PathBuf>;
}

/// Printer-selection prompt. `None` means the user cancelled.
pub trait PrintDialog {
    fn choose_printer(&self) -> Option<PrintTicket>;
}

/// Always answers with a preconfigured path.
#[derive(Debug, Clone)]
pub struct FixedPathDialog {
    path: PathBuf,
}

impl FixedPathDialog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SaveDialog for FixedPathDialog {
    fn choose_save_path(&self, _filter: &FileFilter) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

/// Always answers with a preconfigured ticket.
#[derive(Debug, Clone, Default)]
pub struct FixedTicketDialog {
    ticket: PrintTicket,
}

impl FixedTicketDialog {
    pub fn new(ticket: PrintTicket) -> Self {
        Self { ticket }
    }
}

impl PrintDialog for FixedTicketDialog {
    fn choose_printer(&self) -> Option<PrintTicket> {
        Some(self.ticket.clone())
    }
}

/// Always cancels. Useful for exercising the no-op paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDialog;

impl SaveDialog for NullDialog {
    fn choose_save_path(&self, _filter: &FileFilter) -> Option<PathBuf> {
        None
    }
}

impl PrintDialog for NullDialog {
    fn choose_printer(&self) -> Option<PrintTicket> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_path_answers_every_filter() {
        let dialog = FixedPathDialog::new("/tmp/out.pdf");
        assert_eq!(
            dialog.choose_save_path(&FileFilter::PDF),
            Some(PathBuf::from("/tmp/out.pdf"))
        );
        assert_eq!(
            dialog.choose_save_path(&FileFilter::PNG),
            Some(PathBuf::from("/tmp/out.pdf"))
        );
    }

    #[test]
    fn null_dialog_cancels() {
        assert!(NullDialog.choose_save_path(&FileFilter::BMP).is_none());
        assert!(NullDialog.choose_printer().is_none());
    }

    #[test]
    fn default_ticket_uses_default_device() {
        let ticket = PrintTicket::default();
        assert_eq!(ticket.target, "Letter");
        assert_eq!(ticket.device, DeviceProfile::letter());
    }
}
