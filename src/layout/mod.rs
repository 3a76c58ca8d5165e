//! # Page-Native Report Pagination
//!
//! The heart of folio. A report is a linear stack of pre-measured elements;
//! the page is the unit of output. The paginator walks the stack once,
//! accumulating elements into the current page until the next element would
//! exceed the usable height, then closes the page and opens the next one.
//! Content never gets sliced after the fact — it flows *into* pages.
//!
//! Two deliberate boundary rules, both load-bearing:
//!
//! - The overflow test is strict `>`: an element that exactly fills the
//!   remaining space stays on the current page.
//! - An element taller than the usable height is never split. It becomes the
//!   sole content of its page and overflows silently. Whole-element placement
//!   is the contract; splitting is out of scope.
//!
//! After assignment, every page goes through an arrange pass that produces
//! concrete, absolutely-positioned output ([`ArrangedPage`]) — the moral
//! equivalent of forcing a measure/arrange/layout pass so downstream sinks
//! see real dimensions, not constraints.

use serde_json::Value;
use tracing::debug;

use crate::model::{DeviceProfile, DrawCommand, Edges, Orientation, ReportElement, Visual};
use crate::template::{PageTemplate, TemplateContext};

/// Width and height of the report page, in DIU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Derive the report page size from the source container's rendered width.
///
/// The width is the container width plus horizontal margins. The height
/// scales the device's printable aspect ratio against that width — inverted
/// for landscape — so pages keep the output medium's proportions no matter
/// how wide the on-screen container happens to be. Pure arithmetic; a
/// default device profile is instantiated when none is supplied.
pub fn report_size(
    container_width: f64,
    margin: Edges,
    orientation: Orientation,
    device: Option<&DeviceProfile>,
) -> Size {
    let default_device;
    let device = match device {
        Some(d) => d,
        None => {
            default_device = DeviceProfile::default();
            &default_device
        }
    };

    let width = container_width + margin.left + margin.right;
    let height = match orientation {
        Orientation::Portrait => width / device.area_width * device.area_height,
        Orientation::Landscape => width / device.area_height * device.area_width,
    };
    Size { width, height }
}

/// One paginated unit: an ordered run of elements plus the optional header
/// and footer visuals instantiated for this page.
#[derive(Debug, Clone)]
pub struct ReportPage {
    /// 1-based page number.
    pub number: u32,
    pub size: Size,
    pub margin: Edges,
    pub header: Option<Visual>,
    pub footer: Option<Visual>,
    elements: Vec<ReportElement>,
}

impl ReportPage {
    fn new(number: u32, size: Size, margin: Edges) -> Self {
        Self {
            number,
            size,
            margin,
            header: None,
            footer: None,
            elements: Vec::new(),
        }
    }

    /// Running content height: the sum of every assigned element's visual
    /// height plus its own vertical margins. Header and footer do not count
    /// against the content region.
    pub fn content_height(&self) -> f64 {
        self.elements.iter().map(ReportElement::outer_height).sum()
    }

    pub fn elements(&self) -> &[ReportElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Move the assigned elements back out, dismantling the page. The
    /// restore step drains pages in order to rebuild the source container.
    pub fn take_elements(&mut self) -> Vec<ReportElement> {
        std::mem::take(&mut self.elements)
    }
}

/// Totals produced by a pagination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSummary {
    pub total_pages: u32,
    pub total_elements: usize,
}

pub fn summarize(pages: &[ReportPage]) -> PaginationSummary {
    PaginationSummary {
        total_pages: pages.len() as u32,
        total_elements: pages.iter().map(|p| p.elements.len()).sum(),
    }
}

/// Partition `elements` into pages with a single greedy pass.
///
/// Every input element lands on exactly one page, in input order. Once the
/// total page count is known, header/footer templates are instantiated for
/// each page with the full context (so `{pages}` resolves). The algorithm
/// cannot fail on well-formed input and always terminates in O(n).
pub fn paginate(
    elements: Vec<ReportElement>,
    margin: Edges,
    size: Size,
    header: Option<&dyn PageTemplate>,
    footer: Option<&dyn PageTemplate>,
    data: &Value,
) -> Vec<ReportPage> {
    let usable_height = size.height - margin.top - margin.bottom;
    let total_elements = elements.len();

    let mut pages = Vec::new();
    let mut current = ReportPage::new(1, size, margin);

    for element in elements {
        let outer = element.outer_height();
        if !current.is_empty() && current.content_height() + outer > usable_height {
            let number = current.number;
            pages.push(current);
            current = ReportPage::new(number + 1, size, margin);
        }
        if outer > usable_height {
            debug!(
                page = current.number,
                height = outer,
                usable = usable_height,
                "element taller than usable page height, placed alone"
            );
        }
        current.elements.push(element);
    }
    pages.push(current);

    let total_pages = pages.len() as u32;
    let content_width = size.width - margin.horizontal();
    for page in &mut pages {
        let ctx = TemplateContext {
            page_number: page.number,
            page_count: Some(total_pages),
            content_width,
            data,
        };
        page.header = header.map(|t| t.instantiate(&ctx));
        page.footer = footer.map(|t| t.instantiate(&ctx));
    }

    debug!(
        pages = total_pages,
        elements = total_elements,
        "pagination complete"
    );
    pages
}

/// A page after the forced layout pass: concrete dimensions and a flat,
/// absolutely-positioned display list. This is the only shape the sinks see.
#[derive(Debug, Clone)]
pub struct ArrangedPage {
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

/// Lay a page out at its final size: header at the top margin, elements
/// stacked beneath it (each shifted by its own margins), footer pinned just
/// above the bottom margin.
pub fn arrange(page: &ReportPage) -> ArrangedPage {
    let content_x = page.margin.left;
    let mut commands = Vec::new();
    let mut y = page.margin.top;

    if let Some(header) = &page.header {
        for command in &header.commands {
            commands.push(command.offset(content_x, y));
        }
        y += header.height;
    }

    for element in &page.elements {
        y += element.margin.top;
        let x = content_x + element.margin.left;
        for command in &element.visual.commands {
            commands.push(command.offset(x, y));
        }
        y += element.visual.height + element.margin.bottom;
    }

    if let Some(footer) = &page.footer {
        let footer_y = page.size.height - page.margin.bottom - footer.height;
        for command in &footer.commands {
            commands.push(command.offset(content_x, footer_y));
        }
    }

    ArrangedPage {
        number: page.number,
        width: page.size.width,
        height: page.size.height,
        commands,
    }
}

/// Wrap a single visual as a one-off arranged page of its own size, for the
/// ad-hoc export paths that bypass pagination entirely.
pub fn arrange_visual(visual: &Visual) -> ArrangedPage {
    ArrangedPage {
        number: 1,
        width: visual.width,
        height: visual.height,
        commands: visual.commands.clone(),
    }
}
