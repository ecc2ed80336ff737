//! Formula extraction
//!
//! Choose sheets by policy, read them in formula mode, keep every cell whose
//! text starts with `=`, and write the records to a per-system CSV export.
//! The dump mode reads formulas and displayed values side by side instead.

mod export;
mod scan;
mod selection;

pub use export::{export_dump, export_formulas, export_path, write_dump, EXPORT_HEADER};
pub use scan::{
    dump, extract, is_formula, merge_grids, scan_grid, DumpedCell, ExtractionReport, SheetDump,
    SkippedSheet,
};
pub use selection::{plan_selection, SelectionPlan, SelectionPolicy, SheetVisit, TEMPLATE_TAG};
