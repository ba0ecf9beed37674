pub mod export_xlsx;
pub mod parse_xlsx;

pub use export_xlsx::export_prices_xlsx;
pub use parse_xlsx::{parse_workbook, preview_workbook};
