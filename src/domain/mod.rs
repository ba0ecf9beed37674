pub mod catalog;
pub mod format;
pub mod prices;
pub mod valuation;
