pub mod parsed;
pub mod reconcile;

pub use reconcile::{import_parsed, ImportProgress};
