pub mod card;
pub mod error;

pub use card::{card, stat_row};
pub use error::html_error_response;
