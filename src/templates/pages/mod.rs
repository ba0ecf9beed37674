pub mod admin;
pub mod home;

pub use admin::{admin_page, AdminVm};
pub use home::home_page;
