mod api_tests;
mod import_tests;
mod page_tests;
