pub mod app;
pub mod log_viewer;
pub mod sort;
pub mod view;
