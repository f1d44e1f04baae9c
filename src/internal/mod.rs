pub mod cache;
pub mod models;
pub mod notification;
pub mod recent;
pub mod search;
pub mod stats;
pub mod ui;
