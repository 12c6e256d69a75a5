pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod feedback;
pub mod logging;
pub mod ui;
