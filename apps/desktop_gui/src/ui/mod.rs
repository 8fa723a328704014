//! UI layer for desktop GUI: dashboard app shell and theme.

pub mod app;
pub mod theme;

pub use app::DashboardApp;
