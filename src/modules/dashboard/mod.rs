pub mod cache;
pub mod controller;

pub use controller::DashboardController;
