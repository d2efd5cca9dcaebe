pub mod dashboard_profile;
pub mod secrets;
