pub mod auth;
pub mod contact_service;
pub mod dashboard_service;
pub mod export_service;

pub use auth::AuthService;
pub use contact_service::ContactService;
pub use dashboard_service::DashboardService;
