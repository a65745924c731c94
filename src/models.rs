pub mod auth;
pub mod contacts;
pub mod dashboard;
pub mod import;
pub mod presence;
