pub mod admin;
pub mod auth;
pub mod garage;
pub mod rider;
