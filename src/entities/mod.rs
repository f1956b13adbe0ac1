pub mod address;
pub mod booking;
pub mod garage;
pub mod review;
pub mod user;
