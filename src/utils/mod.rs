pub mod earnings;
pub mod jwt;
pub mod lifecycle;
pub mod ordering;
