pub mod activity;
pub mod asset;
pub mod employee;
pub mod ticket;
pub mod user;
