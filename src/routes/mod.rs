pub mod activity;
pub mod assets;
pub mod auth;
pub mod employees;
pub mod health;
pub mod portal;
pub mod tickets;
pub mod users;
