pub mod core;
pub mod models;
pub mod api;
pub mod natpmp;
pub mod health;
pub mod utils;
