pub mod config;
pub mod database;
pub mod logging;
pub mod persistence;
pub mod scheduler;
