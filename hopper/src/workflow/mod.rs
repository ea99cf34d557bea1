pub mod config;
pub mod events;
pub mod plots;
pub mod runner;
