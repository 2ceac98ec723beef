pub mod color;
pub mod config;
pub mod data;
pub mod forest;
pub mod plot;
pub mod server;
pub mod stats;
