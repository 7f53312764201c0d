// Simulated motor controller for running the panel without hardware

pub mod config;
pub mod device;
pub mod server;

pub use config::SimConfig;
pub use device::{Device, Reply, SimMotor, SimUpdate};
pub use server::{serve, serve_listener, WS_PATH};
