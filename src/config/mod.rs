//! # Configuration
//!
//! Controller-level settings. Everything is read once from the environment
//! at startup and passed down by reference.

pub mod controller;

pub use controller::ControllerConfig;
