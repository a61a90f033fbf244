//! Sentinel client library
//!
//! This exposes the adapters, the application service and the console
//! front end for testing and embedding.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod console;
pub mod services;
