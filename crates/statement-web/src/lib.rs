//! Web front end and command line for the statement renderer.

pub mod config;
pub mod server;
