//! Varaforge - scaffold, build and test Vara/Gear smart programs
//!
//! This crate provides:
//! - A sandbox that keeps every filesystem path inside a workspace root
//! - A process runner that only executes allowlisted developer tools
//! - Toolchain operations (scaffold, compile, test) built on top of both

pub mod cli;
pub mod concurrency;
pub mod config;
pub mod paths;
pub mod sandbox;
pub mod toolchain;

pub use config::Config;
