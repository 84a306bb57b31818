//! # bloom common library
//!
//! Shared code for the bloom services:
//! - Error type used across crates
//! - Root folder and TOML configuration resolution
//! - Database initialization and schema

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
