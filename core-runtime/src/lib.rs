//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback session
//! controller:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Typed session events and the broadcast event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback core depends on.
//! It establishes the logging conventions, configuration validation and
//! event broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
