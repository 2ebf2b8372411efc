//! Common utilities and types shared across track binding components.

#![warn(clippy::pedantic)]

/// Module for common data types
pub mod types;
