//! tabsuspend — the tab-state core of an automatic tab suspender.
//!
//! This library crate exposes all modules for use by the replay binary and integration tests.

pub mod app;
pub mod host;
pub mod managers;
pub mod services;
pub mod types;
