//! Utilities shared by platform sync binaries and services.

pub mod logging;
