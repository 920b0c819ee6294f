//! # SchoolHub
//!
//! The SchoolHub server: HTTP API, CLI commands, token auth and the SMS
//! gateway client. Records and business rules live in `schoolhub_core`.

pub mod api;
pub mod auth;
pub mod cli;
pub mod sms;

pub use schoolhub_core;
