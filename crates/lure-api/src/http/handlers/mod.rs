//! HTTP request handlers.

pub mod analyze;
pub mod honeypot;
pub mod session;
