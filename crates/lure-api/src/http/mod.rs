//! HTTP layer: the honeypot wire contract plus session inspection routes.

pub mod error;
pub mod handlers;
pub mod router;
