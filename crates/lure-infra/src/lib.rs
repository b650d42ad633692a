//! Infrastructure layer for Lure.
//!
//! Implements the ports defined in `lure-core` over HTTP: an
//! OpenAI-compatible inference client and the evaluation callback sink.
//! Also loads configuration and resolves the data directory.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_server;
