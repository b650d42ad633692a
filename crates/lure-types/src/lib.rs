//! Shared domain types for Lure.
//!
//! This crate contains the domain types used across the honeypot:
//! conversation messages, intelligence reports, the external wire contract,
//! session events, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod intelligence;
pub mod llm;
pub mod wire;
