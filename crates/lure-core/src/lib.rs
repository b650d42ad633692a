//! Conversation orchestration for the Lure honeypot.
//!
//! This crate holds the protocol and state-machine logic: SSE stream
//! decoding, message assembly, reply orchestration, intelligence
//! extraction, and final-result submission. It defines the "ports"
//! (`LlmProvider`, `EvaluationSink`) that `lure-infra` implements and never
//! depends on an HTTP client itself.

pub mod agent;
pub mod event;
pub mod finalize;
pub mod intelligence;
pub mod llm;
pub mod reply;
pub mod session;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_support;
