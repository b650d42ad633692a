//! Evaluation sink implementations.

pub mod http;

pub use http::HttpEvaluationSink;
