//! Final-result submission to the external evaluator.

pub mod finalizer;
pub mod sink;

pub use finalizer::{ResultFinalizer, SUBMISSION_SUCCESS};
pub use sink::{BoxEvaluationSink, EvaluationSink};
