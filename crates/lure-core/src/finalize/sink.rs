//! The evaluation sink port and its type-erased wrapper.

use std::future::Future;
use std::pin::Pin;

use lure_types::error::SinkError;
use lure_types::intelligence::FinalResult;

/// Destination for final results. Implemented in lure-infra over HTTP.
pub trait EvaluationSink: Send + Sync {
    fn name(&self) -> &str;

    /// POST one payload. Returns the sink's JSON body, if it sent one.
    fn submit(
        &self,
        result: &FinalResult,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, SinkError>> + Send;
}

trait EvaluationSinkDyn: Send + Sync {
    fn name(&self) -> &str;

    fn submit_boxed<'a>(
        &'a self,
        result: &'a FinalResult,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, SinkError>> + Send + 'a>>;
}

impl<T: EvaluationSink> EvaluationSinkDyn for T {
    fn name(&self) -> &str {
        EvaluationSink::name(self)
    }

    fn submit_boxed<'a>(
        &'a self,
        result: &'a FinalResult,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, SinkError>> + Send + 'a>>
    {
        Box::pin(self.submit(result))
    }
}

/// Type-erased [`EvaluationSink`].
pub struct BoxEvaluationSink {
    inner: Box<dyn EvaluationSinkDyn>,
}

impl BoxEvaluationSink {
    pub fn new<T: EvaluationSink + 'static>(sink: T) -> Self {
        Self {
            inner: Box::new(sink),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn submit(
        &self,
        result: &FinalResult,
    ) -> Result<Option<serde_json::Value>, SinkError> {
        self.inner.submit_boxed(result).await
    }
}

impl std::fmt::Debug for BoxEvaluationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxEvaluationSink")
            .field("name", &self.name())
            .finish()
    }
}
