//! Per-session conversation state.
//!
//! [`MessageAssembler`] owns the ordered message log and applies streamed
//! deltas; [`Session`] wraps it with the current intelligence report and the
//! counters that keep background extractions from clobbering newer results.

pub mod assembler;
pub mod state;

pub use assembler::MessageAssembler;
pub use state::{ExtractionTicket, PendingExtraction, Session, SessionSnapshot};
