//! Reply generation: persona directives and the per-turn orchestrator.

pub mod orchestrator;
pub mod persona;

pub use orchestrator::{
    EMPTY_REPLY_FALLBACK, REPLY_ERROR_MESSAGE, ReplyOrchestrator, ReplySettings, TurnOutcome,
};
pub use persona::resolve_persona;
