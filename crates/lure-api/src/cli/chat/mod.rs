//! Interactive chat: the operator types the scammer's lines and watches
//! the persona answer. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
