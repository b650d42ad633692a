pub mod decoder;

pub use decoder::{DeltaStream, SseDecoder, decode_stream};
