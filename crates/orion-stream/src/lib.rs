pub mod buffer_utils;
pub mod decoder;
pub mod error;
pub mod http;
pub mod traits;

pub use buffer_utils::{
    decode_frame, decode_stream, read_frames, DeltaStream, FrameDecoder, FrameStream, LineBuffer,
};
pub use decoder::MultiFormatDecoder;
pub use error::{ChatError, DecodeSkip};
pub use http::HttpChatTransport;
pub use traits::{ChatRequest, ChatTransport};
