mod buffering;
mod sse_parser;

pub use buffering::LineBuffer;
pub use sse_parser::{
    decode_frame, decode_stream, frame_from_line, read_frames, DeltaStream, FrameDecoder,
    FrameStream, DATA_PREFIX, DONE_MARKER,
};
