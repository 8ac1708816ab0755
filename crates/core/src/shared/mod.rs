pub mod constants;
pub mod dimensions;
pub mod raw_frame;
pub mod stream_path;
