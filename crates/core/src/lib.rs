//! Driver pipeline for encoding raw planar YUV video through a streaming
//! encoder.
//!
//! The encoder is reached through the [`encoding::domain::video_encoder`]
//! port; [`pipeline::encoding_session::EncodingSession`] owns every resource
//! of one run and [`pipeline::encode_video_use_case::EncodeVideoUseCase`]
//! drives frames through it.

pub mod encoding;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod shared;
