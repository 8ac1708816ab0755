pub mod encoded_frame;
pub mod encoder_config;
pub mod video_encoder;
