pub mod ffmpeg_encoder;
