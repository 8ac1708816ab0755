pub mod encode_config;
pub mod encode_logger;
pub mod encode_video_use_case;
pub mod encoding_session;
pub mod run_report;
pub mod stats_accumulator;
pub mod timing;
