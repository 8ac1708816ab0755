pub mod yuv_frame_source;
