pub mod stream_provider;
