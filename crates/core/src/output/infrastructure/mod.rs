pub mod file_stream_provider;
pub mod recon_writer;
