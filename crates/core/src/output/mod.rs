pub mod domain;
pub mod infrastructure;
pub mod output_sink;
