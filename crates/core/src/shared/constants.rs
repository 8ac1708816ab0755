/// Path value that binds a stream to the process's stdin or stdout.
pub const STDIO_SENTINEL: &str = "-";

pub const DEFAULT_CODEC: &str = "libx265";

/// Frame rate assumed for raw input when none is given.
pub const DEFAULT_FPS: (u32, u32) = (25, 1);

/// Encoder input dimensions are rounded up to this multiple.
pub const FRAME_ALIGNMENT: u32 = 2;

/// PSNR reported for a plane with zero squared error.
pub const MAX_PSNR: f64 = 100.0;

/// Frames buffered between the encoder and the reconstruction writer thread.
pub const RECON_CHANNEL_CAPACITY: usize = 8;
