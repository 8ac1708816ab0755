use std::io;
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use yuvenc_core::encoding::domain::encoder_config::EncoderConfig;
use yuvenc_core::encoding::infrastructure::ffmpeg_encoder::FfmpegEncoderBackend;
use yuvenc_core::output::infrastructure::file_stream_provider::FileStreamProvider;
use yuvenc_core::pipeline::encode_config::{parse_codec_option, parse_frame_rate, EncodeConfig};
use yuvenc_core::pipeline::encode_logger::ReportLogger;
use yuvenc_core::pipeline::encoding_session::{EncodingSession, SessionError};
use yuvenc_core::shared::constants::DEFAULT_CODEC;
use yuvenc_core::shared::dimensions::Dimensions;
use yuvenc_core::shared::stream_path::StreamPath;

/// Encodes raw planar YUV 4:2:0 video into an elementary bitstream.
#[derive(Parser)]
#[command(name = "yuvenc", version)]
struct Cli {
    /// Raw YUV 4:2:0 input file ("-" reads standard input).
    #[arg(short, long)]
    input: String,

    /// Bitstream output file ("-" writes standard output).
    #[arg(short, long)]
    output: String,

    /// Also write the reconstructed frames to this file.
    #[arg(short, long)]
    debug: Option<String>,

    /// Input resolution.
    #[arg(long, value_name = "WxH")]
    input_res: Dimensions,

    /// Number of frames to encode (0 = all).
    #[arg(short = 'n', long, default_value_t = 0)]
    frames: u64,

    /// Number of input frames to skip before encoding.
    #[arg(long, default_value_t = 0)]
    seek: u64,

    /// Encoder to use, by libavcodec name.
    #[arg(long, default_value = DEFAULT_CODEC)]
    codec: String,

    /// Input frame rate as N or N/D.
    #[arg(long, value_name = "FPS", default_value = "25", value_parser = parse_frame_rate)]
    input_fps: (u32, u32),

    /// Constant quantization parameter.
    #[arg(long)]
    qp: Option<u8>,

    /// Encoder worker threads (0 = auto).
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Extra encoder option, may be repeated.
    #[arg(long = "codec-opt", value_name = "KEY=VALUE", value_parser = parse_codec_option)]
    codec_opts: Vec<(String, String)>,
}

impl Cli {
    fn into_config(self) -> EncodeConfig {
        EncodeConfig {
            input: StreamPath::parse(&self.input),
            output: StreamPath::parse(&self.output),
            debug: self.debug.as_deref().map(StreamPath::parse),
            frame_limit: self.frames,
            seek: self.seek,
            encoder: EncoderConfig {
                codec: self.codec,
                source: self.input_res,
                fps: self.input_fps,
                qp: self.qp,
                threads: self.threads,
                options: self.codec_opts,
            },
        }
    }
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            e.exit()
        }
        Err(e) => {
            print_usage();
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = ReportLogger::new(io::stderr());

    let session = match EncodingSession::open(
        cli.into_config(),
        &FileStreamProvider,
        &FfmpegEncoderBackend,
        &mut logger,
    ) {
        Ok(session) => session,
        Err(SessionError::Config(e)) => {
            print_usage();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    session.run(&mut logger)?;
    Ok(())
}

fn print_usage() {
    let mut command = Cli::command();
    eprint!("{}", command.render_version());
    eprintln!("{}", command.render_help());
}
