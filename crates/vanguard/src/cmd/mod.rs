use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode frames from a capture file or stdin.
    Decode(DecodeArgs),
    /// Build frames and write them as raw bytes or hex.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read. Default: stdin.
    pub file: Option<PathBuf>,
    /// Input is hex text (whitespace ignored) instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Drop frames whose crc32 does not match their data.
    #[arg(long)]
    pub verify_checksum: bool,
    /// Stop after N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame timestamp in seconds since the Unix epoch. Default: now.
    #[arg(long, global = true)]
    pub timestamp: Option<u32>,
    /// Write one hex line per frame instead of raw bytes.
    #[arg(long, global = true)]
    pub hex: bool,
    /// Write to FILE instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", global = true)]
    pub out: Option<PathBuf>,

    #[command(subcommand)]
    pub message: EncodeMessage,
}

#[derive(Subcommand, Debug)]
pub enum EncodeMessage {
    /// Keep-alive probe.
    Ping(MagicArgs),
    /// Keep-alive answer.
    Pong(MagicArgs),
    /// GPS fix.
    Location(LocationArgs),
    /// Device health sample.
    Telemetry(TelemetryArgs),
    /// Photo file, split into chunks.
    Photo(PhotoArgs),
    /// Tell the camera to start capturing a photo.
    StartPhoto(StartPhotoArgs),
    /// Tell the camera to stop capturing.
    StopPhoto,
    /// Program file, split into upload chunks.
    Upload(UploadArgs),
    /// Program output and exit code, split into result chunks.
    Result(ResultArgs),
}

#[derive(Args, Debug)]
pub struct MagicArgs {
    #[arg(long, default_value_t = 0)]
    pub magic: u32,
}

#[derive(Args, Debug)]
pub struct LocationArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub alt: f32,
    /// GPS fix quality.
    #[arg(long, default_value_t = 0)]
    pub quality: u8,
    #[arg(long, default_value_t = 0)]
    pub satellites: u8,
    #[arg(long, default_value_t = 0.0)]
    pub speed: f32,
}

#[derive(Args, Debug)]
pub struct TelemetryArgs {
    /// Seconds since boot.
    #[arg(long, default_value_t = 0)]
    pub uptime: u32,
    /// 0 preflight, 1 ascent, 2 descent, 3 landed.
    #[arg(long, default_value_t = 0)]
    pub mode: u8,
    /// CPU usage percentage. Default: unknown.
    #[arg(long)]
    pub cpu: Option<u8>,
    /// Free memory in KiB.
    #[arg(long, default_value_t = 0)]
    pub free_mem: u16,
    #[arg(long, allow_negative_numbers = true)]
    pub int_temp: Option<f32>,
    #[arg(long)]
    pub int_humidity: Option<f32>,
    #[arg(long, allow_negative_numbers = true)]
    pub ext_temp: Option<f32>,
}

#[derive(Args, Debug)]
pub struct PhotoArgs {
    /// Photo file to send.
    pub file: PathBuf,
    /// Photo number.
    #[arg(long, default_value_t = 0)]
    pub index: u16,
}

#[derive(Args, Debug)]
pub struct StartPhotoArgs {
    /// Photo number.
    #[arg(long, default_value_t = 0)]
    pub index: u16,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Program file to send.
    pub file: PathBuf,
    #[arg(long, default_value_t = 0)]
    pub index: u16,
    /// Program name on the device. Default: the file name.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResultArgs {
    /// Program name the output belongs to.
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value_t = 0)]
    pub index: u16,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub exit_code: i8,
    /// File holding the program output. Default: empty output.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
