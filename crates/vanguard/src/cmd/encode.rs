use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use vanguard_frame::message::{CPU_UNKNOWN, TEMP_UNKNOWN};
use vanguard_frame::{
    photo_chunks, program_result_chunks, program_upload_chunks, Encoder, FrameWriter, Location,
    Payload, Ping, StartPhotoData, Telemetry,
};

use crate::cmd::{EncodeArgs, EncodeMessage};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payloads = build_payloads(args.message)?;
    let encoder = args
        .timestamp
        .map(Encoder::with_timestamp)
        .unwrap_or_default();

    let out: Box<dyn Write> = match &args.out {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("cannot create {}", path.display()), err))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };

    if args.hex {
        write_hex(out, &encoder, &payloads)?;
    } else {
        let mut writer = FrameWriter::with_encoder(out, encoder);
        for payload in &payloads {
            writer
                .send(payload)
                .map_err(|err| frame_error("encode failed", err))?;
        }
    }

    tracing::debug!(frames = payloads.len(), "encode finished");
    Ok(SUCCESS)
}

fn write_hex(mut out: impl Write, encoder: &Encoder, payloads: &[Payload]) -> CliResult<()> {
    for payload in payloads {
        let frame = encoder
            .encode(payload)
            .map_err(|err| frame_error("encode failed", err))?;
        writeln!(out, "{}", hex::encode(frame)).map_err(|err| io_error("write failed", err))?;
    }
    out.flush().map_err(|err| io_error("write failed", err))
}

fn build_payloads(message: EncodeMessage) -> CliResult<Vec<Payload>> {
    let payloads = match message {
        EncodeMessage::Ping(args) => vec![Payload::Ping(Ping { magic: args.magic })],
        EncodeMessage::Pong(args) => vec![Payload::Pong(Ping { magic: args.magic })],
        EncodeMessage::Location(args) => vec![Payload::Location(Location {
            lat: args.lat,
            lon: args.lon,
            alt: args.alt,
            quality: args.quality,
            satellites: args.satellites,
            speed: args.speed,
        })],
        EncodeMessage::Telemetry(args) => vec![Payload::Telemetry(Telemetry {
            uptime: args.uptime,
            mode: args.mode,
            cpu: args.cpu.unwrap_or(CPU_UNKNOWN),
            free_mem: args.free_mem,
            int_temp: args.int_temp.unwrap_or(TEMP_UNKNOWN),
            int_humidity: args.int_humidity.unwrap_or(TEMP_UNKNOWN),
            ext_temp: args.ext_temp.unwrap_or(TEMP_UNKNOWN),
        })],
        EncodeMessage::Photo(args) => {
            let file = read_file(&args.file)?;
            photo_chunks(args.index, file)
                .map_err(|err| frame_error("photo", err))?
                .into_iter()
                .map(Payload::PhotoData)
                .collect()
        }
        EncodeMessage::StartPhoto(args) => {
            let start = StartPhotoData { index: args.index };
            vec![Payload::StartPhotoData(start)]
        }
        EncodeMessage::StopPhoto => vec![Payload::StopPhotoData],
        EncodeMessage::Upload(args) => {
            let name = match args.name {
                Some(name) => name,
                None => file_name(&args.file)?,
            };
            let program = read_file(&args.file)?;
            program_upload_chunks(args.index, &name, program)
                .map_err(|err| frame_error("program upload", err))?
                .into_iter()
                .map(Payload::ProgramUpload)
                .collect()
        }
        EncodeMessage::Result(args) => {
            let output = match &args.output {
                Some(path) => read_file(path)?,
                None => Vec::new(),
            };
            program_result_chunks(args.index, &args.name, args.exit_code, output)
                .map_err(|err| frame_error("program result", err))?
                .into_iter()
                .map(Payload::ProgramResult)
                .collect()
        }
    };
    Ok(payloads)
}

fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|err| io_error(&format!("cannot read {}", path.display()), err))
}

fn file_name(path: &Path) -> CliResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!(
                    "cannot derive a program name from {}; pass --name",
                    path.display()
                ),
            )
        })
}
