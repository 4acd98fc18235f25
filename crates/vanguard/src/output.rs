use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vanguard_frame::format::frame_size;
use vanguard_frame::message::{
    Message, Payload, CPU_UNKNOWN, MODE_ASCENT, MODE_DESCENT, MODE_LANDED, MODE_PREFLIGHT,
    TEMP_UNKNOWN,
};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRecord<'a> {
    #[serde(flatten)]
    message: &'a Message,
    frame_size: usize,
    checksum_ok: bool,
}

/// Accumulates decoded messages for table output; other formats print immediately.
pub struct MessagePrinter {
    format: OutputFormat,
    table: Option<Table>,
}

impl MessagePrinter {
    pub fn new(format: OutputFormat) -> Self {
        let table = (format == OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIMESTAMP", "TYPE", "LEN", "CRC", "FIELDS"]);
            table
        });
        Self { format, table }
    }

    pub fn print(&mut self, message: &Message) {
        match self.format {
            OutputFormat::Json => {
                let record = MessageRecord {
                    message,
                    frame_size: frame_size(message.header.data_length),
                    checksum_ok: message.verify_checksum().is_ok(),
                };
                println!(
                    "{}",
                    serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        message.header.timestamp.to_string(),
                        message.label().to_string(),
                        message.header.data_length.to_string(),
                        crc_cell(message),
                        describe(&message.payload),
                    ]);
                }
            }
            OutputFormat::Pretty => {
                println!(
                    "ts={} type={} len={} crc={} {}",
                    message.header.timestamp,
                    message.label(),
                    message.header.data_length,
                    crc_cell(message),
                    describe(&message.payload)
                );
            }
        }
    }

    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }
}

fn crc_cell(message: &Message) -> String {
    let mark = if message.verify_checksum().is_ok() {
        "ok"
    } else {
        "BAD"
    };
    format!("{:08x} {mark}", message.header.crc32)
}

/// One-line field summary of a payload.
pub fn describe(payload: &Payload) -> String {
    match payload {
        Payload::Location(loc) => format!(
            "lat={:.6} lon={:.6} alt={:.1} quality={} satellites={} speed={:.1}",
            loc.lat, loc.lon, loc.alt, loc.quality, loc.satellites, loc.speed
        ),
        Payload::Telemetry(t) => format!(
            "uptime={}s mode={} cpu={} freeMem={}KiB intTemp={} intHumidity={} extTemp={}",
            t.uptime,
            mode_name(t.mode),
            if t.cpu == CPU_UNKNOWN {
                "?".to_string()
            } else {
                format!("{}%", t.cpu)
            },
            t.free_mem,
            reading(t.int_temp),
            reading(t.int_humidity),
            reading(t.ext_temp)
        ),
        Payload::PhotoData(photo) => format!(
            "index={} chunk={}/{} fileSize={} data={} bytes",
            photo.index,
            photo.chunk,
            photo.chunk_count,
            photo.file_size,
            photo.data.len()
        ),
        Payload::Ping(ping) | Payload::Pong(ping) => format!("magic=0x{:08x}", ping.magic),
        Payload::StartPhotoData(start) => format!("index={}", start.index),
        Payload::StopPhotoData => String::new(),
        Payload::ProgramUpload(upload) => format!(
            "index={} chunk={}/{} name={:?} data={} bytes",
            upload.index,
            upload.chunk,
            upload.chunk_count,
            upload.program_name,
            upload.program_data.len()
        ),
        Payload::ProgramResult(result) => format!(
            "index={} chunk={}/{} name={:?} exitCode={} output={}",
            result.index,
            result.chunk,
            result.chunk_count,
            result.program_name,
            result.exit_code,
            preview(&result.program_data)
        ),
    }
}

fn mode_name(mode: u8) -> String {
    match mode {
        MODE_PREFLIGHT => "preflight".to_string(),
        MODE_ASCENT => "ascent".to_string(),
        MODE_DESCENT => "descent".to_string(),
        MODE_LANDED => "landed".to_string(),
        other => other.to_string(),
    }
}

fn reading(value: f32) -> String {
    if value == TEMP_UNKNOWN {
        "?".to_string()
    } else {
        format!("{value:.1}")
    }
}

fn preview(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => format!("{text:?}"),
        Err(_) => format!("<binary {} bytes>", data.len()),
    }
}
