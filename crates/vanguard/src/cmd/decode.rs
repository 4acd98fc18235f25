use std::fs::File;
use std::io::{BufReader, Cursor, Read};

use vanguard_frame::{FrameError, FrameReader, ReaderConfig};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{MessagePrinter, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(&args)?;
    let mut config = ReaderConfig::default();
    config.decoder.verify_checksum = args.verify_checksum;
    let mut reader = FrameReader::with_config(input, config);
    let mut printer = MessagePrinter::new(format);
    let mut printed = 0usize;

    while args.count.is_none_or(|count| printed < count) {
        match reader.read_message() {
            Ok(message) => {
                printer.print(&message);
                printed += 1;
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }
    printer.finish();

    let stats = reader.stats();
    tracing::info!(
        messages = stats.messages,
        noise_bytes = stats.noise_bytes,
        malformed = stats.malformed,
        "decode finished"
    );

    Ok(SUCCESS)
}

fn open_input(args: &DecodeArgs) -> CliResult<Box<dyn Read>> {
    let raw: Box<dyn Read> = match &args.file {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("cannot open {}", path.display()), err))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(std::io::stdin().lock()),
    };

    if !args.hex {
        return Ok(raw);
    }

    let bytes = decode_hex(raw)?;
    Ok(Box::new(Cursor::new(bytes)))
}

fn decode_hex(mut input: impl Read) -> CliResult<Vec<u8>> {
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .map_err(|err| io_error("read failed", err))?;
    let digits: String = text.split_whitespace().collect();
    hex::decode(digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_input_ignores_whitespace() {
        let bytes = decode_hex(Cursor::new("a3 9a\n00 01\t0c")).unwrap();
        assert_eq!(bytes, [0xA3, 0x9A, 0x00, 0x01, 0x0C]);
    }

    #[test]
    fn bad_hex_is_data_invalid() {
        let err = decode_hex(Cursor::new("a3 9")).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
