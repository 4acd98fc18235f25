//! Minimal base-station loop: print every message decoded from stdin.
//!
//! ```text
//! cat /dev/ttyUSB0 | cargo run --example ground-station
//! ```

use vanguard::frame::{FrameError, FrameReader, Payload};

fn main() {
    let mut reader = FrameReader::new(std::io::stdin().lock());

    loop {
        match reader.read_message() {
            Ok(message) => match &message.payload {
                Payload::Location(fix) => println!(
                    "[{}] fix lat={:.5} lon={:.5} alt={:.0}m sats={}",
                    message.header.timestamp, fix.lat, fix.lon, fix.alt, fix.satellites
                ),
                Payload::Telemetry(t) => println!(
                    "[{}] uptime={}s mode={} free={}KiB",
                    message.header.timestamp, t.uptime, t.mode, t.free_mem
                ),
                other => println!("[{}] {:?}", message.header.timestamp, other.message_type()),
            },
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => {
                eprintln!("read failed: {err}");
                std::process::exit(1);
            }
        }
    }

    let stats = reader.stats();
    eprintln!(
        "{} messages, {} noise bytes, {} malformed frames",
        stats.messages, stats.noise_bytes, stats.malformed
    );
}
