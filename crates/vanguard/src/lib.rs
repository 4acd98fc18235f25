//! Vanguard telemetry protocol for remote devices on lossy serial or radio links.
//!
//! # Crate Structure
//!
//! - [`frame`]: wire format, encoder, resynchronizing stream decoder, blocking
//!   reader/writer and (behind `async`) a `tokio-util` codec

/// Re-export frame types.
pub mod frame {
    pub use vanguard_frame::*;
}
