//! LWE450 listener - sentence gatherer and logger
//!
//! Reassembles LWE450 sentences from a fragmented byte stream and hands them
//! on to a message bus or a rotating daily log.
//!
//! ## Layers
//!
//! - [`assembler`]: line framing, tag validation, remainder carry-over
//! - [`transport`]: UDP/TCP chunk sources
//! - [`bus`]: multicast publish/subscribe of sentence envelopes
//! - [`recording`]: daily rotating log files
//! - [`sinks`], [`app`]: composition of the above into gather and log modes
//!
//! ## Example
//!
//! ```
//! use lwe450_io::{Lwe450Assembler, Message};
//! use std::time::SystemTime;
//!
//! let mut sentences = Vec::new();
//! let mut assembler = Lwe450Assembler::new(|msg: &Message, _: SystemTime| {
//!     sentences.push(msg.clone());
//! });
//! assembler.ingest(b"UdPbC\\s:EI9999*7C\r\nUdPb", SystemTime::now())?;
//! drop(assembler);
//! assert_eq!(sentences.len(), 1);
//! # Ok::<(), lwe450_io::Error>(())
//! ```

pub mod app;
pub mod assembler;
pub mod bus;
pub mod config;
pub mod error;
pub mod protocol;
pub mod recording;
pub mod sinks;
pub mod transport;

// Re-export commonly used types
pub use assembler::{Lwe450Assembler, Sink};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use protocol::{Message, Tag};
