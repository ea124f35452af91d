//! Bus envelope and datagram framing
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ Protobuf Envelope        │
//! └──────────────────┴──────────────────────────┘
//! ```

use crate::error::{Error, Result};
use crate::protocol::{micros_since_epoch, Message, Tag};
use prost::Message as ProstMessage;
use std::time::SystemTime;

/// Data type id carried by LWE450 envelopes
pub const LWE450_DATA_TYPE: i32 = 450;

/// Length prefix size
pub const LENGTH_PREFIX: usize = 4;

/// One sentence on the bus
#[derive(Clone, PartialEq, prost::Message)]
pub struct Envelope {
    /// Identifies the payload type; LWE450 envelopes use [`LWE450_DATA_TYPE`]
    #[prost(int32, tag = "1")]
    pub data_type: i32,
    /// Publish time (µs since epoch)
    #[prost(uint64, tag = "2")]
    pub sent_us: u64,
    /// Arrival time of the chunk that completed the sentence (µs since epoch)
    #[prost(uint64, tag = "3")]
    pub sample_time_us: u64,
    /// Sender id of the publishing process
    #[prost(uint32, tag = "4")]
    pub sender_stamp: u32,
    #[prost(string, tag = "5")]
    pub header: String,
    /// Sentence bytes after the tag, verbatim
    #[prost(bytes = "vec", tag = "6")]
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Wrap a message for publishing
    pub fn from_message(
        message: &Message,
        sample_time: SystemTime,
        sent: SystemTime,
        sender_stamp: u32,
    ) -> Self {
        Self {
            data_type: LWE450_DATA_TYPE,
            sent_us: micros_since_epoch(sent),
            sample_time_us: micros_since_epoch(sample_time),
            sender_stamp,
            header: message.tag.as_str().to_string(),
            payload: message.payload.clone(),
        }
    }

    pub fn is_lwe450(&self) -> bool {
        self.data_type == LWE450_DATA_TYPE
    }

    /// The carried sentence, if its header is a recognized tag
    pub fn message(&self) -> Option<Message> {
        let tag = Tag::from_bytes(self.header.as_bytes())?;
        Some(Message::new(tag, self.payload.clone()))
    }
}

/// Serialize an envelope with its length prefix into `buffer`
///
/// The buffer is cleared first so it can be reused across sends.
pub fn encode_frame(envelope: &Envelope, buffer: &mut Vec<u8>) -> Result<()> {
    let len = envelope.encoded_len();
    buffer.clear();
    buffer.reserve(LENGTH_PREFIX + len);
    buffer.extend_from_slice(&(len as u32).to_be_bytes());
    envelope.encode(buffer)?;
    Ok(())
}

/// Parse one length-prefixed datagram
pub fn decode_frame(datagram: &[u8]) -> Result<Envelope> {
    if datagram.len() < LENGTH_PREFIX {
        return Err(Error::InvalidFrame(format!(
            "datagram too short: {} bytes",
            datagram.len()
        )));
    }

    let msg_len = u32::from_be_bytes([datagram[0], datagram[1], datagram[2], datagram[3]]) as usize;
    let body = &datagram[LENGTH_PREFIX..];
    if msg_len > body.len() {
        return Err(Error::InvalidFrame(format!(
            "incomplete: expected {} + {} bytes, got {}",
            msg_len,
            LENGTH_PREFIX,
            datagram.len()
        )));
    }

    Ok(Envelope::decode(&body[..msg_len])?)
}
