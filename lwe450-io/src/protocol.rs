//! LWE450 sentence vocabulary
//!
//! Every sentence on the wire is a single line:
//!
//! ```text
//! ┌───────────────┬──────────────────────────────────┬──────┐
//! │ Tag (5 bytes) │ Payload (variable, verbatim)     │ \n   │
//! └───────────────┴──────────────────────────────────┴──────┘
//! ```
//!
//! Example:
//!
//! ```text
//! UdPbC\s:EI9999,d:AI9610,n:270*7C\!EIABB,04,04,9,265503900,5,,,WWwwwwp202T84=R3I`VfWOwwwwp20,4*50
//! ```
//!
//! Only the tag is inspected. The payload bytes are carried through
//! untouched, whether or not they are valid UTF-8.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Length of the sentence tag in bytes
pub const TAG_LEN: usize = 5;

/// Line delimiter
pub const DELIMITER: u8 = b'\n';

/// Bytes stripped from the end of every line
pub const TRAILING_WHITESPACE: &[u8] = b" \n\r\t";

/// Recognized sentence classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    UdPbC,
    RaUdP,
    RrUdP,
    NkPgN,
    RrTcP,
}

impl Tag {
    /// All recognized tags
    pub const ALL: [Tag; 5] = [Tag::UdPbC, Tag::RaUdP, Tag::RrUdP, Tag::NkPgN, Tag::RrTcP];

    /// Match the first bytes of a line against the vocabulary.
    ///
    /// Returns `None` for anything that is not exactly one of the five tags.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"UdPbC" => Some(Tag::UdPbC),
            b"RaUdP" => Some(Tag::RaUdP),
            b"RrUdP" => Some(Tag::RrUdP),
            b"NkPgN" => Some(Tag::NkPgN),
            b"RrTcP" => Some(Tag::RrTcP),
            _ => None,
        }
    }

    /// Wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tag::UdPbC => "UdPbC",
            Tag::RaUdP => "RaUdP",
            Tag::RrUdP => "RrUdP",
            Tag::NkPgN => "NkPgN",
            Tag::RrTcP => "RrTcP",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::from_bytes(s.as_bytes())
            .ok_or_else(|| Error::InvalidParameter(format!("unknown LWE450 tag: {:?}", s)))
    }
}

/// One validated sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tag: Tag,
    /// Line bytes after the tag, verbatim
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(tag: Tag, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// Build a message from a trimmed line, or `None` if the tag is not recognized
    pub fn from_line(line: &[u8]) -> Option<Self> {
        let tag = Tag::from_bytes(line.get(..TAG_LEN)?)?;
        Some(Self {
            tag,
            payload: line[TAG_LEN..].to_vec(),
        })
    }

    /// The sentence as it appeared on the wire, without the delimiter
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(TAG_LEN + self.payload.len());
        bytes.extend_from_slice(self.tag.as_str().as_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

impl fmt::Display for Message {
    /// Tag and payload for console output; invalid UTF-8 is shown as U+FFFD
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, String::from_utf8_lossy(&self.payload))
    }
}

/// Strip trailing `' '`, `\n`, `\r` and `\t` bytes
pub fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !TRAILING_WHITESPACE.contains(b))
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Timestamp in microseconds since epoch
pub fn micros_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Inverse of [`micros_since_epoch`]
pub fn from_micros(micros: u64) -> SystemTime {
    UNIX_EPOCH + std::time::Duration::from_micros(micros)
}
