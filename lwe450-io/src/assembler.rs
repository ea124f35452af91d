//! Stream assembler for LWE450 sentences
//!
//! Turns arbitrarily fragmented byte chunks into validated [`Message`]s.
//!
//! # Framing
//!
//! ```text
//! chunk 1: "...garbage\nUdPbC\s:EI99"      chunk 2: "99,d:AI9610*7C\r\nRaUd"
//!           └─ dropped ─┘└─ remainder ─┘             └─ completes line ─┘└ remainder ┘
//! ```
//!
//! - Lines are split on `\n` and trimmed of trailing ` `, `\r`, `\t`
//! - Lines whose first five bytes are not a known [`Tag`](crate::protocol::Tag) are dropped silently
//! - The unterminated tail is carried into the next call
//! - Every message from one call carries that call's arrival time
//!
//! The unterminated tail is capped (default [`DEFAULT_MAX_REMAINDER`]). A
//! stream that never sends a delimiter gets [`Error::FramingOverflow`] and
//! the tail is discarded so the next delimiter resynchronizes.

use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::protocol::{trim_line, Message, DELIMITER};

/// Default cap on buffered unterminated bytes
pub const DEFAULT_MAX_REMAINDER: usize = 64 * 1024;

/// Receiver of assembled messages
///
/// Called synchronously from inside [`Lwe450Assembler::ingest`], once per
/// accepted line and in line order.
pub trait Sink {
    fn deliver(&mut self, message: &Message, arrival: SystemTime);
}

impl<F> Sink for F
where
    F: FnMut(&Message, SystemTime),
{
    fn deliver(&mut self, message: &Message, arrival: SystemTime) {
        self(message, arrival)
    }
}

/// Line assembler for one LWE450 byte stream
///
/// One instance per stream. `ingest` takes `&mut self`, so calls on a single
/// instance are serialized by construction.
pub struct Lwe450Assembler<S: Sink> {
    sink: S,
    remainder: Vec<u8>,
    max_remainder: usize,
}

impl<S: Sink> Lwe450Assembler<S> {
    /// Create an assembler with the default remainder cap
    pub fn new(sink: S) -> Self {
        Self::with_max_remainder(sink, DEFAULT_MAX_REMAINDER)
    }

    /// Create an assembler with an explicit remainder cap
    pub fn with_max_remainder(sink: S, max_remainder: usize) -> Self {
        Self {
            sink,
            remainder: Vec::new(),
            max_remainder,
        }
    }

    /// Feed one chunk received at `arrival`.
    ///
    /// All complete lines in `remainder + chunk` are dispatched before this
    /// returns. Fails only when the unterminated tail exceeds the cap; lines
    /// completed earlier in the same call have already been delivered.
    pub fn ingest(&mut self, chunk: &[u8], arrival: SystemTime) -> Result<()> {
        let Self {
            sink,
            remainder,
            max_remainder,
        } = self;

        remainder.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(offset) = remainder[consumed..]
            .iter()
            .position(|&b| b == DELIMITER)
        {
            let line = trim_line(&remainder[consumed..consumed + offset]);
            consumed += offset + 1;

            match Message::from_line(line) {
                Some(message) => {
                    log::trace!("{} ({} bytes payload)", message.tag, message.payload.len());
                    sink.deliver(&message, arrival);
                }
                None => {
                    log::trace!("Dropped unrecognized line ({} bytes)", line.len());
                }
            }
        }

        // O(n) shift of the tail only, which is bounded by the cap
        remainder.drain(..consumed);

        if remainder.len() > *max_remainder {
            let len = remainder.len();
            remainder.clear();
            return Err(Error::FramingOverflow {
                len,
                max: *max_remainder,
            });
        }

        Ok(())
    }

    /// Bytes buffered since the last delimiter
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    /// Configured remainder cap
    pub fn max_remainder(&self) -> usize {
        self.max_remainder
    }

    /// The sink receiving messages
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the assembler, returning the sink. Any buffered tail is lost.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Tag;
    use std::time::{Duration, UNIX_EPOCH};

    #[derive(Default)]
    struct Collect(Vec<(Message, SystemTime)>);

    impl Sink for Collect {
        fn deliver(&mut self, message: &Message, arrival: SystemTime) {
            self.0.push((message.clone(), arrival));
        }
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_partial_line_uses_completing_timestamp() {
        let mut a = Lwe450Assembler::new(Collect::default());

        a.ingest(b"RrUdP,abc", at(1)).unwrap();
        assert!(a.sink().0.is_empty());
        assert_eq!(a.remainder(), b"RrUdP,abc");

        a.ingest(b",def\r\n", at(2)).unwrap();
        let out = &a.sink().0;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, Message::new(Tag::RrUdP, ",abc,def"));
        assert_eq!(out[0].1, at(2));
        assert!(a.remainder().is_empty());
    }

    #[test]
    fn test_one_timestamp_per_chunk() {
        let mut a = Lwe450Assembler::new(Collect::default());
        a.ingest(b"UdPbC1\nRaUdP2\nNkPgN3\n", at(7)).unwrap();

        let out = &a.sink().0;
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|(_, t)| *t == at(7)));
        let tags: Vec<Tag> = out.iter().map(|(m, _)| m.tag).collect();
        assert_eq!(tags, vec![Tag::UdPbC, Tag::RaUdP, Tag::NkPgN]);
    }

    #[test]
    fn test_all_tags_accepted() {
        let mut a = Lwe450Assembler::new(Collect::default());
        for tag in Tag::ALL {
            a.ingest(format!("{}payload\n", tag).as_bytes(), at(0)).unwrap();
        }
        assert_eq!(a.sink().0.len(), Tag::ALL.len());
    }

    #[test]
    fn test_short_and_empty_lines_dropped() {
        let mut a = Lwe450Assembler::new(Collect::default());
        a.ingest(b"\n\r\nUdP\n \t\nRrTc\n", at(0)).unwrap();
        assert!(a.sink().0.is_empty());
        assert!(a.remainder().is_empty());
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let mut a = Lwe450Assembler::new(Collect::default());
        a.ingest(b"RrTcPxyz\r", at(1)).unwrap();
        assert!(a.sink().0.is_empty());
        a.ingest(b"\n", at(2)).unwrap();
        assert_eq!(a.sink().0, vec![(Message::new(Tag::RrTcP, "xyz"), at(2))]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut a = Lwe450Assembler::new(Collect::default());
        for b in b"UdPbC\\s:EI9999*7C\r\nNkPgN!\n" {
            a.ingest(std::slice::from_ref(b), at(3)).unwrap();
        }
        let out = &a.sink().0;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0.payload, b"\\s:EI9999*7C");
        assert_eq!(out[1].0, Message::new(Tag::NkPgN, "!"));
    }

    #[test]
    fn test_overflow_clears_and_resyncs() {
        let mut a = Lwe450Assembler::with_max_remainder(Collect::default(), 16);

        a.ingest(b"0123456789", at(0)).unwrap();
        let err = a.ingest(b"0123456789", at(1)).unwrap_err();
        assert!(matches!(err, Error::FramingOverflow { len: 20, max: 16 }));
        assert!(a.remainder().is_empty());

        // Next delimiter realigns the stream
        a.ingest(b"junk\nUdPbCok\n", at(2)).unwrap();
        assert_eq!(a.sink().0, vec![(Message::new(Tag::UdPbC, "ok"), at(2))]);
    }

    #[test]
    fn test_remainder_at_cap_is_kept() {
        let mut a = Lwe450Assembler::with_max_remainder(Collect::default(), 8);
        let cap = a.max_remainder();

        a.ingest(&vec![b'x'; cap], at(0)).unwrap();
        assert_eq!(a.remainder().len(), cap);

        let err = a.ingest(b"x", at(1)).unwrap_err();
        assert!(matches!(err, Error::FramingOverflow { len: 9, max: 8 }));
        assert!(a.remainder().is_empty());
    }

    #[test]
    fn test_non_utf8_payload_delivered_verbatim() {
        let mut a = Lwe450Assembler::new(Collect::default());
        a.ingest(b"UdPbC,\xb0\xff,x\r\n", at(4)).unwrap();

        let out = &a.sink().0;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0.tag, Tag::UdPbC);
        assert_eq!(out[0].0.payload, b",\xb0\xff,x");
    }

    #[test]
    fn test_overflow_after_delivering_complete_lines() {
        let mut a = Lwe450Assembler::with_max_remainder(Collect::default(), 4);
        let err = a.ingest(b"RaUdP1\nRaUdP2 and a long tail", at(5));
        assert!(matches!(err, Err(Error::FramingOverflow { .. })));
        assert_eq!(a.sink().0, vec![(Message::new(Tag::RaUdP, "1"), at(5))]);
    }

    #[test]
    fn test_closure_sink() {
        let mut count = 0;
        {
            let mut a = Lwe450Assembler::new(|_: &Message, _: SystemTime| count += 1);
            a.ingest(b"UdPbCa\nUdPbCb\n", at(0)).unwrap();
        }
        assert_eq!(count, 2);
    }
}
