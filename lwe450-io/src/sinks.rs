//! Downstream handling of assembled sentences
//!
//! - [`GatherSink`]: what the gatherer does with each accepted sentence
//!   (publish on the bus, or write to disk in standalone mode; optional echo)
//! - [`LogRecorder`]: what the logger does with each envelope from the bus

use crate::assembler::Sink;
use crate::bus::{BusPublisher, Envelope};
use crate::error::Result;
use crate::protocol::Message;
use crate::recording::{bus_record, gather_record, DailyFileSink};
use std::time::SystemTime;

/// Where gathered sentences go
pub enum GatherOutput {
    /// Publish on the message bus
    Bus(BusPublisher),
    /// Write directly to the daily log (standalone mode)
    Disk(DailyFileSink),
}

/// Sink used by the gatherer
///
/// A failed publish or write is logged and the sentence dropped; ingestion
/// continues with the next one.
pub struct GatherSink {
    output: GatherOutput,
    verbose: bool,
    forwarded: u64,
    failed: u64,
}

impl GatherSink {
    pub fn new(output: GatherOutput, verbose: bool) -> Self {
        Self {
            output,
            verbose,
            forwarded: 0,
            failed: 0,
        }
    }

    /// Sentences successfully published or written
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Sentences lost to publish/write errors
    pub fn failed(&self) -> u64 {
        self.failed
    }

    fn forward(&mut self, message: &Message, arrival: SystemTime) -> Result<()> {
        match &mut self.output {
            GatherOutput::Bus(publisher) => publisher.send(message, arrival),
            GatherOutput::Disk(file) => file.write_line(&gather_record(message, arrival)),
        }
    }
}

impl Sink for GatherSink {
    fn deliver(&mut self, message: &Message, arrival: SystemTime) {
        match self.forward(message, arrival) {
            Ok(()) => self.forwarded += 1,
            Err(e) => {
                self.failed += 1;
                log::warn!("Failed to forward {} sentence: {}", message.tag, e);
            }
        }

        if self.verbose {
            println!("{}", message);
        }
    }
}

/// Records bus envelopes to the daily log
pub struct LogRecorder {
    file: DailyFileSink,
    verbose: bool,
}

impl LogRecorder {
    pub fn new(file: DailyFileSink, verbose: bool) -> Self {
        Self { file, verbose }
    }

    /// Write one envelope as `<sample µs> <sender stamp> <header><payload>`
    pub fn record(&mut self, envelope: &Envelope) -> Result<()> {
        let line = bus_record(envelope);
        self.file.write_line(&line)?;
        if self.verbose {
            println!("{}", String::from_utf8_lossy(&line));
        }
        Ok(())
    }

    pub fn recorded(&self) -> u64 {
        self.file.lines_written()
    }

    pub fn file(&self) -> &DailyFileSink {
        &self.file
    }
}
