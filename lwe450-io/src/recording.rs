//! Rotating daily sentence log
//!
//! Records one line per sentence into a file that rotates at local midnight:
//!
//! ```text
//! LWE450/messages.txt  →  LWE450/messages_2021-06-01.txt
//!                         LWE450/messages_2021-06-02.txt
//! ```
//!
//! Lines are raw bytes: payloads are written exactly as received. Every
//! line is flushed as it is written so a crash loses at most the sentence
//! in flight.

use crate::bus::Envelope;
use crate::error::Result;
use crate::protocol::{micros_since_epoch, Message};
use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Daily rotating line writer
pub struct DailyFileSink {
    base: PathBuf,
    date: NaiveDate,
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
}

impl DailyFileSink {
    /// Open (append) today's file for `base`, creating parent directories
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        Self::open_on(base, Local::now().date_naive())
    }

    /// Open the file for a given date
    pub fn open_on(base: impl AsRef<Path>, date: NaiveDate) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let path = dated_path(&base, date);
        let writer = open_append(&path)?;
        log::info!("Recording sentences to {}", path.display());

        Ok(Self {
            base,
            date,
            path,
            writer,
            lines_written: 0,
        })
    }

    /// Append a line, rotating first if the local date changed
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.write_line_on(Local::now().date_naive(), line)
    }

    /// Append a line as of `date`
    pub fn write_line_on(&mut self, date: NaiveDate, line: &[u8]) -> Result<()> {
        if date != self.date {
            self.rotate(date)?;
        }
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.lines_written += 1;
        Ok(())
    }

    /// File currently being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn rotate(&mut self, date: NaiveDate) -> Result<()> {
        self.writer.flush()?;
        let path = dated_path(&self.base, date);
        self.writer = open_append(&path)?;
        log::info!("Rotated sentence log to {}", path.display());
        self.path = path;
        self.date = date;
        Ok(())
    }
}

/// `dir/stem.ext` → `dir/stem_YYYY-MM-DD.ext`
pub fn dated_path(base: &Path, date: NaiveDate) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), ext.to_string_lossy()),
        None => format!("{}_{}", stem, date.format("%Y-%m-%d")),
    };
    base.with_file_name(name)
}

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Gather-mode record: `<arrival µs> <tag><payload>`
pub fn gather_record(message: &Message, arrival: SystemTime) -> Vec<u8> {
    let mut record = format!("{} ", micros_since_epoch(arrival)).into_bytes();
    record.extend_from_slice(&message.to_bytes());
    record
}

/// Log-mode record: `<sample µs> <sender stamp> <header><payload>`
pub fn bus_record(envelope: &Envelope) -> Vec<u8> {
    let mut record = format!(
        "{} {} {}",
        envelope.sample_time_us, envelope.sender_stamp, envelope.header
    )
    .into_bytes();
    record.extend_from_slice(&envelope.payload);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{from_micros, Tag};
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, d).unwrap()
    }

    #[test]
    fn test_dated_path() {
        assert_eq!(
            dated_path(Path::new("LWE450/messages.txt"), day(1)),
            PathBuf::from("LWE450/messages_2021-06-01.txt")
        );
        assert_eq!(
            dated_path(Path::new("/tmp/raw"), day(9)),
            PathBuf::from("/tmp/raw_2021-06-09")
        );
    }

    #[test]
    fn test_creates_directories_and_appends() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("nested/dir/messages.txt");

        let mut sink = DailyFileSink::open_on(&base, day(1)).unwrap();
        sink.write_line_on(day(1), b"first").unwrap();
        drop(sink);

        // Reopening the same day appends
        let mut sink = DailyFileSink::open_on(&base, day(1)).unwrap();
        sink.write_line_on(day(1), b"second").unwrap();

        let contents = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(contents, "first\nsecond\n");
        assert_eq!(sink.lines_written(), 1);
    }

    #[test]
    fn test_rotates_at_date_change() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("messages.txt");

        let mut sink = DailyFileSink::open_on(&base, day(1)).unwrap();
        sink.write_line_on(day(1), b"a").unwrap();
        sink.write_line_on(day(2), b"b").unwrap();
        sink.write_line_on(day(2), b"c").unwrap();

        let first = fs::read_to_string(dated_path(&base, day(1))).unwrap();
        let second = fs::read_to_string(dated_path(&base, day(2))).unwrap();
        assert_eq!(first, "a\n");
        assert_eq!(second, "b\nc\n");
        assert_eq!(sink.path(), dated_path(&base, day(2)));
    }

    #[test]
    fn test_record_formats() {
        let msg = Message::new(Tag::UdPbC, "\\s:EI9999*7C");
        assert_eq!(
            gather_record(&msg, from_micros(1_622_505_600_000_001)),
            b"1622505600000001 UdPbC\\s:EI9999*7C"
        );

        let env = Envelope::from_message(&msg, from_micros(5), from_micros(6), 3);
        assert_eq!(bus_record(&env), b"5 3 UdPbC\\s:EI9999*7C");
    }

    #[test]
    fn test_non_utf8_payload_written_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("messages.txt");
        let msg = Message::new(Tag::NkPgN, b",\xb0\xff,x".to_vec());

        let mut sink = DailyFileSink::open_on(&base, day(1)).unwrap();
        sink.write_line_on(day(1), &gather_record(&msg, from_micros(9)))
            .unwrap();

        let env = Envelope::from_message(&msg, from_micros(9), from_micros(10), 2);
        sink.write_line_on(day(1), &bus_record(&env)).unwrap();

        let contents = fs::read(sink.path()).unwrap();
        assert_eq!(contents, b"9 NkPgN,\xb0\xff,x\n9 2 NkPgN,\xb0\xff,x\n");
    }
}
