//! Gather → bus → log pipeline over loopback
//!
//! Run with: `cargo test --test pipeline`

use lwe450_io::app::pump;
use lwe450_io::bus::{BusPublisher, BusSubscriber};
use lwe450_io::recording::DailyFileSink;
use lwe450_io::sinks::{GatherOutput, GatherSink, LogRecorder};
use lwe450_io::transport::MockTransport;
use lwe450_io::{Lwe450Assembler, Message, Tag};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tempfile::TempDir;

const SENTENCE: &str = "UdPbC\\s:EI9999,d:AI9610,n:270*7C\\!EIABB,04,04,9,265503900,5,,,\
                        WWwwwwp202T84=R3I`VfWOwwwwp20,4*50\r\n";

#[test]
fn test_gathered_sentences_reach_the_log() {
    let temp_dir = TempDir::new().unwrap();

    let mut subscriber = BusSubscriber::bind(
        "127.0.0.1:0".parse().unwrap(),
        None,
        Duration::from_millis(500),
    )
    .unwrap();
    let publisher = BusPublisher::new(subscriber.local_addr().unwrap(), 12, 1).unwrap();

    // Gather side: one sentence split over two reads, noise in between
    let mut transport = MockTransport::new();
    let (head, tail) = SENTENCE.split_at(31);
    transport.inject(head.as_bytes());
    transport.inject(format!("{}noise\nRrTcP,2,3\r\n", tail).as_bytes());
    transport.close();

    let running = AtomicBool::new(true);
    let mut assembler = Lwe450Assembler::new(GatherSink::new(GatherOutput::Bus(publisher), false));
    let mut buffer = [0u8; 256];
    let stats = pump(&mut transport, &mut assembler, &running, &mut buffer);

    assert!(stats.disconnected);
    assert_eq!(assembler.sink().forwarded(), 2);

    // Log side
    let file = DailyFileSink::open(temp_dir.path().join("LWE450/messages.txt")).unwrap();
    let mut recorder = LogRecorder::new(file, false);

    let mut received = Vec::new();
    for _ in 0..2 {
        let envelope = subscriber.recv().unwrap().expect("envelope");
        assert_eq!(envelope.sender_stamp, 12);
        recorder.record(&envelope).unwrap();
        received.push(envelope);
    }

    assert_eq!(
        received[0].message(),
        Some(Message::new(Tag::UdPbC, SENTENCE.trim_end()[5..].to_string()))
    );
    assert_eq!(received[1].message(), Some(Message::new(Tag::RrTcP, ",2,3")));
    // Both sentences completed in the second chunk
    assert_eq!(received[0].sample_time_us, received[1].sample_time_us);

    let contents = fs::read_to_string(recorder.file().path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        format!("{} 12 RrTcP,2,3", received[1].sample_time_us)
    );
    assert!(lines[0].ends_with(SENTENCE.trim_end()));
}
