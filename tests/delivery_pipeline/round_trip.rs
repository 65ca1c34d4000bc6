//! Payloads come back byte-for-byte.

use super::*;
use perfgate::{DrainEngine, TraceBufferExt};

fn awkward_payloads() -> Vec<Vec<u8>> {
    vec![
        vec![0x00, 0x01, 0x00, 0xFF, 0xFE],
        vec![0xC3, 0x28, 0xA0, 0xA1],
        b"plain".to_vec(),
        Vec::new(),
        (0..=255u8).cycle().take(64 * 1024).collect(),
    ]
}

#[test]
fn binary_payloads_survive_storage() {
    for fx in backends() {
        let payloads = awkward_payloads();
        for p in &payloads {
            fx.buffer.store(p).unwrap();
        }
        let read: Vec<Vec<u8>> = fx
            .buffer
            .chunks(100)
            .flat_map(|c| c.unwrap())
            .map(|r| r.payload)
            .collect();
        assert_eq!(read, payloads, "{}", fx.name);
    }
}

#[test]
fn binary_payloads_reach_the_sender_unchanged() {
    for fx in backends() {
        let payloads = awkward_payloads();
        for p in &payloads {
            fx.buffer.store(p).unwrap();
        }
        let sender = RecordingSender::new();
        DrainEngine::new(2).unwrap().drain(&fx.buffer, &sender).unwrap();
        assert_eq!(sender.accepted(), payloads, "{}", fx.name);
    }
}

#[test]
fn records_carry_a_creation_time() {
    for fx in backends() {
        let before = chrono::Utc::now() - chrono::Duration::seconds(1);
        fx.buffer.store(b"t").unwrap();
        let chunk = fx.buffer.read_chunk(None, 1).unwrap();
        assert!(chunk[0].created_at >= before, "{}", fx.name);
    }
}
