//! Chunked draining.

use super::*;
use perfgate::{DrainEngine, RecordId, TraceBufferExt};

#[test]
fn ten_records_in_chunks_of_three() {
    for fx in backends() {
        fill(&fx.buffer, 10);
        let sender = RecordingSender::new();

        let mut sizes = Vec::new();
        let report = DrainEngine::new(3)
            .unwrap()
            .drain_with_progress(&fx.buffer, &sender, |c| sizes.push(c.count))
            .unwrap();

        assert_eq!(sizes, vec![3, 3, 3, 1], "{}", fx.name);
        assert_eq!(report.found, 10, "{}", fx.name);
        assert_eq!(report.synced(), 10, "{}", fx.name);
        assert!(report.is_complete());
        assert_eq!(fx.buffer.count_unsent().unwrap(), 0, "{}", fx.name);

        let expected: Vec<Vec<u8>> = (0..10).map(|i| format!("trace-{i}").into_bytes()).collect();
        assert_eq!(sender.accepted(), expected, "{}", fx.name);
    }
}

#[test]
fn chunk_ids_ascend_and_do_not_overlap() {
    for fx in backends() {
        fill(&fx.buffer, 7);
        let sender = RecordingSender::new();
        let report = DrainEngine::new(2).unwrap().drain(&fx.buffer, &sender).unwrap();

        let mut previous: Option<RecordId> = None;
        for chunk in &report.chunks {
            assert!(chunk.first_id <= chunk.last_id, "{}", fx.name);
            if let Some(prev) = &previous {
                assert!(prev < &chunk.first_id, "{}", fx.name);
            }
            previous = Some(chunk.last_id.clone());
        }
    }
}

#[test]
fn chunks_iterator_pages_without_draining() {
    for fx in backends() {
        fill(&fx.buffer, 5);
        let sizes: Vec<usize> = fx
            .buffer
            .chunks(2)
            .map(|c| c.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1], "{}", fx.name);
        assert_eq!(fx.buffer.count_unsent().unwrap(), 5, "{}", fx.name);
    }
}

#[test]
fn empty_buffer_is_a_successful_noop() {
    for fx in backends() {
        let sender = RecordingSender::new();
        let report = DrainEngine::default().drain(&fx.buffer, &sender).unwrap();
        assert_eq!(report.found, 0);
        assert!(report.chunks.is_empty());
        assert!(report.is_complete());
        assert_eq!(sender.calls(), 0, "{}", fx.name);
    }
}
