//! Administrative clear and backend selection from configuration.

use super::*;
use perfgate::DrainEngine;

#[test]
fn clear_empties_the_buffer() {
    for fx in backends() {
        fill(&fx.buffer, 4);
        fx.buffer.clear().unwrap();
        assert_eq!(fx.buffer.count_unsent().unwrap(), 0, "{}", fx.name);

        let sender = RecordingSender::new();
        DrainEngine::default().drain(&fx.buffer, &sender).unwrap();
        assert_eq!(sender.calls(), 0, "{}", fx.name);

        fx.buffer.store(b"after").unwrap();
        assert_eq!(fx.buffer.count_unsent().unwrap(), 1, "{}", fx.name);
    }
}

#[test]
fn configured_backends_share_state_across_opens() {
    for mode in [SendingMode::File, SendingMode::Database] {
        let dir = tempfile::tempdir().unwrap();
        let config = buffered_config(mode, dir.path());

        let writer = BufferBackend::from_config(&config).unwrap().unwrap();
        assert_eq!(writer.mode(), mode);
        fill(&writer, 3);

        let drainer = BufferBackend::from_config(&config).unwrap().unwrap();
        assert_eq!(drainer.count_unsent().unwrap(), 3, "{mode}");
        let sender = RecordingSender::new();
        DrainEngine::default().drain(&drainer, &sender).unwrap();
        assert_eq!(writer.count_unsent().unwrap(), 0, "{mode}");
    }
}

#[test]
fn sync_mode_has_no_buffer() {
    let config = Config::default();
    assert!(BufferBackend::from_config(&config).unwrap().is_none());
}
