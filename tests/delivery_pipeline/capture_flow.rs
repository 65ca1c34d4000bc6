//! Capture through a buffered sink, then drain.

use super::*;
use perfgate::{
    Delivery, DrainEngine, HttpSubject, MemoryEngine, Profiler, RouteInfo, Subject, TraceSink,
};

#[test]
fn captured_traces_are_stored_then_drained() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = buffered_config(SendingMode::Database, dir.path());
    config.exclude.http = vec!["/health".into()];

    let sink = TraceSink::from_config(&config, RecordingSender::new()).unwrap();
    let profiler = Profiler::new(&config, MemoryEngine::new(), sink).unwrap();

    let health = Subject::Http(HttpSubject::new("GET", "health"));
    assert!(profiler.begin(&health, None).unwrap().is_none());

    let show = Subject::Http(HttpSubject::new("GET", "users/1").with_route(RouteInfo {
        uri: "users/{id}".into(),
        action: Some("UserController@show".into()),
        methods: vec!["GET".into()],
    }));
    for status in [200u16, 404] {
        let mut session = profiler.begin(&show, None).unwrap().unwrap();
        session.set_status_code(status);
        assert!(matches!(session.finish().unwrap(), Delivery::Stored(_)));
    }

    let buffer = profiler.sink().buffer().unwrap();
    assert_eq!(buffer.count_unsent().unwrap(), 2);

    let sender = RecordingSender::new();
    let report = DrainEngine::default().drain(buffer, &sender).unwrap();
    assert_eq!(report.synced(), 2);

    let first: serde_json::Value = serde_json::from_slice(&sender.accepted()[0]).unwrap();
    assert_eq!(first["spans"][0], "http.GET./users/{id}");
    assert_eq!(first["attributes"]["http_status_code"], "200");
    assert_eq!(first["attributes"]["action"], "GET users/{id}");
}
