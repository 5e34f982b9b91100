//! Integration tests for data-plane forwarding through the builtin
//! delegate.

use parking_lot::Mutex;
use std::sync::Arc;
use url::Url;
use veldb_embedded::{
    EmbeddedServer, EngineLogger, IndexDef, IndexOpts, NamespaceOpts, RawBinding,
};
use veldb_native::MockEngine;

fn started_server() -> (Arc<MockEngine>, EmbeddedServer) {
    let engine = Arc::new(MockEngine::new());
    engine.set_ready(true);
    let target = Url::parse("veldb://root@127.0.0.1:6534/app").unwrap();
    let server = EmbeddedServer::start(Arc::clone(&engine) as _, &target, &[]).unwrap();
    (engine, server)
}

#[test]
fn namespace_lifecycle_forwards_in_order() {
    let (engine, server) = started_server();

    server
        .open_namespace(
            "events",
            NamespaceOpts {
                enable_storage: true,
                ..NamespaceOpts::default()
            },
        )
        .unwrap();
    server.enable_storage("events").unwrap();
    server.commit("events").unwrap();
    server.close_namespace("events").unwrap();
    server.drop_namespace("events").unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            "0x5eed:open_namespace:events:storage=true".to_owned(),
            "0x5eed:enable_storage:events".to_owned(),
            "0x5eed:commit:events".to_owned(),
            "0x5eed:close_namespace:events".to_owned(),
            "0x5eed:drop_namespace:events".to_owned(),
        ]
    );
}

#[test]
fn index_lifecycle_forwards() {
    let (engine, server) = started_server();

    let index = IndexDef {
        name: "id".into(),
        json_path: "id".into(),
        index_type: "hash".into(),
        field_type: "int".into(),
        opts: IndexOpts {
            is_pk: true,
            ..IndexOpts::default()
        },
        collate_mode: 0,
        sort_order: String::new(),
    };
    server.add_index("events", &index).unwrap();
    server
        .configure_index("events", "id", r#"{"is_dense":true}"#)
        .unwrap();
    server.drop_index("events", "id").unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            "0x5eed:add_index:events:id".to_owned(),
            "0x5eed:configure_index:events:id".to_owned(),
            "0x5eed:drop_index:events:id".to_owned(),
        ]
    );
}

#[test]
fn queries_return_engine_payloads_unchanged() {
    let (engine, server) = started_server();
    engine.set_select_payload(vec![1, 2, 3]);

    let by_string = server
        .select("SELECT * FROM events", true, &[7, 8], 100)
        .unwrap();
    assert_eq!(by_string, vec![1, 2, 3]);

    let by_raw = server.select_query(&[0xAA, 0xBB], false, &[], 0).unwrap();
    assert_eq!(by_raw, vec![1, 2, 3]);

    let deleted = server.delete_query(42, &[0xCC]).unwrap();
    assert!(deleted.is_empty());
}

#[test]
fn item_mutation_and_meta_round_trip() {
    let (engine, server) = started_server();

    let echoed = server.modify_item(42, &[9, 9, 9], 1).unwrap();
    assert_eq!(echoed, vec![9, 9, 9]);

    server.put_meta("events", "schema_version", "3").unwrap();
    assert_eq!(server.get_meta("events", "schema_version").unwrap(), b"3");
    assert!(engine
        .calls()
        .contains(&"0x5eed:put_meta:events:schema_version".to_owned()));
}

struct CapturingLogger {
    records: Mutex<Vec<(i32, String)>>,
}

impl EngineLogger for CapturingLogger {
    fn log(&self, level: i32, message: &str) {
        self.records.lock().push((level, message.to_owned()));
    }
}

#[test]
fn logger_registration_routes_engine_records() {
    let (engine, server) = started_server();

    let logger = Arc::new(CapturingLogger {
        records: Mutex::new(Vec::new()),
    });
    server.enable_logger(Arc::clone(&logger) as _).unwrap();
    assert!(engine.logging_enabled());

    engine.emit_log(3, "wal checkpoint complete");
    assert_eq!(
        *logger.records.lock(),
        vec![(3, "wal checkpoint complete".to_owned())]
    );

    server.disable_logger().unwrap();
    assert!(!engine.logging_enabled());
    engine.emit_log(3, "not delivered");
    assert_eq!(logger.records.lock().len(), 1);
}

#[test]
fn ping_reaches_the_instance() {
    let (engine, server) = started_server();
    server.ping().unwrap();
    assert_eq!(engine.calls(), vec!["0x5eed:ping".to_owned()]);
}
