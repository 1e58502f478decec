//! The blocking facade runs the same protocol without an async caller

use nestlock::blocking::BlockingMember;
use nestlock::core::config::FacadeMode;
use nestlock::{create_registry, Access, BlockingRegistry, Config, ConfiguredRegistry, MemoryStore, Registry};
use serde_json::json;
use std::sync::Arc;

fn blocking_registry() -> BlockingRegistry {
    let registry = Registry::new(Arc::new(MemoryStore::new())).unwrap();
    BlockingRegistry::new(registry).unwrap()
}

#[test]
fn test_blocking_round_trip() {
    let db = blocking_registry();
    db.set("hello", json!({})).unwrap();

    let hello = db.get("hello").unwrap();
    hello.navigate("world").navigate("foo").navigate("bar").set(true).unwrap();
    assert_eq!(hello.get().unwrap(), Some(json!({"world": {"foo": {"bar": true}}})));

    assert!(hello.navigate("world").delete("foo").unwrap());
    assert_eq!(hello.get().unwrap(), Some(json!({"world": {}})));
    assert!(db.delete("hello").unwrap());
    assert!(!db.has("hello").unwrap());
}

#[test]
fn test_blocking_sequence_operations() {
    let db = blocking_registry();
    let example = db.get("example").unwrap();
    example.set(json!(["foo", "bar"])).unwrap();

    assert_eq!(example.push(vec![json!("baz")]).unwrap(), 3);
    assert_eq!(example.pop().unwrap(), Some(json!("baz")));
    assert_eq!(example.slice(0, Some(1)).unwrap(), vec![json!("foo")]);
    assert_eq!(example.splice(1, Some(1), Vec::new()).unwrap(), vec![json!("bar")]);
    assert_eq!(example.get().unwrap(), Some(json!(["foo"])));

    match example.member("push", Access::Auto) {
        BlockingMember::Method(push) => assert_eq!(push.call(vec![json!(1)]).unwrap(), Some(json!(2))),
        BlockingMember::Node(_) => panic!("push resolved to a child"),
    }
}

#[test]
fn test_blocking_from_worker_threads() {
    let db = blocking_registry();
    db.get("counter").unwrap().navigate("n").set(0).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            std::thread::spawn(move || {
                for _ in 0..5 {
                    db.get("counter")
                        .unwrap()
                        .navigate("n")
                        .update(|slot| {
                            let next = slot.as_ref().and_then(|v| v.as_i64()).unwrap_or(0) + 1;
                            *slot = Some(json!(next));
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(db.get("counter").unwrap().navigate("n").get().unwrap(), Some(json!(20)));
}

#[test]
fn test_blocking_inside_runtime_is_rejected() {
    let db = blocking_registry();
    let cursor = db.get("doc").unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let err = runtime.block_on(async { cursor.set(1) }).unwrap_err();
    assert!(err.is_usage());
}

#[test]
fn test_factory_builds_blocking_registry() {
    let mut config = Config::default();
    config.facade.mode = FacadeMode::Blocking;

    match create_registry(config, Arc::new(MemoryStore::new()), Vec::new()).unwrap() {
        ConfiguredRegistry::Blocking(db) => {
            db.set("k", json!("v")).unwrap();
            assert_eq!(db.get("k").unwrap().get().unwrap(), Some(json!("v")));
        }
        ConfiguredRegistry::Async(_) => panic!("expected the blocking facade"),
    }
}
