//! Integration tests for engines running against shared stores.

use kvsync_engine::{
    observer_channel, BatchSync, EngineState, KeySync, ManualTimer, Slots, SyncConfig, TokioTimer,
};
use kvsync_storage::{FileStore, InMemoryStore, KeyValueStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |state: &T| sink.lock().push(state.clone()))
}

#[tokio::test(start_paused = true)]
async fn external_write_detected_within_one_interval() {
    let store = Arc::new(InMemoryStore::new());
    let timer = TokioTimer::current().unwrap();
    let (seen, observer) = recorder::<Option<String>>();

    let sync = KeySync::open(
        Arc::clone(&store),
        "theme",
        &SyncConfig::new().with_poll_interval_ms(50),
        &timer,
        observer,
    )
    .unwrap();
    assert_eq!(sync.value(), None);

    store.set("theme", "dark").unwrap();
    assert!(seen.lock().is_empty());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(*seen.lock(), vec![Some("dark".to_string())]);
    assert_eq!(sync.value().as_deref(), Some("dark"));

    // Nothing changes afterwards, so later ticks stay quiet.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(seen.lock().len(), 1);
    assert!(sync.stats().ticks >= 4);
}

#[tokio::test(start_paused = true)]
async fn disposed_engine_stops_ticking() {
    let store = Arc::new(InMemoryStore::new());
    let timer = TokioTimer::current().unwrap();
    let (seen, observer) = recorder::<Option<String>>();

    let sync = KeySync::open(
        Arc::clone(&store),
        "k",
        &SyncConfig::new().with_poll_interval_ms(10),
        &timer,
        observer,
    )
    .unwrap();
    sync.dispose();

    store.set("k", "after").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(seen.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn batch_engine_polls_on_tokio() {
    let store = Arc::new(InMemoryStore::with_entries([("volume", "3")]));
    let timer = TokioTimer::current().unwrap();
    let (observer, receiver) = observer_channel::<Slots>();

    let sync = BatchSync::open(
        Arc::clone(&store),
        [("volume", None::<&str>), ("muted", None)],
        &SyncConfig::default(),
        &timer,
        observer,
    )
    .unwrap();

    let seeded = receiver.try_recv().unwrap();
    assert_eq!(seeded.get("volume").cloned().flatten().as_deref(), Some("3"));

    store.set("muted", "true").unwrap();
    store.set("volume", "0").unwrap();
    tokio::time::sleep(Duration::from_millis(1001)).await;

    let merged = receiver.try_recv().unwrap();
    assert_eq!(merged.get("muted").cloned().flatten().as_deref(), Some("true"));
    assert_eq!(merged.get("volume").cloned().flatten().as_deref(), Some("0"));
    assert!(receiver.try_recv().is_err());
    assert_eq!(sync.values(), merged);
}

#[test]
fn two_engines_converge_through_the_store() {
    let store = Arc::new(InMemoryStore::new());
    let timer = ManualTimer::new();
    let (seen_a, observer_a) = recorder::<Option<String>>();
    let (seen_b, observer_b) = recorder::<Option<String>>();

    let a = KeySync::open(Arc::clone(&store), "shared", &SyncConfig::new(), &timer, observer_a)
        .unwrap();
    let b = KeySync::open(Arc::clone(&store), "shared", &SyncConfig::new(), &timer, observer_b)
        .unwrap();

    a.set("from-a").unwrap();
    assert_eq!(a.value().as_deref(), Some("from-a"));
    assert_eq!(b.value(), None);

    timer.fire();
    assert_eq!(b.value().as_deref(), Some("from-a"));
    assert_eq!(seen_b.lock().len(), 1);
    // a already knew its own write; the tick finds nothing new.
    assert_eq!(seen_a.lock().len(), 1);

    b.remove().unwrap();
    timer.fire();
    assert_eq!(a.value(), None);
    assert_eq!(seen_a.lock().last().cloned(), Some(None));
}

#[test]
fn file_store_changes_from_another_handle_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let ours = Arc::new(FileStore::open(&path).unwrap());
    let theirs = FileStore::open(&path).unwrap();
    theirs.set("lang", "en").unwrap();

    let timer = ManualTimer::new();
    let (seen, observer) = recorder::<Slots>();
    let sync = BatchSync::open(
        Arc::clone(&ours),
        [("lang", None::<&str>), ("region", None)],
        &SyncConfig::new(),
        &timer,
        observer,
    )
    .unwrap();
    assert_eq!(sync.get("lang").as_deref(), Some("en"));

    theirs.set("region", "TZ").unwrap();
    timer.fire();
    assert_eq!(sync.get("region").as_deref(), Some("TZ"));

    sync.write([("lang", Some("sw"))]).unwrap();
    assert_eq!(theirs.get("lang").unwrap().as_deref(), Some("sw"));
    assert_eq!(seen.lock().len(), 3);
}

#[test]
fn engine_over_trait_object_store() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::with_entries([("k", "v")]));
    let sync = KeySync::open(
        store,
        "k",
        &SyncConfig::no_sync(),
        &ManualTimer::new(),
        |_: &Option<String>| {},
    )
    .unwrap();

    assert_eq!(sync.state(), EngineState::Active);
    assert_eq!(sync.value().as_deref(), Some("v"));
}
