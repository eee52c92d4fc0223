//! Concurrency regression tests.
//!
//! Labeled series of one metric share a single stored map. Racing writers on
//! different label combinations must never drop each other's entries.

use std::sync::{Arc, Barrier};
use std::thread;

use optex_metrics::{Exporter, LabelSet, MetricDefinition, Registry};
use optex_state::{OptionStore, Scope, StateStore};

fn exporter(store: StateStore) -> Exporter {
    let mut registry = Registry::new();
    registry
        .register("worker_heartbeats_total", MetricDefinition::counter("Heartbeats"))
        .unwrap();
    registry
        .register("last_seen", MetricDefinition::gauge("Last seen").with_timestamp())
        .unwrap();
    Exporter::new(registry, Arc::new(store))
}

#[test]
fn two_label_sets_updated_concurrently_both_survive() {
    let exporter = exporter(StateStore::open_in_memory(Scope::Site).unwrap());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|worker| {
            let exporter = exporter.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let labels = LabelSet::new().with("worker", worker);
                let series = exporter
                    .series("worker_heartbeats_total", Some(&labels))
                    .unwrap();
                barrier.wait();
                series.update(format!("{worker}-value")).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for worker in ["a", "b"] {
        let labels = LabelSet::new().with("worker", worker);
        let value = exporter
            .series("worker_heartbeats_total", Some(&labels))
            .unwrap()
            .fetch()
            .unwrap();
        assert_eq!(value, format!("{worker}-value"));
    }
}

#[test]
fn interleaved_writers_lose_no_label_slots() {
    const WORKERS: usize = 8;
    const ROUNDS: usize = 25;

    let exporter = exporter(StateStore::open_in_memory(Scope::Site).unwrap());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let exporter = exporter.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    // Alternate between a shared and a private label set.
                    let labels = LabelSet::new()
                        .with("worker", worker.to_string())
                        .with("phase", if round % 2 == 0 { "even" } else { "odd" });
                    exporter
                        .series("worker_heartbeats_total", Some(&labels))
                        .unwrap()
                        .update(round.to_string())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = exporter
        .store()
        .load("worker_heartbeats_total")
        .unwrap()
        .unwrap();
    assert_eq!(stored.series_count(), WORKERS * 2);

    for worker in 0..WORKERS {
        let labels = LabelSet::new()
            .with("phase", "odd")
            .with("worker", worker.to_string());
        let value = exporter
            .series("worker_heartbeats_total", Some(&labels))
            .unwrap()
            .fetch()
            .unwrap();
        assert_eq!(value, (ROUNDS - 2).to_string());
    }
}

#[test]
fn concurrent_stamped_updates_keep_values_and_timestamps_apart() {
    let exporter = exporter(StateStore::open_in_memory(Scope::Network).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|host| {
            let exporter = exporter.clone();
            thread::spawn(move || {
                let labels = LabelSet::new().with("host", format!("web-{host}"));
                let series = exporter.series("last_seen", Some(&labels)).unwrap();
                series.update("1").unwrap();
                series.timestamp_ms().unwrap()
            })
        })
        .collect();
    let stamps: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let output = exporter.render();
    for (host, ts) in stamps.iter().enumerate() {
        let line = format!("last_seen{{host=\"web-{host}\"}} 1 {ts}");
        assert!(output.contains(&line), "missing `{line}` in:\n{output}");
    }
}
