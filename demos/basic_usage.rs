// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic bulk-engine usage example.
//!
//! Demonstrates:
//! 1. Building a processor over the in-memory store
//! 2. Adding index, update and delete requests from several producers
//! 3. Count-driven and periodic commits
//! 4. Before/after callbacks correlated by execution id
//! 5. Displaying stats and raw metrics
//! 6. Clean shutdown
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use serde_json::json;
use bulk_engine::{
    BulkDeleteRequest, BulkIndexRequest, BulkProcessor, BulkUpdateRequest, InMemoryClient,
    SimpleBackoff, TracingLogger,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for display)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulk_engine=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           bulk-engine: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure and start the processor
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Configuring bulk processor...");

    let client = InMemoryClient::new();
    let processor = BulkProcessor::builder(client.clone())
        .name("demo")
        .workers(3)
        .bulk_actions(50)
        .bulk_size(-1)
        .flush_interval(Duration::from_millis(100))
        .stats(true)
        .backoff(SimpleBackoff::new([10, 50, 100]).jitter(true))
        .logger(TracingLogger)
        .before(|id, requests| {
            println!("   ├─ commit #{} starting with {} requests", id, requests.len());
        })
        .after(|id, _requests, response, err| match (response, err) {
            (Some(res), _) => println!(
                "   └─ commit #{} done in {}ms ({} ok, {} failed)",
                id,
                res.took,
                res.succeeded().len(),
                res.failed().len()
            ),
            (None, Some(e)) => println!("   └─ commit #{} failed: {}", id, e),
            (None, None) => {}
        })
        .start()
        .await?;
    let processor = Arc::new(processor);

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Add requests from several producers
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Adding 200 documents from 4 producers...");
    let started = Instant::now();

    let mut producers = Vec::new();
    for p in 0..4 {
        let processor = processor.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..50 {
                let id = format!("user.{}.{}", p, i);
                let req = BulkIndexRequest::new("users")
                    .id(id)
                    .doc(json!({"producer": p, "seq": i, "active": true}));
                processor.add(req).await?;
            }
            Ok::<_, bulk_engine::BulkError>(())
        }));
    }
    for producer in producers {
        producer.await??;
    }
    println!("   ⚡ All adds accepted in {:?}", started.elapsed());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Updates and deletes, picked up by the periodic flusher
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n✏️  Updating and deleting a few documents...");
    processor
        .add(BulkUpdateRequest::new("users", "user.0.0").doc(json!({"active": false})))
        .await?;
    processor
        .add(BulkUpdateRequest::new("users", "user.9.9").doc(json!({"active": true})).doc_as_upsert(true))
        .await?;
    processor.add(BulkDeleteRequest::new("users", "user.1.1")).await?;
    processor.add(BulkDeleteRequest::new("users", "nobody")).await?;

    println!("\n⏳ Waiting for the periodic flush...");
    tokio::time::sleep(Duration::from_millis(150)).await;

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Inspect the store
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔍 Store contents:");
    println!("   └─ documents: {}", client.len());
    if let Some(doc) = client.get("users", "user.0.0") {
        println!("   └─ user.0.0 (v{}) → {}", doc.version, doc.source);
    }
    println!("   └─ user.1.1 present: {}", client.get("users", "user.1.1").is_some());
    println!("   └─ user.9.9 present: {}", client.get("users", "user.9.9").is_some());

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Stats and metrics
    // ─────────────────────────────────────────────────────────────────────────
    let stats = processor.stats();
    println!("\n📊 Processor Stats:");
    println!("   ┌─ flushed:   {}", stats.flushed);
    println!("   ├─ committed: {}", stats.committed);
    println!("   ├─ indexed:   {}", stats.indexed);
    println!("   ├─ updated:   {}", stats.updated);
    println!("   ├─ deleted:   {}", stats.deleted);
    println!("   ├─ succeeded: {}", stats.succeeded);
    println!("   └─ failed:    {}", stats.failed);
    for (i, w) in stats.workers.iter().enumerate() {
        println!("      worker {}: queued={} last={:?}", i, w.queued, w.last_duration);
    }

    println!("\n📈 Raw Metrics:");
    dump_metrics(&snapshotter);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Shutdown
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🛑 Shutting down...");
    processor.close().await?;
    println!("   ✅ Shutdown complete! Running: {}", processor.is_running().await);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Dump all captured metrics grouped by kind
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut counters = vec![];
    let mut gauges = vec![];
    let mut histograms = vec![];

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
        let name = key.name().to_string();

        match value {
            DebugValue::Counter(v) => counters.push((name, label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name, label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name, label_str, count, sum));
            }
        }
    }

    counters.sort();
    gauges.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    histograms.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }
    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.0}", name, labels, value);
        }
    }
    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, sum) in &histograms {
            println!("      └─ {}{} count={} sum={:.4}", name, labels, count, sum);
        }
    }
    if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
