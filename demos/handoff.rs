//! # Example: Producer/consumer handoff
//!
//! A producer stores a batch as a prop and signals `batch-ready`; the consumer
//! waits for the signal, takes the batch with `dispose` (running its cleanup)
//! and leaves an `ack` prop behind. The scene then idles into its inactivity
//! timeout, which cleans up the `ack`.
//!
//! Run with: `cargo run --example handoff --features logging`

use std::sync::Arc;
use std::time::Duration;

use scenevisor::{LogWriter, Scene, SceneConfig, SceneError, Subscribe};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = SceneConfig::limited(Duration::from_millis(300), Duration::from_secs(5));
    let scene: Scene<Vec<u32>> = Scene::builder(cfg)
        .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
        .build();

    let consumer = {
        let scene = scene.clone();
        tokio::spawn(async move {
            scene
                .wait_signal_limited("batch-ready", Duration::from_secs(1))
                .await?;
            let batch = scene.dispose("batch").await?;
            scene
                .store_clean("ack", vec![batch.len() as u32], |key, v| {
                    println!("[consumer] releasing {key}={v:?}");
                    Ok(())
                })
                .await?;
            Ok::<usize, SceneError>(batch.len())
        })
    };

    scene
        .store_clean("batch", vec![1, 2, 3], |key, v| {
            println!("[producer] batch {key} handed off ({} items)", v.len());
            Ok(())
        })
        .await?;

    // The consumer may not have registered its waiter yet.
    loop {
        match scene.signal("batch-ready").await {
            Ok(()) => break,
            Err(e) if e.is_no_subscriber() => tokio::time::sleep(Duration::from_millis(10)).await,
            Err(e) => return Err(e.into()),
        }
    }

    let taken = consumer.await??;
    println!("[main] consumer took {taken} items");

    match scene.wait().await {
        Err(e) if e.is_timeout() => println!("[main] scene ended: {e}"),
        other => other?,
    }
    // Give the log subscriber a moment to flush.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
