//! Canvas kernel demo: replays a small branching conversation and prints
//! the resulting summary and export.

use canvas_kernel::events::{BroadcastError, EventBroadcaster};
use canvas_kernel::infrastructure::{config::Settings, telemetry::TelemetryBuilder};
use canvas_kernel::{CanvasRegistry, CheckoutOptions, EventDispatcher, Message};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    TelemetryBuilder::from_settings(&config.telemetry, env!("CARGO_PKG_VERSION")).init()?;

    info!("Canvas Kernel Starting...");

    let dispatcher = Arc::new(EventDispatcher::new());
    let broadcaster = EventBroadcaster::with_capacity(config.canvas.event_channel_capacity);
    let bridge = broadcaster.attach(&dispatcher);

    let mut events = broadcaster.subscribe();
    let consumer = tokio::spawn(async move {
        let mut delivered = 0usize;
        loop {
            match events.recv().await {
                Ok(event) => {
                    delivered += 1;
                    info!(
                        event_type = %event.kind(),
                        canvas_id = %event.canvas_id(),
                        "Event received"
                    );
                }
                Err(BroadcastError::Lagged(skipped)) => warn!(skipped, "Event consumer lagged"),
                Err(BroadcastError::Closed) => break,
            }
        }
        delivered
    });

    let registry = CanvasRegistry::with_settings(Arc::clone(&dispatcher), config.canvas.clone());
    let canvas = registry.create(
        Some("Trip planning".into()),
        Some("Branching conversation demo".into()),
    );

    let main = canvas.checkout(CheckoutOptions::new())?;
    let question = main.commit_message(Message::user("Where should I travel in May?"), None)?;
    main.commit_message(Message::assistant("Lisbon is mild and quiet in May."), None)?;

    let alt = canvas.checkout(
        CheckoutOptions::branch("alternative")
            .description("Ask for a colder destination")
            .create_if_not_exists(true)
            .start_from(question.id.clone()),
    )?;
    alt.commit_message(Message::assistant("Try Reykjavik for long days."), None)?;

    let peek = canvas.checkout(CheckoutOptions::detached(question.id))?;
    info!(branch = %peek.name(), "Exploring from the first question");

    canvas.checkout(CheckoutOptions::branch("main"))?;
    main.merge_from(
        &["alternative"],
        Message::system("Both options considered."),
    )?;

    let summary = canvas.summary();
    info!(
        canvas_id = %summary.canvas_id,
        nodes = summary.node_count,
        branches = summary.branch_count,
        "Demo finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("{}", serde_json::to_string_pretty(&canvas.to_canvas_data())?);

    registry.remove(canvas.id());
    dispatcher.unsubscribe(bridge);
    drop(broadcaster);
    let delivered = consumer.await?;
    info!(delivered, "Event stream closed");
    Ok(())
}
