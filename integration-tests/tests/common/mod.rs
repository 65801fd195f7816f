//! Shared test utilities for integration tests.
//!
//! Provides a registry wired to a recording subscriber and an async
//! broadcaster, plus helpers that build canned conversations.

#![allow(dead_code)]

use anyhow::Result;
use canvas_kernel::events::{EventBroadcaster, EventReceiver};
use canvas_kernel::{
    Canvas, CanvasEvent, CanvasRegistry, CheckoutOptions, EventDispatcher, Message, MessageNode,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Integration test context providing shared resources.
pub struct IntegrationTestContext {
    /// Registry under test
    pub registry: CanvasRegistry,
    /// Async bridge attached to the registry dispatcher
    pub broadcaster: EventBroadcaster,
    /// Every event delivered synchronously, in order
    pub recorded: Arc<Mutex<Vec<CanvasEvent>>>,
}

impl IntegrationTestContext {
    /// Creates a registry with a recording subscriber and a broadcaster.
    pub fn new() -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&recorded);
        dispatcher.subscribe(move |event| log.lock().push(event.clone()));

        let broadcaster = EventBroadcaster::new();
        broadcaster.attach(&dispatcher);

        Self {
            registry: CanvasRegistry::new(dispatcher),
            broadcaster,
            recorded,
        }
    }

    /// Subscribes an async receiver.
    pub fn receiver(&self) -> EventReceiver {
        self.broadcaster.subscribe()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<CanvasEvent> {
        self.recorded.lock().clone()
    }

    /// Event type tags in delivery order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.recorded.lock().iter().map(|e| e.kind().as_str()).collect()
    }
}

/// Nodes created by [`branching_conversation`].
pub struct Conversation {
    /// First user turn on `main`
    pub question: MessageNode,
    /// Answer on `main`
    pub answer: MessageNode,
    /// Alternative answer on `alternative`
    pub alternative: MessageNode,
    /// Merge node on `main`
    pub merge: MessageNode,
}

/// Builds question → answer on `main`, a sibling answer on `alternative`,
/// then merges `alternative` back into `main`.
pub fn branching_conversation(canvas: &Canvas) -> Result<Conversation> {
    let main = canvas.checkout(CheckoutOptions::branch("main"))?;
    let question = main.commit_message(Message::user("What is a DAG?"), None)?;
    let answer = main.commit_message(Message::assistant("A directed acyclic graph."), None)?;

    let alt = canvas.checkout(
        CheckoutOptions::branch("alternative")
            .description("Shorter answer")
            .create_if_not_exists(true)
            .start_from(question.id.clone()),
    )?;
    let alternative = alt.commit_message(Message::assistant("A graph without cycles."), None)?;

    canvas.checkout(CheckoutOptions::branch("main"))?;
    let merge = main.merge_from(&["alternative"], Message::system("Merged both answers"))?;

    Ok(Conversation {
        question,
        answer,
        alternative,
        merge,
    })
}
