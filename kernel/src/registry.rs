//! Registry of live canvases.
//!
//! The registry is an explicit value owned by the composition root; there is
//! no process-wide instance. Canvases it creates share its dispatcher, so one
//! subscription observes every canvas.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::canvas::{Canvas, CanvasData, CanvasId, CanvasSummary};
use crate::error::CanvasError;
use crate::events::{CanvasEvent, EventDispatcher};
use crate::infrastructure::config::CanvasSettings;

/// Registry for managing canvases by ID.
#[derive(Debug)]
pub struct CanvasRegistry {
    canvases: RwLock<IndexMap<CanvasId, Canvas>>,
    dispatcher: Arc<EventDispatcher>,
    settings: CanvasSettings,
}

impl CanvasRegistry {
    /// Creates a new, empty registry publishing on `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self::with_settings(dispatcher, CanvasSettings::default())
    }

    /// Creates a registry whose canvases use `settings`.
    #[must_use]
    pub fn with_settings(dispatcher: Arc<EventDispatcher>, settings: CanvasSettings) -> Self {
        Self {
            canvases: RwLock::new(IndexMap::new()),
            dispatcher,
            settings,
        }
    }

    /// Returns the shared dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Creates, registers and announces a new canvas.
    pub fn create(&self, title: Option<String>, description: Option<String>) -> Canvas {
        let mut builder = Canvas::builder()
            .settings(self.settings.clone())
            .dispatcher(Arc::clone(&self.dispatcher));
        if let Some(title) = title {
            builder = builder.title(title);
        }
        if let Some(description) = description {
            builder = builder.description(description);
        }
        let canvas = builder.build();

        self.canvases
            .write()
            .insert(canvas.id().clone(), canvas.clone());
        info!(canvas_id = %canvas.id(), "Canvas registered");
        self.dispatcher
            .publish(CanvasEvent::canvas_created(canvas.summary()));
        canvas
    }

    /// Imports exported data as a new registered canvas on the shared
    /// dispatcher.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for inconsistent data.
    pub fn import(&self, data: CanvasData) -> Result<Canvas, CanvasError> {
        let canvas = Canvas::builder()
            .settings(self.settings.clone())
            .dispatcher(Arc::clone(&self.dispatcher))
            .import(data)?;
        self.insert(canvas.clone());
        Ok(canvas)
    }

    /// Registers an existing canvas, returning any canvas it replaced.
    pub fn insert(&self, canvas: Canvas) -> Option<Canvas> {
        debug!(canvas_id = %canvas.id(), "Canvas inserted");
        self.canvases.write().insert(canvas.id().clone(), canvas)
    }

    /// Looks up a canvas.
    #[must_use]
    pub fn get(&self, id: &CanvasId) -> Option<Canvas> {
        self.canvases.read().get(id).cloned()
    }

    /// Removes a canvas and announces it. Returns `false` if unknown.
    pub fn remove(&self, id: &CanvasId) -> bool {
        let removed = self.canvases.write().shift_remove(id).is_some();
        if removed {
            info!(canvas_id = %id, "Canvas removed");
            self.dispatcher
                .publish(CanvasEvent::canvas_deleted(id.clone()));
        }
        removed
    }

    /// Every canvas in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Canvas> {
        self.canvases.read().values().cloned().collect()
    }

    /// Summaries of every canvas in registration order.
    #[must_use]
    pub fn summaries(&self) -> Vec<CanvasSummary> {
        self.list().iter().map(Canvas::summary).collect()
    }

    /// Number of registered canvases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canvases.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canvases.read().is_empty()
    }
}

impl Default for CanvasRegistry {
    fn default() -> Self {
        Self::new(Arc::new(EventDispatcher::new()))
    }
}
