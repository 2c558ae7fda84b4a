//! Lifecycle notifications emitted by the registry.

use crate::resource::ImageResource;
use std::fmt;
use std::sync::Arc;

/// A durable registry state transition.
#[derive(Clone)]
pub enum ImageEvent {
    /// The image was registered and persisted
    Added(Arc<dyn ImageResource>),
    /// The image was removed and its storage entry deleted
    Deleted(Arc<dyn ImageResource>),
    /// The image picked up changed data from storage
    Updated(Arc<dyn ImageResource>),
}

impl ImageEvent {
    /// The image the event is about.
    pub fn image(&self) -> &Arc<dyn ImageResource> {
        match self {
            ImageEvent::Added(image) | ImageEvent::Deleted(image) | ImageEvent::Updated(image) => {
                image
            }
        }
    }

    /// Short event name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageEvent::Added(_) => "added",
            ImageEvent::Deleted(_) => "deleted",
            ImageEvent::Updated(_) => "updated",
        }
    }
}

impl fmt::Debug for ImageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageEvent")
            .field("kind", &self.kind())
            .field("index", &self.image().index())
            .field("name", &self.image().name())
            .finish()
    }
}

/// Receives registry notifications.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ImageEvent);
}

impl<F> EventSink for F
where
    F: Fn(ImageEvent) + Send + Sync,
{
    fn emit(&self, event: ImageEvent) {
        self(event)
    }
}

/// Logs every event at debug level. Default sink for a registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ImageEvent) {
        let image = event.image();
        tracing::debug!(
            kind = event.kind(),
            index = ?image.index(),
            name = %image.name(),
            "image event"
        );
    }
}
