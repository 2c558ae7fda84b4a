//! Render listener chain.

use super::ImageRegistry;
use crate::models::{RenderData, SurfaceId, ViewerId};
use crate::resource::ImageResource;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Observer invoked on every render pass before pixels reach the surface.
///
/// Listeners may rewrite `data` in place (pixels and cursors).
pub trait RenderEventListener: Send + Sync {
    fn on_render(
        &self,
        registry: &ImageRegistry,
        image: &dyn ImageResource,
        surface: SurfaceId,
        viewer: ViewerId,
        data: &mut RenderData,
    );
}

impl<F> RenderEventListener for F
where
    F: Fn(&ImageRegistry, &dyn ImageResource, SurfaceId, ViewerId, &mut RenderData) + Send + Sync,
{
    fn on_render(
        &self,
        registry: &ImageRegistry,
        image: &dyn ImageResource,
        surface: SurfaceId,
        viewer: ViewerId,
        data: &mut RenderData,
    ) {
        self(registry, image, surface, viewer, data)
    }
}

/// Ordered, copy-on-write list of listeners.
///
/// Renders read a snapshot without locking; edits swap in a new list.
pub(crate) struct ListenerChain {
    listeners: ArcSwap<Vec<Arc<dyn RenderEventListener>>>,
}

impl ListenerChain {
    pub(crate) fn new() -> Self {
        Self { listeners: ArcSwap::from_pointee(Vec::new()) }
    }

    pub(crate) fn append(&self, listener: Arc<dyn RenderEventListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&listener));
            next
        });
    }

    pub(crate) fn prepend(&self, listener: Arc<dyn RenderEventListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(Arc::clone(&listener));
            next.extend(current.iter().cloned());
            next
        });
    }

    /// Remove by identity. Returns whether the listener was present.
    pub(crate) fn remove(&self, listener: &Arc<dyn RenderEventListener>) -> bool {
        let previous = self.listeners.rcu(|current| {
            current.iter().filter(|l| !Arc::ptr_eq(l, listener)).cloned().collect::<Vec<_>>()
        });
        previous.iter().any(|l| Arc::ptr_eq(l, listener))
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub(crate) fn dispatch(
        &self,
        registry: &ImageRegistry,
        image: &dyn ImageResource,
        surface: SurfaceId,
        viewer: ViewerId,
        data: &mut RenderData,
    ) {
        let listeners = self.listeners.load();
        for listener in listeners.iter() {
            listener.on_render(registry, image, surface, viewer, data);
        }
    }
}
