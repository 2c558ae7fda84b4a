//! Host surface seam: resolving surfaces and managing their renderers.
//!
//! A renderer is a plain function value invoked once per render pass. The
//! registry only needs [`SurfaceHost`]; [`MemoryHost`] is an in-process
//! implementation that can also drive render passes.

use crate::models::{MapCursor, SurfaceId, ViewerId};
use crate::palettes::PALETTE_TRANSPARENT;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of an attached renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererId(u64);

impl RendererId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RendererId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Pixel canvas of one surface during a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    size: u32,
    pixels: Vec<u8>,
    pub cursors: Vec<MapCursor>,
}

impl Canvas {
    /// A blank (transparent) `size x size` canvas.
    pub fn new(size: u32) -> Self {
        Self { size, pixels: vec![PALETTE_TRANSPARENT; (size * size) as usize], cursors: Vec::new() }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Set one pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, index: u8) {
        if x < self.size && y < self.size {
            self.pixels[(y * self.size + x) as usize] = index;
        }
    }

    /// Copy a full buffer in. Shorter buffers fill a prefix.
    pub fn draw(&mut self, pixels: &[u8]) {
        let n = pixels.len().min(self.pixels.len());
        self.pixels[..n].copy_from_slice(&pixels[..n]);
    }
}

/// Everything a renderer sees during one pass.
pub struct RenderPass<'a> {
    pub surface: SurfaceId,
    pub viewer: ViewerId,
    /// The renderer being invoked
    pub renderer: RendererId,
    /// Renderers attached to the surface when the pass started, in order
    pub attached: &'a [RendererId],
    pub canvas: &'a mut Canvas,
}

/// Render hook body.
pub type RenderFn = Arc<dyn Fn(&mut RenderPass<'_>) + Send + Sync>;

/// A renderer attached to a surface.
#[derive(Clone)]
pub struct Renderer {
    id: RendererId,
    render: RenderFn,
}

impl Renderer {
    pub fn new(render: impl Fn(&mut RenderPass<'_>) + Send + Sync + 'static) -> Self {
        Self { id: RendererId::next(), render: Arc::new(render) }
    }

    pub fn id(&self) -> RendererId {
        self.id
    }

    /// Invoke the hook.
    pub fn render(&self, pass: &mut RenderPass<'_>) {
        (self.render)(pass)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer").field("id", &self.id).finish()
    }
}

/// Host platform surface registry.
pub trait SurfaceHost: Send + Sync {
    /// Whether the host knows the surface.
    fn contains(&self, surface: SurfaceId) -> bool;

    /// Ids of the renderers currently attached, in invocation order.
    fn renderers(&self, surface: SurfaceId) -> Vec<RendererId>;

    /// Attach a renderer at the end of the surface's list.
    fn attach(&self, surface: SurfaceId, renderer: Renderer);

    /// Detach a renderer. Returns false if it was not attached.
    fn detach(&self, surface: SurfaceId, renderer: RendererId) -> bool;
}

/// In-memory surface host.
#[derive(Debug)]
pub struct MemoryHost {
    size: u32,
    surfaces: RwLock<HashMap<SurfaceId, Vec<Renderer>>>,
    next_surface: AtomicI32,
}

impl MemoryHost {
    /// A host whose surfaces are `size x size` pixels.
    pub fn new(size: u32) -> Self {
        Self { size, surfaces: RwLock::new(HashMap::new()), next_surface: AtomicI32::new(0) }
    }

    /// Allocate a new surface id.
    pub fn create_surface(&self) -> SurfaceId {
        let mut surfaces = self.surfaces.write();
        loop {
            let id = SurfaceId(self.next_surface.fetch_add(1, Ordering::Relaxed));
            if !surfaces.contains_key(&id) {
                surfaces.insert(id, Vec::new());
                return id;
            }
        }
    }

    /// Register a surface with a caller-chosen id.
    pub fn add_surface(&self, surface: SurfaceId) {
        self.surfaces.write().entry(surface).or_default();
    }

    /// Run one render pass for a viewer. `None` if the surface is unknown.
    ///
    /// Renderers run in attachment order against a snapshot of the list, so a
    /// renderer may detach itself (or others) without disturbing the pass.
    pub fn render(&self, surface: SurfaceId, viewer: ViewerId) -> Option<Canvas> {
        let renderers = self.surfaces.read().get(&surface)?.clone();
        let attached: Vec<RendererId> = renderers.iter().map(Renderer::id).collect();
        let mut canvas = Canvas::new(self.size);
        for renderer in &renderers {
            let mut pass = RenderPass {
                surface,
                viewer,
                renderer: renderer.id(),
                attached: &attached,
                canvas: &mut canvas,
            };
            renderer.render(&mut pass);
        }
        Some(canvas)
    }
}

impl SurfaceHost for MemoryHost {
    fn contains(&self, surface: SurfaceId) -> bool {
        self.surfaces.read().contains_key(&surface)
    }

    fn renderers(&self, surface: SurfaceId) -> Vec<RendererId> {
        self.surfaces
            .read()
            .get(&surface)
            .map(|list| list.iter().map(Renderer::id).collect())
            .unwrap_or_default()
    }

    fn attach(&self, surface: SurfaceId, renderer: Renderer) {
        self.surfaces.write().entry(surface).or_default().push(renderer);
    }

    fn detach(&self, surface: SurfaceId, renderer: RendererId) -> bool {
        let mut surfaces = self.surfaces.write();
        let Some(list) = surfaces.get_mut(&surface) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id() != renderer);
        list.len() != before
    }
}
