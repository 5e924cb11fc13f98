//! Surface Controller: owns the single visual-output element.
//!
//! The actual element lives on the embedding side behind [`SurfaceBackend`];
//! the controller owns the process-wide surface state (run/stop display
//! state, fullscreen flag, backing pixel size) and enforces the one ordering
//! rule that matters: explicit style sizes are applied *before* the rendered
//! box is measured, so a measurement always reflects the latest style.

/// Minimal interface the embedding must provide for the visual surface.
///
/// This is public so that unit tests can provide a recording mock backend.
pub trait SurfaceBackend: Send {
    /// Swap the stopped/running display style class.
    fn set_display_running(&mut self, running: bool);
    /// Toggle the fullscreen style class.
    fn set_fullscreen_class(&mut self, enabled: bool);
    /// Apply an explicit style width/height in pixels.
    fn set_style_size(&mut self, width: u32, height: u32);
    /// Measure the current rendered (client) box.
    fn client_box(&self) -> (u32, u32);
    /// Apply the backing pixel-buffer size.
    fn apply_pixel_size(&mut self, width: u32, height: u32);
    /// Give the surface input focus.
    fn focus(&mut self);
    /// Suppress the default context-menu gesture on the surface.
    fn suppress_context_menu(&mut self);
}

/// Opaque surface handle returned from `init`; the guest only ever sees one
/// surface, so the handle is a constant.
pub const SURFACE_HANDLE: u32 = 1;

/// Host-side surface state plus its backend.
pub struct Surface {
    backend: Box<dyn SurfaceBackend>,
    fullscreen: bool,
    running: bool,
    pixel_size: (u32, u32),
}

impl Surface {
    pub fn new(backend: Box<dyn SurfaceBackend>) -> Self {
        Self {
            backend,
            fullscreen: false,
            running: false,
            pixel_size: (0, 0),
        }
    }

    /// Transition stopped -> running: display state, context-menu suppression,
    /// input focus. No error conditions; backend existence was validated at
    /// boot.
    pub fn init(&mut self) -> u32 {
        self.backend.set_display_running(true);
        self.backend.suppress_context_menu();
        self.backend.focus();
        self.running = true;
        SURFACE_HANDLE
    }

    /// Set the fullscreen flag and style class, then recompute the backing
    /// pixel size from the rendered box. Idempotent: repeating a value
    /// repeats the recomputation but changes no other state.
    pub fn set_fullscreen(&mut self, enabled: bool) {
        self.fullscreen = enabled;
        self.backend.set_fullscreen_class(enabled);
        self.sync_pixel_size();
    }

    /// Apply an explicit style size (ignored while fullscreen), then
    /// recompute the backing pixel size from the rendered box. The style must
    /// land before the box is measured.
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.fullscreen {
            self.backend.set_style_size(width, height);
        }
        self.sync_pixel_size();
    }

    /// Transition running -> stopped.
    pub fn stop(&mut self) {
        self.backend.set_display_running(false);
        self.running = false;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current backing pixel-buffer width.
    pub fn pixel_width(&self) -> u32 {
        self.pixel_size.0
    }

    /// Current backing pixel-buffer height.
    pub fn pixel_height(&self) -> u32 {
        self.pixel_size.1
    }

    fn sync_pixel_size(&mut self) {
        let (w, h) = self.backend.client_box();
        self.backend.apply_pixel_size(w, h);
        self.pixel_size = (w, h);
    }
}

/// Windowless backend for embeddings without a real display.
///
/// The rendered box tracks the explicit style size until fullscreen is
/// engaged, at which point it snaps to the fixed viewport — the same shape a
/// styled element takes in the original environment.
pub struct HeadlessBackend {
    viewport: (u32, u32),
    style_size: Option<(u32, u32)>,
    fullscreen: bool,
    pixel_size: (u32, u32),
    running: bool,
    focused: bool,
    context_menu_suppressed: bool,
}

impl HeadlessBackend {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport: (viewport_width, viewport_height),
            style_size: None,
            fullscreen: false,
            pixel_size: (0, 0),
            running: false,
            focused: false,
            context_menu_suppressed: false,
        }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixel_size
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl SurfaceBackend for HeadlessBackend {
    fn set_display_running(&mut self, running: bool) {
        self.running = running;
    }

    fn set_fullscreen_class(&mut self, enabled: bool) {
        self.fullscreen = enabled;
    }

    fn set_style_size(&mut self, width: u32, height: u32) {
        self.style_size = Some((width, height));
    }

    fn client_box(&self) -> (u32, u32) {
        if self.fullscreen {
            self.viewport
        } else {
            self.style_size.unwrap_or(self.viewport)
        }
    }

    fn apply_pixel_size(&mut self, width: u32, height: u32) {
        self.pixel_size = (width, height);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn suppress_context_menu(&mut self) {
        self.context_menu_suppressed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Display(bool),
        FullscreenClass(bool),
        StyleSize(u32, u32),
        Measure,
        PixelSize(u32, u32),
        Focus,
        SuppressContextMenu,
    }

    /// Records every backend call so tests can assert on ordering, not just
    /// final state.
    struct RecordingBackend {
        ops: Arc<Mutex<Vec<Op>>>,
        viewport: (u32, u32),
        style_size: Option<(u32, u32)>,
        fullscreen: bool,
    }

    impl RecordingBackend {
        fn new(viewport: (u32, u32)) -> (Self, Arc<Mutex<Vec<Op>>>) {
            let ops = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    ops: ops.clone(),
                    viewport,
                    style_size: None,
                    fullscreen: false,
                },
                ops,
            )
        }
    }

    impl SurfaceBackend for RecordingBackend {
        fn set_display_running(&mut self, running: bool) {
            self.ops.lock().unwrap().push(Op::Display(running));
        }

        fn set_fullscreen_class(&mut self, enabled: bool) {
            self.fullscreen = enabled;
            self.ops.lock().unwrap().push(Op::FullscreenClass(enabled));
        }

        fn set_style_size(&mut self, width: u32, height: u32) {
            self.style_size = Some((width, height));
            self.ops.lock().unwrap().push(Op::StyleSize(width, height));
        }

        fn client_box(&self) -> (u32, u32) {
            self.ops.lock().unwrap().push(Op::Measure);
            if self.fullscreen {
                self.viewport
            } else {
                self.style_size.unwrap_or(self.viewport)
            }
        }

        fn apply_pixel_size(&mut self, width: u32, height: u32) {
            self.ops.lock().unwrap().push(Op::PixelSize(width, height));
        }

        fn focus(&mut self) {
            self.ops.lock().unwrap().push(Op::Focus);
        }

        fn suppress_context_menu(&mut self) {
            self.ops.lock().unwrap().push(Op::SuppressContextMenu);
        }
    }

    #[test]
    fn init_swaps_display_state_and_focuses() {
        let (backend, ops) = RecordingBackend::new((800, 600));
        let mut surface = Surface::new(Box::new(backend));

        let handle = surface.init();
        assert_eq!(handle, SURFACE_HANDLE);
        assert!(surface.is_running());

        let ops = ops.lock().unwrap();
        assert_eq!(
            *ops,
            vec![Op::Display(true), Op::SuppressContextMenu, Op::Focus]
        );
    }

    #[test]
    fn resize_applies_style_before_measuring() {
        let (backend, ops) = RecordingBackend::new((800, 600));
        let mut surface = Surface::new(Box::new(backend));

        surface.resize(320, 240);

        let ops = ops.lock().unwrap();
        assert_eq!(
            *ops,
            vec![
                Op::StyleSize(320, 240),
                Op::Measure,
                Op::PixelSize(320, 240)
            ]
        );
        drop(ops);
        assert_eq!(surface.pixel_width(), 320);
        assert_eq!(surface.pixel_height(), 240);
    }

    #[test]
    fn resize_then_fullscreen_uses_fullscreen_box() {
        let (backend, _ops) = RecordingBackend::new((1920, 1080));
        let mut surface = Surface::new(Box::new(backend));

        surface.resize(320, 240);
        surface.set_fullscreen(true);

        // Pixel size comes from the fullscreen rendered box, not the explicit
        // resize request.
        assert_eq!(surface.pixel_width(), 1920);
        assert_eq!(surface.pixel_height(), 1080);
    }

    #[test]
    fn resize_while_fullscreen_skips_style_but_still_measures() {
        let (backend, ops) = RecordingBackend::new((1920, 1080));
        let mut surface = Surface::new(Box::new(backend));

        surface.set_fullscreen(true);
        ops.lock().unwrap().clear();

        surface.resize(100, 100);

        let ops = ops.lock().unwrap();
        assert_eq!(*ops, vec![Op::Measure, Op::PixelSize(1920, 1080)]);
    }

    #[test]
    fn leaving_fullscreen_recomputes_from_styled_box() {
        let (backend, _ops) = RecordingBackend::new((1920, 1080));
        let mut surface = Surface::new(Box::new(backend));

        surface.resize(320, 240);
        surface.set_fullscreen(true);
        assert_eq!(surface.pixel_width(), 1920);

        surface.set_fullscreen(false);
        assert!(!surface.is_fullscreen());
        assert_eq!(surface.pixel_width(), 320);
        assert_eq!(surface.pixel_height(), 240);
    }

    #[test]
    fn set_fullscreen_is_idempotent() {
        let (backend, ops) = RecordingBackend::new((640, 480));
        let mut surface = Surface::new(Box::new(backend));

        surface.set_fullscreen(true);
        let first: Vec<Op> = ops.lock().unwrap().clone();
        ops.lock().unwrap().clear();
        surface.set_fullscreen(true);
        let second: Vec<Op> = ops.lock().unwrap().clone();

        // Same class toggle + recomputation both times; flag unchanged.
        assert_eq!(first, second);
        assert!(surface.is_fullscreen());
    }

    #[test]
    fn stop_swaps_display_state_back() {
        let (backend, ops) = RecordingBackend::new((640, 480));
        let mut surface = Surface::new(Box::new(backend));

        surface.init();
        surface.stop();
        assert!(!surface.is_running());
        assert_eq!(*ops.lock().unwrap().last().unwrap(), Op::Display(false));
    }

    #[test]
    fn headless_backend_tracks_style_and_viewport() {
        let mut surface = Surface::new(Box::new(HeadlessBackend::new(1024, 768)));

        surface.resize(320, 200);
        assert_eq!((surface.pixel_width(), surface.pixel_height()), (320, 200));

        surface.set_fullscreen(true);
        assert_eq!((surface.pixel_width(), surface.pixel_height()), (1024, 768));
    }
}
