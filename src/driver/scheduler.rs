use eframe::egui::Context;

/// Anything that can ask the display for another frame callback.
pub trait FrameRequester {
    fn request_frame(&self);
}

impl FrameRequester for Context {
    fn request_frame(&self) {
        self.request_repaint();
    }
}

/// Keeps the animation loop alive: while running, each frame asks for the
/// next one. Once stopped nothing is requested again.
#[derive(Debug, Default)]
pub struct Scheduler {
    running: bool,
    requested: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<R: FrameRequester + ?Sized>(&mut self, requester: &R) {
        if self.running {
            return;
        }
        self.running = true;
        tracing::debug!("frame loop started");
        self.schedule_next(requester);
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(frames = self.requested, "frame loop stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Called at the end of every frame callback. Returns whether a follow-up
    /// frame was requested.
    pub fn schedule_next<R: FrameRequester + ?Sized>(&mut self, requester: &R) -> bool {
        if !self.running {
            return false;
        }
        requester.request_frame();
        self.requested += 1;
        true
    }
}
