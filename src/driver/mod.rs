//! Per-frame orchestration: pacing, resize handling and the choice between
//! simulating in place or on a worker thread.

pub mod clock;
pub mod scheduler;
pub mod worker;

use crate::config::NetworkConfig;
use crate::render::Renderer;
use crate::render::commands::replay;
use crate::render::surface::Surface;
use crate::sim::Simulation;
use crate::sim::node::check_geometry;
use crate::sim::physics::PointerSample;
use clock::FrameClock;
use scheduler::{FrameRequester, Scheduler};
use worker::{FramePayload, HostMessage, OffloadPayload, WorkerHandle};

const MAX_RETRY_FRAMES: u32 = 240;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverMode {
    #[default]
    Inline,
    Offloaded(OffloadPayload),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The driver was stopped; nothing happened.
    Stopped,
    /// The surface has no usable size yet.
    Skipped,
    /// No frame has arrived from the worker yet.
    Waiting,
    Painted,
}

/// Frame-count backoff between worker restarts.
#[derive(Debug, Default)]
struct Backoff {
    failures: u32,
    remaining: u32,
}

impl Backoff {
    fn fail(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.remaining = 2u32
            .saturating_pow(self.failures.min(16))
            .min(MAX_RETRY_FRAMES);
    }

    fn succeed(&mut self) {
        self.failures = 0;
        self.remaining = 0;
    }

    /// Counts one frame down; true once a retry may go ahead.
    fn ready(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        false
    }
}

struct Inline {
    simulation: Simulation,
    renderer: Renderer,
    clock: FrameClock,
}

impl Inline {
    fn resize(&mut self, width: f32, height: f32) {
        if let Err(error) = self.simulation.resize(width, height) {
            tracing::debug!(%error, "resize rejected");
        }
        self.renderer.invalidate();
        self.clock.reset();
    }

    fn frame<S: Surface + ?Sized>(
        &mut self,
        timestamp_ms: f64,
        pointer: Option<PointerSample>,
        surface: &mut S,
    ) -> FrameOutcome {
        self.simulation.set_pointer(pointer);
        if let Some(timing) = self.clock.tick(timestamp_ms) {
            let report = self.simulation.step(timing);
            if let Some(update) = report.graph {
                tracing::trace!(?update, pulses = report.pulses_spawned, "graph cycle");
            }
        }
        if !self.simulation.is_ready() {
            return FrameOutcome::Waiting;
        }
        self.renderer.render(surface, self.simulation.scene());
        FrameOutcome::Painted
    }
}

struct Offloaded {
    config: NetworkConfig,
    seed: Option<u64>,
    payload: OffloadPayload,
    worker: Option<WorkerHandle>,
    backoff: Backoff,
    renderer: Renderer,
    latest: Option<FramePayload>,
    last_pointer: Option<PointerSample>,
    size: Option<(f32, f32)>,
}

impl Offloaded {
    fn ensure_worker(&mut self) -> Option<&WorkerHandle> {
        if self.worker.is_none() && self.backoff.ready() {
            match WorkerHandle::spawn(self.config.clone(), self.seed, self.payload) {
                Ok(worker) => {
                    let init = self.size.map(|(width, height)| HostMessage::Init { width, height });
                    match init.map_or(Ok(()), |message| worker.send(&message)) {
                        Ok(()) => {
                            self.backoff.succeed();
                            self.last_pointer = None;
                            self.worker = Some(worker);
                        }
                        Err(error) => {
                            tracing::warn!(%error, "simulation worker rejected init");
                            self.backoff.fail();
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to start simulation worker");
                    self.backoff.fail();
                }
            }
        }
        self.worker.as_ref()
    }

    fn fail(&mut self, error: &dyn std::error::Error) {
        tracing::warn!(%error, "simulation worker lost, restarting");
        self.worker = None;
        self.latest = None;
        self.backoff.fail();
    }

    /// Keeps `frame` unless it was produced for a surface size other than
    /// the current one.
    fn adopt(&mut self, frame: FramePayload) {
        if self.size == Some(frame.size()) {
            self.latest = Some(frame);
        } else {
            tracing::trace!(frame_size = ?frame.size(), size = ?self.size, "dropped stale frame");
        }
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.size = Some((width, height));
        self.renderer.invalidate();
        self.latest = None;
        if let Some(worker) = &self.worker {
            if let Err(error) = worker.send(&HostMessage::Resize { width, height }) {
                self.fail(&error);
            }
        }
    }

    fn frame<S: Surface + ?Sized>(
        &mut self,
        timestamp_ms: f64,
        pointer: Option<PointerSample>,
        surface: &mut S,
    ) -> FrameOutcome {
        let pointer_changed = pointer != self.last_pointer;
        let sent = self.ensure_worker().map(|worker| {
            let pointer_sent = if pointer_changed {
                let sample = pointer.unwrap_or(PointerSample {
                    x: 0.0,
                    y: 0.0,
                    active: false,
                });
                worker.send(&HostMessage::Pointer(sample))
            } else {
                Ok(())
            };
            pointer_sent
                .and_then(|()| worker.send(&HostMessage::Tick { timestamp_ms }))
                .and_then(|()| worker.latest_frame())
        });

        match sent {
            Some(Ok(frame)) => {
                self.last_pointer = pointer;
                if let Some(frame) = frame {
                    self.adopt(frame);
                }
            }
            Some(Err(error)) => self.fail(&error),
            None => {}
        }

        match &self.latest {
            Some(FramePayload::State(snapshot)) => match snapshot.validate() {
                Ok(()) => {
                    self.renderer.render(surface, snapshot.scene());
                    FrameOutcome::Painted
                }
                Err(error) => {
                    tracing::warn!(%error, "discarding inconsistent snapshot");
                    self.latest = None;
                    FrameOutcome::Waiting
                }
            },
            Some(FramePayload::Commands { commands, .. }) => {
                replay(commands, surface);
                FrameOutcome::Painted
            }
            None => FrameOutcome::Waiting,
        }
    }

    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        self.latest = None;
    }
}

enum Backend {
    Inline(Box<Inline>),
    Offloaded(Box<Offloaded>),
}

/// Drives one visualization from display callbacks.
pub struct FrameDriver {
    backend: Backend,
    scheduler: Scheduler,
    size: Option<(f32, f32)>,
    geometry_valid: bool,
}

impl FrameDriver {
    pub fn new(config: NetworkConfig, mode: DriverMode, seed: Option<u64>) -> Self {
        let renderer = Renderer::new(&config);
        let backend = match mode {
            DriverMode::Inline => Backend::Inline(Box::new(Inline {
                clock: FrameClock::new(config.timing.clone()),
                simulation: Simulation::new(config, seed),
                renderer,
            })),
            DriverMode::Offloaded(payload) => Backend::Offloaded(Box::new(Offloaded {
                config,
                seed,
                payload,
                worker: None,
                backoff: Backoff::default(),
                renderer,
                latest: None,
                last_pointer: None,
                size: None,
            })),
        };

        Self {
            backend,
            scheduler: Scheduler::new(),
            size: None,
            geometry_valid: true,
        }
    }

    pub fn start<R: FrameRequester + ?Sized>(&mut self, requester: &R) {
        self.scheduler.start(requester);
    }

    /// Stops requesting frames and releases the simulation or its worker.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        match &mut self.backend {
            Backend::Inline(inline) => inline.simulation.destroy(),
            Backend::Offloaded(offloaded) => offloaded.shutdown(),
        }
        self.size = None;
    }

    /// Inline simulation, when running in that mode.
    pub fn simulation(&self) -> Option<&Simulation> {
        match &self.backend {
            Backend::Inline(inline) => Some(&inline.simulation),
            Backend::Offloaded(_) => None,
        }
    }

    /// One display callback: adopt the surface size, advance, paint, and ask
    /// for the next callback.
    pub fn frame<S, R>(
        &mut self,
        timestamp_ms: f64,
        size: (f32, f32),
        pointer: Option<PointerSample>,
        surface: &mut S,
        requester: &R,
    ) -> FrameOutcome
    where
        S: Surface + ?Sized,
        R: FrameRequester + ?Sized,
    {
        if !self.scheduler.is_running() {
            return FrameOutcome::Stopped;
        }

        let outcome = match check_geometry(size.0, size.1) {
            Err(error) => {
                if self.geometry_valid {
                    tracing::debug!(%error, "skipping frames until the surface has a size");
                }
                self.geometry_valid = false;
                FrameOutcome::Skipped
            }
            Ok(()) => {
                self.geometry_valid = true;
                if self.size != Some(size) {
                    self.resize(size);
                }
                match &mut self.backend {
                    Backend::Inline(inline) => inline.frame(timestamp_ms, pointer, surface),
                    Backend::Offloaded(offloaded) => {
                        offloaded.frame(timestamp_ms, pointer, surface)
                    }
                }
            }
        };

        self.scheduler.schedule_next(requester);
        outcome
    }

    fn resize(&mut self, (width, height): (f32, f32)) {
        tracing::debug!(width, height, "surface resized");
        self.size = Some((width, height));
        match &mut self.backend {
            Backend::Inline(inline) => inline.resize(width, height),
            Backend::Offloaded(offloaded) => offloaded.resize(width, height),
        }
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if let Backend::Offloaded(offloaded) = &mut self.backend {
            offloaded.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::render::commands::{DrawCommand, RecordingSurface};

    #[derive(Default)]
    struct CountingRequester(Cell<u32>);

    impl FrameRequester for CountingRequester {
        fn request_frame(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn config() -> NetworkConfig {
        let mut config = NetworkConfig::default();
        config.timing.frame_interval_ms = 0.0;
        config
    }

    #[test]
    fn inline_driver_paints_and_keeps_the_loop_alive() {
        let requester = CountingRequester::default();
        let mut driver = FrameDriver::new(config(), DriverMode::Inline, Some(1));
        driver.start(&requester);

        for frame in 0..30 {
            let mut surface = RecordingSurface::new();
            let outcome = driver.frame(
                frame as f64 * 16.67,
                (640.0, 480.0),
                None,
                &mut surface,
                &requester,
            );
            assert_eq!(outcome, FrameOutcome::Painted);
            assert_eq!(surface.commands().first(), Some(&DrawCommand::Clear));
        }
        assert_eq!(requester.0.get(), 31);
    }

    #[test]
    fn invalid_geometry_skips_without_touching_state() {
        let requester = CountingRequester::default();
        let mut driver = FrameDriver::new(config(), DriverMode::Inline, Some(1));
        driver.start(&requester);

        let mut surface = RecordingSurface::new();
        let outcome = driver.frame(0.0, (0.0, 480.0), None, &mut surface, &requester);
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(surface.commands().is_empty());
        assert!(!driver.simulation().unwrap().is_ready());

        let outcome = driver.frame(16.0, (640.0, 480.0), None, &mut surface, &requester);
        assert_eq!(outcome, FrameOutcome::Painted);
        assert!(driver.simulation().unwrap().is_ready());
    }

    #[test]
    fn resize_reseeds_and_restarts_the_fade_in() {
        let requester = CountingRequester::default();
        let mut driver = FrameDriver::new(config(), DriverMode::Inline, Some(2));
        driver.start(&requester);

        let mut surface = RecordingSurface::new();
        for frame in 0..120 {
            driver.frame(frame as f64 * 16.67, (640.0, 480.0), None, &mut surface, &requester);
        }
        let before = driver.simulation().unwrap().snapshot();
        assert_eq!(before.progress, 1.0);

        driver.frame(2100.0, (800.0, 600.0), None, &mut surface, &requester);
        let after = driver.simulation().unwrap().snapshot();
        assert_eq!((after.width, after.height), (800.0, 600.0));
        assert_eq!(after.progress, 0.0);
        assert!(after.connections.is_empty());
        assert_ne!(before.nodes, after.nodes);
    }

    #[test]
    fn stopped_driver_never_steps_again() {
        let requester = CountingRequester::default();
        let mut driver = FrameDriver::new(config(), DriverMode::Inline, Some(3));
        driver.start(&requester);
        let mut surface = RecordingSurface::new();
        driver.frame(0.0, (640.0, 480.0), None, &mut surface, &requester);

        driver.stop();
        let requested = requester.0.get();
        let mut surface = RecordingSurface::new();
        for frame in 1..10 {
            let outcome = driver.frame(
                frame as f64 * 16.67,
                (640.0, 480.0),
                None,
                &mut surface,
                &requester,
            );
            assert_eq!(outcome, FrameOutcome::Stopped);
        }
        assert!(surface.commands().is_empty());
        assert_eq!(requester.0.get(), requested);
        assert!(!driver.simulation().unwrap().is_ready());
    }

    #[test]
    fn backoff_grows_and_resets() {
        let mut backoff = Backoff::default();
        assert!(backoff.ready());

        backoff.fail();
        assert!(!backoff.ready());
        assert!(!backoff.ready());
        assert!(backoff.ready());

        for _ in 0..20 {
            backoff.fail();
        }
        assert_eq!(backoff.remaining, MAX_RETRY_FRAMES);

        backoff.succeed();
        assert!(backoff.ready());
    }

    #[test]
    fn frames_for_an_old_size_are_dropped_after_a_resize() {
        let config = config();
        let mut offloaded = Offloaded {
            renderer: Renderer::new(&config),
            config: config.clone(),
            seed: Some(6),
            payload: OffloadPayload::Commands,
            worker: None,
            backoff: Backoff::default(),
            latest: None,
            last_pointer: None,
            size: None,
        };
        offloaded.resize(320.0, 240.0);

        let frame = |width, height| FramePayload::Commands {
            width,
            height,
            commands: vec![DrawCommand::Clear],
        };
        offloaded.adopt(frame(320.0, 240.0));
        assert!(offloaded.latest.is_some());

        offloaded.resize(800.0, 600.0);
        assert!(offloaded.latest.is_none());
        offloaded.adopt(frame(320.0, 240.0));
        assert!(offloaded.latest.is_none());

        let mut simulation = Simulation::new(config, Some(6));
        simulation.resize(320.0, 240.0).unwrap();
        offloaded.adopt(FramePayload::State(simulation.snapshot()));
        assert!(offloaded.latest.is_none());

        offloaded.adopt(frame(800.0, 600.0));
        assert_eq!(offloaded.latest.as_ref().map(FramePayload::size), Some((800.0, 600.0)));
    }

    #[test]
    fn offloaded_driver_paints_the_newest_worker_frame() {
        for payload in [OffloadPayload::State, OffloadPayload::Commands] {
            let requester = CountingRequester::default();
            let mut driver = FrameDriver::new(config(), DriverMode::Offloaded(payload), Some(4));
            driver.start(&requester);
            assert!(driver.simulation().is_none());

            let deadline = Instant::now() + Duration::from_secs(5);
            let mut timestamp_ms = 0.0;
            let mut outcome = FrameOutcome::Waiting;
            let mut surface = RecordingSurface::new();
            while outcome != FrameOutcome::Painted && Instant::now() < deadline {
                surface = RecordingSurface::new();
                outcome =
                    driver.frame(timestamp_ms, (320.0, 240.0), None, &mut surface, &requester);
                timestamp_ms += 16.67;
                thread::sleep(Duration::from_millis(5));
            }

            assert_eq!(outcome, FrameOutcome::Painted, "{payload:?}");
            assert_eq!(surface.commands().first(), Some(&DrawCommand::Clear));
            driver.stop();
        }
    }
}
