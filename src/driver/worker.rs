//! Offloaded mode: the simulation runs on its own thread and streams frames
//! back to the rendering side.
//!
//! Both directions carry the JSON wire form, so every message is
//! self-contained. Ticks are coalesced on the worker and frames on the host:
//! only the newest of each is ever acted upon.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::clock::FrameClock;
use crate::config::NetworkConfig;
use crate::error::ProtocolError;
use crate::render::Renderer;
use crate::render::commands::{DrawCommand, RecordingSurface};
use crate::sim::physics::PointerSample;
use crate::sim::{Simulation, Snapshot};

/// What the worker ships back per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffloadPayload {
    /// Node and connection state; the host renders it.
    #[default]
    State,
    /// Finished draw commands; the host only replays them.
    Commands,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Init { width: f32, height: f32 },
    Resize { width: f32, height: f32 },
    Tick { timestamp_ms: f64 },
    Pointer(PointerSample),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePayload {
    State(Snapshot),
    Commands {
        width: f32,
        height: f32,
        commands: Vec<DrawCommand>,
    },
}

impl FramePayload {
    /// Surface size the frame was produced for.
    pub fn size(&self) -> (f32, f32) {
        match self {
            Self::State(snapshot) => (snapshot.width, snapshot.height),
            Self::Commands { width, height, .. } => (*width, *height),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerMessage {
    Frame(FramePayload),
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

/// Everything the worker thread owns. Kept apart from the thread loop so the
/// message handling can be driven directly.
pub(crate) struct WorkerState {
    simulation: Simulation,
    clock: FrameClock,
    renderer: Option<Renderer>,
    pending_tick: Option<f64>,
}

impl WorkerState {
    pub(crate) fn new(config: NetworkConfig, seed: Option<u64>, payload: OffloadPayload) -> Self {
        let renderer = (payload == OffloadPayload::Commands).then(|| Renderer::new(&config));
        Self {
            clock: FrameClock::new(config.timing.clone()),
            simulation: Simulation::new(config, seed),
            renderer,
            pending_tick: None,
        }
    }

    pub(crate) fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::Init { width, height } | HostMessage::Resize { width, height } => {
                match self.simulation.resize(width, height) {
                    Ok(()) => {
                        self.clock.reset();
                        if let Some(renderer) = &mut self.renderer {
                            renderer.invalidate();
                        }
                    }
                    Err(error) => tracing::debug!(%error, "worker ignored resize"),
                }
            }
            HostMessage::Tick { timestamp_ms } => {
                self.pending_tick = Some(match self.pending_tick {
                    Some(previous) => previous.max(timestamp_ms),
                    None => timestamp_ms,
                });
            }
            HostMessage::Pointer(pointer) => {
                self.simulation.set_pointer(pointer.active.then_some(pointer));
            }
        }
    }

    /// Simulates the newest pending tick, if any, and builds its frame.
    pub(crate) fn produce_frame(&mut self) -> Option<WorkerMessage> {
        let timestamp_ms = self.pending_tick.take()?;
        if !self.simulation.is_ready() {
            return None;
        }
        let timing = self.clock.tick(timestamp_ms)?;
        self.simulation.step(timing);

        let payload = match &mut self.renderer {
            Some(renderer) => {
                let mut surface = RecordingSurface::new();
                renderer.render(&mut surface, self.simulation.scene());
                let (width, height) = self.simulation.size();
                FramePayload::Commands {
                    width,
                    height,
                    commands: surface.into_commands(),
                }
            }
            None => FramePayload::State(self.simulation.snapshot()),
        };
        Some(WorkerMessage::Frame(payload))
    }
}

fn run_worker(mut state: WorkerState, inbox: Receiver<String>, outbox: Sender<String>) {
    let apply = |state: &mut WorkerState, text: String| match decode::<HostMessage>(&text) {
        Ok(message) => state.handle(message),
        Err(error) => tracing::warn!(%error, "worker dropped a host message"),
    };

    while let Ok(first) = inbox.recv() {
        apply(&mut state, first);
        while let Ok(text) = inbox.try_recv() {
            apply(&mut state, text);
        }

        let Some(message) = state.produce_frame() else {
            continue;
        };
        let text = match encode(&message) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(%error, "worker dropped a frame");
                continue;
            }
        };
        if outbox.send(text).is_err() {
            break;
        }
    }
    tracing::info!("simulation worker exiting");
}

/// Host side of a running worker thread. Dropping it closes the channel and
/// joins the thread.
pub struct WorkerHandle {
    sender: Option<Sender<String>>,
    receiver: Receiver<String>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(
        config: NetworkConfig,
        seed: Option<u64>,
        payload: OffloadPayload,
    ) -> io::Result<Self> {
        let (host_tx, worker_rx) = mpsc::channel::<String>();
        let (worker_tx, host_rx) = mpsc::channel::<String>();
        let state = WorkerState::new(config, seed, payload);

        let thread = thread::Builder::new()
            .name("neural-backdrop-sim".into())
            .spawn(move || run_worker(state, worker_rx, worker_tx))?;
        tracing::info!(?payload, "simulation worker started");

        Ok(Self {
            sender: Some(host_tx),
            receiver: host_rx,
            thread: Some(thread),
        })
    }

    pub fn send(&self, message: &HostMessage) -> Result<(), ProtocolError> {
        let text = encode(message)?;
        self.sender
            .as_ref()
            .ok_or(ProtocolError::Disconnected)?
            .send(text)
            .map_err(|_| ProtocolError::Disconnected)
    }

    /// Drains every frame that arrived since the last call and decodes only
    /// the newest one. `Ok(None)` means nothing new yet.
    pub fn latest_frame(&self) -> Result<Option<FramePayload>, ProtocolError> {
        let mut newest = None;
        let mut disconnected = false;

        loop {
            match self.receiver.try_recv() {
                Ok(text) => newest = Some(text),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        match newest {
            Some(text) => {
                let WorkerMessage::Frame(payload) = decode(&text)?;
                Ok(Some(payload))
            }
            None if disconnected => Err(ProtocolError::Disconnected),
            None => Ok(None),
        }
    }

    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.sender = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("simulation worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.close();
    }
}
