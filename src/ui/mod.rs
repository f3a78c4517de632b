//! Interaction layer: host page, events, controls and speech

mod controller;
pub mod events;
mod host;
mod speech;

pub use controller::{CommandOutcome, ControlRole, FontStep, InteractionController, Theme, ViewerState};
pub use events::{Event, EventDispatcher, EventType, ListenerId};
pub use host::{HostPage, MountPoint};
pub use speech::{LoggingSynthesizer, Playback, SpeechChannel, SpeechSynthesizer};
