//! Shadowing practice media engine.
//!
//! The core is a timeline synchronization engine: on every reported
//! playback tick it reconciles two looping policies (explicit A-B loop vs.
//! subtitle-sentence loop), keeps a waveform view and its A/B markers in
//! sync, and turns pointer drags on the rendered surface into loop-boundary
//! updates. Decoding, audio output and microphone capture are collaborator
//! services around that core.
//!
//! Everything is event-driven and single-threaded from the engine's point
//! of view: handlers run to completion per event, the only real threads
//! are the audio callbacks owned by the collaborators.

pub mod controller;
pub mod drag;
pub mod player;
pub mod recorder;
pub mod render;
pub mod session;
pub mod subtitle;
pub mod timeline;
pub mod waveform;

pub use controller::PlaybackCommand;
pub use drag::{CursorHint, DragController, Modifiers, PointerEvent};
pub use player::Player;
pub use recorder::{Recorder, RecorderError, RecordingResult};
pub use render::{render, DrawOp, Viewport};
pub use session::{Key, Session, SessionCommand};
pub use subtitle::SubtitleCue;
pub use timeline::{LoopMode, Timeline, RATES};
pub use waveform::{MediaError, WaveformBuffer};
