//! Speech synthesis via the external Piper engine.

mod engine;

pub use engine::{PiperEngine, SpeechEngine, SynthesisParams};
