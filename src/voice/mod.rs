//! Voice identity and asset management.
//!
//! Validates requested voice names and maps them to cached model files,
//! downloading missing assets from the voice store on first use.

mod cache;
mod name;

pub use cache::{VoiceAssets, VoiceCache};
pub use name::VoiceName;
