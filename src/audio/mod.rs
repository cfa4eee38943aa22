//! Output audio formats and transcoding.

mod convert;

pub use convert::{AudioFormat, FfmpegTranscoder, Transcoder};
