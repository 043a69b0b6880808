//! mediarpc - media operations as schema-validated remote procedures
//!
//! A catalog of typed operations (conversion, trimming, filtering,
//! transcription) compiled into ffmpeg/ffprobe/whisper invocations and
//! served over newline-delimited JSON-RPC on stdin/stdout.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod process;
pub mod protocol;
pub mod server;
pub mod validate;
pub mod workspace;
