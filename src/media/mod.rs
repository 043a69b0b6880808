// Media operation compilers
//
// Each operation owns a typed argument struct and turns it into an
// `InvocationPlan` without touching the filesystem or spawning anything:
// - Commands: the `Invocation` builder for ffmpeg-style argument vectors
// - Plan: plans, staging and the per-request compile context
// - Video / Audio / Probe / Transcript: the per-operation compilers

pub mod audio;
pub mod commands;
pub mod plan;
pub mod probe;
pub mod transcript;
pub mod video;

use std::path::Path;

pub use commands::*;
pub use plan::*;

use crate::catalog::OperationKind;
use crate::error::Result;
use crate::process::ProcessOutput;
use crate::validate::ValidatedArgs;

use audio::{AdjustVolumeArgs, ExtractAudioArgs};
use probe::MediaInfoArgs;
use transcript::TranscriptArgs;
use video::{
    ApplyFilterArgs, BurnSubtitlesArgs, ChangeSpeedArgs, CompressArgs, ConcatenateArgs, ConvertFormatArgs,
    ExtractFramesArgs, ResizeArgs, RotateArgs, TrimArgs,
};

/// Behaviour shared by every typed operation
pub trait MediaOperation: Send + Sync {
    /// Build the invocation plan. Pure: no I/O happens here.
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan;

    /// File the operation produces, if any
    fn output(&self) -> Option<&Path>;

    fn success_message(&self, _last: &ProcessOutput) -> String {
        match self.output() {
            Some(path) => format!("Wrote {}", path.display()),
            None => "Completed".to_string(),
        }
    }
}

/// One variant per catalog entry
#[derive(Debug, Clone)]
pub enum Operation {
    GetMediaInfo(MediaInfoArgs),
    ConvertFormat(ConvertFormatArgs),
    ExtractAudio(ExtractAudioArgs),
    ResizeVideo(ResizeArgs),
    TrimMedia(TrimArgs),
    CompressVideo(CompressArgs),
    ConcatenateMedia(ConcatenateArgs),
    RotateVideo(RotateArgs),
    BurnSubtitles(BurnSubtitlesArgs),
    ApplyFilter(ApplyFilterArgs),
    ChangeSpeed(ChangeSpeedArgs),
    AdjustVolume(AdjustVolumeArgs),
    ExtractFrames(ExtractFramesArgs),
    GenerateTranscript(TranscriptArgs),
}

impl Operation {
    /// Build the typed operation from a validated record.
    ///
    /// Keys the typed struct doesn't know about are ignored here.
    pub fn from_record(kind: OperationKind, record: ValidatedArgs) -> Result<Self> {
        let value = record.into_value();
        let operation = match kind {
            OperationKind::GetMediaInfo => Operation::GetMediaInfo(serde_json::from_value(value)?),
            OperationKind::ConvertFormat => Operation::ConvertFormat(serde_json::from_value(value)?),
            OperationKind::ExtractAudio => Operation::ExtractAudio(serde_json::from_value(value)?),
            OperationKind::ResizeVideo => Operation::ResizeVideo(serde_json::from_value(value)?),
            OperationKind::TrimMedia => Operation::TrimMedia(serde_json::from_value(value)?),
            OperationKind::CompressVideo => Operation::CompressVideo(serde_json::from_value(value)?),
            OperationKind::ConcatenateMedia => Operation::ConcatenateMedia(serde_json::from_value(value)?),
            OperationKind::RotateVideo => Operation::RotateVideo(serde_json::from_value(value)?),
            OperationKind::BurnSubtitles => Operation::BurnSubtitles(serde_json::from_value(value)?),
            OperationKind::ApplyFilter => Operation::ApplyFilter(serde_json::from_value(value)?),
            OperationKind::ChangeSpeed => Operation::ChangeSpeed(serde_json::from_value(value)?),
            OperationKind::AdjustVolume => Operation::AdjustVolume(serde_json::from_value(value)?),
            OperationKind::ExtractFrames => Operation::ExtractFrames(serde_json::from_value(value)?),
            OperationKind::GenerateTranscript => Operation::GenerateTranscript(serde_json::from_value(value)?),
        };
        Ok(operation)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::GetMediaInfo(_) => OperationKind::GetMediaInfo,
            Operation::ConvertFormat(_) => OperationKind::ConvertFormat,
            Operation::ExtractAudio(_) => OperationKind::ExtractAudio,
            Operation::ResizeVideo(_) => OperationKind::ResizeVideo,
            Operation::TrimMedia(_) => OperationKind::TrimMedia,
            Operation::CompressVideo(_) => OperationKind::CompressVideo,
            Operation::ConcatenateMedia(_) => OperationKind::ConcatenateMedia,
            Operation::RotateVideo(_) => OperationKind::RotateVideo,
            Operation::BurnSubtitles(_) => OperationKind::BurnSubtitles,
            Operation::ApplyFilter(_) => OperationKind::ApplyFilter,
            Operation::ChangeSpeed(_) => OperationKind::ChangeSpeed,
            Operation::AdjustVolume(_) => OperationKind::AdjustVolume,
            Operation::ExtractFrames(_) => OperationKind::ExtractFrames,
            Operation::GenerateTranscript(_) => OperationKind::GenerateTranscript,
        }
    }

    fn inner(&self) -> &dyn MediaOperation {
        match self {
            Operation::GetMediaInfo(args) => args,
            Operation::ConvertFormat(args) => args,
            Operation::ExtractAudio(args) => args,
            Operation::ResizeVideo(args) => args,
            Operation::TrimMedia(args) => args,
            Operation::CompressVideo(args) => args,
            Operation::ConcatenateMedia(args) => args,
            Operation::RotateVideo(args) => args,
            Operation::BurnSubtitles(args) => args,
            Operation::ApplyFilter(args) => args,
            Operation::ChangeSpeed(args) => args,
            Operation::AdjustVolume(args) => args,
            Operation::ExtractFrames(args) => args,
            Operation::GenerateTranscript(args) => args,
        }
    }

    pub fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        self.inner().compile(ctx)
    }

    pub fn output(&self) -> Option<&Path> {
        self.inner().output()
    }

    pub fn success_message(&self, last: &ProcessOutput) -> String {
        self.inner().success_message(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::ToolsConfig;
    use crate::validate::validate;
    use serde_json::json;
    use std::path::PathBuf;

    fn compile(name: &str, raw: serde_json::Value) -> InvocationPlan {
        let catalog = Catalog::builtin().unwrap();
        let descriptor = catalog.lookup(name).unwrap();
        let record = validate(descriptor, raw.as_object().unwrap()).unwrap();
        let operation = Operation::from_record(descriptor.kind, record).unwrap();
        assert_eq!(operation.kind(), descriptor.kind);
        operation.compile(&CompileContext::new(ToolsConfig::default(), PathBuf::from("/scratch")))
    }

    #[test]
    fn test_resize_with_preset() {
        let plan = compile("resize_video", json!({"input": "a.mp4", "output": "b.mp4", "preset": "720p"}));
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].value_of("-vf"), Some("scale=1280:720:flags=lanczos"));
    }

    #[test]
    fn test_trim_defaults_to_stream_copy() {
        let plan = compile(
            "trim_media",
            json!({"input": "a.mp4", "output": "c.mp4", "start_time": "00:01:00", "duration": "30"}),
        );
        let inv = &plan.steps[0];
        assert_eq!(inv.value_of("-c"), Some("copy"));
        assert!(!inv.has_arg("-c:v"));
        assert!(!inv.has_arg("-c:a"));
        assert_eq!(inv.value_of("-ss"), Some("00:01:00"));
        assert_eq!(inv.value_of("-t"), Some("30"));
    }

    #[test]
    fn test_every_operation_compiles_from_required_args() {
        let inputs = json!({
            "input": "a.mp4", "output": "b.mp4", "inputs": ["a.mp4", "b.mp4"],
            "start_time": "1", "rotation": "90", "subtitles": "a.srt",
            "speed": 1.25, "volume": "0.5", "output_pattern": "f_%03d.png",
        });
        for kind in OperationKind::ALL {
            let plan = compile(kind.as_str(), inputs.clone());
            assert!(!plan.steps.is_empty(), "{}", kind);
        }
    }

    #[test]
    fn test_extra_keys_ignored_by_typed_args() {
        let plan = compile(
            "rotate_video",
            json!({"input": "a.mp4", "output": "b.mp4", "rotation": "270", "preserve_metadata": true}),
        );
        assert_eq!(plan.steps[0].value_of("-vf"), Some("transpose=2"));
    }

    #[test]
    fn test_default_success_message_names_output() {
        let catalog = Catalog::builtin().unwrap();
        let descriptor = catalog.lookup("adjust_volume").unwrap();
        let raw = json!({"input": "a.mp4", "output": "loud.mp4", "volume": "2"});
        let record = validate(descriptor, raw.as_object().unwrap()).unwrap();
        let operation = Operation::from_record(descriptor.kind, record).unwrap();
        assert_eq!(operation.output(), Some(Path::new("loud.mp4")));
        assert_eq!(operation.success_message(&ProcessOutput::succeeded("")), "Wrote loud.mp4");
    }
}
