use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{CompileContext, InvocationPlan, MediaOperation};

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractAudioArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub codec: String,
    pub bitrate: String,
    pub sample_rate: Option<i64>,
    pub channels: Option<i64>,
}

impl MediaOperation for ExtractAudioArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        let mut cmd = ctx
            .ffmpeg("Audio extraction")
            .overwrite()
            .input(&self.input)
            .no_video()
            .audio_codec(&self.codec);
        // a copied stream keeps its own bitrate
        if self.codec != "copy" {
            cmd = cmd.arg("-b:a").arg(&self.bitrate);
        }
        InvocationPlan::single(
            cmd.opt("-ar", self.sample_rate.map(|r| r.to_string()))
                .opt("-ac", self.channels.map(|c| c.to_string()))
                .output(&self.output),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustVolumeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub volume: String,
}

impl MediaOperation for AdjustVolumeArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        InvocationPlan::single(
            ctx.ffmpeg("Volume adjustment")
                .overwrite()
                .input(&self.input)
                .audio_filter(format!("volume={}", self.volume))
                .copy_video()
                .output(&self.output),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;

    fn ctx() -> CompileContext {
        CompileContext::new(ToolsConfig::default(), PathBuf::from("/scratch"))
    }

    #[test]
    fn test_extract_audio_defaults() {
        let args = ExtractAudioArgs {
            input: "talk.mp4".into(),
            output: "talk.mp3".into(),
            codec: "libmp3lame".into(),
            bitrate: "192k".into(),
            sample_rate: Some(44100),
            channels: None,
        };
        let plan = args.compile(&ctx());
        assert_eq!(plan.steps[0].program, "ffmpeg");
        assert_eq!(
            plan.steps[0].args,
            vec!["-y", "-i", "talk.mp4", "-vn", "-c:a", "libmp3lame", "-b:a", "192k", "-ar", "44100", "talk.mp3"]
        );
    }

    #[test]
    fn test_extract_audio_copy_has_no_bitrate() {
        let args = ExtractAudioArgs {
            input: "talk.mp4".into(),
            output: "talk.m4a".into(),
            codec: "copy".into(),
            bitrate: "192k".into(),
            sample_rate: None,
            channels: None,
        };
        let inv = &args.compile(&ctx()).steps[0];
        assert!(!inv.has_arg("-b:a"));
        assert_eq!(inv.value_of("-c:a"), Some("copy"));
    }

    #[test]
    fn test_adjust_volume() {
        let args = AdjustVolumeArgs {
            input: "a.mp4".into(),
            output: "b.mp4".into(),
            volume: "6dB".into(),
        };
        let inv = &args.compile(&ctx()).steps[0];
        assert_eq!(inv.value_of("-af"), Some("volume=6dB"));
        assert_eq!(inv.value_of("-c:v"), Some("copy"));
    }
}
