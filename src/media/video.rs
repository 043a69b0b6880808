use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::table::resolution_for_preset;
use super::{CompileContext, Invocation, InvocationPlan, MediaOperation};

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertFormatArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub format: Option<String>,
    pub copy_streams: bool,
}

impl MediaOperation for ConvertFormatArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        let mut cmd = ctx.ffmpeg("Format conversion").overwrite().input(&self.input);
        if self.copy_streams {
            cmd = cmd.copy_all();
        } else {
            cmd = cmd
                .opt("-c:v", self.video_codec.as_deref())
                .opt("-c:a", self.audio_codec.as_deref());
        }
        InvocationPlan::single(cmd.opt("-f", self.format.as_deref()).output(&self.output))
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResizeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub preset: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub scale_algorithm: String,
    pub copy_audio: bool,
}

/// `width:height` for the scale filter.
///
/// A known preset wins; otherwise explicit dimensions are used, with `-1`
/// standing in for a missing one so ffmpeg keeps the aspect ratio.
pub fn resolve_scale(preset: Option<&str>, width: Option<i64>, height: Option<i64>) -> Option<String> {
    if let Some(resolution) = preset.and_then(resolution_for_preset) {
        return Some(resolution.to_string());
    }
    match (width, height) {
        (None, None) => None,
        (w, h) => Some(format!("{}:{}", w.unwrap_or(-1), h.unwrap_or(-1))),
    }
}

impl MediaOperation for ResizeArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        let mut cmd = ctx.ffmpeg("Resize").overwrite().input(&self.input);
        if let Some(scale) = resolve_scale(self.preset.as_deref(), self.width, self.height) {
            cmd = cmd.video_filter(format!("scale={}:flags={}", scale, self.scale_algorithm));
        }
        if self.copy_audio {
            cmd = cmd.copy_audio();
        }
        InvocationPlan::single(cmd.output(&self.output))
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrimArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start_time: String,
    pub duration: Option<String>,
    pub end_time: Option<String>,
    pub copy_streams: bool,
}

impl MediaOperation for TrimArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        let mut cmd = ctx
            .ffmpeg("Trim")
            .overwrite()
            .input(&self.input)
            .arg("-ss")
            .arg(&self.start_time);
        cmd = match (&self.duration, &self.end_time) {
            (Some(duration), _) => cmd.arg("-t").arg(duration),
            (None, Some(end)) => cmd.arg("-to").arg(end),
            (None, None) => cmd,
        };
        if self.copy_streams {
            cmd = cmd.copy_all();
        }
        InvocationPlan::single(cmd.output(&self.output))
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompressArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub crf: i64,
    pub preset: String,
    pub two_pass: bool,
    pub target_bitrate: Option<String>,
    pub video_codec: String,
    pub audio_bitrate: String,
}

impl CompressArgs {
    fn encode(&self, ctx: &CompileContext, description: &str) -> Invocation {
        let cmd = ctx
            .ffmpeg(description)
            .overwrite()
            .input(&self.input)
            .video_codec(&self.video_codec)
            .arg("-preset")
            .arg(&self.preset);
        match &self.target_bitrate {
            Some(bitrate) => cmd.arg("-b:v").arg(bitrate),
            None => cmd.arg("-crf").arg(self.crf.to_string()),
        }
    }

    fn with_audio(&self, cmd: Invocation) -> Invocation {
        cmd.audio_codec("aac").arg("-b:a").arg(&self.audio_bitrate).output(&self.output)
    }
}

impl MediaOperation for CompressArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        if !self.two_pass {
            return InvocationPlan::single(self.with_audio(self.encode(ctx, "Compression")));
        }

        let prefix = ctx.scratch_prefix("passlog");
        let prefix_arg = prefix.to_string_lossy().to_string();

        let first = self
            .encode(ctx, "Compression pass 1")
            .arg("-pass")
            .arg("1")
            .arg("-passlogfile")
            .arg(&prefix_arg)
            .no_audio()
            .null_output();
        let second = self.with_audio(
            self.encode(ctx, "Compression pass 2")
                .arg("-pass")
                .arg("2")
                .arg("-passlogfile")
                .arg(&prefix_arg),
        );

        InvocationPlan::single(first)
            .then(second)
            .artifact(format!("{}-0.log", prefix_arg))
            .artifact(format!("{}-0.log.mbtree", prefix_arg))
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMethod {
    Demuxer,
    Protocol,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConcatenateArgs {
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub method: ConcatMethod,
}

/// Concat demuxer file list, one `file '<path>'` line per input
pub fn concat_manifest(inputs: &[String]) -> String {
    inputs
        .iter()
        .map(|path| format!("file '{}'\n", path.replace('\'', "'\\''")))
        .collect()
}

impl MediaOperation for ConcatenateArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        match self.method {
            ConcatMethod::Demuxer => {
                let manifest = ctx.scratch_path("concat", "txt");
                let cmd = ctx
                    .ffmpeg("Concatenation (demuxer)")
                    .overwrite()
                    .arg("-f")
                    .arg("concat")
                    .arg("-safe")
                    .arg("0")
                    .input(&manifest)
                    .copy_all()
                    .output(&self.output);
                InvocationPlan::single(cmd)
                    .stage(&manifest, concat_manifest(&self.inputs))
                    .artifact(&manifest)
            }
            ConcatMethod::Protocol => {
                let cmd = ctx
                    .ffmpeg("Concatenation (protocol)")
                    .overwrite()
                    .arg("-i")
                    .arg(format!("concat:{}", self.inputs.join("|")))
                    .copy_all()
                    .output(&self.output);
                InvocationPlan::single(cmd)
            }
        }
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Rotation {
    #[serde(rename = "90")]
    Clockwise90,
    #[serde(rename = "180")]
    Half,
    #[serde(rename = "270")]
    Clockwise270,
    #[serde(rename = "hflip")]
    FlipHorizontal,
    #[serde(rename = "vflip")]
    FlipVertical,
}

impl Rotation {
    pub fn filter(&self) -> &'static str {
        match self {
            Rotation::Clockwise90 => "transpose=1",
            Rotation::Half => "transpose=2,transpose=2",
            Rotation::Clockwise270 => "transpose=2",
            Rotation::FlipHorizontal => "hflip",
            Rotation::FlipVertical => "vflip",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotateArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rotation: Rotation,
}

impl MediaOperation for RotateArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        InvocationPlan::single(
            ctx.ffmpeg("Rotation")
                .overwrite()
                .input(&self.input)
                .video_filter(self.rotation.filter())
                .copy_audio()
                .output(&self.output),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BurnSubtitlesArgs {
    pub input: PathBuf,
    pub subtitles: String,
    pub output: PathBuf,
    pub style: Option<String>,
    pub video_codec: String,
}

impl MediaOperation for BurnSubtitlesArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        // filter text goes through untouched; escaping is the caller's job
        let mut filter = format!("subtitles={}", self.subtitles);
        if let Some(style) = &self.style {
            filter.push_str(&format!(":force_style='{}'", style));
        }
        InvocationPlan::single(
            ctx.ffmpeg("Subtitle burn-in")
                .overwrite()
                .input(&self.input)
                .video_filter(filter)
                .video_codec(&self.video_codec)
                .copy_audio()
                .output(&self.output),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyFilterArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub video_filter: Option<String>,
    pub audio_filter: Option<String>,
}

impl MediaOperation for ApplyFilterArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        InvocationPlan::single(
            ctx.ffmpeg("Custom filter")
                .overwrite()
                .input(&self.input)
                .opt("-vf", self.video_filter.as_deref())
                .opt("-af", self.audio_filter.as_deref())
                .output(&self.output),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSpeedArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub speed: f64,
}

/// `atempo` only accepts factors in [0.5, 2.0]; larger changes are chained.
pub fn atempo_chain(speed: f64) -> String {
    let mut stages = Vec::new();
    let mut remaining = speed;
    if remaining.is_finite() && remaining > 0.0 {
        while remaining > 2.0 {
            stages.push(2.0);
            remaining /= 2.0;
        }
        while remaining < 0.5 {
            stages.push(0.5);
            remaining /= 0.5;
        }
    }
    stages.push(remaining);
    stages
        .iter()
        .map(|factor| format!("atempo={}", factor))
        .collect::<Vec<_>>()
        .join(",")
}

impl MediaOperation for ChangeSpeedArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        InvocationPlan::single(
            ctx.ffmpeg("Speed change")
                .overwrite()
                .input(&self.input)
                .arg("-filter:v")
                .arg(format!("setpts={}*PTS", 1.0 / self.speed))
                .arg("-filter:a")
                .arg(atempo_chain(self.speed))
                .output(&self.output),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractFramesArgs {
    pub input: PathBuf,
    pub output_pattern: PathBuf,
    pub fps: f64,
    pub start_time: Option<String>,
    pub frame_count: Option<i64>,
    pub quality: i64,
}

impl MediaOperation for ExtractFramesArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        InvocationPlan::single(
            ctx.ffmpeg("Frame extraction")
                .overwrite()
                .opt("-ss", self.start_time.as_deref())
                .input(&self.input)
                .video_filter(format!("fps={}", self.fps))
                .opt("-frames:v", self.frame_count.map(|n| n.to_string()))
                .arg("-q:v")
                .arg(self.quality.to_string())
                .output(&self.output_pattern),
        )
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output_pattern)
    }
}
