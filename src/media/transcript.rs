use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{CompileContext, InvocationPlan, MediaOperation};

/// Sample rate the speech-to-text models expect
const WHISPER_SAMPLE_RATE: u32 = 16000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    Srt,
    Vtt,
    Txt,
}

impl TranscriptFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TranscriptFormat::Srt => "srt",
            TranscriptFormat::Vtt => "vtt",
            TranscriptFormat::Txt => "txt",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub model: String,
    pub language: Option<String>,
    pub output_format: TranscriptFormat,
}

impl MediaOperation for TranscriptArgs {
    /// Extract mono 16 kHz PCM, transcribe it, then move the tool's output
    /// (named after the audio file) to the requested path.
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        let audio = ctx.scratch_path("transcript", "wav");
        let produced = audio.with_extension(self.output_format.extension());

        let extract = ctx
            .ffmpeg("Audio extraction")
            .overwrite()
            .input(&self.input)
            .no_video()
            .audio_channels(1)
            .audio_sample_rate(WHISPER_SAMPLE_RATE)
            .audio_codec("pcm_s16le")
            .output(&audio);

        let transcribe = ctx
            .whisper("Speech-to-text")
            .output(&audio)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg(self.output_format.extension())
            .arg("--output_dir")
            .arg(ctx.scratch_dir.to_string_lossy().to_string())
            .opt("--language", self.language.as_deref())
            .current_dir(&ctx.scratch_dir);

        InvocationPlan::single(extract)
            .then(transcribe)
            .relocate(&produced, &self.output)
            .artifact(&audio)
            .artifact(&produced)
    }

    fn output(&self) -> Option<&Path> {
        Some(&self.output)
    }
}
