use super::{OperationDescriptor, OperationKind, ParamSpec};

/// Named resolution presets understood by `resize_video`
pub const RESOLUTION_PRESETS: [(&str, &str); 5] = [
    ("360p", "640:360"),
    ("480p", "854:480"),
    ("720p", "1280:720"),
    ("1080p", "1920:1080"),
    ("4k", "3840:2160"),
];

pub const ROTATIONS: [&str; 5] = ["90", "180", "270", "hflip", "vflip"];

pub const CONCAT_METHODS: [&str; 2] = ["demuxer", "protocol"];

pub const TRANSCRIPT_FORMATS: [&str; 3] = ["srt", "vtt", "txt"];

const ENCODER_PRESETS: [&str; 9] = [
    "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow", "slower", "veryslow",
];

const SCALE_ALGORITHMS: [&str; 6] = ["fast_bilinear", "bilinear", "bicubic", "neighbor", "area", "lanczos"];

const WHISPER_MODELS: [&str; 6] = ["tiny", "base", "small", "medium", "large", "turbo"];

fn input() -> ParamSpec {
    ParamSpec::string("input", "Path to the input media file")
}

fn output() -> ParamSpec {
    ParamSpec::string("output", "Path of the file to write")
}

pub fn descriptor(kind: OperationKind) -> OperationDescriptor {
    let base = |description: &str| OperationDescriptor::new(kind, description);

    match kind {
        OperationKind::GetMediaInfo => base("Inspect a media file and return its format and stream metadata as JSON")
            .required(input())
            .param(ParamSpec::boolean("show_streams", "Include per-stream information").default_value(true))
            .param(ParamSpec::boolean("show_format", "Include container format information").default_value(true)),

        OperationKind::ConvertFormat => base("Convert a media file to another container and/or codec")
            .required(input())
            .required(output())
            .param(ParamSpec::string("video_codec", "Video codec, e.g. libx264, libvpx-vp9"))
            .param(ParamSpec::string("audio_codec", "Audio codec, e.g. aac, libopus"))
            .param(ParamSpec::string("format", "Force the output container format, e.g. mp4, matroska"))
            .param(ParamSpec::boolean("copy_streams", "Copy all streams without re-encoding").default_value(false)),

        OperationKind::ExtractAudio => base("Extract the audio track of a media file")
            .required(input())
            .required(output())
            .param(ParamSpec::string("codec", "Audio codec for the extracted track").default_value("libmp3lame"))
            .param(ParamSpec::string("bitrate", "Audio bitrate").default_value("192k"))
            .param(ParamSpec::integer("sample_rate", "Output sample rate in Hz"))
            .param(ParamSpec::integer("channels", "Number of output channels")),

        OperationKind::ResizeVideo => base("Scale a video to a preset or explicit resolution")
            .required(input())
            .required(output())
            .param(
                ParamSpec::string("preset", "Named resolution preset")
                    .choices(&RESOLUTION_PRESETS.map(|(name, _)| name)),
            )
            .param(ParamSpec::integer("width", "Target width in pixels (used when no preset is given)"))
            .param(ParamSpec::integer("height", "Target height in pixels (used when no preset is given)"))
            .param(
                ParamSpec::string("scale_algorithm", "Scaling algorithm")
                    .default_value("lanczos")
                    .choices(&SCALE_ALGORITHMS),
            )
            .param(ParamSpec::boolean("copy_audio", "Copy the audio stream unchanged").default_value(true)),

        OperationKind::TrimMedia => base("Cut a segment out of a media file")
            .required(input())
            .required(output())
            .required(ParamSpec::string("start_time", "Start position (seconds or HH:MM:SS[.ms])"))
            .param(ParamSpec::string("duration", "Length of the segment (takes precedence over end_time)"))
            .param(ParamSpec::string("end_time", "End position"))
            .param(ParamSpec::boolean("copy_streams", "Copy streams without re-encoding").default_value(true)),

        OperationKind::CompressVideo => base("Re-encode a video to reduce its size, optionally with two-pass encoding")
            .required(input())
            .required(output())
            .param(ParamSpec::integer("crf", "Constant rate factor (0-51, lower is better quality)").default_value(23))
            .param(ParamSpec::string("preset", "Encoder speed preset").default_value("medium").choices(&ENCODER_PRESETS))
            .param(ParamSpec::boolean("two_pass", "Use two-pass encoding").default_value(false))
            .param(ParamSpec::string("target_bitrate", "Target video bitrate, e.g. 2M (replaces crf)"))
            .param(ParamSpec::string("video_codec", "Video codec").default_value("libx264"))
            .param(ParamSpec::string("audio_bitrate", "AAC audio bitrate").default_value("128k")),

        OperationKind::ConcatenateMedia => base("Join several media files into one")
            .required(ParamSpec::string_array("inputs", "Input files, in playback order"))
            .required(output())
            .param(
                ParamSpec::string("method", "demuxer writes a file list; protocol joins paths with concat:")
                    .default_value("demuxer")
                    .strict(&CONCAT_METHODS),
            ),

        OperationKind::RotateVideo => base("Rotate or flip a video")
            .required(input())
            .required(output())
            .required(ParamSpec::string("rotation", "Clockwise degrees or flip direction").strict(&ROTATIONS)),

        OperationKind::BurnSubtitles => base("Render a subtitle file into the video frames")
            .required(input())
            .required(ParamSpec::string("subtitles", "Path to the subtitle file (srt, ass, vtt)"))
            .required(output())
            .param(ParamSpec::string("style", "ASS force_style override, e.g. FontSize=24,PrimaryColour=&H00FFFFFF"))
            .param(ParamSpec::string("video_codec", "Video codec").default_value("libx264")),

        OperationKind::ApplyFilter => base("Apply raw ffmpeg filter graphs to a media file")
            .required(input())
            .required(output())
            .param(ParamSpec::string("video_filter", "Video filter graph passed to -vf"))
            .param(ParamSpec::string("audio_filter", "Audio filter graph passed to -af")),

        OperationKind::ChangeSpeed => base("Speed up or slow down playback of video and audio")
            .required(input())
            .required(output())
            .required(ParamSpec::number("speed", "Playback speed factor, e.g. 2.0 for double speed")),

        OperationKind::AdjustVolume => base("Change the audio volume of a media file")
            .required(input())
            .required(output())
            .required(ParamSpec::string("volume", "Volume factor or gain, e.g. 1.5 or 6dB")),

        OperationKind::ExtractFrames => base("Export still frames from a video")
            .required(input())
            .required(ParamSpec::string("output_pattern", "Image path pattern, e.g. frames/frame_%04d.png"))
            .param(ParamSpec::number("fps", "Frames per second to extract").default_value(1))
            .param(ParamSpec::string("start_time", "Start position"))
            .param(ParamSpec::integer("frame_count", "Maximum number of frames"))
            .param(ParamSpec::integer("quality", "JPEG quality scale (2-31, lower is better)").default_value(2)),

        OperationKind::GenerateTranscript => base("Transcribe the speech in a media file to a subtitle file")
            .required(input())
            .required(output())
            .param(ParamSpec::string("model", "Speech-to-text model").default_value("base").choices(&WHISPER_MODELS))
            .param(ParamSpec::string("language", "Spoken language code; detected when omitted"))
            .param(
                ParamSpec::string("output_format", "Transcript format")
                    .default_value("srt")
                    .strict(&TRANSCRIPT_FORMATS),
            ),
    }
}

/// Explicit `width:height` for a named preset
pub fn resolution_for_preset(preset: &str) -> Option<&'static str> {
    RESOLUTION_PRESETS
        .iter()
        .find(|(name, _)| *name == preset)
        .map(|(_, resolution)| *resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_presets() {
        assert_eq!(resolution_for_preset("360p"), Some("640:360"));
        assert_eq!(resolution_for_preset("480p"), Some("854:480"));
        assert_eq!(resolution_for_preset("720p"), Some("1280:720"));
        assert_eq!(resolution_for_preset("1080p"), Some("1920:1080"));
        assert_eq!(resolution_for_preset("4k"), Some("3840:2160"));
        assert_eq!(resolution_for_preset("8k"), None);
        assert_eq!(resolution_for_preset("720P"), None);
    }
}
