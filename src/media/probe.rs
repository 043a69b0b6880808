use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::process::ProcessOutput;
use super::{CompileContext, InvocationPlan, MediaOperation};

#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfoArgs {
    pub input: PathBuf,
    pub show_streams: bool,
    pub show_format: bool,
}

impl MediaOperation for MediaInfoArgs {
    fn compile(&self, ctx: &CompileContext) -> InvocationPlan {
        let mut cmd = ctx.ffprobe("Media inspection").args(["-v", "quiet", "-print_format", "json"]);
        if self.show_format {
            cmd = cmd.arg("-show_format");
        }
        if self.show_streams {
            cmd = cmd.arg("-show_streams");
        }
        InvocationPlan::single(cmd.output(&self.input))
    }

    fn output(&self) -> Option<&Path> {
        None
    }

    /// The probe's JSON report is the result
    fn success_message(&self, last: &ProcessOutput) -> String {
        last.stdout.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;

    #[test]
    fn test_probe_arguments() {
        let mut tools = ToolsConfig::default();
        tools.ffprobe_path = "/usr/local/bin/ffprobe".into();
        let ctx = CompileContext::new(tools, PathBuf::from("/scratch"));
        let args = MediaInfoArgs {
            input: "clip.mov".into(),
            show_streams: true,
            show_format: false,
        };
        let plan = args.compile(&ctx);
        assert_eq!(plan.steps[0].program, "/usr/local/bin/ffprobe");
        assert_eq!(
            plan.steps[0].args,
            vec!["-v", "quiet", "-print_format", "json", "-show_streams", "clip.mov"]
        );
    }

    #[test]
    fn test_message_is_stdout() {
        let args = MediaInfoArgs {
            input: "clip.mov".into(),
            show_streams: true,
            show_format: true,
        };
        let last = ProcessOutput {
            stdout: "{\"streams\": []}\n".into(),
            success: true,
            ..Default::default()
        };
        assert_eq!(args.success_message(&last), "{\"streams\": []}");
    }
}
