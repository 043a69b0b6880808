use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::ToolsConfig;
use super::Invocation;

/// Everything compilation needs besides the arguments themselves.
///
/// The request id makes every temp artifact name unique, so identical
/// requests running at the same time never share a path.
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub tools: ToolsConfig,
    pub scratch_dir: PathBuf,
    pub request_id: Uuid,
}

impl CompileContext {
    pub fn new(tools: ToolsConfig, scratch_dir: PathBuf) -> Self {
        Self {
            tools,
            scratch_dir,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Request-unique path inside the scratch directory
    pub fn scratch_path(&self, label: &str, extension: &str) -> PathBuf {
        self.scratch_dir
            .join(format!("{}-{}.{}", label, self.request_id.simple(), extension))
    }

    /// Request-unique stem inside the scratch directory, for tools that
    /// derive several file names from one prefix
    pub fn scratch_prefix(&self, label: &str) -> PathBuf {
        self.scratch_dir.join(format!("{}-{}", label, self.request_id.simple()))
    }

    pub fn ffmpeg(&self, description: impl Into<String>) -> Invocation {
        Invocation::new(&self.tools.ffmpeg_path, description)
    }

    pub fn ffprobe(&self, description: impl Into<String>) -> Invocation {
        Invocation::new(&self.tools.ffprobe_path, description)
    }

    pub fn whisper(&self, description: impl Into<String>) -> Invocation {
        Invocation::new(&self.tools.whisper_path, description)
    }
}

/// A file written before the first invocation runs
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Move applied after the last invocation succeeds
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Ordered external invocations realizing one operation, plus the
/// filesystem steps around them. Building a plan has no side effects;
/// the dispatcher performs staging, relocation and cleanup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationPlan {
    pub staging: Vec<StagedFile>,
    pub steps: Vec<Invocation>,
    pub relocations: Vec<Relocation>,
    /// Removed once the plan concludes, whatever the outcome
    pub artifacts: Vec<PathBuf>,
}

impl InvocationPlan {
    pub fn single(invocation: Invocation) -> Self {
        Self {
            steps: vec![invocation],
            ..Default::default()
        }
    }

    pub fn then(mut self, invocation: Invocation) -> Self {
        self.steps.push(invocation);
        self
    }

    pub fn stage<P: AsRef<Path>>(mut self, path: P, contents: String) -> Self {
        self.staging.push(StagedFile {
            path: path.as_ref().to_path_buf(),
            contents,
        });
        self
    }

    pub fn relocate<P: AsRef<Path>, Q: AsRef<Path>>(mut self, from: P, to: Q) -> Self {
        self.relocations.push(Relocation {
            from: from.as_ref().to_path_buf(),
            to: to.as_ref().to_path_buf(),
        });
        self
    }

    pub fn artifact<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.artifacts.push(path.as_ref().to_path_buf());
        self
    }

    /// True when the plan writes anything into the scratch directory
    pub fn uses_scratch(&self) -> bool {
        !self.artifacts.is_empty() || !self.staging.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_names_differ_per_request() {
        let a = CompileContext::new(ToolsConfig::default(), PathBuf::from("/tmp/s"));
        let b = CompileContext::new(ToolsConfig::default(), PathBuf::from("/tmp/s"));
        assert_ne!(a.scratch_path("audio", "wav"), b.scratch_path("audio", "wav"));
        assert!(a.scratch_path("audio", "wav").starts_with("/tmp/s"));
    }

    #[test]
    fn test_scratch_names_are_stable_for_one_request() {
        let ctx = CompileContext::new(ToolsConfig::default(), PathBuf::from("/tmp/s"))
            .with_request_id(Uuid::nil());
        assert_eq!(
            ctx.scratch_path("concat", "txt"),
            PathBuf::from("/tmp/s/concat-00000000000000000000000000000000.txt")
        );
    }
}
