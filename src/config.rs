use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, MediaRpcError};

/// Environment variables consulted once at startup.
pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";
pub const ENV_FFPROBE_PATH: &str = "FFPROBE_PATH";
pub const ENV_WHISPER_PATH: &str = "WHISPER_PATH";
pub const ENV_SCRATCH_DIR: &str = "MEDIARPC_SCRATCH_DIR";

fn default_max_concurrent_requests() -> usize {
    4
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the ffmpeg binary (transcoder)
    pub ffmpeg_path: String,
    /// Path to the ffprobe binary (inspection)
    pub ffprobe_path: String,
    /// Path to the speech-to-text binary (openai-whisper style CLI)
    pub whisper_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory for temp artifacts (manifests, extracted audio, pass logs).
    /// Defaults to `<system temp>/mediarpc`.
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Upper bound on requests being dispatched at the same time
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            whisper_path: "whisper".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl WorkspaceConfig {
    /// Scratch directory as an absolute path. Tools run with the scratch
    /// directory as cwd, so a relative path would resolve twice.
    pub fn resolved_scratch_dir(&self) -> PathBuf {
        let dir = self
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mediarpc"));
        if dir.is_absolute() {
            return dir;
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MediaRpcError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MediaRpcError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MediaRpcError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MediaRpcError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply executable and scratch-dir overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(ENV_FFMPEG_PATH) {
            self.tools.ffmpeg_path = path;
        }
        if let Some(path) = lookup(ENV_FFPROBE_PATH) {
            self.tools.ffprobe_path = path;
        }
        if let Some(path) = lookup(ENV_WHISPER_PATH) {
            self.tools.whisper_path = path;
        }
        if let Some(dir) = lookup(ENV_SCRATCH_DIR) {
            self.workspace.scratch_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.max_concurrent_requests == 0 {
            return Err(MediaRpcError::Config(
                "server.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
            ("tools.whisper_path", &self.tools.whisper_path),
        ] {
            if path.trim().is_empty() {
                return Err(MediaRpcError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_replace_tool_paths() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_FFMPEG_PATH, "/opt/ffmpeg/bin/ffmpeg"),
            (ENV_WHISPER_PATH, ""),
            (ENV_SCRATCH_DIR, "/var/tmp/mr"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.tools.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.tools.ffprobe_path, "ffprobe");
        assert_eq!(config.tools.whisper_path, "whisper");
        assert_eq!(config.workspace.resolved_scratch_dir(), PathBuf::from("/var/tmp/mr"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediarpc.toml");
        std::fs::write(&path, "[tools]\nffmpeg_path = \"ff\"\nffprobe_path = \"fp\"\nwhisper_path = \"w\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tools.ffmpeg_path, "ff");
        assert_eq!(config.server.max_concurrent_requests, 4);
        assert!(config.workspace.scratch_dir.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.toml");
        let mut config = Config::default();
        config.server.max_concurrent_requests = 9;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.server.max_concurrent_requests, 9);
    }

    #[test]
    fn test_relative_scratch_dir_is_made_absolute() {
        let mut config = Config::default();
        config.workspace.scratch_dir = Some(PathBuf::from("scratch"));

        let resolved = config.workspace.resolved_scratch_dir();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, std::env::current_dir().unwrap().join("scratch"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.server.max_concurrent_requests = 0;
        assert!(config.validate().is_err());
    }
}
