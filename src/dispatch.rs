//! Request dispatch: lookup, input pre-check, validation, compilation,
//! sequential invocation and normalization into a [`ResponseEnvelope`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, OperationDescriptor};
use crate::config::{Config, ToolsConfig};
use crate::media::{CompileContext, InvocationPlan, Operation};
use crate::process::{ProcessOutput, ProcessRunner};
use crate::validate::validate;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownOperation,
    InputNotFound,
    InvalidArguments,
    ExternalToolFailure,
    InternalFault,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::UnknownOperation => "unknown_operation",
            FailureKind::InputNotFound => "input_not_found",
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::ExternalToolFailure => "external_tool_failure",
            FailureKind::InternalFault => "internal_fault",
        };
        f.write_str(name)
    }
}

/// Result of one dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub message: String,
    /// Captured stderr of the last invocation that ran
    pub diagnostics: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
}

impl ResponseEnvelope {
    pub fn success<S: Into<String>>(message: S, diagnostics: String) -> Self {
        Self {
            success: true,
            message: message.into(),
            diagnostics,
            error: None,
        }
    }

    pub fn failure<S: Into<String>>(kind: FailureKind, message: S, diagnostics: String) -> Self {
        Self {
            success: false,
            message: message.into(),
            diagnostics,
            error: Some(kind),
        }
    }
}

/// Where a request is in its lifecycle; recorded in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Received,
    Validating,
    Compiling,
    Invoking(usize),
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    message: String,
    diagnostics: String,
}

impl Failure {
    fn internal(message: String, diagnostics: String) -> Self {
        Self {
            kind: FailureKind::InternalFault,
            message,
            diagnostics,
        }
    }
}

pub struct Dispatcher {
    catalog: Arc<Catalog>,
    tools: ToolsConfig,
    scratch_dir: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    workspace: Arc<dyn Workspace>,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<Catalog>,
        config: &Config,
        runner: Arc<dyn ProcessRunner>,
        workspace: Arc<dyn Workspace>,
    ) -> Self {
        Self {
            catalog,
            tools: config.tools.clone(),
            scratch_dir: config.workspace.resolved_scratch_dir(),
            runner,
            workspace,
        }
    }

    /// Every operation, in catalog order
    pub fn list_operations(&self) -> &[OperationDescriptor] {
        self.catalog.list()
    }

    pub async fn dispatch(&self, name: &str, raw: &Map<String, Value>) -> ResponseEnvelope {
        debug!(operation = name, stage = ?DispatchStage::Received, "Dispatching");

        let Some(descriptor) = self.catalog.lookup(name) else {
            warn!("Unknown operation requested: {}", name);
            return ResponseEnvelope::failure(
                FailureKind::UnknownOperation,
                format!("Unknown operation: {}", name),
                String::new(),
            );
        };

        if let Some(missing) = self.missing_input(descriptor, raw) {
            info!(operation = name, stage = ?DispatchStage::Failed, "Input not found: {}", missing);
            return ResponseEnvelope::failure(
                FailureKind::InputNotFound,
                format!("Input file not found: {}", missing),
                String::new(),
            );
        }

        debug!(operation = name, stage = ?DispatchStage::Validating);
        let record = match validate(descriptor, raw) {
            Ok(record) => record,
            Err(e) => {
                info!(operation = name, stage = ?DispatchStage::Failed, "Invalid arguments: {}", e);
                return ResponseEnvelope::failure(FailureKind::InvalidArguments, e.to_string(), String::new());
            }
        };

        debug!(operation = name, stage = ?DispatchStage::Compiling);
        let operation = match Operation::from_record(descriptor.kind, record) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(operation = name, "Typed argument construction failed: {}", e);
                return ResponseEnvelope::failure(
                    FailureKind::InternalFault,
                    format!("Failed to prepare {}: {}", name, e),
                    String::new(),
                );
            }
        };
        let ctx = CompileContext::new(self.tools.clone(), self.scratch_dir.clone());
        let plan = operation.compile(&ctx);

        let outcome = self.execute(name, &plan).await;
        self.release(&plan.artifacts).await;

        match outcome {
            Ok(last) => {
                info!(operation = name, stage = ?DispatchStage::Succeeded, "Operation completed");
                ResponseEnvelope::success(operation.success_message(&last), last.stderr)
            }
            Err(failure) => {
                info!(operation = name, stage = ?DispatchStage::Failed, "{}: {}", failure.kind, failure.message);
                ResponseEnvelope::failure(failure.kind, failure.message, failure.diagnostics)
            }
        }
    }

    /// First declared input path that does not exist
    fn missing_input(&self, descriptor: &OperationDescriptor, raw: &Map<String, Value>) -> Option<String> {
        let mut candidates: Vec<String> = Vec::new();
        if descriptor.has_param("input") {
            if let Some(path) = raw.get("input").and_then(path_text) {
                candidates.push(path);
            }
        }
        if descriptor.has_param("inputs") {
            if let Some(items) = raw.get("inputs").and_then(Value::as_array) {
                candidates.extend(items.iter().filter_map(path_text));
            }
        }
        candidates
            .into_iter()
            .find(|path| !self.workspace.exists(Path::new(path)))
    }

    /// Stage files, run each step in order, stop at the first failure,
    /// then apply relocations.
    async fn execute(&self, name: &str, plan: &InvocationPlan) -> Result<ProcessOutput, Failure> {
        if plan.uses_scratch() {
            self.workspace
                .create_dir_all(&self.scratch_dir)
                .await
                .map_err(|e| Failure::internal(format!("Failed to prepare scratch directory: {}", e), String::new()))?;
        }
        for staged in &plan.staging {
            self.workspace
                .write_file(&staged.path, &staged.contents)
                .await
                .map_err(|e| Failure::internal(e.to_string(), String::new()))?;
        }

        let total = plan.steps.len();
        let mut last = ProcessOutput::default();
        for (index, step) in plan.steps.iter().enumerate() {
            debug!(operation = name, stage = ?DispatchStage::Invoking(index + 1), "{}", step.command_line());

            let output = self.runner.run(step).await.map_err(|e| {
                Failure::internal(format!("{} could not be started: {}", step.description, e), String::new())
            })?;

            if !output.success {
                let code = output
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                return Err(Failure {
                    kind: FailureKind::ExternalToolFailure,
                    message: format!("{} failed (step {}/{}, exit {})", step.description, index + 1, total, code),
                    diagnostics: output.stderr,
                });
            }
            last = output;
        }

        for relocation in &plan.relocations {
            self.workspace
                .relocate(&relocation.from, &relocation.to)
                .await
                .map_err(|e| Failure::internal(e.to_string(), last.stderr.clone()))?;
        }

        Ok(last)
    }

    /// Best-effort removal; failures are logged and swallowed
    async fn release(&self, artifacts: &[PathBuf]) {
        for artifact in artifacts {
            if let Err(e) = self.workspace.remove_file(artifact).await {
                warn!("Failed to remove temp artifact {}: {}", artifact.display(), e);
            }
        }
    }
}

/// Path text as the validator will see it: numbers and booleans are
/// stringified the same way string parameters coerce them.
fn path_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
