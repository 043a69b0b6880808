// Operation catalog
//
// The catalog is the read-only registry of every callable operation:
// - Kinds: the closed set of operation names (`OperationKind`)
// - Descriptors: parameter schema + required set per operation
// - Table: the built-in descriptor data
//
// It is built once at startup and shared behind an `Arc`; nothing mutates it.

pub mod table;

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, MediaRpcError};

/// Every operation the server knows how to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    GetMediaInfo,
    ConvertFormat,
    ExtractAudio,
    ResizeVideo,
    TrimMedia,
    CompressVideo,
    ConcatenateMedia,
    RotateVideo,
    BurnSubtitles,
    ApplyFilter,
    ChangeSpeed,
    AdjustVolume,
    ExtractFrames,
    GenerateTranscript,
}

impl OperationKind {
    /// Catalog order.
    pub const ALL: [OperationKind; 14] = [
        OperationKind::GetMediaInfo,
        OperationKind::ConvertFormat,
        OperationKind::ExtractAudio,
        OperationKind::ResizeVideo,
        OperationKind::TrimMedia,
        OperationKind::CompressVideo,
        OperationKind::ConcatenateMedia,
        OperationKind::RotateVideo,
        OperationKind::BurnSubtitles,
        OperationKind::ApplyFilter,
        OperationKind::ChangeSpeed,
        OperationKind::AdjustVolume,
        OperationKind::ExtractFrames,
        OperationKind::GenerateTranscript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GetMediaInfo => "get_media_info",
            OperationKind::ConvertFormat => "convert_format",
            OperationKind::ExtractAudio => "extract_audio",
            OperationKind::ResizeVideo => "resize_video",
            OperationKind::TrimMedia => "trim_media",
            OperationKind::CompressVideo => "compress_video",
            OperationKind::ConcatenateMedia => "concatenate_media",
            OperationKind::RotateVideo => "rotate_video",
            OperationKind::BurnSubtitles => "burn_subtitles",
            OperationKind::ApplyFilter => "apply_filter",
            OperationKind::ChangeSpeed => "change_speed",
            OperationKind::AdjustVolume => "adjust_volume",
            OperationKind::ExtractFrames => "extract_frames",
            OperationKind::GenerateTranscript => "generate_transcript",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
}

impl ParamType {
    /// JSON-Schema type name
    pub fn schema_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::StringArray => "array",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::StringArray => f.write_str("array of string"),
            other => f.write_str(other.schema_type()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// When set, values outside `choices` are rejected during validation.
    pub strict_choices: bool,
}

impl ParamSpec {
    pub fn new(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            default: None,
            choices: Vec::new(),
            strict_choices: false,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Number, description)
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Boolean, description)
    }

    pub fn string_array(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::StringArray, description)
    }

    pub fn default_value<V: Into<Value>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Documented choices, not enforced.
    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Choices enforced by the validator.
    pub fn strict(mut self, choices: &[&str]) -> Self {
        self.strict_choices = true;
        self.choices(choices)
    }

    /// JSON-Schema fragment for this parameter
    pub fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.param_type.schema_type()));
        if self.param_type == ParamType::StringArray {
            schema.insert("items".into(), json!({ "type": "string" }));
        }
        schema.insert("description".into(), json!(self.description));
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if !self.choices.is_empty() {
            schema.insert("enum".into(), json!(self.choices));
        }
        Value::Object(schema)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationDescriptor {
    #[serde(skip)]
    pub kind: OperationKind,
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub required: Vec<String>,
}

impl OperationDescriptor {
    pub fn new(kind: OperationKind, description: &str) -> Self {
        Self {
            kind,
            name: kind.as_str().to_string(),
            description: description.to_string(),
            params: Vec::new(),
            required: Vec::new(),
        }
    }

    /// Declare an optional parameter
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Declare a required parameter
    pub fn required(mut self, spec: ParamSpec) -> Self {
        self.required.push(spec.name.clone());
        self.params.push(spec);
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// JSON-Schema object advertised to callers
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_schema()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// Checks the descriptor's internal invariants.
    pub fn check_consistency(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(MediaRpcError::Catalog(format!(
                    "{}: parameter '{}' declared twice",
                    self.name, param.name
                )));
            }
        }
        for name in &self.required {
            let Some(spec) = self.params.iter().find(|p| &p.name == name) else {
                return Err(MediaRpcError::Catalog(format!(
                    "{}: required parameter '{}' is not declared",
                    self.name, name
                )));
            };
            if spec.default.is_some() {
                return Err(MediaRpcError::Catalog(format!(
                    "{}: required parameter '{}' must not carry a default",
                    self.name, name
                )));
            }
        }
        Ok(())
    }
}

/// Read-only mapping from operation name to descriptor
#[derive(Debug, Clone)]
pub struct Catalog {
    descriptors: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(descriptors: Vec<OperationDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            descriptor.check_consistency()?;
            if index.insert(descriptor.name.clone(), position).is_some() {
                return Err(MediaRpcError::Catalog(format!(
                    "operation '{}' registered twice",
                    descriptor.name
                )));
            }
        }
        Ok(Self { descriptors, index })
    }

    /// Catalog populated from the built-in table
    pub fn builtin() -> Result<Self> {
        Self::new(OperationKind::ALL.iter().map(|kind| table::descriptor(*kind)).collect())
    }

    pub fn lookup(&self, name: &str) -> Option<&OperationDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    pub fn list(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_consistent() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), OperationKind::ALL.len());
        for descriptor in catalog.list() {
            descriptor.check_consistency().unwrap();
            for name in &descriptor.required {
                assert!(descriptor.has_param(name));
            }
        }
    }

    #[test]
    fn test_list_preserves_table_order() {
        let catalog = Catalog::builtin().unwrap();
        let names: Vec<&str> = catalog.list().iter().map(|d| d.name.as_str()).collect();
        let expected: Vec<&str> = OperationKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.lookup("resize_video").unwrap().kind, OperationKind::ResizeVideo);
        assert!(catalog.lookup("make_coffee").is_none());
    }

    #[test]
    fn test_kind_name_roundtrip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(OperationKind::from_name("unknown"), None);
    }

    #[test]
    fn test_rejects_required_with_default() {
        let descriptor = OperationDescriptor::new(OperationKind::TrimMedia, "bad")
            .required(ParamSpec::string("input", "x").default_value("a.mp4"));
        assert!(Catalog::new(vec![descriptor]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_operation() {
        let a = OperationDescriptor::new(OperationKind::TrimMedia, "a");
        let b = OperationDescriptor::new(OperationKind::TrimMedia, "b");
        assert!(Catalog::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_input_schema_shape() {
        let catalog = Catalog::builtin().unwrap();
        let schema = catalog.lookup("concatenate_media").unwrap().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["inputs"]["type"], "array");
        assert_eq!(schema["properties"]["inputs"]["items"]["type"], "string");
        assert_eq!(schema["properties"]["method"]["default"], "demuxer");
        assert_eq!(schema["required"], json!(["inputs", "output"]));
    }
}
