//! Batch request and response documents for the command-line tool.

use serde::{Deserialize, Serialize};

use crate::edit::total_byte_shift;
use crate::editor::ConfigEditor;
use crate::error::{ConfigError, Result};
use crate::file::checksum;

fn default_execution_id() -> String {
    "auto".to_string()
}

/// A batch of editor operations to run against one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    /// `"auto"` asks for a generated id
    #[serde(default = "default_execution_id")]
    pub execution_id: String,
    /// Refuse to edit unless the document hashes to this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_checksum: Option<String>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddOrUpdateSource {
        key: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol_version: Option<String>,
    },
    RemoveSource {
        key: String,
    },
    UpdateAttribute {
        key: String,
        attribute: String,
        value: String,
    },
    UpdateSourceUrl {
        key: String,
        value: String,
    },
    UpdateSourceProtocolVersion {
        key: String,
        protocol_version: String,
    },
}

impl Operation {
    /// Queue this operation on `editor`, returning the number of edits queued
    pub fn queue(&self, editor: &mut ConfigEditor) -> Result<usize> {
        match self {
            Operation::AddOrUpdateSource {
                key,
                value,
                protocol_version,
            } => editor.add_or_update_source(key, value, protocol_version.as_deref()),
            Operation::RemoveSource { key } => editor.remove_source(key),
            Operation::UpdateAttribute {
                key,
                attribute,
                value,
            } => editor.update_attribute(key, attribute, value),
            Operation::UpdateSourceUrl { key, value } => editor.update_source_url(key, value),
            Operation::UpdateSourceProtocolVersion {
                key,
                protocol_version,
            } => editor.update_source_protocol_version(key, protocol_version),
        }
    }
}

/// Result of running a batch: the new document plus what the report needs
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub output: Vec<u8>,
    pub original_checksum: String,
    pub final_checksum: String,
    pub applied_count: usize,
    pub total_byte_shift: i64,
}

/// Parse `original`, queue every operation of `request` and apply them in
/// one pass.
///
/// Nothing is applied if any operation fails to queue or the queued edits
/// conflict.
pub fn run_batch(original: &[u8], request: &EditRequest) -> Result<BatchOutput> {
    let mut editor = ConfigEditor::parse(original)?;
    let original_checksum = editor.parse_result().checksum().to_string();

    if let Some(expected) = &request.expected_checksum {
        if *expected != original_checksum {
            return Err(ConfigError::validation(format!(
                "checksum mismatch: expected {expected}, got {original_checksum}"
            )));
        }
    }

    for operation in &request.operations {
        operation.queue(&mut editor)?;
    }

    let applied_count = editor.pending().len();
    let shift = total_byte_shift(editor.pending());
    let output = editor.apply_edits()?;

    Ok(BatchOutput {
        final_checksum: checksum(&output),
        output,
        original_checksum,
        applied_count,
        total_byte_shift: shift,
    })
}

/// Report printed by the command-line tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditResponse {
    pub execution_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_checksum: Option<String>,
    pub applied_count: usize,
    pub total_byte_shift: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditResponse {
    pub fn success(execution_id: String, batch: &BatchOutput) -> Self {
        Self {
            execution_id,
            success: true,
            original_checksum: Some(batch.original_checksum.clone()),
            final_checksum: Some(batch.final_checksum.clone()),
            applied_count: batch.applied_count,
            total_byte_shift: batch.total_byte_shift,
            error_kind: None,
            error: None,
        }
    }

    pub fn failure(execution_id: String, err: &ConfigError) -> Self {
        Self {
            execution_id,
            success: false,
            original_checksum: None,
            final_checksum: None,
            applied_count: 0,
            total_byte_shift: 0,
            error_kind: Some(err.kind().name().to_string()),
            error: Some(err.to_string()),
        }
    }
}

/// Generate a fresh execution id
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Resolve `"auto"` to a generated id, keep anything else
pub fn resolve_execution_id(requested: &str) -> String {
    if requested == "auto" {
        generate_execution_id()
    } else {
        requested.to_string()
    }
}
