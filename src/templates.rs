//! Template System - Visual Themes With Externalized Token Groups
//!
//! A template definition is split into one file per token group plus a
//! metadata record that references every file by URL and checksum.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::hashing::json_checksum;
use crate::store::{
    is_artifact_name, is_group_name, to_document_json, token_group_file_name, ArtifactKind, RegistryLayout,
};

/// The one token group every template must define
pub const MANDATORY_GROUP: &str = "colors";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template {0} has no tokens.colors group")]
    MissingColors(String),

    #[error("Malformed template document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid template name {0:?}: expected lower-case letters, digits and '-'")]
    InvalidName(String),

    #[error("Invalid token group {group:?} in template {template}")]
    InvalidGroup { template: String, group: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Personality {
    pub mood: String,
    pub spacing: String,
    pub roundness: String,
}

/// Authored template document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub description: String,
    pub author: String,
    pub version: String,
    pub personality: Personality,
    #[serde(default)]
    pub preview: Option<Value>,
    pub tokens: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateFile {
    #[serde(rename = "type")]
    pub group_type: String,
    pub url: String,
    pub checksum: String,
}

/// Published template record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    pub personality: Personality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Value>,
    pub checksum: String,
    pub template_url: String,
    pub files: BTreeMap<String, TemplateFile>,
}

/// One externalized token group, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFile {
    pub group: String,
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub struct ProcessedTemplate {
    pub record: TemplateRecord,
    pub group_files: Vec<GroupFile>,
}

/// Parses and processes raw template text.
pub fn process_template_str(
    text: &str,
    layout: &RegistryLayout,
    display_name: impl Fn(&str) -> String,
) -> Result<ProcessedTemplate, TemplateError> {
    let document: Value = serde_json::from_str(text)?;
    process_template(&document, layout, display_name)
}

/// Splits a template document into token group files and a record.
///
/// The whole-template checksum covers the entire input document, each group
/// checksum covers only that group's value. Both use canonical JSON.
pub fn process_template(
    document: &Value,
    layout: &RegistryLayout,
    display_name: impl Fn(&str) -> String,
) -> Result<ProcessedTemplate, TemplateError> {
    if document.pointer("/tokens/colors").map_or(true, Value::is_null) {
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        return Err(TemplateError::MissingColors(name));
    }

    let definition: TemplateDefinition = serde_json::from_value(document.clone())?;
    if !is_artifact_name(&definition.name) {
        return Err(TemplateError::InvalidName(definition.name));
    }

    let kind = ArtifactKind::Template;
    let mut files = BTreeMap::new();
    let mut group_files = vec![];

    for (group, value) in &definition.tokens {
        if !is_group_name(group) {
            return Err(TemplateError::InvalidGroup {
                template: definition.name.clone(),
                group: group.clone(),
            });
        }
        let file_name = token_group_file_name(group);
        files.insert(
            group.clone(),
            TemplateFile {
                group_type: group.clone(),
                url: layout.artifact_url(kind, &definition.name, &file_name),
                checksum: json_checksum(value)?,
            },
        );
        group_files.push(GroupFile {
            group: group.clone(),
            file_name,
            contents: to_document_json(value)?,
        });
    }
    group_files.sort_by(|a, b| a.group.cmp(&b.group));

    let record = TemplateRecord {
        display_name: definition
            .display_name
            .clone()
            .unwrap_or_else(|| display_name(&definition.name)),
        checksum: json_checksum(document)?,
        template_url: layout.metadata_url(kind, &definition.name),
        name: definition.name,
        description: definition.description,
        author: definition.author,
        version: definition.version,
        personality: definition.personality,
        preview: definition.preview,
        files,
    };

    Ok(ProcessedTemplate { record, group_files })
}
