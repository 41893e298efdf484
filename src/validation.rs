//! Validation System - Registry Integrity
//!
//! Rules produce structured violations per record; the validator walks every
//! published document and record and collects all of them. Nothing stops at
//! the first defect, and nothing here writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::catalog::Category;
use crate::hashing::{content_checksum, json_checksum};
use crate::store::{
    is_artifact_name, is_group_name, template_file_name, token_group_file_name, ArtifactKind, RegistryLayout,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefectClass {
    /// Required directory or file absent
    MissingStructure,
    /// JSON parse failure
    MalformedDocument,
    /// Required field absent or of the wrong shape
    SchemaViolation,
    /// A record points at something that does not exist or does not match
    ReferentialBreak,
    /// On-disk content no longer hashes to the published checksum
    ChecksumMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    pub rule: String,
    pub class: DefectClass,
    pub severity: ViolationSeverity,
    /// `components/button` for records, `api/components.json` for documents
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ValidationViolation {
    pub fn error(rule: &str, class: DefectClass, subject: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            class,
            severity: ViolationSeverity::Error,
            subject: subject.to_string(),
            message: message.into(),
            field: None,
            path: None,
        }
    }

    pub fn warning(rule: &str, class: DefectClass, subject: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ViolationSeverity::Warning,
            ..Self::error(rule, class, subject, message)
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ViolationSeverity::Error
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub documents_checked: usize,
    pub artifacts_checked: usize,
    pub invalid_artifacts: Vec<String>,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.is_error())
    }

    pub fn violations_for<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a ValidationViolation> + 'a {
        self.violations.iter().filter(move |v| v.subject == subject)
    }
}

/// One published record under inspection.
pub struct RecordContext<'a> {
    pub kind: ArtifactKind,
    pub name: &'a str,
    pub record: &'a Map<String, Value>,
    pub subject: String,
    pub layout: &'a RegistryLayout,
    /// Names in the providers document, when that document loaded
    pub provider_names: Option<&'a BTreeSet<String>>,
}

impl RecordContext<'_> {
    fn str_field(&self, field: &str) -> Option<&str> {
        self.record.get(field).and_then(Value::as_str)
    }

    fn template_copy_path(&self) -> Option<PathBuf> {
        let file_name = self.str_field("fileName")?;
        Some(self.layout.artifact_file(self.kind, self.name, &template_file_name(file_name)))
    }

    fn group_files(&self) -> Vec<(&str, &Map<String, Value>)> {
        self.record
            .get("files")
            .and_then(Value::as_object)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|(group, entry)| entry.as_object().map(|e| (group.as_str(), e)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Validation rule trait - produces violations for one record
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, ctx: &RecordContext<'_>) -> Vec<ValidationViolation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    String,
    Bool,
    Array,
    Object,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

const SOURCE_FIELDS: &[(&str, FieldType)] = &[
    ("name", FieldType::String),
    ("displayName", FieldType::String),
    ("description", FieldType::String),
    ("version", FieldType::String),
    ("checksum", FieldType::String),
    ("fileName", FieldType::String),
    ("downloadUrl", FieldType::String),
    ("metadataUrl", FieldType::String),
    ("dependencies", FieldType::Array),
    ("exports", FieldType::Array),
];

const COMPONENT_FIELDS: &[(&str, FieldType)] = &[
    ("category", FieldType::String),
    ("requiredProviders", FieldType::Array),
    ("variants", FieldType::Array),
    ("sizes", FieldType::Array),
    ("tokenUsage", FieldType::Array),
    ("hasHaptics", FieldType::Bool),
];

const TEMPLATE_FIELDS: &[(&str, FieldType)] = &[
    ("name", FieldType::String),
    ("displayName", FieldType::String),
    ("description", FieldType::String),
    ("author", FieldType::String),
    ("version", FieldType::String),
    ("personality", FieldType::Object),
    ("checksum", FieldType::String),
    ("templateUrl", FieldType::String),
    ("files", FieldType::Object),
];

const FILE_ENTRY_FIELDS: &[(&str, FieldType)] = &[
    ("type", FieldType::String),
    ("url", FieldType::String),
    ("checksum", FieldType::String),
];

// --- Concrete Rules ---

/// Every declared field present with the right JSON shape
pub struct RequiredFieldsRule;

impl RequiredFieldsRule {
    fn check_fields(
        &self,
        subject: &str,
        object: &Map<String, Value>,
        fields: &[(&str, FieldType)],
        prefix: &str,
        out: &mut Vec<ValidationViolation>,
    ) {
        for (field, ty) in fields {
            let qualified = format!("{prefix}{field}");
            match object.get(*field) {
                None => out.push(
                    ValidationViolation::error(self.name(), DefectClass::SchemaViolation, subject, format!("missing field {qualified}"))
                        .with_field(&qualified),
                ),
                Some(v) if !ty.matches(v) => out.push(
                    ValidationViolation::error(
                        self.name(),
                        DefectClass::SchemaViolation,
                        subject,
                        format!("field {qualified} should be {ty:?}"),
                    )
                    .with_field(&qualified),
                ),
                Some(_) => {}
            }
        }
    }
}

impl ValidationRule for RequiredFieldsRule {
    fn name(&self) -> &'static str { "required_fields" }

    fn validate(&self, ctx: &RecordContext<'_>) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        let subject = ctx.subject.as_str();
        match ctx.kind {
            ArtifactKind::Template => {
                self.check_fields(subject, ctx.record, TEMPLATE_FIELDS, "", &mut violations);
                for (group, entry) in ctx.group_files() {
                    let prefix = format!("files.{group}.");
                    self.check_fields(subject, entry, FILE_ENTRY_FIELDS, &prefix, &mut violations);
                }
            }
            kind => {
                self.check_fields(subject, ctx.record, SOURCE_FIELDS, "", &mut violations);
                if kind == ArtifactKind::Component {
                    self.check_fields(subject, ctx.record, COMPONENT_FIELDS, "", &mut violations);
                    if let Some(category) = ctx.record.get("category").filter(|c| c.is_string()) {
                        if serde_json::from_value::<Category>(category.clone()).is_err() {
                            violations.push(
                                ValidationViolation::error(
                                    self.name(),
                                    DefectClass::SchemaViolation,
                                    subject,
                                    format!("unknown category {category}"),
                                )
                                .with_field("category"),
                            );
                        }
                    }
                }
            }
        }
        violations
    }
}

/// The artifact directory and every file the record declares exist on disk
pub struct ArtifactFilesRule;

impl ValidationRule for ArtifactFilesRule {
    fn name(&self) -> &'static str { "artifact_files" }

    fn validate(&self, ctx: &RecordContext<'_>) -> Vec<ValidationViolation> {
        let subject = ctx.subject.as_str();
        let dir = ctx.layout.artifact_dir(ctx.kind, ctx.name);
        if !dir.is_dir() {
            return vec![ValidationViolation::error(
                self.name(),
                DefectClass::ReferentialBreak,
                subject,
                "artifact directory missing",
            )
            .with_path(&dir)];
        }

        let mut violations = vec![];
        let mut declared = vec![(ctx.layout.metadata_path(ctx.kind, ctx.name), "metadataUrl".to_string())];
        match ctx.kind {
            ArtifactKind::Template => {
                for (group, _) in ctx.group_files() {
                    let file = ctx.layout.artifact_file(ctx.kind, ctx.name, &token_group_file_name(group));
                    declared.push((file, format!("files.{group}")));
                }
            }
            _ => {
                if let Some(path) = ctx.template_copy_path() {
                    declared.push((path, "downloadUrl".to_string()));
                }
            }
        }

        for (path, field) in declared {
            if !path.is_file() {
                violations.push(
                    ValidationViolation::error(self.name(), DefectClass::ReferentialBreak, subject, "declared file missing")
                        .with_field(&field)
                        .with_path(&path),
                );
            }
        }

        let metadata_path = ctx.layout.metadata_path(ctx.kind, ctx.name);
        if metadata_path.is_file() {
            match read_json(&metadata_path) {
                Ok(Value::Object(on_disk)) if &on_disk == ctx.record => {}
                Ok(_) => violations.push(
                    ValidationViolation::error(
                        self.name(),
                        DefectClass::ReferentialBreak,
                        subject,
                        "metadata file disagrees with the published record",
                    )
                    .with_path(&metadata_path),
                ),
                Err(violation) => violations.push(violation.retarget(self.name(), subject)),
            }
        }
        violations
    }
}

/// On-disk content still hashes to the published checksums
pub struct ChecksumRule;

impl ValidationRule for ChecksumRule {
    fn name(&self) -> &'static str { "checksum" }

    fn validate(&self, ctx: &RecordContext<'_>) -> Vec<ValidationViolation> {
        let subject = ctx.subject.as_str();
        let mut violations = vec![];
        match ctx.kind {
            ArtifactKind::Template => {
                for (group, entry) in ctx.group_files() {
                    let path = ctx.layout.artifact_file(ctx.kind, ctx.name, &token_group_file_name(group));
                    let Some(expected) = entry.get("checksum").and_then(Value::as_str) else { continue };
                    if !path.is_file() {
                        continue;
                    }
                    match read_json(&path) {
                        Ok(value) => {
                            let actual = json_checksum(&value).unwrap_or_default();
                            if actual != expected {
                                violations.push(self.mismatch(subject, &format!("files.{group}.checksum"), &path));
                            }
                        }
                        Err(violation) => violations.push(violation.retarget(self.name(), subject)),
                    }
                }
            }
            _ => {
                let (Some(path), Some(expected)) = (ctx.template_copy_path(), ctx.str_field("checksum")) else {
                    return violations;
                };
                if !path.is_file() {
                    return violations;
                }
                match fs::read_to_string(&path) {
                    Ok(text) if content_checksum(&text) == expected => {}
                    Ok(_) => violations.push(self.mismatch(subject, "checksum", &path)),
                    Err(e) => violations.push(
                        ValidationViolation::error(self.name(), DefectClass::MalformedDocument, subject, format!("unreadable: {e}"))
                            .with_path(&path),
                    ),
                }
            }
        }
        violations
    }
}

impl ChecksumRule {
    fn mismatch(&self, subject: &str, field: &str, path: &Path) -> ValidationViolation {
        ValidationViolation::error(
            self.name(),
            DefectClass::ChecksumMismatch,
            subject,
            "file content does not match the published checksum",
        )
        .with_field(field)
        .with_path(path)
    }
}

/// Published URLs are exactly the ones derived from baseUrl, kind and name
pub struct UrlRule;

impl ValidationRule for UrlRule {
    fn name(&self) -> &'static str { "derived_urls" }

    fn validate(&self, ctx: &RecordContext<'_>) -> Vec<ValidationViolation> {
        let layout = ctx.layout;
        let mut expected: Vec<(String, Option<String>, String)> = vec![];
        match ctx.kind {
            ArtifactKind::Template => {
                expected.push((
                    "templateUrl".to_string(),
                    ctx.str_field("templateUrl").map(str::to_string),
                    layout.metadata_url(ctx.kind, ctx.name),
                ));
                for (group, entry) in ctx.group_files() {
                    expected.push((
                        format!("files.{group}.url"),
                        entry.get("url").and_then(Value::as_str).map(str::to_string),
                        layout.artifact_url(ctx.kind, ctx.name, &token_group_file_name(group)),
                    ));
                }
            }
            _ => {
                expected.push((
                    "metadataUrl".to_string(),
                    ctx.str_field("metadataUrl").map(str::to_string),
                    layout.metadata_url(ctx.kind, ctx.name),
                ));
                if let Some(file_name) = ctx.str_field("fileName") {
                    expected.push((
                        "downloadUrl".to_string(),
                        ctx.str_field("downloadUrl").map(str::to_string),
                        layout.artifact_url(ctx.kind, ctx.name, &template_file_name(file_name)),
                    ));
                }
            }
        }

        expected
            .into_iter()
            .filter_map(|(field, actual, derived)| {
                let actual = actual?;
                (actual != derived).then(|| {
                    ValidationViolation::error(
                        self.name(),
                        DefectClass::ReferentialBreak,
                        &ctx.subject,
                        format!("{field} is {actual}, expected {derived}"),
                    )
                    .with_field(&field)
                })
            })
            .collect()
    }
}

/// requiredProviders agrees with hasHaptics and names published providers
pub struct ProviderRule;

impl ValidationRule for ProviderRule {
    fn name(&self) -> &'static str { "required_providers" }

    fn validate(&self, ctx: &RecordContext<'_>) -> Vec<ValidationViolation> {
        if ctx.kind != ArtifactKind::Component {
            return vec![];
        }
        let Some(required) = ctx.record.get("requiredProviders").and_then(Value::as_array) else {
            return vec![];
        };
        let required: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
        let has_haptics = ctx.record.get("hasHaptics").and_then(Value::as_bool).unwrap_or(false);
        let subject = ctx.subject.as_str();
        let mut violations = vec![];

        let wants_haptics = required.contains(&"haptics");
        let wants_theme = required.contains(&"theme");
        if wants_haptics != has_haptics || (has_haptics && !wants_theme) {
            violations.push(
                ValidationViolation::error(
                    self.name(),
                    DefectClass::SchemaViolation,
                    subject,
                    format!("requiredProviders {required:?} inconsistent with hasHaptics={has_haptics}"),
                )
                .with_field("requiredProviders"),
            );
        }

        if let Some(providers) = ctx.provider_names {
            for provider in required {
                if !providers.contains(provider) {
                    violations.push(
                        ValidationViolation::warning(
                            self.name(),
                            DefectClass::ReferentialBreak,
                            subject,
                            format!("required provider {provider:?} is not published"),
                        )
                        .with_field("requiredProviders"),
                    );
                }
            }
        }
        violations
    }
}

impl ValidationViolation {
    fn retarget(mut self, rule: &str, subject: &str) -> Self {
        self.rule = rule.to_string();
        self.subject = subject.to_string();
        self
    }
}

const DOCUMENT_RULE: &str = "document";
const INDEX_RULE: &str = "index_consistency";

fn read_json(path: &Path) -> Result<Value, ValidationViolation> {
    let subject = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| {
        ValidationViolation::error(DOCUMENT_RULE, DefectClass::MissingStructure, &subject, format!("cannot read: {e}"))
            .with_path(path)
    })?;
    serde_json::from_str(&text).map_err(|e| {
        ValidationViolation::error(DOCUMENT_RULE, DefectClass::MalformedDocument, &subject, format!("invalid JSON: {e}"))
            .with_path(path)
    })
}

/// A kind document that loaded and passed its envelope checks
struct LoadedDocument {
    base_url: String,
    last_updated: Option<String>,
    records: Vec<Value>,
}

/// Validator orchestrates rules over every published record
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldsRule),
                Box::new(ArtifactFilesRule),
                Box::new(ChecksumRule),
                Box::new(UrlRule),
                Box::new(ProviderRule),
            ],
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Checks the registry tree rooted at `root`.
    pub fn validate(&self, root: &Path) -> ValidationReport {
        let mut violations = vec![];
        let mut documents_checked = 0;
        let mut artifacts_checked = 0;
        let mut invalid = BTreeSet::new();
        info!(root = %root.display(), "validating registry");

        let api_dir = RegistryLayout::new(root, "").api_dir();
        if !api_dir.is_dir() {
            violations.push(
                ValidationViolation::error(DOCUMENT_RULE, DefectClass::MissingStructure, "api", "API directory missing")
                    .with_path(&api_dir),
            );
            return finish(violations, 0, 0, invalid);
        }

        let mut documents: BTreeMap<ArtifactKind, LoadedDocument> = BTreeMap::new();
        for kind in ArtifactKind::ALL {
            documents_checked += 1;
            if let Some(doc) = load_kind_document(root, kind, &mut violations) {
                documents.insert(kind, doc);
            }
        }

        let provider_names: Option<BTreeSet<String>> = documents.get(&ArtifactKind::Provider).map(|doc| {
            doc.records
                .iter()
                .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
                .collect()
        });

        for (kind, doc) in &documents {
            let layout = RegistryLayout::new(root, &doc.base_url);
            let document_subject = format!("api/{}", kind.document_file());
            let mut seen = BTreeSet::new();

            for (position, value) in doc.records.iter().enumerate() {
                let Some((name, record)) = value
                    .as_object()
                    .and_then(|r| r.get("name").and_then(Value::as_str).map(|n| (n, r)))
                else {
                    violations.push(
                        ValidationViolation::error(
                            DOCUMENT_RULE,
                            DefectClass::SchemaViolation,
                            &document_subject,
                            format!("record {position} is not an object with a name"),
                        )
                        .with_field(kind.dir()),
                    );
                    continue;
                };

                artifacts_checked += 1;
                let ctx = RecordContext {
                    kind: *kind,
                    name,
                    record,
                    subject: format!("{}/{}", kind.dir(), name),
                    layout: &layout,
                    provider_names: provider_names.as_ref(),
                };

                if !seen.insert(name.to_string()) {
                    violations.push(
                        ValidationViolation::error(DOCUMENT_RULE, DefectClass::SchemaViolation, &ctx.subject, "duplicate name")
                            .with_field("name"),
                    );
                    invalid.insert(ctx.subject.clone());
                    continue;
                }

                if let Some(violation) = unsafe_path_segment(&ctx) {
                    violations.push(violation);
                    invalid.insert(ctx.subject.clone());
                    continue;
                }

                let found: Vec<_> = self.rules.iter().flat_map(|rule| rule.validate(&ctx)).collect();
                if found.iter().any(ValidationViolation::is_error) {
                    invalid.insert(ctx.subject.clone());
                }
                violations.extend(found);
            }
        }

        documents_checked += 1;
        check_index(root, &documents, &mut violations);

        finish(violations, documents_checked, artifacts_checked, invalid)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Names and group keys are joined into paths, so anything outside their
/// shape is rejected before a rule touches the filesystem.
fn unsafe_path_segment(ctx: &RecordContext<'_>) -> Option<ValidationViolation> {
    if !is_artifact_name(ctx.name) {
        return Some(
            ValidationViolation::error(
                DOCUMENT_RULE,
                DefectClass::SchemaViolation,
                &ctx.subject,
                format!("name {:?} is not a kebab-case artifact name", ctx.name),
            )
            .with_field("name"),
        );
    }
    if ctx.kind == ArtifactKind::Template {
        if let Some((group, _)) = ctx.group_files().into_iter().find(|(g, _)| !is_group_name(g)) {
            return Some(
                ValidationViolation::error(
                    DOCUMENT_RULE,
                    DefectClass::SchemaViolation,
                    &ctx.subject,
                    format!("token group {group:?} is not a valid group name"),
                )
                .with_field(&format!("files.{group}")),
            );
        }
    }
    None
}

fn finish(
    violations: Vec<ValidationViolation>,
    documents_checked: usize,
    artifacts_checked: usize,
    invalid: BTreeSet<String>,
) -> ValidationReport {
    for v in &violations {
        let path = v.path.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        let field = v.field.as_deref().unwrap_or_default();
        match v.severity {
            ViolationSeverity::Error => {
                error!(subject = %v.subject, rule = %v.rule, class = ?v.class, field, path, "{}", v.message)
            }
            ViolationSeverity::Warning => {
                warn!(subject = %v.subject, rule = %v.rule, class = ?v.class, field, path, "{}", v.message)
            }
        }
    }
    let valid = !violations.iter().any(ValidationViolation::is_error);
    info!(valid, documents_checked, artifacts_checked, violations = violations.len(), "validation finished");
    ValidationReport {
        valid,
        documents_checked,
        artifacts_checked,
        invalid_artifacts: invalid.into_iter().collect(),
        violations,
    }
}

/// Envelope checks shared by the kind documents and the index.
fn check_envelope(subject: &str, doc: &Map<String, Value>, violations: &mut Vec<ValidationViolation>) {
    for field in ["version", "lastUpdated", "baseUrl"] {
        if !doc.get(field).is_some_and(Value::is_string) {
            violations.push(
                ValidationViolation::error(DOCUMENT_RULE, DefectClass::SchemaViolation, subject, format!("missing field {field}"))
                    .with_field(field),
            );
        }
    }
    if !doc.get("stats").is_some_and(Value::is_object) {
        violations.push(
            ValidationViolation::error(DOCUMENT_RULE, DefectClass::SchemaViolation, subject, "missing field stats")
                .with_field("stats"),
        );
    }
    if let Some(version) = doc.get("version").and_then(Value::as_str) {
        if semver::Version::parse(version).is_err() {
            violations.push(
                ValidationViolation::error(
                    DOCUMENT_RULE,
                    DefectClass::SchemaViolation,
                    subject,
                    format!("version {version:?} is not semver"),
                )
                .with_field("version"),
            );
        }
    }
    if let Some(stamp) = doc.get("lastUpdated").and_then(Value::as_str) {
        if chrono::DateTime::parse_from_rfc3339(stamp).is_err() {
            violations.push(
                ValidationViolation::error(
                    DOCUMENT_RULE,
                    DefectClass::SchemaViolation,
                    subject,
                    format!("lastUpdated {stamp:?} is not an ISO-8601 timestamp"),
                )
                .with_field("lastUpdated"),
            );
        }
    }
}

fn load_kind_document(
    root: &Path,
    kind: ArtifactKind,
    violations: &mut Vec<ValidationViolation>,
) -> Option<LoadedDocument> {
    let layout = RegistryLayout::new(root, "");
    let path = layout.document_path(kind);
    let subject = format!("api/{}", kind.document_file());

    if !path.is_file() {
        violations.push(
            ValidationViolation::error(DOCUMENT_RULE, DefectClass::MissingStructure, &subject, "document missing")
                .with_path(&path),
        );
        return None;
    }
    let value = match read_json(&path) {
        Ok(value) => value,
        Err(v) => {
            violations.push(v.retarget(DOCUMENT_RULE, &subject));
            return None;
        }
    };
    let Some(doc) = value.as_object() else {
        violations.push(
            ValidationViolation::error(DOCUMENT_RULE, DefectClass::SchemaViolation, &subject, "document is not an object")
                .with_path(&path),
        );
        return None;
    };

    check_envelope(&subject, doc, violations);
    let Some(records) = doc.get(kind.dir()).and_then(Value::as_array) else {
        violations.push(
            ValidationViolation::error(
                DOCUMENT_RULE,
                DefectClass::SchemaViolation,
                &subject,
                format!("missing records array {}", kind.dir()),
            )
            .with_field(kind.dir()),
        );
        return None;
    };

    if let Some(total) = value.pointer("/stats/total").and_then(Value::as_u64) {
        if total as usize != records.len() {
            violations.push(
                ValidationViolation::error(
                    DOCUMENT_RULE,
                    DefectClass::SchemaViolation,
                    &subject,
                    format!("stats.total is {total}, document has {} records", records.len()),
                )
                .with_field("stats.total"),
            );
        }
    }

    Some(LoadedDocument {
        base_url: doc.get("baseUrl").and_then(Value::as_str).unwrap_or_default().to_string(),
        last_updated: doc.get("lastUpdated").and_then(Value::as_str).map(str::to_string),
        records: records.clone(),
    })
}

/// The index must be the exact aggregation of the kind documents.
fn check_index(
    root: &Path,
    documents: &BTreeMap<ArtifactKind, LoadedDocument>,
    violations: &mut Vec<ValidationViolation>,
) {
    let subject = "api/index.json";
    let path = RegistryLayout::new(root, "").index_path();
    if !path.is_file() {
        violations.push(
            ValidationViolation::error(INDEX_RULE, DefectClass::MissingStructure, subject, "document missing").with_path(&path),
        );
        return;
    }
    let index = match read_json(&path) {
        Ok(Value::Object(index)) => index,
        Ok(_) => {
            violations.push(
                ValidationViolation::error(INDEX_RULE, DefectClass::SchemaViolation, subject, "document is not an object")
                    .with_path(&path),
            );
            return;
        }
        Err(v) => {
            violations.push(v.retarget(INDEX_RULE, subject));
            return;
        }
    };
    check_envelope(subject, &index, violations);

    let base_url = index.get("baseUrl").and_then(Value::as_str).unwrap_or_default();
    let layout = RegistryLayout::new(root, base_url);
    let stamp = index.get("lastUpdated").and_then(Value::as_str);

    for kind in ArtifactKind::ALL {
        let pointer = format!("/endpoints/{}", kind.dir());
        let field = format!("endpoints.{}", kind.dir());
        match index.get("endpoints").and_then(|e| e.get(kind.dir())).and_then(Value::as_str) {
            None => violations.push(
                ValidationViolation::error(INDEX_RULE, DefectClass::SchemaViolation, subject, format!("missing field {field}"))
                    .with_field(&field),
            ),
            Some(url) if url != layout.endpoint_url(kind) => violations.push(
                ValidationViolation::error(
                    INDEX_RULE,
                    DefectClass::ReferentialBreak,
                    subject,
                    format!("{pointer} is {url}, expected {}", layout.endpoint_url(kind)),
                )
                .with_field(&field),
            ),
            Some(_) => {}
        }

        let Some(doc) = documents.get(&kind) else { continue };
        let field = format!("stats.{}", kind.dir());
        let count = index.get("stats").and_then(|s| s.get(kind.dir())).and_then(Value::as_u64);
        if count != Some(doc.records.len() as u64) {
            violations.push(
                ValidationViolation::error(
                    INDEX_RULE,
                    DefectClass::ReferentialBreak,
                    subject,
                    format!("{field} is {count:?}, {} has {} records", kind.document_file(), doc.records.len()),
                )
                .with_field(&field),
            );
        }
        if stamp.is_some() && doc.last_updated.as_deref() != stamp {
            violations.push(
                ValidationViolation::warning(
                    INDEX_RULE,
                    DefectClass::ReferentialBreak,
                    subject,
                    format!("{} was produced by a different build", kind.document_file()),
                )
                .with_field("lastUpdated"),
            );
        }
    }

    let Some(components) = documents.get(&ArtifactKind::Component) else { return };
    let categories = string_union(&components.records, "category");
    if index_set(&index, "categories") != Some(categories) {
        violations.push(
            ValidationViolation::error(
                INDEX_RULE,
                DefectClass::ReferentialBreak,
                subject,
                "stats.categories is not the union of component categories",
            )
            .with_field("stats.categories"),
        );
    }

    let dependencies = string_union(&components.records, "dependencies");
    if index_set(&index, "dependencies") != Some(dependencies) {
        violations.push(
            ValidationViolation::error(
                INDEX_RULE,
                DefectClass::ReferentialBreak,
                subject,
                "stats.dependencies is not the union of component dependencies",
            )
            .with_field("stats.dependencies"),
        );
    }
}

/// Union of a string field, or of a string-array field, across records
fn string_union(records: &[Value], field: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for record in records {
        match record.get(field) {
            Some(Value::String(s)) => {
                set.insert(s.clone());
            }
            Some(Value::Array(items)) => {
                set.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
            }
            _ => {}
        }
    }
    set
}

fn index_set(index: &Map<String, Value>, stat: &str) -> Option<BTreeSet<String>> {
    let items = index.get("stats")?.get(stat)?.as_array()?;
    Some(items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_ctx<'a>(
        kind: ArtifactKind,
        record: &'a Map<String, Value>,
        layout: &'a RegistryLayout,
    ) -> RecordContext<'a> {
        let name = record["name"].as_str().unwrap();
        RecordContext {
            kind,
            name,
            record,
            subject: format!("{}/{}", kind.dir(), name),
            layout,
            provider_names: None,
        }
    }

    #[test]
    fn test_required_fields_reports_each_missing_field() {
        let layout = RegistryLayout::new("/nowhere", "https://x");
        let record = json!({"name": "button", "hasHaptics": "yes"});
        let record = record.as_object().unwrap();
        let violations = RequiredFieldsRule.validate(&record_ctx(ArtifactKind::Component, record, &layout));

        let fields: BTreeSet<_> = violations.iter().filter_map(|v| v.field.as_deref()).collect();
        assert!(fields.contains("checksum"));
        assert!(fields.contains("category"));
        assert!(fields.contains("hasHaptics"));
        assert!(!fields.contains("name"));
        assert!(violations.iter().all(|v| v.class == DefectClass::SchemaViolation));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let layout = RegistryLayout::new("/nowhere", "https://x");
        let record = json!({"name": "button", "category": "gadgets"});
        let record = record.as_object().unwrap();
        let violations = RequiredFieldsRule.validate(&record_ctx(ArtifactKind::Component, record, &layout));
        assert!(violations.iter().any(|v| v.message.contains("unknown category")));
    }

    #[test]
    fn test_provider_rule_checks_haptics_consistency() {
        let layout = RegistryLayout::new("/nowhere", "https://x");
        let consistent = json!({"name": "a", "hasHaptics": true, "requiredProviders": ["theme", "haptics"]});
        let missing_theme = json!({"name": "b", "hasHaptics": true, "requiredProviders": ["haptics"]});
        let stray_haptics = json!({"name": "c", "hasHaptics": false, "requiredProviders": ["theme", "haptics"]});

        let check = |v: &Value| ProviderRule.validate(&record_ctx(ArtifactKind::Component, v.as_object().unwrap(), &layout));
        assert!(check(&consistent).is_empty());
        assert_eq!(check(&missing_theme).len(), 1);
        assert_eq!(check(&stray_haptics).len(), 1);
    }

    #[test]
    fn test_unpublished_provider_is_warning() {
        let layout = RegistryLayout::new("/nowhere", "https://x");
        let record = json!({"name": "card", "hasHaptics": false, "requiredProviders": ["theme"]});
        let providers: BTreeSet<String> = BTreeSet::new();
        let mut ctx = record_ctx(ArtifactKind::Component, record.as_object().unwrap(), &layout);
        ctx.provider_names = Some(&providers);

        let violations = ProviderRule.validate(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, ViolationSeverity::Warning);
    }

    #[test]
    fn test_url_rule_detects_hand_edited_url() {
        let layout = RegistryLayout::new("/nowhere", "https://x");
        let record = json!({
            "name": "theme",
            "fileName": "ThemeProvider.tsx",
            "metadataUrl": "https://x/providers/theme/provider.json",
            "downloadUrl": "https://elsewhere/theme.tsx"
        });
        let violations = UrlRule.validate(&record_ctx(ArtifactKind::Provider, record.as_object().unwrap(), &layout));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field.as_deref(), Some("downloadUrl"));
    }

    #[test]
    fn test_missing_api_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let report = Validator::new().validate(tmp.path());
        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].class, DefectClass::MissingStructure);
    }

    #[test]
    fn test_every_document_checked_even_when_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let api = tmp.path().join("api");
        fs::create_dir_all(&api).unwrap();
        fs::write(api.join("components.json"), "{ broken").unwrap();

        let report = Validator::new().validate(tmp.path());
        assert!(!report.valid);
        assert_eq!(report.documents_checked, 5);
        let classes: Vec<_> = report.violations.iter().map(|v| v.class).collect();
        assert!(classes.contains(&DefectClass::MalformedDocument));
        assert_eq!(
            classes.iter().filter(|c| **c == DefectClass::MissingStructure).count(),
            4
        );
    }
}
