//! Build Pipeline - Single Entry Point
//!
//! Source tree in, registry tree out. Every record is produced once from its
//! source file, aggregation happens afterwards in one pure step, and only then
//! is anything written.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analyzer::{FactSheet, SourceAnalyzer};
use crate::assembler::{assemble, BuildContext, RecordSet};
use crate::config::{ConfigError, RegistryConfig};
use crate::metadata::{SourceArtifact, Synthesizer};
use crate::store::{
    list_files, prune_stale, remove_file, reset_dir, template_file_name, write_json, write_text, ArtifactKind,
    RegistryLayout, StoreError,
};
use crate::templates::{process_template_str, ProcessedTemplate};

/// Source file extensions scanned in the component, provider and token dirs
pub const SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid analyzer pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Required {kind} input directory not found: {path}")]
    MissingInputDir { kind: ArtifactKind, path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct KindCounts {
    pub components: usize,
    pub providers: usize,
    pub tokens: usize,
    pub templates: usize,
}

/// Outcome of one build run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub success: bool,
    pub last_updated: String,
    pub counts: KindCounts,
    /// `"<kind dir>/<name>"` → checksum
    pub checksums: BTreeMap<String, String>,
    pub skipped: Vec<SkippedArtifact>,
    pub pruned: Vec<String>,
    /// Kinds whose sub-build failed and whose previous output was taken down
    pub withdrawn: Vec<ArtifactKind>,
    pub errors: Vec<String>,
}

impl BuildReport {
    fn new(last_updated: &str) -> Self {
        Self {
            success: false,
            last_updated: last_updated.to_string(),
            counts: KindCounts::default(),
            checksums: BTreeMap::new(),
            skipped: vec![],
            pruned: vec![],
            withdrawn: vec![],
            errors: vec![],
        }
    }

    fn skip(&mut self, kind: ArtifactKind, path: &Path, reason: String) {
        warn!(%kind, path = %path.display(), %reason, "skipping artifact");
        self.skipped.push(SkippedArtifact {
            kind,
            path: path.to_path_buf(),
            reason,
        });
    }

    fn fail(&mut self, err: PipelineError) {
        error!(error = %err, "build step failed");
        self.errors.push(err.to_string());
    }
}

type Built<R> = Vec<(SourceArtifact, R)>;

/// The registry build pipeline
pub struct RegistryBuilder {
    config: RegistryConfig,
    analyzer: SourceAnalyzer,
    layout: RegistryLayout,
}

impl RegistryBuilder {
    pub fn new(config: RegistryConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let analyzer = SourceAnalyzer::new(config.analyzer.clone())?;
        let layout = RegistryLayout::new(&config.output_dir, &config.base_url);
        Ok(Self { config, analyzer, layout })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    pub fn analyze(&self, source: &str) -> FactSheet {
        self.analyzer.analyze(source)
    }

    pub fn build(&self) -> BuildReport {
        self.build_at(Utc::now())
    }

    /// Runs the whole pipeline with a fixed `lastUpdated` timestamp.
    pub fn build_at(&self, now: DateTime<Utc>) -> BuildReport {
        let ctx = BuildContext {
            version: self.config.version.clone(),
            last_updated: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let mut report = BuildReport::new(&ctx.last_updated);
        info!(output = %self.layout.root().display(), "building registry");

        let synth = Synthesizer::new(&self.config.catalog, &self.layout, &self.config.version);

        let components = self.build_sources(
            ArtifactKind::Component,
            &self.config.components_dir,
            &mut report,
            |a, f| synth.component(a, f),
        );
        let providers = self.build_sources(
            ArtifactKind::Provider,
            &self.config.providers_dir,
            &mut report,
            |a, f| synth.provider(a, f),
        );
        let tokens = self.build_sources(
            ArtifactKind::TokenSet,
            &self.config.tokens_dir,
            &mut report,
            |a, f| synth.token_set(a, f),
        );
        let templates = self.build_templates(&mut report);

        let records = RecordSet {
            components: records_of(&components),
            providers: records_of(&providers),
            tokens: records_of(&tokens),
            templates: templates.iter().map(|t| t.record.clone()).collect(),
        };
        for r in &records.components {
            report.checksums.insert(key(ArtifactKind::Component, &r.name), r.checksum.clone());
        }
        for r in &records.providers {
            report.checksums.insert(key(ArtifactKind::Provider, &r.name), r.checksum.clone());
        }
        for r in &records.tokens {
            report.checksums.insert(key(ArtifactKind::TokenSet, &r.name), r.checksum.clone());
        }
        for r in &records.templates {
            report.checksums.insert(key(ArtifactKind::Template, &r.name), r.checksum.clone());
        }
        report.counts = KindCounts {
            components: records.components.len(),
            providers: records.providers.len(),
            tokens: records.tokens.len(),
            templates: records.templates.len(),
        };

        let registry = assemble(&ctx, &self.layout, records);

        match &components {
            Some(items) => self.publish_sources(ArtifactKind::Component, items, &registry.components, &mut report),
            None => self.withdraw(ArtifactKind::Component, &mut report),
        }
        match &providers {
            Some(items) => self.publish_sources(ArtifactKind::Provider, items, &registry.providers, &mut report),
            None => self.withdraw(ArtifactKind::Provider, &mut report),
        }
        match &tokens {
            Some(items) => self.publish_sources(ArtifactKind::TokenSet, items, &registry.tokens, &mut report),
            None => self.withdraw(ArtifactKind::TokenSet, &mut report),
        }
        self.publish_templates(&templates, &registry.templates, &mut report);

        if let Err(e) = write_json(&self.layout.index_path(), &registry.index) {
            report.fail(e.into());
        }

        report.success = report.errors.is_empty();
        info!(
            success = report.success,
            components = report.counts.components,
            providers = report.counts.providers,
            tokens = report.counts.tokens,
            templates = report.counts.templates,
            skipped = report.skipped.len(),
            "registry build finished"
        );
        report
    }

    /// Reads, analyzes and synthesizes one source kind.
    ///
    /// `None` means the sub-build failed and nothing of this kind is published.
    fn build_sources<R>(
        &self,
        kind: ArtifactKind,
        dir: &Path,
        report: &mut BuildReport,
        synthesize: impl Fn(&SourceArtifact, &FactSheet) -> R,
    ) -> Option<Built<R>> {
        let artifacts = match self.collect_sources(kind, dir, report) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                report.fail(e);
                return None;
            }
        };

        let built: Built<R> = artifacts
            .into_iter()
            .map(|artifact| {
                let facts = self.analyzer.analyze(&artifact.source);
                debug!(%kind, name = %artifact.name, deps = facts.dependencies.len(), "analyzed");
                let record = synthesize(&artifact, &facts);
                (artifact, record)
            })
            .collect();
        info!(%kind, count = built.len(), "synthesized records");
        Some(built)
    }

    fn collect_sources(
        &self,
        kind: ArtifactKind,
        dir: &Path,
        report: &mut BuildReport,
    ) -> Result<Vec<SourceArtifact>, PipelineError> {
        if !dir.is_dir() {
            return Err(PipelineError::MissingInputDir {
                kind,
                path: dir.to_path_buf(),
            });
        }
        let files = list_files(dir, SOURCE_EXTENSIONS).map_err(|source| PipelineError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut seen = BTreeSet::new();
        let mut artifacts = vec![];
        for path in files {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if is_auxiliary_source(file_name) {
                debug!(%kind, file = file_name, "ignoring auxiliary source");
                continue;
            }
            let source = match fs::read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    report.skip(kind, &path, format!("unreadable: {e}"));
                    continue;
                }
            };
            let artifact = SourceArtifact::new(kind, file_name, source);
            if artifact.name.is_empty() {
                report.skip(kind, &path, "file name yields an empty artifact name".to_string());
                continue;
            }
            if !seen.insert(artifact.name.clone()) {
                report.skip(kind, &path, format!("duplicate {} name {:?}", kind.noun(), artifact.name));
                continue;
            }
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }

    fn build_templates(&self, report: &mut BuildReport) -> Vec<ProcessedTemplate> {
        let kind = ArtifactKind::Template;
        let dir = &self.config.templates_dir;
        if !dir.is_dir() {
            warn!(path = %dir.display(), "template directory not found, publishing no templates");
            return vec![];
        }
        let files = match list_files(dir, &["json"]) {
            Ok(files) => files,
            Err(source) => {
                report.fail(PipelineError::Read {
                    path: dir.clone(),
                    source,
                });
                return vec![];
            }
        };

        let mut seen = BTreeSet::new();
        let mut processed = vec![];
        for path in files {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    report.skip(kind, &path, format!("unreadable: {e}"));
                    continue;
                }
            };
            match process_template_str(&text, &self.layout, |n| self.config.catalog.display_name(n)) {
                Ok(template) => {
                    if !seen.insert(template.record.name.clone()) {
                        report.skip(kind, &path, format!("duplicate template name {:?}", template.record.name));
                        continue;
                    }
                    debug!(name = %template.record.name, groups = template.group_files.len(), "processed template");
                    processed.push(template);
                }
                Err(e) => report.skip(kind, &path, e.to_string()),
            }
        }
        info!(%kind, count = processed.len(), "processed templates");
        processed
    }

    fn publish_sources<R: Serialize, D: Serialize>(
        &self,
        kind: ArtifactKind,
        items: &[(SourceArtifact, R)],
        document: &D,
        report: &mut BuildReport,
    ) {
        let keep: BTreeSet<String> = items.iter().map(|(a, _)| a.name.clone()).collect();
        self.prune(kind, &keep, report);

        for (artifact, record) in items {
            if let Err(e) = self.write_source_artifact(artifact, record) {
                report.fail(e.into());
            }
        }
        if let Err(e) = write_json(&self.layout.document_path(kind), document) {
            report.fail(e.into());
        }
    }

    fn write_source_artifact<R: Serialize>(&self, artifact: &SourceArtifact, record: &R) -> Result<(), StoreError> {
        let kind = artifact.kind;
        reset_dir(&self.layout.artifact_dir(kind, &artifact.name))?;
        let template = template_file_name(&artifact.file_name);
        write_text(&self.layout.artifact_file(kind, &artifact.name, &template), &artifact.source)?;
        write_json(&self.layout.metadata_path(kind, &artifact.name), record)
    }

    fn publish_templates<D: Serialize>(&self, templates: &[ProcessedTemplate], document: &D, report: &mut BuildReport) {
        let kind = ArtifactKind::Template;
        let keep: BTreeSet<String> = templates.iter().map(|t| t.record.name.clone()).collect();
        self.prune(kind, &keep, report);

        for template in templates {
            if let Err(e) = self.write_template(template) {
                report.fail(e.into());
            }
        }
        if let Err(e) = write_json(&self.layout.document_path(kind), document) {
            report.fail(e.into());
        }
    }

    fn write_template(&self, template: &ProcessedTemplate) -> Result<(), StoreError> {
        let kind = ArtifactKind::Template;
        let name = &template.record.name;
        reset_dir(&self.layout.artifact_dir(kind, name))?;
        for group in &template.group_files {
            write_text(&self.layout.artifact_file(kind, name, &group.file_name), &group.contents)?;
        }
        write_json(&self.layout.metadata_path(kind, name), &template.record)
    }

    /// Takes down a kind whose sub-build failed.
    ///
    /// The index already counts it as empty, so its previous document and
    /// artifact directories must not outlive this build.
    fn withdraw(&self, kind: ArtifactKind, report: &mut BuildReport) {
        self.prune(kind, &BTreeSet::new(), report);
        match remove_file(&self.layout.document_path(kind)) {
            Ok(true) => info!(%kind, "withdrew previous document"),
            Ok(false) => {}
            Err(e) => report.fail(e.into()),
        }
        report.withdrawn.push(kind);
    }

    fn prune(&self, kind: ArtifactKind, keep: &BTreeSet<String>, report: &mut BuildReport) {
        match prune_stale(&self.layout, kind, keep) {
            Ok(removed) => {
                for name in removed {
                    info!(%kind, %name, "pruned stale artifact");
                    report.pruned.push(key(kind, &name));
                }
            }
            Err(e) => report.fail(e.into()),
        }
    }
}

fn records_of<R: Clone>(built: &Option<Built<R>>) -> Vec<R> {
    built
        .as_ref()
        .map(|items| items.iter().map(|(_, r)| r.clone()).collect())
        .unwrap_or_default()
}

fn key(kind: ArtifactKind, name: &str) -> String {
    format!("{}/{}", kind.dir(), name)
}

/// Barrels, declaration files and tests live next to artifacts but are not artifacts
fn is_auxiliary_source(file_name: &str) -> bool {
    let stem = file_name.split('.').next().unwrap_or_default();
    stem == "index"
        || file_name.ends_with(".d.ts")
        || file_name.contains(".test.")
        || file_name.contains(".spec.")
        || file_name.contains(".stories.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auxiliary_sources() {
        assert!(is_auxiliary_source("index.ts"));
        assert!(is_auxiliary_source("types.d.ts"));
        assert!(is_auxiliary_source("Button.test.tsx"));
        assert!(is_auxiliary_source("Button.stories.tsx"));
        assert!(!is_auxiliary_source("Button.tsx"));
        assert!(!is_auxiliary_source("indexed-list.tsx"));
    }

    #[test]
    fn test_invalid_version_rejected_up_front() {
        let config = RegistryConfig {
            version: "latest".to_string(),
            ..RegistryConfig::default()
        };
        assert!(matches!(
            RegistryBuilder::new(config),
            Err(PipelineError::Config(ConfigError::InvalidVersion(_)))
        ));
    }

    #[test]
    fn test_missing_component_dir_fails_only_that_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RegistryConfig::for_project(tmp.path());
        fs::create_dir_all(&config.providers_dir).unwrap();
        fs::create_dir_all(&config.tokens_dir).unwrap();
        fs::write(config.tokens_dir.join("colors.ts"), "export const colors = {};").unwrap();

        let builder = RegistryBuilder::new(config).unwrap();
        let report = builder.build();

        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("components"));
        assert_eq!(report.counts.tokens, 1);
        assert!(!builder.layout().document_path(ArtifactKind::Component).exists());
        assert!(builder.layout().document_path(ArtifactKind::TokenSet).exists());
        assert!(builder.layout().index_path().exists());
    }

    #[test]
    fn test_duplicate_names_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RegistryConfig::for_project(tmp.path());
        for dir in [&config.components_dir, &config.providers_dir, &config.tokens_dir] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(config.components_dir.join("IconButton.tsx"), "export const A = 1;").unwrap();
        fs::write(config.components_dir.join("icon-button.tsx"), "export const B = 2;").unwrap();

        let report = RegistryBuilder::new(config).unwrap().build();

        assert!(report.success);
        assert_eq!(report.counts.components, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("duplicate"));
    }
}
