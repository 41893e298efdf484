//! KitRegistry Core - UI Kit Registry Compiler
//!
//! # The Five Rules (Non-Negotiable)
//! 1. Source Is Truth: records are rebuilt from the source tree every run
//! 2. Checksums Are Identity: same text, same checksum
//! 3. URLs Are Derived, Never Authored
//! 4. Providers Follow Capabilities
//! 5. Validation Collects Everything

pub mod analyzer;
pub mod assembler;
pub mod catalog;
pub mod config;
pub mod hashing;
pub mod metadata;
pub mod pipeline;
pub mod store;
pub mod templates;
pub mod validation;

pub use analyzer::{AnalyzerConfig, FactSheet, SourceAnalyzer};
pub use assembler::{assemble, AssembledRegistry, BuildContext, IndexDocument, RecordSet};
pub use catalog::{Catalog, Category};
pub use config::{ConfigError, RegistryConfig};
pub use hashing::{canonical_json, content_checksum, json_checksum};
pub use metadata::{ArtifactRecord, ComponentRecord, RequiredProvider, SourceArtifact, Synthesizer};
pub use pipeline::{BuildReport, PipelineError, RegistryBuilder};
pub use store::{ArtifactKind, RegistryLayout};
pub use templates::{TemplateDefinition, TemplateError, TemplateRecord};
pub use validation::{DefectClass, ValidationReport, ValidationRule, ValidationViolation, Validator, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Version stamped on every record and document unless configured otherwise
pub const REGISTRY_VERSION: &str = "1.0.0";
