//! Metadata Synthesizer - Fact Sheet to Publishable Record
//!
//! Pure functions: a record depends only on the source artifact, its fact
//! sheet, the catalog, the layout and the registry version.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analyzer::FactSheet;
use crate::catalog::{Catalog, Category};
use crate::hashing::content_checksum;
use crate::store::{template_file_name, ArtifactKind, RegistryLayout};

/// One source file read from the input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArtifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub file_name: String,
    pub source: String,
}

impl SourceArtifact {
    pub fn new(kind: ArtifactKind, file_name: &str, source: String) -> Self {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        Self {
            kind,
            name: artifact_name(kind, stem),
            file_name: file_name.to_string(),
            source,
        }
    }

    pub fn checksum(&self) -> String {
        content_checksum(&self.source)
    }
}

/// Lower-case kebab identifier for a file stem.
///
/// `IconButton` → `icon-button`, `HTMLView` → `html-view`. Provider files
/// drop a trailing `-provider`, so `ThemeProvider.tsx` registers as `theme`.
pub fn artifact_name(kind: ArtifactKind, stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(stem.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' || c == '.' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }
    let name = out.trim_end_matches('-').to_string();
    if kind == ArtifactKind::Provider {
        if let Some(base) = name.strip_suffix("-provider").filter(|b| !b.is_empty()) {
            return base.to_string();
        }
    }
    name
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequiredProvider {
    Theme,
    Haptics,
}

impl RequiredProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredProvider::Theme => "theme",
            RequiredProvider::Haptics => "haptics",
        }
    }
}

/// Haptics usage needs both providers, theming alone needs the theme provider.
pub fn required_providers(facts: &FactSheet) -> Vec<RequiredProvider> {
    let mut required = vec![];
    if facts.has_provider || facts.has_haptics {
        required.push(RequiredProvider::Theme);
    }
    if facts.has_haptics {
        required.push(RequiredProvider::Haptics);
    }
    required
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: Category,
    pub version: String,
    pub checksum: String,
    pub file_name: String,
    pub download_url: String,
    pub metadata_url: String,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    pub required_providers: Vec<RequiredProvider>,
    pub variants: Vec<String>,
    pub sizes: Vec<String>,
    pub token_usage: Vec<String>,
    pub has_haptics: bool,
}

/// Provider and token-set record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub checksum: String,
    pub file_name: String,
    pub download_url: String,
    pub metadata_url: String,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
}

pub type ProviderRecord = ArtifactRecord;
pub type TokenSetRecord = ArtifactRecord;

/// Merges fact sheets with the catalog into records.
pub struct Synthesizer<'a> {
    catalog: &'a Catalog,
    layout: &'a RegistryLayout,
    version: &'a str,
}

impl<'a> Synthesizer<'a> {
    pub fn new(catalog: &'a Catalog, layout: &'a RegistryLayout, version: &'a str) -> Self {
        Self { catalog, layout, version }
    }

    pub fn component(&self, artifact: &SourceArtifact, facts: &FactSheet) -> ComponentRecord {
        let base = self.artifact(artifact, facts);
        ComponentRecord {
            category: self.catalog.category(&artifact.name),
            required_providers: required_providers(facts),
            variants: facts.variants.clone(),
            sizes: facts.sizes.clone(),
            token_usage: facts.token_usage.iter().cloned().collect(),
            has_haptics: facts.has_haptics,
            name: base.name,
            display_name: base.display_name,
            description: base.description,
            version: base.version,
            checksum: base.checksum,
            file_name: base.file_name,
            download_url: base.download_url,
            metadata_url: base.metadata_url,
            dependencies: base.dependencies,
            exports: base.exports,
        }
    }

    pub fn provider(&self, artifact: &SourceArtifact, facts: &FactSheet) -> ProviderRecord {
        self.artifact(artifact, facts)
    }

    pub fn token_set(&self, artifact: &SourceArtifact, facts: &FactSheet) -> TokenSetRecord {
        self.artifact(artifact, facts)
    }

    fn artifact(&self, artifact: &SourceArtifact, facts: &FactSheet) -> ArtifactRecord {
        let kind = artifact.kind;
        let name = artifact.name.as_str();
        ArtifactRecord {
            name: name.to_string(),
            display_name: self.catalog.display_name(name),
            description: self.catalog.description(name, kind.noun()),
            version: self.version.to_string(),
            checksum: artifact.checksum(),
            file_name: artifact.file_name.clone(),
            download_url: self
                .layout
                .artifact_url(kind, name, &template_file_name(&artifact.file_name)),
            metadata_url: self.layout.metadata_url(kind, name),
            dependencies: facts.dependencies.iter().cloned().collect(),
            exports: facts.exports.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SourceAnalyzer;

    #[test]
    fn test_artifact_names() {
        let c = ArtifactKind::Component;
        assert_eq!(artifact_name(c, "Button"), "button");
        assert_eq!(artifact_name(c, "IconButton"), "icon-button");
        assert_eq!(artifact_name(c, "HTMLView"), "html-view");
        assert_eq!(artifact_name(c, "list_item"), "list-item");
        assert_eq!(artifact_name(c, "text-area"), "text-area");
        assert_eq!(artifact_name(ArtifactKind::Provider, "ThemeProvider"), "theme");
        assert_eq!(artifact_name(ArtifactKind::Provider, "Provider"), "provider");
        assert_eq!(artifact_name(ArtifactKind::TokenSet, "iconSizes"), "icon-sizes");
    }

    #[test]
    fn test_required_providers_follow_flags() {
        let mut facts = FactSheet::default();
        assert!(required_providers(&facts).is_empty());

        facts.has_provider = true;
        assert_eq!(required_providers(&facts), vec![RequiredProvider::Theme]);

        facts.has_haptics = true;
        assert_eq!(
            required_providers(&facts),
            vec![RequiredProvider::Theme, RequiredProvider::Haptics]
        );
    }

    #[test]
    fn test_component_record() {
        let catalog = Catalog::default();
        let layout = RegistryLayout::new("/out", "https://reg.example.com");
        let synth = Synthesizer::new(&catalog, &layout, "1.0.0");

        let source = "import { Check } from 'lucide-react-native';\nimport { useHaptics } from '../haptics';\nexport type ButtonVariant = 'solid' | 'outline';\nexport function Button() { return colors.primary; }\n";
        let artifact = SourceArtifact::new(ArtifactKind::Component, "Button.tsx", source.to_string());
        let facts = SourceAnalyzer::default().analyze(source);
        let record = synth.component(&artifact, &facts);

        assert_eq!(record.name, "button");
        assert_eq!(record.display_name, "Button");
        assert_eq!(record.category, Category::Inputs);
        assert_eq!(record.dependencies, vec!["lucide-react-native"]);
        assert_eq!(record.variants, vec!["solid", "outline"]);
        assert_eq!(record.exports, vec!["ButtonVariant", "Button"]);
        assert_eq!(record.token_usage, vec!["colors.primary"]);
        assert!(record.has_haptics);
        assert_eq!(
            record.required_providers,
            vec![RequiredProvider::Theme, RequiredProvider::Haptics]
        );
        assert_eq!(
            record.download_url,
            "https://reg.example.com/components/button/Button.tsx.template"
        );
        assert_eq!(
            record.metadata_url,
            "https://reg.example.com/components/button/component.json"
        );
        assert_eq!(record.checksum, content_checksum(source));
    }

    #[test]
    fn test_unknown_name_falls_back() {
        let catalog = Catalog::default();
        let layout = RegistryLayout::new("/out", "https://reg.example.com");
        let synth = Synthesizer::new(&catalog, &layout, "1.0.0");
        let artifact = SourceArtifact::new(ArtifactKind::Component, "Gizmo.tsx", String::new());
        let record = synth.component(&artifact, &FactSheet::default());
        assert_eq!(record.category, Category::Other);
        assert_eq!(record.description, "Gizmo component");
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let catalog = Catalog::default();
        let layout = RegistryLayout::new("/out", "https://reg.example.com");
        let synth = Synthesizer::new(&catalog, &layout, "1.0.0");
        let artifact = SourceArtifact::new(
            ArtifactKind::TokenSet,
            "radii.ts",
            "export const radii = { sm: 4 };".to_string(),
        );
        let facts = SourceAnalyzer::default().analyze(&artifact.source);
        let a = synth.token_set(&artifact, &facts);
        let b = synth.token_set(&artifact, &facts);
        assert_eq!(a, b);
        assert_eq!(a.display_name, "Radius");
        assert_eq!(a.exports, vec!["radii"]);
    }
}
