//! Registry Assembler - API Documents and Index
//!
//! A pure reduction over finished records. Nothing here extracts, reads or
//! writes; stats are unions and counts of what upstream already computed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::Category;
use crate::metadata::{ComponentRecord, ProviderRecord, TokenSetRecord};
use crate::store::{ArtifactKind, RegistryLayout};
use crate::templates::TemplateRecord;

/// Values shared by every document of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub version: String,
    pub last_updated: String,
}

/// Completed records of one build, per kind.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub components: Vec<ComponentRecord>,
    pub providers: Vec<ProviderRecord>,
    pub tokens: Vec<TokenSetRecord>,
    pub templates: Vec<TemplateRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument<B> {
    pub version: String,
    pub last_updated: String,
    pub base_url: String,
    #[serde(flatten)]
    pub body: B,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentsBody {
    pub components: Vec<ComponentRecord>,
    pub stats: ComponentStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStats {
    pub total: usize,
    pub categories: Vec<Category>,
    pub dependencies: Vec<String>,
    pub with_haptics: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvidersBody {
    pub providers: Vec<ProviderRecord>,
    pub stats: ProviderStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderStats {
    pub total: usize,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokensBody {
    pub tokens: Vec<TokenSetRecord>,
    pub stats: TokenStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenStats {
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplatesBody {
    pub templates: Vec<TemplateRecord>,
    pub stats: TemplateStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateStats {
    pub total: usize,
    pub authors: Vec<String>,
    pub moods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub version: String,
    pub last_updated: String,
    pub base_url: String,
    pub endpoints: Endpoints,
    pub stats: IndexStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoints {
    pub components: String,
    pub providers: String,
    pub tokens: String,
    pub templates: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub components: usize,
    pub providers: usize,
    pub tokens: usize,
    pub templates: usize,
    pub categories: Vec<Category>,
    pub dependencies: Vec<String>,
}

/// All documents of one build.
#[derive(Debug, Clone)]
pub struct AssembledRegistry {
    pub components: ApiDocument<ComponentsBody>,
    pub providers: ApiDocument<ProvidersBody>,
    pub tokens: ApiDocument<TokensBody>,
    pub templates: ApiDocument<TemplatesBody>,
    pub index: IndexDocument,
}

pub fn assemble(ctx: &BuildContext, layout: &RegistryLayout, records: RecordSet) -> AssembledRegistry {
    let RecordSet {
        mut components,
        mut providers,
        mut tokens,
        mut templates,
    } = records;
    components.sort_by(|a, b| a.name.cmp(&b.name));
    providers.sort_by(|a, b| a.name.cmp(&b.name));
    tokens.sort_by(|a, b| a.name.cmp(&b.name));
    templates.sort_by(|a, b| a.name.cmp(&b.name));

    let component_stats = component_stats(&components);
    let provider_stats = ProviderStats {
        total: providers.len(),
        dependencies: union(providers.iter().map(|p| p.dependencies.iter())),
    };
    let token_stats = TokenStats { total: tokens.len() };
    let template_stats = TemplateStats {
        total: templates.len(),
        authors: union(templates.iter().map(|t| std::iter::once(&t.author))),
        moods: union(templates.iter().map(|t| std::iter::once(&t.personality.mood))),
    };

    let index = IndexDocument {
        version: ctx.version.clone(),
        last_updated: ctx.last_updated.clone(),
        base_url: layout.base_url().to_string(),
        endpoints: Endpoints {
            components: layout.endpoint_url(ArtifactKind::Component),
            providers: layout.endpoint_url(ArtifactKind::Provider),
            tokens: layout.endpoint_url(ArtifactKind::TokenSet),
            templates: layout.endpoint_url(ArtifactKind::Template),
        },
        stats: IndexStats {
            components: component_stats.total,
            providers: provider_stats.total,
            tokens: token_stats.total,
            templates: template_stats.total,
            categories: component_stats.categories.clone(),
            dependencies: component_stats.dependencies.clone(),
        },
    };

    AssembledRegistry {
        components: envelope(ctx, layout, ComponentsBody { components, stats: component_stats }),
        providers: envelope(ctx, layout, ProvidersBody { providers, stats: provider_stats }),
        tokens: envelope(ctx, layout, TokensBody { tokens, stats: token_stats }),
        templates: envelope(ctx, layout, TemplatesBody { templates, stats: template_stats }),
        index,
    }
}

pub fn component_stats(components: &[ComponentRecord]) -> ComponentStats {
    let mut categories: Vec<Category> = components.iter().map(|c| c.category).collect();
    categories.sort_by_key(|c| c.as_str());
    categories.dedup();
    ComponentStats {
        total: components.len(),
        categories,
        dependencies: union(components.iter().map(|c| c.dependencies.iter())),
        with_haptics: components.iter().filter(|c| c.has_haptics).count(),
    }
}

fn envelope<B>(ctx: &BuildContext, layout: &RegistryLayout, body: B) -> ApiDocument<B> {
    ApiDocument {
        version: ctx.version.clone(),
        last_updated: ctx.last_updated.clone(),
        base_url: layout.base_url().to_string(),
        body,
    }
}

/// Sorted union of string sets.
fn union<'a, O, I>(sets: O) -> Vec<String>
where
    O: IntoIterator<Item = I>,
    I: Iterator<Item = &'a String>,
{
    let all: BTreeSet<&String> = sets.into_iter().flatten().collect();
    all.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ArtifactRecord, RequiredProvider};
    use crate::templates::Personality;
    use std::collections::BTreeMap;

    fn component(name: &str, category: Category, deps: &[&str], haptics: bool) -> ComponentRecord {
        ComponentRecord {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            category,
            version: "1.0.0".to_string(),
            checksum: "00".to_string(),
            file_name: format!("{name}.tsx"),
            download_url: String::new(),
            metadata_url: String::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            exports: vec![],
            required_providers: if haptics {
                vec![RequiredProvider::Theme, RequiredProvider::Haptics]
            } else {
                vec![]
            },
            variants: vec![],
            sizes: vec![],
            token_usage: vec![],
            has_haptics: haptics,
        }
    }

    fn provider(name: &str, deps: &[&str]) -> ArtifactRecord {
        ArtifactRecord {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            version: "1.0.0".to_string(),
            checksum: "00".to_string(),
            file_name: format!("{name}.tsx"),
            download_url: String::new(),
            metadata_url: String::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            exports: vec![],
        }
    }

    fn template(name: &str, author: &str, mood: &str) -> TemplateRecord {
        TemplateRecord {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            author: author.to_string(),
            version: "1.0.0".to_string(),
            personality: Personality {
                mood: mood.to_string(),
                spacing: "normal".to_string(),
                roundness: "soft".to_string(),
            },
            preview: None,
            checksum: "00".to_string(),
            template_url: String::new(),
            files: BTreeMap::new(),
        }
    }

    fn ctx() -> BuildContext {
        BuildContext {
            version: "1.0.0".to_string(),
            last_updated: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_stats_are_unions() {
        let layout = RegistryLayout::new("/out", "https://reg.example.com");
        let records = RecordSet {
            components: vec![
                component("switch", Category::Inputs, &["react-native-reanimated"], true),
                component("button", Category::Inputs, &["lucide-react-native"], true),
                component("card", Category::Display, &[], false),
            ],
            providers: vec![provider("haptics", &["expo-haptics"])],
            tokens: vec![],
            templates: vec![template("ocean", "Ana", "calm"), template("ember", "Ana", "bold")],
        };

        let registry = assemble(&ctx(), &layout, records);

        let names: Vec<_> = registry.components.body.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["button", "card", "switch"]);

        let stats = &registry.components.body.stats;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.categories, vec![Category::Display, Category::Inputs]);
        assert_eq!(stats.dependencies, vec!["lucide-react-native", "react-native-reanimated"]);
        assert_eq!(stats.with_haptics, 2);

        assert_eq!(registry.templates.body.stats.authors, vec!["Ana"]);
        assert_eq!(registry.templates.body.stats.moods, vec!["bold", "calm"]);

        let index = &registry.index.stats;
        assert_eq!((index.components, index.providers, index.tokens, index.templates), (3, 1, 0, 2));
        assert_eq!(index.dependencies, vec!["lucide-react-native", "react-native-reanimated"]);
        assert!(!index.dependencies.contains(&"expo-haptics".to_string()));
        assert_eq!(
            registry.index.endpoints.templates,
            "https://reg.example.com/api/templates.json"
        );
    }

    #[test]
    fn test_documents_share_timestamp() {
        let layout = RegistryLayout::new("/out", "https://reg.example.com");
        let registry = assemble(&ctx(), &layout, RecordSet::default());
        let stamps = [
            &registry.components.last_updated,
            &registry.providers.last_updated,
            &registry.tokens.last_updated,
            &registry.templates.last_updated,
            &registry.index.last_updated,
        ];
        assert!(stamps.iter().all(|s| *s == "2026-01-01T00:00:00Z"));
        assert!(registry.index.stats.categories.is_empty());
    }

    #[test]
    fn test_document_envelope_shape() {
        let layout = RegistryLayout::new("/out", "https://reg.example.com");
        let registry = assemble(&ctx(), &layout, RecordSet::default());
        let value = serde_json::to_value(&registry.tokens).unwrap();
        for key in ["version", "lastUpdated", "baseUrl", "tokens", "stats"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
