//! Source Analyzer - Pattern Extraction
//!
//! Pulls a fact sheet out of one artifact's source text. This is not a parser:
//! each extractor is an independent text pattern, and a missing pattern yields
//! an empty set or `false`, never an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s+(?:[\w*${}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#)
        .expect("import regex is valid")
});

static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s+(?:type\s+)?(?:\*|\{[^}]*\})(?:\s+as\s+[\w$]+)?\s+from\s+['"]([^'"\n]+)['"]"#)
        .expect("export-from regex is valid")
});

static CALL_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:require|import)\(\s*['"]([^'"\n]+)['"]\s*\)"#)
        .expect("require regex is valid")
});

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(?:interface|type|function\*?|const|let|enum|class)\s+([A-Za-z_$][\w$]*)",
    )
    .expect("export regex is valid")
});

static LITERAL_UNION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\btype\s+([A-Za-z_$][\w$]*)\s*=\s*\|?\s*((?:'[^'\n]*'|"[^"\n]*")(?:\s*\|\s*(?:'[^'\n]*'|"[^"\n]*"))*)"#,
    )
    .expect("union regex is valid")
});

static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^'\n]*)'|"([^"\n]*)""#).expect("literal regex is valid")
});

/// Markers and tables the analyzer matches against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    /// Packages of the host UI framework, never reported as dependencies
    pub host_packages: Vec<String>,
    /// Any of these in the text means the artifact uses haptics
    pub haptics_markers: Vec<String>,
    /// Any of these in the text means the artifact reads the theme
    pub theming_markers: Vec<String>,
    /// Identifiers whose dotted accessors count as token usage
    pub token_roots: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            host_packages: strings(&["react", "react-native"]),
            haptics_markers: strings(&["useHaptics", "expo-haptics"]),
            theming_markers: strings(&["useTheme"]),
            token_roots: strings(&[
                "colors",
                "spacing",
                "radii",
                "borders",
                "typography",
                "iconSizes",
                "opacity",
                "shadows",
                "haptics",
            ]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Structural facts extracted from one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FactSheet {
    pub dependencies: BTreeSet<String>,
    pub exports: Vec<String>,
    pub variants: Vec<String>,
    pub sizes: Vec<String>,
    pub has_haptics: bool,
    pub has_provider: bool,
    pub token_usage: BTreeSet<String>,
}

/// Analyzer with its token accessor pattern compiled once.
#[derive(Debug, Clone)]
pub struct SourceAnalyzer {
    config: AnalyzerConfig,
    token_pattern: Option<Regex>,
}

impl SourceAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, regex::Error> {
        let token_pattern = token_accessor_pattern(&config.token_roots)?;
        Ok(Self { config, token_pattern })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, source: &str) -> FactSheet {
        let has_haptics = contains_any(source, &self.config.haptics_markers);
        let has_theming = contains_any(source, &self.config.theming_markers);

        FactSheet {
            dependencies: extract_dependencies(source, &self.config.host_packages),
            exports: extract_exports(source),
            variants: extract_union_literals(source, "Variant"),
            sizes: extract_union_literals(source, "Size"),
            has_haptics,
            has_provider: has_theming || has_haptics,
            token_usage: self
                .token_pattern
                .as_ref()
                .map(|re| extract_token_usage(source, re))
                .unwrap_or_default(),
        }
    }
}

impl Default for SourceAnalyzer {
    fn default() -> Self {
        let config = AnalyzerConfig::default();
        let token_pattern = token_accessor_pattern(&config.token_roots)
            .expect("default token roots form a valid pattern");
        Self { config, token_pattern }
    }
}

/// External module paths referenced by import-style statements.
pub fn extract_dependencies(source: &str, host_packages: &[String]) -> BTreeSet<String> {
    [&*IMPORT_FROM, &*EXPORT_FROM, &*CALL_IMPORT]
        .into_iter()
        .flat_map(|re| re.captures_iter(source))
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim()))
        .filter(|path| !path.is_empty() && !path.starts_with('.'))
        .filter(|path| !is_host_package(path, host_packages))
        .map(str::to_string)
        .collect()
}

fn is_host_package(path: &str, host_packages: &[String]) -> bool {
    host_packages.iter().any(|host| {
        path == host
            || path
                .strip_prefix(host.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Names introduced by top-level exported declarations.
pub fn extract_exports(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for cap in EXPORT_DECL.captures_iter(source) {
        let name = &cap[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// String literals of every `type <X><suffix> = 'a' | 'b'` alias.
///
/// A union that mixes a non-literal member in is skipped entirely.
pub fn extract_union_literals(source: &str, suffix: &str) -> Vec<String> {
    let mut values = Vec::new();
    for cap in LITERAL_UNION.captures_iter(source) {
        if !cap[1].ends_with(suffix) {
            continue;
        }
        let Some(whole) = cap.get(0) else { continue };
        let tail = source[whole.end()..].trim_start();
        if tail.starts_with('|') || tail.starts_with('&') {
            continue;
        }
        for lit in STRING_LITERAL.captures_iter(&cap[2]) {
            let value = lit
                .get(1)
                .or_else(|| lit.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }
    }
    values
}

/// Full dotted paths rooted at one of the token categories.
pub fn extract_token_usage(source: &str, pattern: &Regex) -> BTreeSet<String> {
    pattern
        .find_iter(source)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Builds `\b(?:colors|spacing|...)(?:\.ident)+` for the given roots.
pub fn token_accessor_pattern(roots: &[String]) -> Result<Option<Regex>, regex::Error> {
    if roots.is_empty() {
        return Ok(None);
    }
    let alternation = roots
        .iter()
        .map(|r| regex::escape(r))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"\b(?:{alternation})(?:\.[A-Za-z_$][\w$]*)+");
    Regex::new(&pattern).map(Some)
}

fn contains_any(source: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| !m.is_empty() && source.contains(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        AnalyzerConfig::default().host_packages
    }

    #[test]
    fn test_dependencies_skip_host_and_relative() {
        let src = r#"
import React, { useState } from 'react';
import { Pressable, View } from "react-native";
import { Check } from 'lucide-react-native';
import * as Haptics from 'expo-haptics';
import { useTheme } from '../theme';
import './styles.css';
import type { Foo } from "@scope/types";
"#;
        let deps = extract_dependencies(src, &hosts());
        let deps: Vec<_> = deps.iter().map(String::as_str).collect();
        assert_eq!(deps, vec!["@scope/types", "expo-haptics", "lucide-react-native"]);
    }

    #[test]
    fn test_dependencies_multiline_and_require() {
        let src = "import {\n  Animated,\n  Easing,\n} from 'react-native-reanimated';\nconst svg = require('react-native-svg');\nexport { Icon } from 'lucide-react-native';\nimport x from 'react-native/Libraries/Utilities';";
        let deps = extract_dependencies(src, &hosts());
        let deps: Vec<_> = deps.iter().map(String::as_str).collect();
        assert_eq!(
            deps,
            vec!["lucide-react-native", "react-native-reanimated", "react-native-svg"]
        );
    }

    #[test]
    fn test_duplicate_imports_collapse() {
        let src = "import { A } from 'pkg';\nimport { B } from 'pkg';";
        assert_eq!(extract_dependencies(src, &hosts()).len(), 1);
    }

    #[test]
    fn test_exports() {
        let src = r#"
export interface ButtonProps { label: string }
export type ButtonVariant = 'solid' | 'outline';
export function Button(props: ButtonProps) {}
export const buttonStyles = {};
export default function IconButton() {}
const internal = 1;
  export const nested = 2;
export { internal };
"#;
        assert_eq!(
            extract_exports(src),
            vec!["ButtonProps", "ButtonVariant", "Button", "buttonStyles", "IconButton"]
        );
    }

    #[test]
    fn test_variants_and_sizes() {
        let src = r#"
export type ButtonVariant = 'solid' | 'outline' | "ghost";
type ButtonSize =
  | 'sm'
  | 'md'
  | 'lg';
type Tone = 'warm' | 'cold';
"#;
        assert_eq!(extract_union_literals(src, "Variant"), vec!["solid", "outline", "ghost"]);
        assert_eq!(extract_union_literals(src, "Size"), vec!["sm", "md", "lg"]);
    }

    #[test]
    fn test_mixed_union_ignored() {
        let src = "type BadgeVariant = 'info' | BaseVariant;\ntype IconSize = number;";
        assert!(extract_union_literals(src, "Variant").is_empty());
        assert!(extract_union_literals(src, "Size").is_empty());
    }

    #[test]
    fn test_token_usage() {
        let re = token_accessor_pattern(&AnalyzerConfig::default().token_roots)
            .unwrap()
            .unwrap();
        let src = "backgroundColor: theme.colors.primary.base,\npadding: spacing.md,\nmycolors.x,\nborderRadius: radii.lg, spacing.md";
        let usage: Vec<_> = extract_token_usage(src, &re).into_iter().collect();
        assert_eq!(usage, vec!["colors.primary.base", "radii.lg", "spacing.md"]);
    }

    #[test]
    fn test_capability_flags() {
        let analyzer = SourceAnalyzer::default();

        let themed = analyzer.analyze("const { colors } = useTheme();");
        assert!(!themed.has_haptics);
        assert!(themed.has_provider);

        let haptic = analyzer.analyze("const haptics = useHaptics();");
        assert!(haptic.has_haptics);
        assert!(haptic.has_provider);

        let plain = analyzer.analyze("export const Divider = () => null;");
        assert!(!plain.has_haptics);
        assert!(!plain.has_provider);
    }

    #[test]
    fn test_empty_source_is_empty_sheet() {
        assert_eq!(SourceAnalyzer::default().analyze(""), FactSheet::default());
    }

    #[test]
    fn test_analyze_deterministic() {
        let src = "import { X } from 'b';\nimport { Y } from 'a';\ntype CardVariant = 'flat' | 'raised';\ncolors.text";
        let analyzer = SourceAnalyzer::default();
        assert_eq!(analyzer.analyze(src), analyzer.analyze(src));
    }

    #[test]
    fn test_empty_token_roots() {
        let analyzer = SourceAnalyzer::new(AnalyzerConfig {
            token_roots: vec![],
            ..AnalyzerConfig::default()
        })
        .unwrap();
        assert!(analyzer.analyze("colors.primary").token_usage.is_empty());
    }
}
