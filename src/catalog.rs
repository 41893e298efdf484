//! Catalog - Static Classification Tables
//!
//! Name → category, name → description and irregular display names. The
//! synthesizer only ever sees these through a `Catalog` value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Inputs,
    Display,
    Feedback,
    Layout,
    Navigation,
    Overlay,
    Typography,
    Media,
    /// Fallback for names missing from the table
    #[default]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Inputs => "inputs",
            Category::Display => "display",
            Category::Feedback => "feedback",
            Category::Layout => "layout",
            Category::Navigation => "navigation",
            Category::Overlay => "overlay",
            Category::Typography => "typography",
            Category::Media => "media",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalog {
    pub categories: BTreeMap<String, Category>,
    pub descriptions: BTreeMap<String, String>,
    /// Names whose display form is not plain PascalCase
    pub display_names: BTreeMap<String, String>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
            descriptions: BTreeMap::new(),
            display_names: BTreeMap::new(),
        }
    }

    pub fn category(&self, name: &str) -> Category {
        self.categories.get(name).copied().unwrap_or_default()
    }

    /// Table description, or `"<DisplayName> <noun>"` when the name is unknown.
    pub fn description(&self, name: &str, noun: &str) -> String {
        match self.descriptions.get(name) {
            Some(d) => d.clone(),
            None => format!("{} {}", self.display_name(name), noun),
        }
    }

    /// PascalCase of the kebab segments. `radii` is the one irregular
    /// plural in the built-in table and displays as `Radius`.
    pub fn display_name(&self, name: &str) -> String {
        if let Some(irregular) = self.display_names.get(name) {
            return irregular.clone();
        }
        name.split(['-', '_'])
            .filter(|s| !s.is_empty())
            .map(capitalize)
            .collect()
    }
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Default for Catalog {
    fn default() -> Self {
        use Category::*;

        let categories = [
            ("button", Inputs),
            ("icon-button", Inputs),
            ("input", Inputs),
            ("text-area", Inputs),
            ("checkbox", Inputs),
            ("radio", Inputs),
            ("switch", Inputs),
            ("slider", Inputs),
            ("select", Inputs),
            ("chip", Inputs),
            ("card", Display),
            ("badge", Display),
            ("avatar", Display),
            ("list-item", Display),
            ("divider", Layout),
            ("stack", Layout),
            ("container", Layout),
            ("spacer", Layout),
            ("alert", Feedback),
            ("toast", Feedback),
            ("progress", Feedback),
            ("spinner", Feedback),
            ("skeleton", Feedback),
            ("tabs", Navigation),
            ("header", Navigation),
            ("link", Navigation),
            ("modal", Overlay),
            ("sheet", Overlay),
            ("popover", Overlay),
            ("tooltip", Overlay),
            ("text", Typography),
            ("heading", Typography),
            ("image", Media),
            ("icon", Media),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let descriptions = [
            ("button", "Pressable button with variants, sizes and haptic feedback"),
            ("icon-button", "Compact button that renders a single icon"),
            ("input", "Single-line text field with label and error states"),
            ("text-area", "Multi-line text field"),
            ("checkbox", "Binary selection control"),
            ("radio", "Exclusive selection within a group"),
            ("switch", "Animated on/off toggle"),
            ("slider", "Continuous range selector"),
            ("select", "Dropdown picker for a list of options"),
            ("chip", "Selectable or dismissible tag"),
            ("card", "Surface container for grouped content"),
            ("badge", "Small status or count indicator"),
            ("avatar", "User image with initials fallback"),
            ("list-item", "Row with leading, content and trailing slots"),
            ("divider", "Horizontal or vertical separator"),
            ("stack", "Flex container with consistent spacing"),
            ("alert", "Inline message for important information"),
            ("toast", "Transient notification"),
            ("progress", "Determinate progress bar"),
            ("spinner", "Indeterminate activity indicator"),
            ("skeleton", "Loading placeholder"),
            ("tabs", "Tabbed navigation between views"),
            ("modal", "Dialog rendered above the current screen"),
            ("sheet", "Bottom sheet with drag gestures"),
            ("tooltip", "Contextual hint on long press"),
            ("text", "Themed text with typography variants"),
            ("theme", "Theme context with light and dark color schemes"),
            ("haptics", "Haptic feedback context and hooks"),
            ("colors", "Color palette tokens"),
            ("spacing", "Spacing scale tokens"),
            ("radii", "Corner radius tokens"),
            ("typography", "Font family, size and weight tokens"),
            ("shadows", "Elevation shadow tokens"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let display_names = [("radii", "Radius")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self { categories, descriptions, display_names }
    }
}
