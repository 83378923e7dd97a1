//! Configuration handling for strutsmig.
//!
//! Settings live in `strutsmig.toml` at the workspace root. Every field has a
//! default, so a missing file or an empty table is valid:
//!
//! ```toml
//! [recipes]
//! static_method_access = true
//! dynamic_method_invocation = true
//! date_tag_format = true
//!
//! [files]
//! include = ["src/main/**"]
//! exclude = ["**/generated/**"]
//!
//! [routing]
//! file_patterns = ["struts"]
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, DocumentKind};

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = "strutsmig.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown recipe '{name}' (expected one of: static-method-access, dynamic-method-invocation, date-tag-format)")]
    UnknownRecipe { name: String },
}

// ============================================================================
// Recipes
// ============================================================================

/// A migration step that can be switched on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recipe {
    /// Wrapper synthesis plus expression rewriting.
    StaticMethodAccess,
    /// Flag flip plus action splitting.
    DynamicMethodInvocation,
    DateTagFormat,
}

impl Recipe {
    pub const ALL: [Recipe; 3] = [
        Recipe::StaticMethodAccess,
        Recipe::DynamicMethodInvocation,
        Recipe::DateTagFormat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recipe::StaticMethodAccess => "static-method-access",
            Recipe::DynamicMethodInvocation => "dynamic-method-invocation",
            Recipe::DateTagFormat => "date-tag-format",
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Recipe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-");
        Recipe::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownRecipe {
                name: s.to_string(),
            })
    }
}

/// Which recipes run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipesConfig {
    #[serde(default = "default_enabled")]
    pub static_method_access: bool,

    #[serde(default = "default_enabled")]
    pub dynamic_method_invocation: bool,

    #[serde(default = "default_enabled")]
    pub date_tag_format: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            static_method_access: default_enabled(),
            dynamic_method_invocation: default_enabled(),
            date_tag_format: default_enabled(),
        }
    }
}

impl RecipesConfig {
    /// Only the listed recipes enabled.
    pub fn only(recipes: &[Recipe]) -> Self {
        Self {
            static_method_access: recipes.contains(&Recipe::StaticMethodAccess),
            dynamic_method_invocation: recipes.contains(&Recipe::DynamicMethodInvocation),
            date_tag_format: recipes.contains(&Recipe::DateTagFormat),
        }
    }

    pub fn is_enabled(&self, recipe: Recipe) -> bool {
        match recipe {
            Recipe::StaticMethodAccess => self.static_method_access,
            Recipe::DynamicMethodInvocation => self.dynamic_method_invocation,
            Recipe::DateTagFormat => self.date_tag_format,
        }
    }

    /// Enabled recipes in declaration order.
    pub fn enabled(&self) -> Vec<Recipe> {
        Recipe::ALL
            .into_iter()
            .filter(|r| self.is_enabled(*r))
            .collect()
    }
}

// ============================================================================
// Files and Routing
// ============================================================================

/// Glob filters over workspace-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// When non-empty, only matching files are loaded.
    #[serde(default)]
    pub include: Vec<String>,

    /// Excluded in addition to the built-in exclusions.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// How routing documents are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Path substrings marking a routing document.
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
}

fn default_file_patterns() -> Vec<String> {
    vec!["struts".to_string()]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            file_patterns: default_file_patterns(),
        }
    }
}

impl RoutingConfig {
    /// Whether `document` maps actions to views.
    ///
    /// Only configuration documents with a tree qualify. One rooted at
    /// `<struts>` always does; otherwise the path must contain one of the
    /// configured patterns.
    pub fn is_routing(&self, document: &Document) -> bool {
        if document.kind != DocumentKind::Config {
            return false;
        }
        let Some(tree) = document.tree() else {
            return false;
        };
        if tree.root().is_some_and(|root| root.name == "struts") {
            return true;
        }
        self.file_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && document.path.contains(pattern.as_str()))
    }
}

// ============================================================================
// Migration Config
// ============================================================================

/// Full strutsmig configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub recipes: RecipesConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub routing: RoutingConfig,
}

impl MigrationConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse configuration text; `path` is only used in errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `strutsmig.toml` from the workspace root, or defaults when absent.
    pub fn load_from_workspace(workspace_root: &Path) -> Result<Self, ConfigError> {
        let config_path = workspace_root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading configuration");
            Self::load(&config_path)
        } else {
            Ok(MigrationConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let config = MigrationConfig::default();
        assert_eq!(config.recipes.enabled(), Recipe::ALL.to_vec());
        assert!(config.files.include.is_empty());
        assert_eq!(config.routing.file_patterns, vec!["struts"]);
    }

    #[test]
    fn empty_file_is_defaults() {
        let config = MigrationConfig::parse("", Path::new(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, MigrationConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = MigrationConfig::parse(
            "[recipes]\ndate_tag_format = false\n\n[files]\nexclude = [\"**/gen/**\"]\n",
            Path::new(CONFIG_FILE_NAME),
        )
        .unwrap();
        assert!(config.recipes.static_method_access);
        assert!(!config.recipes.date_tag_format);
        assert_eq!(config.files.exclude, vec!["**/gen/**"]);
        assert_eq!(config.routing, RoutingConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = MigrationConfig::parse("[recipes\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse x.toml"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MigrationConfig::load_from_workspace(dir.path()).unwrap();
        assert_eq!(config, MigrationConfig::default());
    }

    #[test]
    fn file_in_workspace_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[routing]\nfile_patterns = [\"routes\"]\n",
        )
        .unwrap();
        let config = MigrationConfig::load_from_workspace(dir.path()).unwrap();
        assert_eq!(config.routing.file_patterns, vec!["routes"]);
    }

    #[test]
    fn recipe_names() {
        assert_eq!("date-tag-format".parse::<Recipe>().unwrap(), Recipe::DateTagFormat);
        assert_eq!(
            "static_method_access".parse::<Recipe>().unwrap(),
            Recipe::StaticMethodAccess
        );
        assert!(matches!(
            "tiles".parse::<Recipe>(),
            Err(ConfigError::UnknownRecipe { .. })
        ));
        let only = RecipesConfig::only(&[Recipe::DateTagFormat]);
        assert_eq!(only.enabled(), vec![Recipe::DateTagFormat]);
    }

    #[test]
    fn routing_detection() {
        let routing = RoutingConfig::default();
        let (by_root, _) = Document::load("conf/app.xml", "<struts><package/></struts>");
        let (by_path, _) = Document::load("conf/struts-admin.xml", "<config/>");
        let (neither, _) = Document::load("conf/web.xml", "<web-app/>");
        let (text, _) = Document::load("src/struts/A.java", "class A {}");
        assert!(routing.is_routing(&by_root));
        assert!(routing.is_routing(&by_path));
        assert!(!routing.is_routing(&neither));
        assert!(!routing.is_routing(&text));
    }

    #[test]
    fn markup_is_never_routing() {
        let routing = RoutingConfig::default();
        let (view, _) = Document::load("web/struts/list.jsp", "<p>${items}</p>");
        let (rooted, _) = Document::load("web/page.jsp", "<struts><package/></struts>");
        assert!(view.tree().is_some());
        assert!(!routing.is_routing(&view));
        assert!(!routing.is_routing(&rooted));
    }
}
