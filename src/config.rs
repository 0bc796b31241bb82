//! Engine, layout, and render configuration
//!
//! Every struct has builder-style `with_*` setters and can be loaded from a
//! TOML file where missing keys keep their defaults:
//!
//! ```toml
//! [engine]
//! max_depth = 32
//! default_container = [1024.0, 768.0]
//!
//! [engine.layout]
//! max_iterations = 200
//! exact_fallback = false
//!
//! [svg]
//! indent = false
//! class_prefix = "chart-"
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration of the constraint-solving step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Relaxation passes before giving up
    pub max_iterations: usize,

    /// Tolerance used when checking whether a constraint holds
    pub epsilon: f64,

    /// Retry with the exact Cassowary solver when relaxation does not
    /// converge
    pub exact_fallback: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-6,
            exact_fallback: true,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_exact_fallback(mut self, enabled: bool) -> Self {
        self.exact_fallback = enabled;
        self
    }
}

/// Configuration of an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on spec chains plus nested child resolution
    pub max_depth: usize,

    /// Container size used by `fitToContainer` when nothing better is known
    pub default_container: (f64, f64),

    pub layout: LayoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            default_container: (800.0, 400.0),
            layout: LayoutConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_default_container(mut self, width: f64, height: f64) -> Self {
        self.default_container = (width, height);
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }
}

/// How [`SvgDocument::to_svg_string`](crate::SvgDocument::to_svg_string)
/// lays out its text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SvgConfig {
    /// Emit `<?xml ...?>` before the root
    pub xml_declaration: bool,
    /// One element per line, two spaces per level
    pub indent: bool,
    /// Prepended to each type class, `viz-` gives `viz-rect`
    pub class_prefix: Option<String>,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            xml_declaration: true,
            indent: true,
            class_prefix: Some("viz-".to_string()),
        }
    }
}

impl SvgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single line with bare type classes, for embedding
    pub fn compact() -> Self {
        Self {
            xml_declaration: false,
            indent: false,
            class_prefix: None,
        }
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    pub fn with_indent(mut self, enabled: bool) -> Self {
        self.indent = enabled;
        self
    }

    /// `None` leaves classes as the bare type name
    pub fn with_class_prefix(mut self, prefix: Option<&str>) -> Self {
        self.class_prefix = prefix.map(str::to_string);
        self
    }
}

/// Configuration for the complete spec-to-output pipeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub engine: EngineConfig,
    pub svg: SvgConfig,
}

impl RenderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    pub fn with_svg(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.default_container, (800.0, 400.0));
        assert_eq!(config.layout.max_iterations, 100);
        assert_eq!(config.layout.epsilon, 1e-6);
        assert!(config.layout.exact_fallback);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_max_depth(8)
            .with_default_container(300.0, 200.0)
            .with_layout(LayoutConfig::new().with_max_iterations(10));

        assert_eq!(config.max_depth, 8);
        assert_eq!(config.default_container, (300.0, 200.0));
        assert_eq!(config.layout.max_iterations, 10);
    }

    #[test]
    fn test_svg_presets() {
        assert_eq!(SvgConfig::default().class_prefix.as_deref(), Some("viz-"));
        assert_eq!(
            SvgConfig::compact(),
            SvgConfig::new()
                .with_xml_declaration(false)
                .with_indent(false)
                .with_class_prefix(None)
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RenderConfig::from_toml_str(
            r#"
            [engine]
            max_depth = 12

            [engine.layout]
            exact_fallback = false

            [svg]
            indent = false
            class_prefix = "chart-"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.max_depth, 12);
        assert_eq!(config.engine.default_container, (800.0, 400.0));
        assert!(!config.engine.layout.exact_fallback);
        assert_eq!(config.engine.layout.max_iterations, 100);
        assert!(!config.svg.indent);
        assert!(config.svg.xml_declaration);
        assert_eq!(config.svg.class_prefix.as_deref(), Some("chart-"));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let err = RenderConfig::from_toml_str("max_depth = [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
