//! Parser configuration.
//!
//! ```toml
//! short_tags = true
//! asp_tags = false
//! extensions = ["php", "phtml"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lexer::LexerOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// `<?` opens a PHP section.
    pub short_tags: bool,
    /// `<%` and `<%=` open a PHP section, `%>` closes it.
    pub asp_tags: bool,
    /// File extensions (without the dot) handed to the parser.
    pub extensions: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            short_tags: false,
            asp_tags: false,
            extensions: vec!["php".to_string(), "phtml".to_string(), "inc".to_string()],
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn lexer_options(&self) -> LexerOptions {
        LexerOptions { short_tags: self.short_tags, asp_tags: self.asp_tags }
    }

    /// Case-insensitive match against the registered extensions.
    pub fn is_registered(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ParserConfig::from_toml_str("short_tags = true").unwrap();
        assert!(config.short_tags);
        assert!(!config.asp_tags);
        assert_eq!(config.extensions, ParserConfig::default().extensions);
    }

    #[test]
    fn extensions_match_case_insensitively() {
        let config = ParserConfig::from_toml_str(r#"extensions = ["php"]"#).unwrap();
        assert!(config.is_registered("PHP"));
        assert!(!config.is_registered("phtml"));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = ParserConfig::from_toml_str("short_tags = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
