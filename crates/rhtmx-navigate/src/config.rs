// File: src/config.rs
// Purpose: Router options, parsed from the [router] table of rhtmx.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Navigation substrate strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Addresses live in the fragment: `#!/users/1?tab=posts`
    #[default]
    Hash,
    /// Addresses are plain paths: `/users/1?tab=posts`
    Path,
}

/// Router configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Case-insensitive path matching (default: false)
    #[serde(default = "default_false")]
    pub ignore_case: bool,

    /// When false, a trailing `/` is ignored during matching (default: false)
    #[serde(default = "default_false")]
    pub strict: bool,

    /// Separator placed after `#` in hash mode, e.g. "!" for hashbang URLs
    #[serde(default)]
    pub split: String,

    /// Substrate strategy (default: hash)
    #[serde(default)]
    pub mode: Mode,

    /// Maximum consecutive redirect hops before the chain is abandoned
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

/// Wrapper used to pull `[router]` out of a full rhtmx.toml
#[derive(Debug, Deserialize, Default)]
struct RouterSection {
    #[serde(default)]
    router: RouterOptions,
}

fn default_false() -> bool {
    false
}

fn default_max_redirects() -> usize {
    25
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            strict: false,
            split: String::new(),
            mode: Mode::default(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl RouterOptions {
    /// Load options from a standalone TOML file
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match read_optional(path)? {
            Some(content) => Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse router options: {:?}", path)),
            None => Ok(Self::default()),
        }
    }

    /// Load options from the `[router]` table of an application config file
    pub fn load_section(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let Some(content) = read_optional(path)? else {
            return Ok(Self::default());
        };

        let section: RouterSection = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(section.router)
    }

    /// Parse options from an in-memory TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: RouterOptions =
            toml::from_str(content).context("Invalid router options")?;
        Ok(options)
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    if content.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(content))
}
