//! User configuration at `~/.kubeve/config.yaml`.
//!
//! The file nests everything under a root `config:` key:
//!
//! ```yaml
//! config:
//!   flags:
//!     disableLogo: false
//!     includeHistory: false
//!   theme:
//!     name: ocean
//!     backgroundColor: "#021b2f"
//!     textColor: "#d6f0ff"
//!   drilldown:
//!     timeoutSecs: 8
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "KUBEVE_CONFIG";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Flags {
    pub disable_logo: bool,
    /// Show the events returned by the initial listing, not only new ones.
    pub include_history: bool,
}

/// Fields missing from the file stay empty so `resolve_theme` can tell a
/// partial theme apart from the default one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub text_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        let (name, background, text) = THEME_PRESETS[0];
        Self::preset(name, background, text)
    }
}

impl Theme {
    fn preset(name: &str, background: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            background_color: background.to_string(),
            text_color: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrilldownConfig {
    /// Per-call deadline for drill-down requests.
    pub timeout_secs: u64,
}

impl Default for DrilldownConfig {
    fn default() -> Self {
        Self { timeout_secs: 8 }
    }
}

impl DrilldownConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub flags: Flags,
    pub theme: Theme,
    pub drilldown: DrilldownConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    config: Config,
}

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

const THEME_PRESETS: [(&str, &str, &str); 10] = [
    ("midnight", "#000000", "#ffffff"),
    ("ocean", "#021b2f", "#d6f0ff"),
    ("forest", "#0f1a12", "#d7f3d8"),
    ("sunset", "#2b1510", "#ffe3d6"),
    ("solarized-dark", "#002b36", "#93a1a1"),
    ("solarized-light", "#fdf6e3", "#586e75"),
    ("mono-light", "#f5f5f5", "#1f1f1f"),
    ("terminal-green", "#001100", "#66ff66"),
    ("cobalt", "#0b1f3a", "#dbe8ff"),
    ("ember", "#1b0f0a", "#ffd3b6"),
];

/// All built-in themes, in display order.
#[must_use]
pub fn themes() -> Vec<Theme> {
    THEME_PRESETS
        .iter()
        .map(|(name, background, text)| Theme::preset(name, background, text))
        .collect()
}

#[must_use]
pub fn theme_names() -> Vec<&'static str> {
    THEME_PRESETS.iter().map(|(name, _, _)| *name).collect()
}

/// Built-in theme by case-insensitive name.
#[must_use]
pub fn theme_by_name(name: &str) -> Option<Theme> {
    let query = name.trim();
    if query.is_empty() {
        return None;
    }
    THEME_PRESETS
        .iter()
        .find(|(preset, _, _)| preset.eq_ignore_ascii_case(query))
        .map(|(name, background, text)| Theme::preset(name, background, text))
}

fn theme_name_by_colors(background: &str, text: &str) -> Option<&'static str> {
    let background = background.trim();
    let text = text.trim();
    THEME_PRESETS
        .iter()
        .find(|(_, bg, fg)| bg.eq_ignore_ascii_case(background) && fg.eq_ignore_ascii_case(text))
        .map(|(name, _, _)| *name)
}

/// Normalizes a configured theme. A known preset name wins outright; an
/// unknown name is dropped, missing colors fall back to the default theme,
/// and colors that equal a preset pick up that preset's name.
#[must_use]
pub fn resolve_theme(theme: &Theme) -> Theme {
    if let Some(preset) = theme_by_name(&theme.name) {
        return preset;
    }
    let fallback = Theme::default();
    let mut resolved = Theme {
        name: String::new(),
        background_color: theme.background_color.clone(),
        text_color: theme.text_color.clone(),
    };
    if resolved.background_color.is_empty() {
        resolved.background_color = fallback.background_color;
    }
    if resolved.text_color.is_empty() {
        resolved.text_color = fallback.text_color;
    }
    if let Some(name) = theme_name_by_colors(&resolved.background_color, &resolved.text_color) {
        resolved.name = name.to_string();
    }
    resolved
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Config file location: `$KUBEVE_CONFIG`, else `~/.kubeve/config.yaml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".kubeve").join("config.yaml"))
}

/// Reads `path`. A missing or empty file yields the defaults.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    let parsed: FileConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parsed.config;
    config.theme = resolve_theme(&config.theme);
    Ok(config)
}

/// Loads the user config, falling back to defaults on any failure.
#[must_use]
pub fn load() -> Config {
    let result = config_path().and_then(|path| load_from(&path));
    match result {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "using default configuration");
            Config::default()
        }
    }
}

/// Writes `config` to `path`, creating parent directories.
pub fn save_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let mut normalized = config.clone();
    normalized.theme = resolve_theme(&normalized.theme);
    let text = serde_yaml::to_string(&FileConfig { config: normalized })
        .map_err(ConfigError::Serialize)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `config` to the default location and returns that path.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    save_to(&path, config)?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{
        load_from, resolve_theme, save_to, theme_by_name, theme_names, themes, Config, Theme,
    };

    #[test]
    fn defaults_match_midnight_theme() {
        let cfg = Config::default();
        assert!(!cfg.flags.disable_logo);
        assert!(!cfg.flags.include_history);
        assert_eq!(cfg.theme.name, "midnight");
        assert_eq!(cfg.theme.background_color, "#000000");
        assert_eq!(cfg.theme.text_color, "#ffffff");
        assert_eq!(cfg.drilldown.timeout_secs, 8);
    }

    #[test]
    fn ten_builtin_themes() {
        assert_eq!(themes().len(), 10);
        assert_eq!(theme_names()[5], "solarized-light");
        assert_eq!(
            theme_by_name(" OCEAN ").map(|t| t.background_color),
            Some("#021b2f".to_string())
        );
        assert!(theme_by_name("").is_none());
        assert!(theme_by_name("neon").is_none());
    }

    #[test]
    fn resolve_prefers_preset_name() {
        let theme = Theme {
            name: "ember".into(),
            background_color: "#123456".into(),
            text_color: String::new(),
        };
        let resolved = resolve_theme(&theme);
        assert_eq!(resolved, theme_by_name("ember").unwrap());
    }

    #[test]
    fn resolve_fills_missing_colors_and_names_matching_preset() {
        let theme = Theme {
            name: "unknown".into(),
            background_color: "#021B2F".into(),
            text_color: "#d6f0ff".into(),
        };
        assert_eq!(resolve_theme(&theme).name, "ocean");

        let partial = Theme {
            name: String::new(),
            background_color: "#111111".into(),
            text_color: String::new(),
        };
        let resolved = resolve_theme(&partial);
        assert_eq!(resolved.name, "");
        assert_eq!(resolved.background_color, "#111111");
        assert_eq!(resolved.text_color, "#ffffff");
    }

    #[test]
    fn missing_and_empty_files_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert_eq!(load_from(&missing).unwrap(), Config::default());

        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "\n").unwrap();
        assert_eq!(load_from(&empty).unwrap(), Config::default());
    }

    #[test]
    fn parses_camel_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "config:\n  flags:\n    disableLogo: true\n  theme:\n    backgroundColor: \"#fdf6e3\"\n    textColor: \"#586e75\"\n",
        )
        .unwrap();
        let cfg = load_from(&path).unwrap();
        assert!(cfg.flags.disable_logo);
        assert_eq!(cfg.theme.name, "solarized-light");
        assert_eq!(cfg.drilldown.timeout_secs, 8);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "config: [unterminated").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("parse config"));
    }

    #[test]
    fn save_then_load_keeps_theme_choice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut cfg = Config::default();
        cfg.theme = theme_by_name("cobalt").unwrap();
        cfg.flags.include_history = true;
        save_to(&path, &cfg).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("config:"));
        assert!(text.contains("backgroundColor:"));
        assert!(text.contains("#0b1f3a"));
        assert_eq!(load_from(&path).unwrap(), cfg);
    }
}
