//! Settings file discovery, loading and command-line overrides.

use anyhow::{Context, Result};
use shared::settings::{AppSettings, ResearchSettings};
use std::fs;
use std::path::{Path, PathBuf};

/// `settings.json` in the platform config directory.
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Deep Research", "DeepResearch")
        .map(|proj| proj.config_dir().join("settings.json"))
}

/// Load settings from `path`, falling back to defaults when the file is
/// missing or does not parse.
pub fn load_settings_or_default(path: Option<&Path>) -> AppSettings {
    let Some(path) = path else {
        return AppSettings::default();
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return AppSettings::default();
    }
    match read_settings(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "ignoring settings file");
            AppSettings::default()
        }
    }
}

fn read_settings(path: &Path) -> Result<AppSettings> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let bytes = serde_json::to_vec_pretty(settings)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Values given on the command line; `None` keeps the loaded setting.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub breadth: Option<usize>,
    pub depth: Option<usize>,
    pub model: Option<String>,
    pub concurrency: Option<usize>,
    pub language: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut ResearchSettings) {
        if let Some(breadth) = self.breadth {
            settings.breadth = breadth;
        }
        if let Some(depth) = self.depth {
            settings.depth = depth;
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(language) = &self.language {
            settings.language = language.clone();
        }
    }
}

/// Resolve the settings for this invocation and validate them.
pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<AppSettings> {
    let path = explicit.map(Path::to_path_buf).or_else(config_path);
    let mut settings = load_settings_or_default(path.as_deref());
    overrides.apply(&mut settings.research);
    settings.research.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_or_default(Some(&dir.path().join("nope.json")));
        assert_eq!(settings.research.breadth, 2);
        assert_eq!(settings.research.model, "gpt-4o-mini");
    }

    #[test]
    fn test_unparseable_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings_or_default(Some(&path)).research.depth, 2);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = AppSettings::default();
        settings.research.breadth = 6;
        settings.providers.firecrawl_base_url = Some("http://localhost:3002".into());

        save_settings(&path, &settings).unwrap();
        let loaded = load_settings_or_default(Some(&path));
        assert_eq!(loaded.research.breadth, 6);
        assert_eq!(
            loaded.providers.firecrawl_base_url.as_deref(),
            Some("http://localhost:3002")
        );
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"research": {"breadth": 3, "model": "gpt-4o"}}"#).unwrap();

        let overrides = Overrides {
            depth: Some(4),
            model: Some("o3-mini".into()),
            ..Overrides::default()
        };
        let settings = resolve(Some(&path), &overrides).unwrap();
        assert_eq!(settings.research.breadth, 3);
        assert_eq!(settings.research.depth, 4);
        assert_eq!(settings.research.model, "o3-mini");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            concurrency: Some(0),
            ..Overrides::default()
        };
        let err = resolve(Some(&dir.path().join("none.json")), &overrides).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }
}
