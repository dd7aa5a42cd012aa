//! Directory scoped configuration (`.abt.yml`).
//!
//! The nearest ancestor directory holding the settings file wins. The file holds one mapping per
//! scheme:
//!
//! ```yaml
//! asana:
//!   path: 1201/1305
//! harvest:
//!   path: 27/981
//! ```

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = ".abt.yml";

type Sections = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DirectoryConfig {
    /// Location the values were read from; `None` when nothing was found.
    path: Option<PathBuf>,
    sections: Sections,
}

impl DirectoryConfig {
    /// Walk upward from `start` and load the first settings file. No file means empty config.
    pub fn discover(start: &Path) -> Result<Self> {
        match find(start) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let sections = parse_sections(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), sections = sections.len(), "loaded directory config");
        Ok(Self {
            path: Some(path.to_path_buf()),
            sections,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn unset(&mut self, section: &str, key: &str) {
        if let Some(s) = self.sections.get_mut(section) {
            s.remove(key);
            if s.is_empty() {
                self.sections.remove(section);
            }
        }
    }

    pub fn remove_section(&mut self, section: &str) -> bool {
        self.sections.remove(section).is_some()
    }

    /// Write back to the file it came from, or create one in `fallback_dir`.
    pub fn save(&mut self, fallback_dir: &Path) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| fallback_dir.join(FILE_NAME));
        let yaml = serde_yaml::to_string(&self.sections).context("failed to serialize config")?;
        std::fs::write(&path, yaml)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.path = Some(path.clone());
        Ok(path)
    }
}

/// First `.abt.yml` in `start` or any of its ancestors.
pub fn find(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn parse_sections(raw: &str) -> Result<Sections> {
    if raw.trim().is_empty() {
        return Ok(Sections::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
    let mut sections = Sections::new();

    let root = match value {
        serde_yaml::Value::Null => return Ok(sections),
        serde_yaml::Value::Mapping(m) => m,
        _ => bail!("top level must be a mapping of scheme to settings"),
    };

    for (scheme, settings) in root {
        let Some(scheme) = scalar(&scheme) else {
            bail!("scheme names must be scalars");
        };
        let values = match settings {
            serde_yaml::Value::Null => BTreeMap::new(),
            serde_yaml::Value::Mapping(m) => m
                .iter()
                .filter_map(|(k, v)| Some((scalar(k)?, scalar(v)?)))
                .collect(),
            _ => bail!("settings for '{scheme}' must be a mapping"),
        };
        sections.insert(scheme, values);
    }
    Ok(sections)
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_walks_up_to_nearest_file() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(FILE_NAME), "asana:\n  path: outer\n").unwrap();
        std::fs::write(root.path().join("a").join(FILE_NAME), "asana:\n  path: 12/34\n").unwrap();

        let config = DirectoryConfig::discover(&nested).unwrap();
        assert_eq!(config.get("asana", "path"), Some("12/34"));
        assert_eq!(config.path(), Some(root.path().join("a").join(FILE_NAME).as_path()));
    }

    #[test]
    fn missing_file_is_empty_config() {
        let root = tempfile::tempdir().unwrap();
        let config = DirectoryConfig::discover(root.path()).unwrap();
        assert_eq!(config.path(), None);
        assert_eq!(config.get("asana", "path"), None);
    }

    #[test]
    fn numbers_are_read_as_strings() {
        let sections = parse_sections("harvest:\n  path: 27\n  billable: true\ngit:\n").unwrap();
        assert_eq!(sections["harvest"]["path"], "27");
        assert_eq!(sections["harvest"]["billable"], "true");
        assert!(sections["git"].is_empty());
    }

    #[test]
    fn malformed_layout_is_rejected() {
        assert!(parse_sections("- asana\n- harvest\n").is_err());
        assert!(parse_sections("asana: 12\n").is_err());
        assert!(parse_sections("").unwrap().is_empty());
    }

    #[test]
    fn save_creates_file_in_fallback_dir() {
        let root = tempfile::tempdir().unwrap();
        let mut config = DirectoryConfig::default();
        config.set("devops", "path", "org/project");
        let written = config.save(root.path()).unwrap();
        assert_eq!(written, root.path().join(FILE_NAME));

        let reloaded = DirectoryConfig::load(&written).unwrap();
        assert_eq!(reloaded.get("devops", "path"), Some("org/project"));
    }

    #[test]
    fn unset_drops_empty_sections() {
        let mut config = DirectoryConfig::default();
        config.set("asana", "path", "1");
        config.unset("asana", "path");
        assert!(!config.remove_section("asana"));
    }
}
