//! Learned-Skill Store
//!
//! Durable source of truth for skills taught at runtime. One JSON file,
//! a map keyed by skill name, read fully at startup and rewritten in
//! full on each successful learn. Writes go to a sibling temp file that
//! is atomically renamed over the store, so a crash mid-write never
//! corrupts prior entries.

use crate::skills::template::{CommandTemplate, TemplateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persisted form of one learned terminal skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedSkillRecord {
    pub name: String,
    pub description: String,
    pub shell_command_template: String,
    pub template_parameters: Vec<String>,
    pub learned_at: DateTime<Utc>,
}

impl LearnedSkillRecord {
    /// Re-check the placeholder invariant. Stored records are untrusted:
    /// the file may have been edited by hand.
    pub fn validate(&self) -> Result<(), TemplateError> {
        CommandTemplate::new(&self.shell_command_template)
            .validate_parameters(&self.template_parameters)
    }
}

/// Store I/O failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read learned-skill store at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("learned-skill store at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write learned-skill store at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Record-oriented file of learned skills, keyed by skill name.
#[derive(Debug, Clone)]
pub struct LearnedSkillStore {
    path: PathBuf,
}

impl LearnedSkillStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. A missing file is an empty store.
    pub fn load_all(&self) -> Result<Vec<LearnedSkillRecord>, StoreError> {
        let map = self.read_map()?;
        Ok(map.into_values().collect())
    }

    /// Whether a record with this name is already persisted.
    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.read_map()?.contains_key(name))
    }

    /// Insert or replace the record with the same name, atomically.
    pub fn upsert(&self, record: &LearnedSkillRecord) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(record.name.clone(), record.clone());
        self.write_map(&map)
    }

    fn read_map(&self) -> Result<BTreeMap<String, LearnedSkillRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write_map(&self, map: &BTreeMap<String, LearnedSkillRecord>) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        // serde_json serialization of an in-memory map cannot fail here;
        // treat it as an I/O-class error if it somehow does.
        let json = serde_json::to_string_pretty(map).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), records = map.len(), "rewrote learned-skill store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, template: &str, params: &[&str]) -> LearnedSkillRecord {
        LearnedSkillRecord {
            name: name.to_string(),
            description: format!("{name} does things"),
            shell_command_template: template.to_string(),
            template_parameters: params.iter().map(|s| s.to_string()).collect(),
            learned_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = LearnedSkillStore::new(dir.path().join("skills.json"));
        assert!(store.load_all().unwrap().is_empty());
        assert!(!store.contains("anything").unwrap());
    }

    #[test]
    fn upsert_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = LearnedSkillStore::new(dir.path().join("skills.json"));

        store
            .upsert(&record("make_folder", "mkdir /tmp/{{folder}}", &["folder"]))
            .unwrap();
        store
            .upsert(&record("say_hi", "echo hi", &[]))
            .unwrap();

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 2);
        // BTreeMap keying sorts by name.
        assert_eq!(records[0].name, "make_folder");
        assert_eq!(records[1].name, "say_hi");
        assert!(store.contains("say_hi").unwrap());
    }

    #[test]
    fn upsert_overwrites_by_name() {
        let dir = TempDir::new().unwrap();
        let store = LearnedSkillStore::new(dir.path().join("skills.json"));

        store
            .upsert(&record("greet", "echo hello", &[]))
            .unwrap();
        store
            .upsert(&record("greet", "echo goodbye", &[]))
            .unwrap();

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].shell_command_template, "echo goodbye");
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skills.json");
        std::fs::write(&path, "not json {").unwrap();

        let store = LearnedSkillStore::new(&path);
        assert!(matches!(store.load_all(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = LearnedSkillStore::new(dir.path().join("skills.json"));
        store.upsert(&record("greet", "echo hello", &[])).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["skills.json".to_string()]);
    }

    #[test]
    fn record_validation_catches_mismatch() {
        let bad = record("broken", "echo {{a}} {{b}}", &["a"]);
        assert!(bad.validate().is_err());
        let good = record("fine", "echo {{a}}", &["a"]);
        assert!(good.validate().is_ok());
    }
}
