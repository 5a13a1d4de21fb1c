use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::mission::{MissionKind, MissionOutcome};
use crate::tuning::RewardTuning;

pub const PROGRESS_VERSION: u32 = 1;
pub const MAX_ENERGY: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProgress {
    pub level: u32,
    pub exp: u64,
    pub energy: u32,
}

impl Default for CharacterProgress {
    fn default() -> Self {
        Self {
            level: 1,
            exp: 0,
            energy: MAX_ENERGY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub mission_id: String,
    pub kind: MissionKind,
    pub character_id: String,
    pub destination: String,
    pub money: u64,
    pub exp: u64,
    pub landing_attempts: u32,
    pub summoned: Vec<String>,
}

/// Player-wide stats that outlive a single mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub version: u32,
    pub money: u64,
    pub exp: u64,
    pub characters: BTreeMap<String, CharacterProgress>,
    pub history: Vec<MissionRecord>,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            version: PROGRESS_VERSION,
            money: 0,
            exp: 0,
            characters: BTreeMap::new(),
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub character_id: String,
    pub level: u32,
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("failed to encode progress: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode progress at {json_path}: {message}")]
    Decode { json_path: String, message: String },
    #[error("unsupported progress version {found}; expected {expected}")]
    Version { expected: u32, found: u32 },
    #[error("failed to read progress file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write progress file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PlayerProgress {
    pub fn serialize(&self) -> Result<Value, ProgressError> {
        serde_json::to_value(self).map_err(ProgressError::Encode)
    }

    pub fn deserialize(value: Value) -> Result<Self, ProgressError> {
        let progress: PlayerProgress =
            serde_path_to_error::deserialize(value).map_err(|error| ProgressError::Decode {
                json_path: error.path().to_string(),
                message: error.into_inner().to_string(),
            })?;
        if progress.version != PROGRESS_VERSION {
            return Err(ProgressError::Version {
                expected: PROGRESS_VERSION,
                found: progress.version,
            });
        }
        Ok(progress)
    }

    pub fn character(&self, character_id: &str) -> Option<&CharacterProgress> {
        self.characters.get(character_id)
    }

    /// Banks mission rewards, spends energy for every character that flew and
    /// reports any level gained.
    pub fn apply_outcome(&mut self, outcome: &MissionOutcome, tuning: &RewardTuning) -> Vec<LevelUp> {
        self.money = self.money.saturating_add(outcome.rewards.money);
        self.exp = self.exp.saturating_add(outcome.rewards.exp);

        let exp_per_level = tuning.exp_per_level.max(1);
        let mut level_ups = Vec::new();
        let flown = std::iter::once(&outcome.character_id).chain(outcome.summoned.iter());
        for (index, character_id) in flown.enumerate() {
            let entry = self.characters.entry(character_id.clone()).or_default();
            entry.energy = entry.energy.saturating_sub(tuning.energy_cost);
            if index != 0 {
                continue;
            }
            entry.exp = entry.exp.saturating_add(outcome.rewards.exp);
            let level = u32::try_from(1 + entry.exp / exp_per_level).unwrap_or(u32::MAX);
            if level > entry.level {
                entry.level = level;
                level_ups.push(LevelUp {
                    character_id: character_id.clone(),
                    level,
                });
            }
        }

        self.history.push(MissionRecord {
            mission_id: outcome.mission_id.clone(),
            kind: outcome.kind,
            character_id: outcome.character_id.clone(),
            destination: outcome.destination.clone(),
            money: outcome.rewards.money,
            exp: outcome.rewards.exp,
            landing_attempts: outcome.landing_attempts,
            summoned: outcome.summoned.clone(),
        });
        level_ups
    }

    /// Loads saved progress; a missing file starts a fresh profile.
    pub fn load_from_file(path: &Path) -> Result<Self, ProgressError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ProgressError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let value: Value = serde_json::from_str(&raw).map_err(|error| ProgressError::Decode {
            json_path: ".".to_string(),
            message: error.to_string(),
        })?;
        Self::deserialize(value)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ProgressError> {
        let json = serde_json::to_string_pretty(&self.serialize()?).map_err(ProgressError::Encode)?;
        write_atomic(path, json.as_bytes()).map_err(|source| ProgressError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), missions = self.history.len(), "progress_saved");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("progress.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, bytes)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::sim::Rewards;

    fn outcome(exp: u64) -> MissionOutcome {
        MissionOutcome {
            mission_id: "m1".to_string(),
            kind: MissionKind::Delivery,
            character_id: "jett".to_string(),
            destination: "paris".to_string(),
            phases: Vec::new(),
            landing_attempts: 2,
            summoned: vec!["donnie".to_string()],
            rewards: Rewards { money: 250, exp },
        }
    }

    #[test]
    fn outcome_banks_rewards_and_spends_energy() {
        let mut progress = PlayerProgress::default();
        let level_ups = progress.apply_outcome(&outcome(40), &RewardTuning::default());

        assert!(level_ups.is_empty());
        assert_eq!(progress.money, 250);
        assert_eq!(progress.character("jett").expect("jett").energy, 80);
        assert_eq!(progress.character("donnie").expect("donnie").energy, 80);
        assert_eq!(progress.character("donnie").expect("donnie").exp, 0);
        assert_eq!(progress.history.len(), 1);
        assert_eq!(progress.history[0].landing_attempts, 2);
    }

    #[test]
    fn levels_every_hundred_exp() {
        let mut progress = PlayerProgress::default();
        let tuning = RewardTuning::default();
        progress.apply_outcome(&outcome(60), &tuning);
        let level_ups = progress.apply_outcome(&outcome(60), &tuning);

        assert_eq!(
            level_ups,
            vec![LevelUp {
                character_id: "jett".to_string(),
                level: 2
            }]
        );
        assert_eq!(progress.character("jett").expect("jett").level, 2);
    }

    #[test]
    fn plain_value_round_trip() {
        let mut progress = PlayerProgress::default();
        progress.apply_outcome(&outcome(10), &RewardTuning::default());

        let value = progress.serialize().expect("serialize");
        assert_eq!(value["characters"]["jett"]["energy"], json!(80));
        assert_eq!(PlayerProgress::deserialize(value).expect("deserialize"), progress);
    }

    #[test]
    fn decode_error_reports_json_path() {
        let mut value = PlayerProgress::default().serialize().expect("serialize");
        value["money"] = json!("lots");
        let err = PlayerProgress::deserialize(value).expect_err("bad money");
        assert!(matches!(err, ProgressError::Decode { json_path, .. } if json_path == "money"));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut value = PlayerProgress::default().serialize().expect("serialize");
        value["version"] = json!(PROGRESS_VERSION + 1);
        assert!(matches!(
            PlayerProgress::deserialize(value),
            Err(ProgressError::Version { .. })
        ));
    }

    #[test]
    fn file_save_is_atomic_and_reloadable() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("saves").join("progress.json");
        assert_eq!(
            PlayerProgress::load_from_file(&path).expect("fresh"),
            PlayerProgress::default()
        );

        let mut progress = PlayerProgress::default();
        progress.apply_outcome(&outcome(10), &RewardTuning::default());
        progress.save_to_file(&path).expect("save");

        assert!(!path.with_file_name("progress.json.tmp").exists());
        assert_eq!(PlayerProgress::load_from_file(&path).expect("load"), progress);
    }
}
