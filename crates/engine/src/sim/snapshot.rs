use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::math::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub money: u64,
    pub exp: u64,
}

impl Rewards {
    pub fn add(&mut self, other: Rewards) {
        self.money = self.money.saturating_add(other.money);
        self.exp = self.exp.saturating_add(other.exp);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub character_id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub actors: Vec<ActorState>,
    pub controlled_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcState {
    pub id: String,
    pub position: Vec2,
    pub dialogue_index: u32,
    pub quest_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
    pub id: String,
    pub item_type: String,
    pub position: Vec2,
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ObjectiveTarget {
    Npc(String),
    Item(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestObjective {
    pub target: ObjectiveTarget,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestState {
    pub quest_id: String,
    pub objectives: Vec<QuestObjective>,
    pub completed: bool,
    pub reward: Rewards,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueState {
    pub open: bool,
    pub npc_id: Option<String>,
    pub node: u32,
}

/// Everything needed to resume an exploration scene exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub actor_state: ActorSnapshot,
    pub camera: CameraState,
    pub npcs: Vec<NpcState>,
    pub items: Vec<ItemState>,
    pub active_quest: Option<QuestState>,
    pub dialogue: DialogueState,
    pub collected_item_counts: BTreeMap<String, u32>,
    pub completed_quest_ids: Vec<String>,
    pub accumulated_rewards: Rewards,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("quest objective references unknown npc '{0}'")]
    UnknownNpc(String),
    #[error("quest objective references undeclared item type '{0}'")]
    UnknownItemType(String),
    #[error("controlled actor index {index} is out of range for {actor_count} actors")]
    ControlledIndexOutOfRange { index: usize, actor_count: usize },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The parts of a scene that a summon must leave untouched.
#[derive(Serialize)]
struct WorldView<'a> {
    npcs: &'a [NpcState],
    items: &'a [ItemState],
    active_quest: &'a Option<QuestState>,
    dialogue: &'a DialogueState,
    collected_item_counts: &'a BTreeMap<String, u32>,
    completed_quest_ids: &'a [String],
    accumulated_rewards: &'a Rewards,
}

impl SceneSnapshot {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let actor_count = self.actor_state.actors.len();
        if actor_count > 0 && self.actor_state.controlled_index >= actor_count {
            return Err(SnapshotError::ControlledIndexOutOfRange {
                index: self.actor_state.controlled_index,
                actor_count,
            });
        }

        let Some(quest) = &self.active_quest else {
            return Ok(());
        };
        let npc_ids: BTreeSet<&str> = self.npcs.iter().map(|npc| npc.id.as_str()).collect();
        let item_types: BTreeSet<&str> = self
            .items
            .iter()
            .map(|item| item.item_type.as_str())
            .collect();
        for objective in &quest.objectives {
            match &objective.target {
                ObjectiveTarget::Npc(id) if !npc_ids.contains(id.as_str()) => {
                    return Err(SnapshotError::UnknownNpc(id.clone()));
                }
                ObjectiveTarget::Item(item_type) if !item_types.contains(item_type.as_str()) => {
                    return Err(SnapshotError::UnknownItemType(item_type.clone()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: SceneSnapshot = serde_json::from_slice(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// SHA-256 over the JSON encoding of the whole snapshot.
    pub fn fingerprint(&self) -> Result<String, SnapshotError> {
        Ok(sha256_hex(&self.to_json_bytes()?))
    }

    /// Fingerprint of npcs, items, quest, dialogue and progress; actors and
    /// camera are excluded.
    pub fn world_fingerprint(&self) -> Result<String, SnapshotError> {
        let view = WorldView {
            npcs: &self.npcs,
            items: &self.items,
            active_quest: &self.active_quest,
            dialogue: &self.dialogue,
            collected_item_counts: &self.collected_item_counts,
            completed_quest_ids: &self.completed_quest_ids,
            accumulated_rewards: &self.accumulated_rewards,
        };
        Ok(sha256_hex(&serde_json::to_vec(&view)?))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
