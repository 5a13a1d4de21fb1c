use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::Rewards;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Delivery,
    Rescue,
    Summon,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionFlags {
    pub is_summon_mission: bool,
    pub simplified_flight: bool,
}

/// Identity and configuration of one mission, threaded through every phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionContext {
    id: String,
    kind: MissionKind,
    character_id: String,
    destination: String,
    flags: MissionFlags,
}

impl MissionContext {
    pub fn new(
        id: impl Into<String>,
        kind: MissionKind,
        character_id: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            character_id: character_id.into(),
            destination: destination.into(),
            flags: MissionFlags::default(),
        }
    }

    /// Context for a partner summoned from inside `parent`'s exploration.
    pub fn summon(parent: &MissionContext, partner_id: &str) -> Self {
        Self {
            id: format!("{}-summon-{partner_id}", parent.id),
            kind: MissionKind::Summon,
            character_id: partner_id.to_string(),
            destination: parent.destination.clone(),
            flags: MissionFlags {
                is_summon_mission: true,
                simplified_flight: parent.flags.simplified_flight,
            },
        }
    }

    pub fn with_flags(mut self, flags: MissionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MissionKind {
        self.kind
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn flags(&self) -> MissionFlags {
        self.flags
    }

    pub fn phase_chain(&self) -> &'static [PhaseId] {
        if self.flags.is_summon_mission {
            &SUMMON_CHAIN
        } else {
            &STANDARD_CHAIN
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Dispatch,
    Launch,
    Flight,
    Arrival,
    Transformation,
    Landing,
    Exploration,
    Return,
    Idle,
}

impl PhaseId {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseId::Dispatch => "dispatch",
            PhaseId::Launch => "launch",
            PhaseId::Flight => "flight",
            PhaseId::Arrival => "arrival",
            PhaseId::Transformation => "transformation",
            PhaseId::Landing => "landing",
            PhaseId::Exploration => "exploration",
            PhaseId::Return => "return",
            PhaseId::Idle => "idle",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const STANDARD_CHAIN: [PhaseId; 8] = [
    PhaseId::Dispatch,
    PhaseId::Launch,
    PhaseId::Flight,
    PhaseId::Arrival,
    PhaseId::Transformation,
    PhaseId::Landing,
    PhaseId::Exploration,
    PhaseId::Return,
];

pub const SUMMON_CHAIN: [PhaseId; 4] = [
    PhaseId::Launch,
    PhaseId::Flight,
    PhaseId::Transformation,
    PhaseId::Landing,
];

/// What a finished phase hands to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub success: bool,
    pub score: u32,
    pub timing_seconds: f32,
    pub attempts: u32,
    pub rewards: Rewards,
}

impl PhaseResult {
    pub fn succeeded(score: u32, timing_seconds: f32) -> Self {
        Self {
            success: true,
            score,
            timing_seconds,
            attempts: 1,
            rewards: Rewards::default(),
        }
    }

    /// Seed result for the first phase of a chain.
    pub fn initial() -> Self {
        Self::succeeded(0, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: PhaseId,
    pub result: PhaseResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionOutcome {
    pub mission_id: String,
    pub kind: MissionKind,
    pub character_id: String,
    pub destination: String,
    pub phases: Vec<PhaseRecord>,
    pub landing_attempts: u32,
    pub summoned: Vec<String>,
    pub rewards: Rewards,
}

impl MissionOutcome {
    pub fn score_for(&self, phase: PhaseId) -> Option<u32> {
        self.phases
            .iter()
            .find(|record| record.phase == phase)
            .map(|record| record.result.score)
    }
}
