use crate::app::InputSnapshot;
use crate::content::CharacterRoster;
use crate::tuning::MissionTuning;

use super::context::{MissionContext, PhaseId, PhaseResult};
use super::phases::ExplorationPhase;
use super::services::Services;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummonRequest {
    pub partner_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseStatus {
    Continue,
    Complete(PhaseResult),
    /// Exploration asks its sequencer to start a summon sub-flow.
    Interrupt(SummonRequest),
}

/// How a phase is spending its ticks, as seen by the stuck-phase watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseActivity {
    /// Simulating toward completion. A new `attempt` restarts the stall clock.
    Advancing { attempt: u32 },
    /// Gated on the player; idle time here is not a stall.
    AwaitingInput,
}

/// Everything a mission needs besides its own state: tuning, roster and the
/// external collaborators. Nested sequencers share the parent's runtime.
pub struct MissionRuntime {
    pub tuning: MissionTuning,
    pub roster: CharacterRoster,
    pub services: Services,
}

impl MissionRuntime {
    pub fn env<'a>(&'a mut self, context: &'a MissionContext) -> PhaseEnv<'a> {
        PhaseEnv {
            context,
            tuning: &self.tuning,
            roster: &self.roster,
            services: &mut self.services,
        }
    }
}

/// Explicit context handed to a phase on every call.
pub struct PhaseEnv<'a> {
    pub context: &'a MissionContext,
    pub tuning: &'a MissionTuning,
    pub roster: &'a CharacterRoster,
    pub services: &'a mut Services,
}

pub trait PhaseController {
    fn id(&self) -> PhaseId;
    fn enter(&mut self, env: &mut PhaseEnv<'_>);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        env: &mut PhaseEnv<'_>,
    ) -> PhaseStatus;
    /// Releases timers, tickets and render resources. Must leave
    /// `live_timers()` at zero.
    fn exit(&mut self, env: &mut PhaseEnv<'_>);
    fn live_timers(&self) -> usize {
        0
    }
    fn activity(&self) -> PhaseActivity {
        PhaseActivity::Advancing { attempt: 1 }
    }
    fn debug_title(&self) -> Option<String> {
        None
    }
    fn as_exploration(&self) -> Option<&ExplorationPhase> {
        None
    }
    fn as_exploration_mut(&mut self) -> Option<&mut ExplorationPhase> {
        None
    }
}
