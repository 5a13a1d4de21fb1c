use tracing::{error, info, warn};

use crate::app::InputSnapshot;
use crate::tuning::RewardTuning;

use super::context::{MissionContext, MissionOutcome, PhaseId, PhaseRecord, PhaseResult};
use super::error::MissionError;
use super::phase::{MissionRuntime, PhaseActivity, PhaseController, PhaseStatus};
use super::phases::{build_phase, ExplorationPhase};
use super::subflow::SubFlowInterrupt;
use crate::sim::Rewards;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerStatus {
    /// Built but not started.
    Pending,
    Running,
    /// Exploration is suspended while a nested summon mission runs.
    SubFlow,
    Completed,
    Stuck,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissionEvent {
    PhaseEntered {
        phase: PhaseId,
    },
    PhaseCompleted {
        phase: PhaseId,
        result: PhaseResult,
    },
    SubFlowStarted {
        partner_id: String,
    },
    SubFlowComplete {
        partner_id: String,
        phases: Vec<PhaseId>,
    },
    PhaseStuck {
        phase: PhaseId,
        elapsed_seconds: f32,
    },
    MissionCompleted {
        mission_id: String,
    },
    Aborted {
        phase: Option<PhaseId>,
    },
}

/// Drives one mission through its phase chain.
pub struct MissionSequencer {
    context: MissionContext,
    chain: &'static [PhaseId],
    position: usize,
    current: Option<Box<dyn PhaseController>>,
    last_result: PhaseResult,
    records: Vec<PhaseRecord>,
    history: Vec<PhaseId>,
    status: SequencerStatus,
    phase_elapsed_seconds: f32,
    watched_attempt: u32,
    stuck: Option<(PhaseId, f32)>,
    subflow: Option<SubFlowInterrupt>,
    summoned: Vec<String>,
    events: Vec<MissionEvent>,
    outcome: Option<MissionOutcome>,
}

impl MissionSequencer {
    pub fn new(context: MissionContext) -> Self {
        let chain = context.phase_chain();
        Self {
            context,
            chain,
            position: 0,
            current: None,
            last_result: PhaseResult::initial(),
            records: Vec::new(),
            history: Vec::new(),
            status: SequencerStatus::Pending,
            phase_elapsed_seconds: 0.0,
            watched_attempt: 1,
            stuck: None,
            subflow: None,
            summoned: Vec::new(),
            events: Vec::new(),
            outcome: None,
        }
    }

    pub fn context(&self) -> &MissionContext {
        &self.context
    }

    pub fn status(&self) -> SequencerStatus {
        self.status
    }

    pub fn current_phase(&self) -> Option<PhaseId> {
        self.current.as_ref().map(|phase| phase.id())
    }

    /// The phase receiving input right now, looking through any nested
    /// summon mission.
    pub fn active_phase(&self) -> Option<PhaseId> {
        match &self.subflow {
            Some(subflow) => subflow.nested().active_phase(),
            None => self.current_phase(),
        }
    }

    pub fn current(&self) -> Option<&dyn PhaseController> {
        self.current.as_deref()
    }

    pub fn exploration(&self) -> Option<&ExplorationPhase> {
        self.current.as_ref()?.as_exploration()
    }

    pub fn history(&self) -> &[PhaseId] {
        &self.history
    }

    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    pub fn outcome(&self) -> Option<&MissionOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_summon_flow(&self) -> bool {
        self.subflow.is_some()
    }

    pub fn subflow(&self) -> Option<&SubFlowInterrupt> {
        self.subflow.as_ref()
    }

    pub fn take_events(&mut self) -> Vec<MissionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn debug_title(&self) -> Option<String> {
        match &self.subflow {
            Some(subflow) => subflow
                .nested()
                .debug_title()
                .map(|title| format!("[summon {}] {title}", subflow.partner_id())),
            None => self.current.as_ref()?.debug_title(),
        }
    }

    pub fn start(&mut self, runtime: &mut MissionRuntime) -> Result<(), MissionError> {
        if self.status != SequencerStatus::Pending {
            return Err(MissionError::invalid_transition("mission already started"));
        }
        self.status = SequencerStatus::Running;
        info!(
            mission = self.context.id(),
            kind = ?self.context.kind(),
            character = self.context.character_id(),
            destination = self.context.destination(),
            summon = self.context.flags().is_summon_mission,
            "mission_started"
        );
        self.enter_phase(0, runtime)
    }

    pub fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        runtime: &mut MissionRuntime,
    ) -> Result<SequencerStatus, MissionError> {
        match self.status {
            SequencerStatus::Pending | SequencerStatus::Completed | SequencerStatus::Aborted => {
                Ok(self.status)
            }
            SequencerStatus::Stuck => {
                let (phase, elapsed_seconds) = self.stuck.unwrap_or((PhaseId::Idle, 0.0));
                Err(MissionError::PhaseStuck {
                    phase,
                    elapsed_seconds,
                })
            }
            SequencerStatus::SubFlow => self.update_subflow(fixed_dt_seconds, input, runtime),
            SequencerStatus::Running => self.update_running(fixed_dt_seconds, input, runtime),
        }
    }

    fn update_running(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        runtime: &mut MissionRuntime,
    ) -> Result<SequencerStatus, MissionError> {
        let Some(current) = self.current.as_mut() else {
            return Ok(self.status);
        };
        let phase = current.id();
        let status = {
            let mut env = runtime.env(&self.context);
            current.update(fixed_dt_seconds, input, &mut env)
        };
        let activity = current.activity();

        match status {
            PhaseStatus::Continue => {
                let limit = runtime.tuning.watchdog.stuck_after_seconds;
                if self.watchdog_tick(activity, fixed_dt_seconds, limit) {
                    return Err(self.mark_stuck(phase, self.phase_elapsed_seconds));
                }
            }
            PhaseStatus::Complete(result) => self.advance(result, runtime)?,
            PhaseStatus::Interrupt(request) => {
                match self.begin_subflow(&request.partner_id, runtime) {
                    Ok(()) | Err(MissionError::InvalidTransition { .. }) => {}
                    Err(error) => return Err(error),
                }
            }
        }
        Ok(self.status)
    }

    fn update_subflow(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        runtime: &mut MissionRuntime,
    ) -> Result<SequencerStatus, MissionError> {
        let Some(subflow) = self.subflow.as_mut() else {
            self.status = SequencerStatus::Running;
            return Ok(self.status);
        };
        match subflow.update(fixed_dt_seconds, input, runtime) {
            Ok(true) => {
                self.resume_exploration(runtime)?;
                Ok(self.status)
            }
            Ok(false) => Ok(self.status),
            Err(MissionError::PhaseStuck {
                phase,
                elapsed_seconds,
            }) => Err(self.mark_stuck(phase, elapsed_seconds)),
            Err(error) => Err(error),
        }
    }

    /// Counts only ticks where the phase is simulating on its current
    /// attempt. Returns true once that time passes `limit`.
    fn watchdog_tick(&mut self, activity: PhaseActivity, dt_seconds: f32, limit: f32) -> bool {
        match activity {
            PhaseActivity::AwaitingInput => false,
            PhaseActivity::Advancing { attempt } => {
                if attempt != self.watched_attempt {
                    self.watched_attempt = attempt;
                    self.phase_elapsed_seconds = 0.0;
                }
                self.phase_elapsed_seconds += dt_seconds;
                self.phase_elapsed_seconds > limit
            }
        }
    }

    fn mark_stuck(&mut self, phase: PhaseId, elapsed_seconds: f32) -> MissionError {
        if self.status != SequencerStatus::Stuck {
            error!(
                mission = self.context.id(),
                phase = %phase,
                elapsed_seconds,
                "phase_stuck"
            );
            self.events.push(MissionEvent::PhaseStuck {
                phase,
                elapsed_seconds,
            });
        }
        self.status = SequencerStatus::Stuck;
        self.stuck = Some((phase, elapsed_seconds));
        MissionError::PhaseStuck {
            phase,
            elapsed_seconds,
        }
    }

    fn advance(&mut self, result: PhaseResult, runtime: &mut MissionRuntime) -> Result<(), MissionError> {
        let Some(mut finished) = self.current.take() else {
            return Ok(());
        };
        let phase = finished.id();
        finished.exit(&mut runtime.env(&self.context));
        let leaked = finished.live_timers();
        if leaked != 0 {
            error!(mission = self.context.id(), phase = %phase, count = leaked, "timer_leak");
            return Err(MissionError::TimerLeak {
                phase,
                count: leaked,
            });
        }

        info!(
            mission = self.context.id(),
            phase = %phase,
            score = result.score,
            timing_seconds = result.timing_seconds,
            "phase_completed"
        );
        self.records.push(PhaseRecord { phase, result });
        self.events.push(MissionEvent::PhaseCompleted { phase, result });
        self.last_result = result;
        self.enter_phase(self.position + 1, runtime)
    }

    fn enter_phase(&mut self, position: usize, runtime: &mut MissionRuntime) -> Result<(), MissionError> {
        self.position = position;
        let Some(&phase) = self.chain.get(position) else {
            self.complete_mission(&runtime.tuning.rewards);
            return Ok(());
        };
        let mut env = runtime.env(&self.context);
        let Some(mut controller) = build_phase(phase, &self.last_result, &env) else {
            self.complete_mission(&runtime.tuning.rewards);
            return Ok(());
        };
        controller.enter(&mut env);
        info!(mission = self.context.id(), phase = %phase, "phase_entered");
        self.current = Some(controller);
        self.history.push(phase);
        self.phase_elapsed_seconds = 0.0;
        self.watched_attempt = 1;
        self.events.push(MissionEvent::PhaseEntered { phase });
        Ok(())
    }

    fn complete_mission(&mut self, rewards: &RewardTuning) {
        self.current = None;
        self.status = SequencerStatus::Completed;
        let outcome = self.build_outcome(rewards);
        info!(
            mission = self.context.id(),
            money = outcome.rewards.money,
            exp = outcome.rewards.exp,
            landing_attempts = outcome.landing_attempts,
            "mission_completed"
        );
        self.outcome = Some(outcome);
        self.events.push(MissionEvent::MissionCompleted {
            mission_id: self.context.id().to_string(),
        });
    }

    fn build_outcome(&self, tuning: &RewardTuning) -> MissionOutcome {
        let record = |phase: PhaseId| self.records.iter().find(|record| record.phase == phase);
        let mut rewards = if self.context.flags().is_summon_mission {
            Rewards::default()
        } else {
            Rewards {
                money: tuning.base_money
                    + record(PhaseId::Flight).map_or(0, |record| u64::from(record.result.score)),
                exp: tuning.base_exp,
            }
        };
        if let Some(exploration) = record(PhaseId::Exploration) {
            rewards.add(exploration.result.rewards);
        }
        MissionOutcome {
            mission_id: self.context.id().to_string(),
            kind: self.context.kind(),
            character_id: self.context.character_id().to_string(),
            destination: self.context.destination().to_string(),
            phases: self.records.clone(),
            landing_attempts: record(PhaseId::Landing).map_or(0, |record| record.result.attempts),
            summoned: self.summoned.clone(),
            rewards,
        }
    }

    /// Starts a summon sub-flow from the live exploration. Rejected calls
    /// leave the sequencer untouched.
    pub fn summon_partner(
        &mut self,
        partner_id: &str,
        runtime: &mut MissionRuntime,
    ) -> Result<(), MissionError> {
        self.begin_subflow(partner_id, runtime)
    }

    fn begin_subflow(&mut self, partner_id: &str, runtime: &mut MissionRuntime) -> Result<(), MissionError> {
        let rejection = if self.subflow.is_some() {
            Some("a summon sub-flow is already running")
        } else if self.context.flags().is_summon_mission {
            Some("summons cannot start inside a summon mission")
        } else if self.status != SequencerStatus::Running {
            Some("mission is not running")
        } else if !runtime.roster.contains(partner_id) {
            Some("partner is not in the roster")
        } else {
            match self.exploration() {
                None => Some("summons start only from exploration"),
                Some(exploration) if exploration.world().has_actor(partner_id) => {
                    Some("partner is already in the scene")
                }
                Some(_) => None,
            }
        };
        if let Some(reason) = rejection {
            warn!(mission = self.context.id(), partner = partner_id, reason, "summon_rejected");
            return Err(MissionError::invalid_transition(reason));
        }

        let exploration = self
            .current
            .as_mut()
            .and_then(|phase| phase.as_exploration_mut())
            .ok_or_else(|| MissionError::invalid_transition("summons start only from exploration"))?;
        let subflow = SubFlowInterrupt::begin(exploration, &self.context, partner_id, runtime)?;
        self.subflow = Some(subflow);
        self.status = SequencerStatus::SubFlow;
        self.events.push(MissionEvent::SubFlowStarted {
            partner_id: partner_id.to_string(),
        });
        Ok(())
    }

    /// Restores the suspended exploration once the nested mission is done.
    pub fn resume_exploration(&mut self, runtime: &mut MissionRuntime) -> Result<(), MissionError> {
        let ready = self
            .subflow
            .as_ref()
            .map(|subflow| subflow.nested().status() == SequencerStatus::Completed);
        let reason = match ready {
            None => Some("no pending snapshot to resume"),
            Some(false) => Some("nested mission has not finished"),
            Some(true) => None,
        };
        if let Some(reason) = reason {
            warn!(mission = self.context.id(), reason, "resume_rejected");
            return Err(MissionError::invalid_transition(reason));
        }
        let (Some(subflow), Some(current)) = (self.subflow.as_mut(), self.current.as_mut()) else {
            return Err(MissionError::invalid_transition("no suspended exploration"));
        };

        let partner_id = subflow.partner_id().to_string();
        let phases = match subflow.resume(current, &self.context, runtime) {
            Ok(phases) => phases,
            Err(error) => {
                error!(
                    mission = self.context.id(),
                    partner = %partner_id,
                    error = %error,
                    "subflow_resume_failed"
                );
                return Err(error);
            }
        };
        self.subflow = None;
        info!(
            mission = self.context.id(),
            partner = %partner_id,
            "subflow_complete"
        );
        self.summoned.push(partner_id.clone());
        self.status = SequencerStatus::Running;
        self.events.push(MissionEvent::SubFlowComplete { partner_id, phases });
        Ok(())
    }

    /// Escape hatch: exits every live controller, nested ones included, and
    /// marks the mission aborted.
    pub fn force_exit(&mut self, runtime: &mut MissionRuntime) {
        if matches!(
            self.status,
            SequencerStatus::Completed | SequencerStatus::Aborted
        ) {
            return;
        }
        if let Some(mut subflow) = self.subflow.take() {
            subflow.force_exit(runtime);
        }
        let phase = self.current_phase();
        if let Some(mut current) = self.current.take() {
            current.exit(&mut runtime.env(&self.context));
        }
        warn!(mission = self.context.id(), phase = ?phase, "mission_aborted");
        self.status = SequencerStatus::Aborted;
        self.events.push(MissionEvent::Aborted { phase });
    }
}
