use tracing::{info, warn};

use crate::app::InputSnapshot;
use crate::sim::SceneSnapshot;

use super::context::{MissionContext, PhaseId};
use super::error::MissionError;
use super::phase::{MissionRuntime, PhaseController};
use super::phases::ExplorationPhase;
use super::sequencer::{MissionSequencer, SequencerStatus};

/// A summon in progress: the captured exploration scene plus the nested
/// mission flying the partner in. The snapshot, not the render surface, is
/// what the scene is rebuilt from.
pub struct SubFlowInterrupt {
    partner_id: String,
    snapshot: SceneSnapshot,
    elapsed_seconds: f32,
    fingerprint: String,
    nested: Box<MissionSequencer>,
}

impl SubFlowInterrupt {
    /// Captures and suspends `exploration`, then starts the nested mission.
    pub(crate) fn begin(
        exploration: &mut ExplorationPhase,
        parent: &MissionContext,
        partner_id: &str,
        runtime: &mut MissionRuntime,
    ) -> Result<Self, MissionError> {
        let snapshot = exploration.capture_snapshot();
        let elapsed_seconds = exploration.elapsed_seconds();
        let fingerprint = snapshot.fingerprint()?;

        exploration.suspend(&mut runtime.services);
        let leaked = exploration.live_timers();
        if leaked != 0 {
            return Err(MissionError::TimerLeak {
                phase: PhaseId::Exploration,
                count: leaked,
            });
        }

        let mut nested = Box::new(MissionSequencer::new(MissionContext::summon(
            parent, partner_id,
        )));
        nested.start(runtime)?;
        info!(
            mission = parent.id(),
            partner = partner_id,
            fingerprint = %fingerprint,
            "subflow_started"
        );
        Ok(Self {
            partner_id: partner_id.to_string(),
            snapshot,
            elapsed_seconds,
            fingerprint,
            nested,
        })
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    pub fn snapshot(&self) -> &SceneSnapshot {
        &self.snapshot
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[cfg(test)]
    pub(crate) fn snapshot_mut(&mut self) -> &mut SceneSnapshot {
        &mut self.snapshot
    }

    pub fn nested(&self) -> &MissionSequencer {
        &self.nested
    }

    /// Ticks the nested mission. Returns true once it has completed.
    pub(crate) fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        runtime: &mut MissionRuntime,
    ) -> Result<bool, MissionError> {
        let status = self.nested.update(fixed_dt_seconds, input, runtime)?;
        Ok(status == SequencerStatus::Completed)
    }

    pub(crate) fn force_exit(&mut self, runtime: &mut MissionRuntime) {
        self.nested.force_exit(runtime);
    }

    /// Restores the scene into `current` (rebuilding it first when the render
    /// surface is gone), adds the partner and resumes ticking. Returns the
    /// phases the nested mission visited. On error the snapshot is kept so
    /// the owner can retry or force an exit.
    pub(crate) fn resume(
        &mut self,
        current: &mut Box<dyn PhaseController>,
        context: &MissionContext,
        runtime: &mut MissionRuntime,
    ) -> Result<Vec<PhaseId>, MissionError> {
        if runtime.services.renderer.surface_ready() {
            let phase = current.id();
            let exploration =
                current
                    .as_exploration_mut()
                    .ok_or_else(|| MissionError::SnapshotMismatch {
                        reason: format!("suspended phase is {phase}, not exploration"),
                    })?;
            exploration.restore_snapshot(&self.snapshot)?;
        } else {
            warn!(
                mission = context.id(),
                partner = %self.partner_id,
                "surface_rebuild_before_restore"
            );
            runtime.services.renderer.rebuild_surface();
            current.exit(&mut runtime.env(context));
            let rebuilt = ExplorationPhase::from_snapshot(
                &self.snapshot,
                self.elapsed_seconds,
                &runtime.env(context),
            )?;
            *current = Box::new(rebuilt);
        }

        let exploration = current
            .as_exploration_mut()
            .ok_or_else(|| MissionError::SnapshotMismatch {
                reason: "restored phase is not exploration".to_string(),
            })?;
        let restored = exploration.capture_snapshot().fingerprint()?;
        if restored != self.fingerprint {
            return Err(MissionError::SnapshotMismatch {
                reason: format!(
                    "restored fingerprint {restored} differs from captured {}",
                    self.fingerprint
                ),
            });
        }

        exploration.add_partner(&self.partner_id);
        exploration.resume(&mut runtime.services);
        Ok(self.nested.history().to_vec())
    }
}
