use tracing::info;

use crate::app::{InputAction, InputSnapshot};
use crate::mission::context::{PhaseId, PhaseResult};
use crate::mission::loading::AssetGate;
use crate::mission::phase::{PhaseController, PhaseEnv, PhaseStatus};
use crate::mission::services::{ContentKind, ContentRequest, ModelView, PhaseNotice};
use crate::sim::{LaunchGame, LaunchStatus};

pub struct LaunchPhase {
    game: LaunchGame,
    gate: AssetGate,
}

impl LaunchPhase {
    pub fn new(env: &PhaseEnv<'_>) -> Self {
        Self {
            game: LaunchGame::new(env.tuning.launch.clone()),
            gate: AssetGate::new(PhaseId::Launch, env.tuning.loading.timeout_seconds),
        }
    }

    pub fn game(&self) -> &LaunchGame {
        &self.game
    }
}

impl PhaseController for LaunchPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Launch
    }

    fn enter(&mut self, env: &mut PhaseEnv<'_>) {
        env.services
            .renderer
            .show_phase(PhaseId::Launch, &PhaseNotice::Entered);
        let request = ContentRequest::new(ContentKind::Backdrop)
            .with_param("scene", "launch_pad")
            .with_param("character", env.context.character_id());
        self.gate
            .request("backdrop", request, env.services.content.as_mut());
        self.gate.announce(env.services);
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        env: &mut PhaseEnv<'_>,
    ) -> PhaseStatus {
        if self.gate.still_loading(fixed_dt_seconds, env.services) {
            return PhaseStatus::Continue;
        }

        let status = self
            .game
            .step(fixed_dt_seconds, input.is_down(InputAction::Jump));
        env.services.renderer.draw(&ModelView::Launch {
            body: self.game.body(),
            thrust_progress: self.game.thrust_progress(),
        });

        match status {
            LaunchStatus::Holding => PhaseStatus::Continue,
            LaunchStatus::LiftOff(report) => {
                info!(
                    mission = env.context.id(),
                    score = report.score,
                    hold_seconds = report.hold_seconds,
                    lift_off_speed = report.lift_off_speed,
                    "lift_off"
                );
                PhaseStatus::Complete(PhaseResult::succeeded(report.score, report.elapsed_seconds))
            }
        }
    }

    fn exit(&mut self, env: &mut PhaseEnv<'_>) {
        self.gate.cancel_all(env.services.content.as_mut());
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "launch progress={:.0} hold={:.2}s",
            self.game.thrust_progress(),
            self.game.hold_seconds()
        ))
    }
}
