use tracing::{info, warn};

use crate::app::{InputAction, InputSnapshot};
use crate::mission::context::{PhaseId, PhaseResult};
use crate::mission::loading::AssetGate;
use crate::mission::phase::{PhaseActivity, PhaseController, PhaseEnv, PhaseStatus};
use crate::mission::services::{ContentKind, ContentRequest, ModelView, PhaseNotice};
use crate::sim::{LandingControls, LandingGame, LandingStatus};

/// Descent onto the runway. A crash resets the same controller for another
/// attempt; the sequencer never sees it.
pub struct LandingPhase {
    game: LandingGame,
    gate: AssetGate,
}

impl LandingPhase {
    pub fn new(env: &PhaseEnv<'_>) -> Self {
        Self {
            game: LandingGame::new(env.tuning.landing.clone()),
            gate: AssetGate::new(PhaseId::Landing, env.tuning.loading.timeout_seconds),
        }
    }

    pub fn game(&self) -> &LandingGame {
        &self.game
    }
}

impl PhaseController for LandingPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Landing
    }

    fn enter(&mut self, env: &mut PhaseEnv<'_>) {
        env.services
            .renderer
            .show_phase(PhaseId::Landing, &PhaseNotice::Entered);
        let request = ContentRequest::new(ContentKind::Backdrop)
            .with_param("scene", "runway")
            .with_param("destination", env.context.destination());
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

        let controls = LandingControls {
            left: input.is_down(InputAction::MoveLeft),
            right: input.is_down(InputAction::MoveRight),
            thrust: input.is_down(InputAction::Jump),
        };
        let status = self.game.step(fixed_dt_seconds, controls);
        env.services.renderer.draw(&ModelView::Landing {
            body: self.game.body(),
            attempt: self.game.attempt(),
        });

        match status {
            LandingStatus::Descending => PhaseStatus::Continue,
            LandingStatus::Crashed(report) => {
                warn!(
                    mission = env.context.id(),
                    attempt = report.attempt,
                    touchdown_x = report.touchdown_x,
                    vx = report.touchdown_velocity.x,
                    vy = report.touchdown_velocity.y,
                    "landing_retry"
                );
                self.game.reset_for_retry();
                env.services.renderer.show_phase(
                    PhaseId::Landing,
                    &PhaseNotice::RetryPrompt {
                        attempt: self.game.attempt(),
                    },
                );
                PhaseStatus::Continue
            }
            LandingStatus::Landed(report) => {
                info!(
                    mission = env.context.id(),
                    attempt = report.attempt,
                    score = report.score,
                    "touchdown"
                );
                let mut result = PhaseResult::succeeded(report.score, report.elapsed_seconds);
                result.attempts = report.attempt;
                PhaseStatus::Complete(result)
            }
        }
    }

    fn exit(&mut self, env: &mut PhaseEnv<'_>) {
        self.gate.cancel_all(env.services.content.as_mut());
    }

    fn activity(&self) -> PhaseActivity {
        PhaseActivity::Advancing {
            attempt: self.game.attempt(),
        }
    }

    fn debug_title(&self) -> Option<String> {
        let body = self.game.body();
        Some(format!(
            "landing attempt={} x={:.0} y={:.0}",
            self.game.attempt(),
            body.position.x,
            body.position.y
        ))
    }
}
