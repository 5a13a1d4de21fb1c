use tracing::{debug, info};

use crate::app::{InputAction, InputSnapshot};
use crate::mission::context::{PhaseId, PhaseResult};
use crate::mission::loading::AssetGate;
use crate::mission::phase::{PhaseController, PhaseEnv, PhaseStatus};
use crate::mission::services::{ContentKind, ContentRequest, ModelView, PhaseNotice};
use crate::sim::{build_course, course_seed, FlightGame, FlightStatus};

pub struct FlightPhase {
    game: FlightGame,
    gate: AssetGate,
}

impl FlightPhase {
    /// The launch score sets the opening scroll speed.
    pub fn new(previous: &PhaseResult, env: &PhaseEnv<'_>) -> Self {
        let tuning = env.tuning.flight.clone();
        let initial_speed =
            tuning.base_speed + previous.score as f32 * tuning.launch_bonus_per_point;
        let obstacles = if env.context.flags().simplified_flight {
            Vec::new()
        } else {
            build_course(&tuning, course_seed(env.context.id()))
        };
        debug!(
            mission = env.context.id(),
            initial_speed,
            obstacles = obstacles.len(),
            "flight_course_built"
        );
        Self {
            game: FlightGame::new(tuning, initial_speed, obstacles),
            gate: AssetGate::new(PhaseId::Flight, env.tuning.loading.timeout_seconds),
        }
    }

    pub fn game(&self) -> &FlightGame {
        &self.game
    }
}

impl PhaseController for FlightPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Flight
    }

    fn enter(&mut self, env: &mut PhaseEnv<'_>) {
        env.services
            .renderer
            .show_phase(PhaseId::Flight, &PhaseNotice::Entered);
        let request = ContentRequest::new(ContentKind::Backdrop)
            .with_param("scene", "sky")
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

        let status = self
            .game
            .step(fixed_dt_seconds, input.is_down(InputAction::Jump));
        env.services.renderer.draw(&ModelView::Flight {
            body: self.game.body(),
            distance: self.game.distance(),
            score: self.game.score(),
        });

        match status {
            FlightStatus::Flying => PhaseStatus::Continue,
            FlightStatus::Complete(report) => {
                info!(
                    mission = env.context.id(),
                    distance = report.distance,
                    score = report.score,
                    passed = report.passed,
                    hits = report.hits,
                    completion = ?report.completion,
                    "flight_complete"
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
            "flight distance={:.0} speed={:.0} score={}",
            self.game.distance(),
            self.game.speed(),
            self.game.score()
        ))
    }
}
