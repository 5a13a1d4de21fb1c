use crate::app::InputSnapshot;
use crate::mission::context::{PhaseId, PhaseResult};
use crate::mission::loading::AssetGate;
use crate::mission::phase::{PhaseController, PhaseEnv, PhaseStatus};
use crate::mission::services::{ContentKind, ContentRequest, ModelView, PhaseNotice};
use crate::sim::TimerSet;

const HOLD_TIMER: &str = "presentation_hold";
const ASSET_SLOT: &str = "presentation";

/// Dispatch, Arrival and Return: load one piece of content, show it for a
/// fixed hold, then complete.
pub struct PresentationPhase {
    id: PhaseId,
    kind: ContentKind,
    hold_seconds: f32,
    gate: AssetGate,
    timers: TimerSet,
    hold_armed: bool,
    elapsed_seconds: f32,
}

impl PresentationPhase {
    pub fn new(id: PhaseId, env: &PhaseEnv<'_>) -> Self {
        let presentation = &env.tuning.presentation;
        let (kind, hold_seconds) = match id {
            PhaseId::Dispatch => (ContentKind::Briefing, presentation.dispatch_seconds),
            PhaseId::Arrival => (ContentKind::Destination, presentation.arrival_seconds),
            _ => (ContentKind::Summary, presentation.return_seconds),
        };
        Self {
            id,
            kind,
            hold_seconds,
            gate: AssetGate::new(id, env.tuning.loading.timeout_seconds),
            timers: TimerSet::default(),
            hold_armed: false,
            elapsed_seconds: 0.0,
        }
    }
}

impl PhaseController for PresentationPhase {
    fn id(&self) -> PhaseId {
        self.id
    }

    fn enter(&mut self, env: &mut PhaseEnv<'_>) {
        env.services.renderer.show_phase(self.id, &PhaseNotice::Entered);
        let request = ContentRequest::new(self.kind)
            .with_param("destination", env.context.destination())
            .with_param("character", env.context.character_id());
        self.gate
            .request(ASSET_SLOT, request, env.services.content.as_mut());
        self.gate.announce(env.services);
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        _input: &InputSnapshot,
        env: &mut PhaseEnv<'_>,
    ) -> PhaseStatus {
        if self.gate.still_loading(fixed_dt_seconds, env.services) {
            return PhaseStatus::Continue;
        }
        if !self.hold_armed {
            self.timers.start_once(HOLD_TIMER, self.hold_seconds);
            self.hold_armed = true;
        }

        self.elapsed_seconds += fixed_dt_seconds;
        let mut fired = Vec::new();
        self.timers.tick(fixed_dt_seconds, &mut fired);
        env.services.renderer.draw(&ModelView::Presentation {
            phase: self.id,
            asset: self
                .gate
                .asset(ASSET_SLOT)
                .map(|asset| asset.primary_asset.as_str()),
        });

        if fired.contains(&HOLD_TIMER) {
            PhaseStatus::Complete(PhaseResult::succeeded(0, self.elapsed_seconds))
        } else {
            PhaseStatus::Continue
        }
    }

    fn exit(&mut self, env: &mut PhaseEnv<'_>) {
        self.gate.cancel_all(env.services.content.as_mut());
        self.timers.clear();
    }

    fn live_timers(&self) -> usize {
        self.timers.len()
    }
}
