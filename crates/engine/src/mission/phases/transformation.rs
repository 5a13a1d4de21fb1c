use tracing::{info, warn};

use crate::app::{InputAction, InputSnapshot};
use crate::mission::context::{PhaseId, PhaseResult};
use crate::mission::loading::AssetGate;
use crate::mission::phase::{PhaseActivity, PhaseController, PhaseEnv, PhaseStatus};
use crate::mission::services::{ContentKind, ContentRequest, ModelView, PhaseNotice};
use crate::sim::{FrameHandle, FramePlaybackController, FrameSequence, PlaybackState};

const FRAMES_SLOT: &str = "frames";

/// Hold-to-play transformation sequence. The frame set is resolved through
/// the loading gate; the sequence length is whatever the source actually
/// delivered.
pub struct TransformationPhase {
    playback: FramePlaybackController,
    gate: AssetGate,
    loaded: bool,
    elapsed_seconds: f32,
    forced: bool,
}

impl TransformationPhase {
    pub fn new(env: &PhaseEnv<'_>) -> Self {
        Self {
            playback: FramePlaybackController::new(
                FrameSequence::new(Vec::new(), 0, env.tuning.playback.default_frame_rate),
                env.tuning.playback.finish_grace_seconds,
            ),
            gate: AssetGate::new(PhaseId::Transformation, env.tuning.loading.timeout_seconds),
            loaded: false,
            elapsed_seconds: 0.0,
            forced: false,
        }
    }

    pub fn playback(&self) -> &FramePlaybackController {
        &self.playback
    }

    /// Builds the sequence once the gate has resolved. A placeholder frame
    /// set (failed or timed-out request) plays a single placeholder frame.
    fn install_sequence(&mut self, env: &mut PhaseEnv<'_>) {
        let sequence = match self.gate.asset(FRAMES_SLOT) {
            Some(asset) if !asset.is_placeholder() => Self::load_sequence(env),
            _ => {
                let frame_rate = env
                    .roster
                    .get(env.context.character_id())
                    .and_then(|def| def.frame_rate)
                    .unwrap_or(env.tuning.playback.default_frame_rate);
                placeholder_sequence(env.context.character_id(), frame_rate)
            }
        };
        info!(
            character = env.context.character_id(),
            frames = sequence.len(),
            frame_rate = sequence.frame_rate(),
            "transformation_ready"
        );
        self.playback =
            FramePlaybackController::new(sequence, env.tuning.playback.finish_grace_seconds);
        self.loaded = true;
    }

    fn load_sequence(env: &mut PhaseEnv<'_>) -> FrameSequence {
        let character_id = env.context.character_id();
        let playback = &env.tuning.playback;
        let Some(def) = env.roster.get(character_id) else {
            warn!(character = character_id, "transformation_unknown_character");
            return placeholder_sequence(character_id, playback.default_frame_rate);
        };
        let requested = def.transform_frames as usize;
        let frame_rate = def.frame_rate.unwrap_or(playback.default_frame_rate);
        match env.services.frames.load_frames(character_id, requested) {
            Ok(frames) => {
                if frames.len() < requested {
                    warn!(
                        character = character_id,
                        requested,
                        loaded = frames.len(),
                        "transformation_frames_short"
                    );
                }
                FrameSequence::new(frames, requested, frame_rate)
            }
            Err(failure) => {
                warn!(character = character_id, error = %failure, "content_fallback");
                placeholder_sequence(character_id, frame_rate)
            }
        }
    }
}

fn placeholder_sequence(character_id: &str, frame_rate: f32) -> FrameSequence {
    FrameSequence::new(
        vec![FrameHandle::new(format!("placeholder/{character_id}"))],
        1,
        frame_rate,
    )
}

impl PhaseController for TransformationPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Transformation
    }

    fn enter(&mut self, env: &mut PhaseEnv<'_>) {
        env.services
            .renderer
            .show_phase(PhaseId::Transformation, &PhaseNotice::Entered);
        let request = ContentRequest::new(ContentKind::Frames)
            .with_param("character", env.context.character_id());
        self.gate
            .request(FRAMES_SLOT, request, env.services.content.as_mut());
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
        if !self.loaded {
            self.install_sequence(env);
        }
        if self.playback.state() != PlaybackState::Finished {
            self.elapsed_seconds += fixed_dt_seconds;
        }

        let finished = if input.was_pressed(InputAction::Finish) {
            self.forced = self.playback.finish();
            self.forced
        } else {
            if input.is_down(InputAction::Jump) {
                self.playback.hold();
            } else {
                self.playback.release();
            }
            if input.was_pressed(InputAction::MoveLeft) {
                self.playback.scrub_back(1);
            }
            if input.was_pressed(InputAction::MoveRight) {
                self.playback.step_forward();
            }
            self.playback.update(fixed_dt_seconds)
        };

        let sequence = self.playback.sequence();
        env.services.renderer.draw(&ModelView::Transformation {
            index: sequence.current_index(),
            frame_count: sequence.len(),
            frame: sequence.current_frame(),
        });

        if finished {
            info!(
                character = env.context.character_id(),
                forced = self.forced,
                elapsed_seconds = self.elapsed_seconds,
                "transformation_finished"
            );
            PhaseStatus::Complete(PhaseResult::succeeded(0, self.elapsed_seconds))
        } else {
            PhaseStatus::Continue
        }
    }

    fn exit(&mut self, env: &mut PhaseEnv<'_>) {
        self.gate.cancel_all(env.services.content.as_mut());
        self.playback.clear_timers();
    }

    fn live_timers(&self) -> usize {
        self.playback.live_timers()
    }

    fn activity(&self) -> PhaseActivity {
        match self.playback.state() {
            PlaybackState::Idle | PlaybackState::Paused if self.loaded => {
                PhaseActivity::AwaitingInput
            }
            _ => PhaseActivity::Advancing { attempt: 1 },
        }
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "transformation frame={}/{} state={:?}",
            self.playback.current_index() + 1,
            self.playback.sequence().len(),
            self.playback.state()
        ))
    }
}
