use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::app::{InputAction, InputSnapshot};
use crate::content::{CharacterDef, CharacterRoster, SyntheticFrameSource};
use crate::sim::Vec2;
use crate::tuning::MissionTuning;

use super::context::{MissionContext, MissionKind, PhaseId};
use super::error::{LoadFailure, MissionError};
use super::phase::MissionRuntime;
use super::sequencer::{MissionSequencer, SequencerStatus};
use super::services::{
    ContentPoll, ContentRequest, ContentResponse, ContentService, ContentTicket, ModelView,
    ObjectiveMatcher, PhaseNotice, Renderer, Services,
};

pub(crate) const DT: f32 = 1.0 / 60.0;

#[derive(Debug)]
pub(crate) struct RenderLog {
    pub notices: Vec<(PhaseId, PhaseNotice)>,
    pub transformation_indices: Vec<usize>,
    pub flight_distances: Vec<f32>,
    pub exploration_draws: usize,
    pub teardowns: usize,
    pub rebuilds: usize,
    pub surface_ready: bool,
}

impl Default for RenderLog {
    fn default() -> Self {
        Self {
            notices: Vec::new(),
            transformation_indices: Vec::new(),
            flight_distances: Vec::new(),
            exploration_draws: 0,
            teardowns: 0,
            rebuilds: 0,
            surface_ready: true,
        }
    }
}

impl RenderLog {
    pub fn retry_prompts(&self) -> usize {
        self.notices
            .iter()
            .filter(|(_, notice)| matches!(notice, PhaseNotice::RetryPrompt { .. }))
            .count()
    }
}

pub(crate) struct RecordingRenderer {
    log: Rc<RefCell<RenderLog>>,
}

impl Renderer for RecordingRenderer {
    fn show_phase(&mut self, phase: PhaseId, notice: &PhaseNotice) {
        self.log.borrow_mut().notices.push((phase, notice.clone()));
    }

    fn draw(&mut self, view: &ModelView<'_>) {
        let mut log = self.log.borrow_mut();
        match view {
            ModelView::Transformation { index, .. } => log.transformation_indices.push(*index),
            ModelView::Flight { distance, .. } => log.flight_distances.push(*distance),
            ModelView::Exploration(_) => log.exploration_draws += 1,
            _ => {}
        }
    }

    fn teardown(&mut self) {
        self.log.borrow_mut().teardowns += 1;
    }

    fn surface_ready(&self) -> bool {
        self.log.borrow().surface_ready
    }

    fn rebuild_surface(&mut self) {
        let mut log = self.log.borrow_mut();
        log.rebuilds += 1;
        log.surface_ready = true;
    }
}

#[derive(Debug, Clone)]
enum ContentScript {
    ReadyAfter(u32),
    Failing(LoadFailure),
    Hanging,
}

#[derive(Debug)]
pub(crate) struct ScriptedContent {
    script: ContentScript,
    next_ticket: u64,
    polls: BTreeMap<ContentTicket, u32>,
    requests: Vec<ContentRequest>,
    cancelled: Vec<ContentTicket>,
}

impl ScriptedContent {
    fn with_script(script: ContentScript) -> Self {
        Self {
            script,
            next_ticket: 0,
            polls: BTreeMap::new(),
            requests: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub fn ready_after(polls: u32) -> Self {
        Self::with_script(ContentScript::ReadyAfter(polls))
    }

    pub fn instant() -> Self {
        Self::ready_after(0)
    }

    pub fn failing(failure: LoadFailure) -> Self {
        Self::with_script(ContentScript::Failing(failure))
    }

    pub fn hanging() -> Self {
        Self::with_script(ContentScript::Hanging)
    }

    pub fn cancelled(&self) -> &[ContentTicket] {
        &self.cancelled
    }
}

impl ContentService for ScriptedContent {
    fn request(&mut self, request: ContentRequest) -> ContentTicket {
        self.next_ticket += 1;
        let ticket = ContentTicket(self.next_ticket);
        self.requests.push(request);
        self.polls.insert(ticket, 0);
        ticket
    }

    fn poll(&mut self, ticket: ContentTicket) -> ContentPoll {
        let count = self.polls.entry(ticket).or_insert(0);
        match &self.script {
            ContentScript::ReadyAfter(needed) if *count >= *needed => {
                ContentPoll::Ready(ContentResponse::new(format!("asset/{}", ticket.0)))
            }
            ContentScript::ReadyAfter(_) | ContentScript::Hanging => {
                *count += 1;
                ContentPoll::Pending
            }
            ContentScript::Failing(failure) => ContentPoll::Failed(failure.clone()),
        }
    }

    fn cancel(&mut self, ticket: ContentTicket) {
        self.cancelled.push(ticket);
    }
}

/// Short presentation holds, a short course and a runway the craft drops
/// straight onto.
pub(crate) fn test_tuning() -> MissionTuning {
    let mut tuning = MissionTuning::default();
    tuning.presentation.dispatch_seconds = 0.1;
    tuning.presentation.arrival_seconds = 0.1;
    tuning.presentation.return_seconds = 0.1;
    tuning.flight.min_distance = 600.0;
    tuning.flight.target_distance = 1200.0;
    tuning.flight.obstacle_count = 2;
    tuning.flight.obstacle_start = 300.0;
    tuning.flight.obstacle_spacing = 300.0;
    tuning.landing.start_offset_x = 0.0;
    tuning.landing.start_altitude = 100.0;
    tuning.landing.start_velocity = Vec2::ZERO;
    tuning.landing.drag = 0.98;
    tuning
}

pub(crate) fn test_roster() -> CharacterRoster {
    CharacterRoster::from_defs(vec![
        CharacterDef {
            id: "jett".to_string(),
            label: "Jett".to_string(),
            transform_frames: 12,
            frame_rate: Some(60.0),
        },
        CharacterDef {
            id: "donnie".to_string(),
            label: "Donnie".to_string(),
            transform_frames: 8,
            frame_rate: Some(60.0),
        },
        CharacterDef {
            id: "paul".to_string(),
            label: "Paul".to_string(),
            transform_frames: 6,
            frame_rate: Some(60.0),
        },
    ])
}

pub(crate) fn runtime_with(
    tuning: MissionTuning,
    roster: CharacterRoster,
    content: Box<dyn ContentService>,
) -> (MissionRuntime, Rc<RefCell<RenderLog>>) {
    let log = Rc::new(RefCell::new(RenderLog::default()));
    let runtime = MissionRuntime {
        tuning,
        roster,
        services: Services {
            renderer: Box::new(RecordingRenderer { log: Rc::clone(&log) }),
            content,
            quests: Box::new(ObjectiveMatcher),
            frames: Box::new(SyntheticFrameSource::default()),
        },
    };
    (runtime, log)
}

pub(crate) fn runtime() -> (MissionRuntime, Rc<RefCell<RenderLog>>) {
    runtime_with(
        test_tuning(),
        test_roster(),
        Box::new(ScriptedContent::instant()),
    )
}

/// Holds Jump through launch and transformation; everything else coasts.
/// Exploration is left to the test.
pub(crate) fn autopilot(sequencer: &MissionSequencer) -> InputSnapshot {
    match sequencer.active_phase() {
        Some(PhaseId::Launch | PhaseId::Transformation) => {
            InputSnapshot::empty().with_action_down(InputAction::Jump, true)
        }
        _ => InputSnapshot::empty(),
    }
}

/// Ticks with `input` until `done` holds. Panics past `max_ticks`.
pub(crate) fn run_with(
    sequencer: &mut MissionSequencer,
    runtime: &mut MissionRuntime,
    max_ticks: usize,
    mut input: impl FnMut(&MissionSequencer) -> InputSnapshot,
    mut done: impl FnMut(&MissionSequencer) -> bool,
) -> Result<usize, MissionError> {
    for tick in 0..max_ticks {
        if done(sequencer) {
            return Ok(tick);
        }
        let snapshot = input(sequencer);
        sequencer.update(DT, &snapshot, runtime)?;
    }
    assert!(done(sequencer), "condition not reached in {max_ticks} ticks");
    Ok(max_ticks)
}

pub(crate) fn run_until(
    sequencer: &mut MissionSequencer,
    runtime: &mut MissionRuntime,
    max_ticks: usize,
    done: impl FnMut(&MissionSequencer) -> bool,
) -> Result<usize, MissionError> {
    run_with(sequencer, runtime, max_ticks, autopilot, done)
}

/// Runs to exploration and spends its loading tick, so the next update
/// already reads input.
pub(crate) fn run_to_exploration(
    sequencer: &mut MissionSequencer,
    runtime: &mut MissionRuntime,
) -> Result<(), MissionError> {
    run_until(sequencer, runtime, 5_000, |seq| {
        seq.current_phase() == Some(PhaseId::Exploration)
    })?;
    sequencer.update(DT, &InputSnapshot::empty(), runtime)?;
    Ok(())
}

pub(crate) fn tick(
    sequencer: &mut MissionSequencer,
    runtime: &mut MissionRuntime,
    input: InputSnapshot,
) -> Result<SequencerStatus, MissionError> {
    sequencer.update(DT, &input, runtime)
}

pub(crate) fn press(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_pressed(action)
}

pub(crate) fn delivery(character: &str) -> MissionSequencer {
    MissionSequencer::new(MissionContext::new(
        "m-1",
        MissionKind::Delivery,
        character,
        "harbor",
    ))
}
