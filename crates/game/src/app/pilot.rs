use mission_engine::mission::{ExplorationPhase, SequencerStatus};
use mission_engine::sim::{ExplorationWorld, ObjectiveTarget, Vec2};
use mission_engine::{InputAction, InputCollector, MissionSequencer, MissionTuning, PhaseId};

use super::adapters::Telemetry;

const STEER_DEADBAND: f32 = 5.0;

/// Actions for one tick. Taps produce a fresh press edge; held actions stay
/// down; everything else is released.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Controls {
    held: Vec<InputAction>,
    taps: Vec<InputAction>,
}

impl Controls {
    fn hold(action: InputAction) -> Self {
        Self {
            held: vec![action],
            taps: Vec::new(),
        }
    }

    fn tap(action: InputAction) -> Self {
        Self {
            held: Vec::new(),
            taps: vec![action],
        }
    }

    pub(crate) fn apply(&self, collector: &mut InputCollector) {
        for action in InputAction::ALL {
            if self.taps.contains(&action) {
                collector.release(action);
                collector.press(action);
            } else if self.held.contains(&action) {
                collector.press(action);
            } else {
                collector.release(action);
            }
        }
    }
}

/// Scripted player for headless runs: flies every phase, walks the quest,
/// summons the partner once and then finishes exploration.
#[derive(Debug, Clone)]
pub(crate) struct Pilot {
    partner: Option<String>,
    summon_requested: bool,
    cruise_altitude: f32,
    runway_x: f32,
    safe_speed: f32,
    reach: f32,
    exploration_ticks: u32,
    exploration_budget_ticks: u32,
}

impl Pilot {
    pub(crate) fn new(tuning: &MissionTuning, partner: Option<String>, target_tps: u32) -> Self {
        Self {
            partner,
            summon_requested: false,
            cruise_altitude: (tuning.flight.floor_y + tuning.flight.ceiling_y) * 0.5,
            runway_x: tuning.landing.runway_x,
            safe_speed: tuning.landing.speed_threshold * 0.5,
            reach: tuning.exploration.interact_radius * 0.5,
            exploration_ticks: 0,
            exploration_budget_ticks: target_tps.saturating_mul(60),
        }
    }

    pub(crate) fn drive(&mut self, sequencer: &MissionSequencer, telemetry: &Telemetry) -> Controls {
        match sequencer.active_phase() {
            Some(PhaseId::Launch | PhaseId::Transformation) => Controls::hold(InputAction::Jump),
            Some(PhaseId::Flight) => match telemetry.flight_altitude {
                Some(altitude) if altitude < self.cruise_altitude => {
                    Controls::hold(InputAction::Jump)
                }
                _ => Controls::default(),
            },
            Some(PhaseId::Landing) => self.land(telemetry),
            Some(PhaseId::Exploration) if sequencer.status() == SequencerStatus::Running => {
                match sequencer.exploration() {
                    Some(phase) => self.explore(phase),
                    None => Controls::default(),
                }
            }
            _ => Controls::default(),
        }
    }

    fn land(&self, telemetry: &Telemetry) -> Controls {
        let (Some(position), Some(velocity)) =
            (telemetry.landing_position, telemetry.landing_velocity)
        else {
            return Controls::default();
        };
        let mut controls = Controls::default();
        let desired_vx = ((self.runway_x - position.x) * 0.5).clamp(-self.safe_speed, self.safe_speed);
        if velocity.x < desired_vx - STEER_DEADBAND {
            controls.held.push(InputAction::MoveRight);
        } else if velocity.x > desired_vx + STEER_DEADBAND {
            controls.held.push(InputAction::MoveLeft);
        }
        if velocity.y < -self.safe_speed {
            controls.held.push(InputAction::Jump);
        }
        controls
    }

    fn explore(&mut self, phase: &ExplorationPhase) -> Controls {
        if phase.is_paused() {
            return Controls::default();
        }
        self.exploration_ticks += 1;

        if let Some(menu) = phase.menu() {
            let Some(partner) = self.partner.as_deref() else {
                return Controls::tap(InputAction::SummonMenu);
            };
            if !menu.options().iter().any(|option| option == partner) {
                self.summon_requested = true;
                return Controls::tap(InputAction::SummonMenu);
            }
            if menu.selected() == Some(partner) {
                self.summon_requested = true;
                return Controls::tap(InputAction::Interact);
            }
            return Controls::tap(InputAction::MoveRight);
        }

        if self.exploration_ticks > self.exploration_budget_ticks {
            return Controls::tap(InputAction::Finish);
        }
        let world = phase.world();
        if let Some(controls) = self.pursue_quest(world) {
            return controls;
        }
        if let Some(partner) = self.partner.as_deref() {
            if !self.summon_requested && !world.has_actor(partner) {
                return Controls::tap(InputAction::SummonMenu);
            }
        }
        Controls::tap(InputAction::Finish)
    }

    fn pursue_quest(&self, world: &ExplorationWorld) -> Option<Controls> {
        let quest = world.active_quest().filter(|quest| !quest.completed)?;
        let actor = world.controlled()?.body.position;
        let objective = quest.objectives.iter().find(|objective| !objective.completed)?;
        match &objective.target {
            ObjectiveTarget::Npc(npc_id) => {
                let npc = world.npcs().iter().find(|npc| &npc.id == npc_id)?;
                if (npc.position.x - actor.x).abs() <= self.reach {
                    Some(Controls::tap(InputAction::Interact))
                } else {
                    Some(walk_toward(actor, npc.position))
                }
            }
            ObjectiveTarget::Item(item_type) => {
                let item = world
                    .items()
                    .iter()
                    .filter(|item| !item.collected && &item.item_type == item_type)
                    .min_by(|a, b| {
                        a.position
                            .distance_to(actor)
                            .total_cmp(&b.position.distance_to(actor))
                    })?;
                Some(walk_toward(actor, item.position))
            }
        }
    }
}

fn walk_toward(from: Vec2, to: Vec2) -> Controls {
    if to.x >= from.x {
        Controls::hold(InputAction::MoveRight)
    } else {
        Controls::hold(InputAction::MoveLeft)
    }
}
