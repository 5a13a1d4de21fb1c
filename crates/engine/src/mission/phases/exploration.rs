use tracing::{debug, info};

use crate::app::{InputAction, InputSnapshot};
use crate::mission::context::{PhaseId, PhaseResult};
use crate::mission::error::MissionError;
use crate::mission::loading::AssetGate;
use crate::mission::phase::{
    PhaseActivity, PhaseController, PhaseEnv, PhaseStatus, SummonRequest,
};
use crate::mission::services::{ContentKind, ContentRequest, ModelView, PhaseNotice, Services};
use crate::sim::{
    ExplorationWorld, ExploreControls, Interaction, ObjectiveTarget, SceneSnapshot, TimerSet,
    WorldEvent,
};

const RENDER_TIMER: &str = "render";
const DIALOGUE_TIMER: &str = "dialogue_close";
const ASSET_SLOT: &str = "destination";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummonMenu {
    options: Vec<String>,
    selected: usize,
}

impl SummonMenu {
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        self.options.get(self.selected).map(String::as_str)
    }

    fn cycle(&mut self, step: isize) {
        let len = self.options.len() as isize;
        if len > 0 {
            self.selected = (self.selected as isize + step).rem_euclid(len) as usize;
        }
    }
}

enum MenuAction {
    Close,
    Choose(String),
    Browse,
}

/// Open-ended platformer scene. Completes only when the player finishes it;
/// a summon suspends it instead.
pub struct ExplorationPhase {
    world: ExplorationWorld,
    gate: AssetGate,
    timers: TimerSet,
    paused: bool,
    menu: Option<SummonMenu>,
    render_interval_seconds: f32,
    dialogue_seconds: f32,
    elapsed_seconds: f32,
}

impl ExplorationPhase {
    pub fn new(env: &PhaseEnv<'_>) -> Self {
        let tuning = env.tuning.exploration.clone();
        let world = ExplorationWorld::generate(
            env.context.destination(),
            env.context.character_id(),
            tuning,
        );
        Self::with_world(world, env)
    }

    /// Rebuilds a suspended scene from its snapshot and the time already
    /// spent in it. The result stays paused until `resume`.
    pub fn from_snapshot(
        snapshot: &SceneSnapshot,
        elapsed_seconds: f32,
        env: &PhaseEnv<'_>,
    ) -> Result<Self, MissionError> {
        let world = ExplorationWorld::from_snapshot(snapshot, env.tuning.exploration.clone())?;
        let mut phase = Self::with_world(world, env);
        phase.paused = true;
        phase.elapsed_seconds = elapsed_seconds;
        Ok(phase)
    }

    fn with_world(world: ExplorationWorld, env: &PhaseEnv<'_>) -> Self {
        let tuning = &env.tuning.exploration;
        Self {
            world,
            gate: AssetGate::new(PhaseId::Exploration, env.tuning.loading.timeout_seconds),
            timers: TimerSet::default(),
            paused: false,
            menu: None,
            render_interval_seconds: tuning.render_interval_seconds,
            dialogue_seconds: tuning.dialogue_auto_close_seconds,
            elapsed_seconds: 0.0,
        }
    }

    pub fn world(&self) -> &ExplorationWorld {
        &self.world
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed_seconds
    }

    pub fn menu(&self) -> Option<&SummonMenu> {
        self.menu.as_ref()
    }

    pub fn capture_snapshot(&self) -> SceneSnapshot {
        self.world.capture()
    }

    pub fn restore_snapshot(&mut self, snapshot: &SceneSnapshot) -> Result<(), MissionError> {
        self.world.restore(snapshot)?;
        Ok(())
    }

    pub fn add_partner(&mut self, partner_id: &str) -> usize {
        self.world.add_actor(partner_id)
    }

    /// Stops all ticking and drops render resources. Simulation state is
    /// kept. Returns how many timers were cleared.
    pub fn suspend(&mut self, services: &mut Services) -> usize {
        self.paused = true;
        self.menu = None;
        let cleared = self.timers.clear();
        self.gate.cancel_all(services.content.as_mut());
        services
            .renderer
            .show_phase(PhaseId::Exploration, &PhaseNotice::Paused);
        services.renderer.teardown();
        debug!(cleared, "exploration_suspended");
        cleared
    }

    pub fn resume(&mut self, services: &mut Services) {
        self.paused = false;
        self.timers
            .start_interval(RENDER_TIMER, self.render_interval_seconds);
        if self.world.dialogue().open {
            self.timers.start_once(DIALOGUE_TIMER, self.dialogue_seconds);
        }
        services
            .renderer
            .show_phase(PhaseId::Exploration, &PhaseNotice::Resumed);
        services.renderer.draw(&ModelView::Exploration(&self.world));
    }

    fn menu_action(&mut self, input: &InputSnapshot) -> Option<MenuAction> {
        let menu = self.menu.as_mut()?;
        if input.was_pressed(InputAction::SummonMenu) {
            return Some(MenuAction::Close);
        }
        if input.was_pressed(InputAction::MoveLeft) {
            menu.cycle(-1);
        }
        if input.was_pressed(InputAction::MoveRight) {
            menu.cycle(1);
        }
        if input.was_pressed(InputAction::Interact) {
            if let Some(choice) = menu.selected() {
                return Some(MenuAction::Choose(choice.to_string()));
            }
        }
        Some(MenuAction::Browse)
    }

    fn check_objective(&mut self, target: ObjectiveTarget, env: &mut PhaseEnv<'_>) {
        let Some(quest) = self.world.active_quest().filter(|quest| !quest.completed) else {
            return;
        };
        let check = env.services.quests.check_objective(quest, &target);
        if let Some(reward) = self.world.apply_objective(&target, check) {
            info!(
                mission = env.context.id(),
                money = reward.money,
                exp = reward.exp,
                "quest_completed"
            );
        }
    }

    fn finish(&self) -> PhaseStatus {
        let mut result = PhaseResult::succeeded(
            self.world.completed_quest_ids().len() as u32,
            self.elapsed_seconds,
        );
        result.rewards = self.world.accumulated_rewards();
        PhaseStatus::Complete(result)
    }
}

impl PhaseController for ExplorationPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Exploration
    }

    fn enter(&mut self, env: &mut PhaseEnv<'_>) {
        env.services
            .renderer
            .show_phase(PhaseId::Exploration, &PhaseNotice::Entered);
        let request = ContentRequest::new(ContentKind::Destination)
            .with_param("destination", env.context.destination())
            .with_param("layout", "exploration");
        self.gate
            .request(ASSET_SLOT, request, env.services.content.as_mut());
        self.gate.announce(env.services);
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        env: &mut PhaseEnv<'_>,
    ) -> PhaseStatus {
        if self.paused || self.gate.still_loading(fixed_dt_seconds, env.services) {
            return PhaseStatus::Continue;
        }
        if !self.timers.is_running(RENDER_TIMER) {
            self.timers
                .start_interval(RENDER_TIMER, self.render_interval_seconds);
        }
        self.elapsed_seconds += fixed_dt_seconds;

        let controls = match self.menu_action(input) {
            Some(MenuAction::Close) => {
                self.menu = None;
                ExploreControls::default()
            }
            Some(MenuAction::Choose(choice)) => {
                self.menu = None;
                if self.world.switch_control(&choice) {
                    info!(character = %choice, "control_switched");
                } else {
                    return PhaseStatus::Interrupt(SummonRequest { partner_id: choice });
                }
                ExploreControls::default()
            }
            Some(MenuAction::Browse) => ExploreControls::default(),
            None => {
                if input.was_pressed(InputAction::Finish) {
                    return self.finish();
                }
                if input.was_pressed(InputAction::SummonMenu) && !env.roster.is_empty() {
                    self.menu = Some(SummonMenu {
                        options: env.roster.ids().map(str::to_string).collect(),
                        selected: 0,
                    });
                }
                if input.was_pressed(InputAction::Interact) {
                    match self.world.interact() {
                        Interaction::Talked { npc_id } => {
                            self.timers.start_once(DIALOGUE_TIMER, self.dialogue_seconds);
                            self.check_objective(ObjectiveTarget::Npc(npc_id), env);
                        }
                        Interaction::Closed => {
                            self.timers.cancel(DIALOGUE_TIMER);
                        }
                        Interaction::Nothing => {}
                    }
                }
                ExploreControls {
                    move_axis: input.move_axis(),
                    jump: input.was_pressed(InputAction::Jump),
                }
            }
        };

        for event in self.world.step(fixed_dt_seconds, controls) {
            match event {
                WorldEvent::ItemCollected { item_type, .. } => {
                    self.check_objective(ObjectiveTarget::Item(item_type), env);
                }
            }
        }

        let mut fired = Vec::new();
        self.timers.tick(fixed_dt_seconds, &mut fired);
        for name in fired {
            match name {
                RENDER_TIMER => env
                    .services
                    .renderer
                    .draw(&ModelView::Exploration(&self.world)),
                DIALOGUE_TIMER => self.world.close_dialogue(),
                _ => {}
            }
        }
        PhaseStatus::Continue
    }

    fn exit(&mut self, env: &mut PhaseEnv<'_>) {
        self.menu = None;
        self.timers.clear();
        self.gate.cancel_all(env.services.content.as_mut());
    }

    fn live_timers(&self) -> usize {
        self.timers.len()
    }

    fn activity(&self) -> PhaseActivity {
        PhaseActivity::AwaitingInput
    }

    fn debug_title(&self) -> Option<String> {
        let actor = self.world.controlled()?;
        Some(format!(
            "exploration actor={} x={:.0} paused={}",
            actor.character_id, actor.body.position.x, self.paused
        ))
    }

    fn as_exploration(&self) -> Option<&ExplorationPhase> {
        Some(self)
    }

    fn as_exploration_mut(&mut self) -> Option<&mut ExplorationPhase> {
        Some(self)
    }
}
