use std::collections::BTreeMap;

use crate::tuning::ExplorationTuning;

use super::math::Vec2;
use super::physics::{integrate, PhysicsBody, StepParams};
use super::snapshot::{
    ActorSnapshot, ActorState, CameraState, DialogueState, ItemState, NpcState, ObjectiveTarget,
    QuestObjective, QuestState, Rewards, SceneSnapshot, SnapshotError,
};

const ACTOR_HALF_EXTENTS: Vec2 = Vec2::new(16.0, 24.0);
const ITEM_TYPES: [&str; 2] = ["parcel", "flower"];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExploreControls {
    /// -1.0 for left, 1.0 for right.
    pub move_axis: f32,
    pub jump: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub character_id: String,
    pub body: PhysicsBody,
    pub on_ground: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    ItemCollected { item_id: String, item_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Talked { npc_id: String },
    Closed,
    Nothing,
}

/// Outcome of asking the quest service about a touched target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectiveCheck {
    pub completed: bool,
    pub quest_complete: bool,
}

/// Live platformer scene at a destination.
#[derive(Debug, Clone)]
pub struct ExplorationWorld {
    tuning: ExplorationTuning,
    actors: Vec<Actor>,
    controlled_index: usize,
    camera: CameraState,
    npcs: Vec<NpcState>,
    items: Vec<ItemState>,
    active_quest: Option<QuestState>,
    dialogue: DialogueState,
    collected_item_counts: BTreeMap<String, u32>,
    completed_quest_ids: Vec<String>,
    accumulated_rewards: Rewards,
}

impl ExplorationWorld {
    /// Lays out npcs, items and a delivery quest for `destination` with
    /// `character_id` standing at the origin.
    pub fn generate(destination: &str, character_id: &str, tuning: ExplorationTuning) -> Self {
        let ground_y = tuning.ground_y;
        let npcs: Vec<NpcState> = (0..tuning.npc_count)
            .map(|i| NpcState {
                id: format!("{destination}-npc-{i}"),
                position: Vec2::new(200.0 + i as f32 * 250.0, ground_y),
                dialogue_index: 0,
                quest_ref: (i == 0).then(|| format!("{destination}-quest")),
            })
            .collect();
        let items: Vec<ItemState> = (0..tuning.item_count)
            .map(|i| ItemState {
                id: format!("{destination}-item-{i}"),
                item_type: ITEM_TYPES[i as usize % ITEM_TYPES.len()].to_string(),
                position: Vec2::new(-150.0 - i as f32 * 180.0, ground_y),
                collected: false,
            })
            .collect();

        let mut objectives = Vec::new();
        if let Some(npc) = npcs.first() {
            objectives.push(QuestObjective {
                target: ObjectiveTarget::Npc(npc.id.clone()),
                completed: false,
            });
        }
        if let Some(item) = items.first() {
            objectives.push(QuestObjective {
                target: ObjectiveTarget::Item(item.item_type.clone()),
                completed: false,
            });
        }
        let active_quest = (!objectives.is_empty()).then(|| QuestState {
            quest_id: format!("{destination}-quest"),
            objectives,
            completed: false,
            reward: Rewards {
                money: tuning.quest_reward_money,
                exp: tuning.quest_reward_exp,
            },
        });

        let player = Actor {
            character_id: character_id.to_string(),
            body: PhysicsBody::new(Vec2::new(0.0, ground_y), Vec2::ZERO, ACTOR_HALF_EXTENTS),
            on_ground: true,
        };
        Self {
            camera: CameraState {
                position: player.body.position,
                zoom: 1.0,
            },
            tuning,
            actors: vec![player],
            controlled_index: 0,
            npcs,
            items,
            active_quest,
            dialogue: DialogueState::default(),
            collected_item_counts: BTreeMap::new(),
            completed_quest_ids: Vec::new(),
            accumulated_rewards: Rewards::default(),
        }
    }

    pub fn from_snapshot(
        snapshot: &SceneSnapshot,
        tuning: ExplorationTuning,
    ) -> Result<Self, SnapshotError> {
        let mut world = Self {
            tuning,
            actors: Vec::new(),
            controlled_index: 0,
            camera: CameraState::default(),
            npcs: Vec::new(),
            items: Vec::new(),
            active_quest: None,
            dialogue: DialogueState::default(),
            collected_item_counts: BTreeMap::new(),
            completed_quest_ids: Vec::new(),
            accumulated_rewards: Rewards::default(),
        };
        world.restore(snapshot)?;
        Ok(world)
    }

    pub fn capture(&self) -> SceneSnapshot {
        SceneSnapshot {
            actor_state: ActorSnapshot {
                actors: self
                    .actors
                    .iter()
                    .map(|actor| ActorState {
                        character_id: actor.character_id.clone(),
                        position: actor.body.position,
                        velocity: actor.body.velocity,
                        on_ground: actor.on_ground,
                    })
                    .collect(),
                controlled_index: self.controlled_index,
            },
            camera: self.camera,
            npcs: self.npcs.clone(),
            items: self.items.clone(),
            active_quest: self.active_quest.clone(),
            dialogue: self.dialogue.clone(),
            collected_item_counts: self.collected_item_counts.clone(),
            completed_quest_ids: self.completed_quest_ids.clone(),
            accumulated_rewards: self.accumulated_rewards,
        }
    }

    /// Replaces the whole scene state. The world is left untouched when the
    /// snapshot fails validation.
    pub fn restore(&mut self, snapshot: &SceneSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        self.actors = snapshot
            .actor_state
            .actors
            .iter()
            .map(|state| Actor {
                character_id: state.character_id.clone(),
                body: PhysicsBody::new(state.position, state.velocity, ACTOR_HALF_EXTENTS),
                on_ground: state.on_ground,
            })
            .collect();
        self.controlled_index = snapshot.actor_state.controlled_index;
        self.camera = snapshot.camera;
        self.npcs = snapshot.npcs.clone();
        self.items = snapshot.items.clone();
        self.active_quest = snapshot.active_quest.clone();
        self.dialogue = snapshot.dialogue.clone();
        self.collected_item_counts = snapshot.collected_item_counts.clone();
        self.completed_quest_ids = snapshot.completed_quest_ids.clone();
        self.accumulated_rewards = snapshot.accumulated_rewards;
        Ok(())
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn controlled(&self) -> Option<&Actor> {
        self.actors.get(self.controlled_index)
    }

    pub fn controlled_index(&self) -> usize {
        self.controlled_index
    }

    pub fn has_actor(&self, character_id: &str) -> bool {
        self.actors
            .iter()
            .any(|actor| actor.character_id == character_id)
    }

    pub fn camera(&self) -> CameraState {
        self.camera
    }

    pub fn npcs(&self) -> &[NpcState] {
        &self.npcs
    }

    pub fn items(&self) -> &[ItemState] {
        &self.items
    }

    pub fn active_quest(&self) -> Option<&QuestState> {
        self.active_quest.as_ref()
    }

    pub fn dialogue(&self) -> &DialogueState {
        &self.dialogue
    }

    pub fn collected_item_counts(&self) -> &BTreeMap<String, u32> {
        &self.collected_item_counts
    }

    pub fn completed_quest_ids(&self) -> &[String] {
        &self.completed_quest_ids
    }

    pub fn accumulated_rewards(&self) -> Rewards {
        self.accumulated_rewards
    }

    /// Adds `character_id` at `partner_offset_x` ahead of the controlled actor
    /// and returns its index. When that spot is past the scene edge the
    /// partner lands the same distance behind instead.
    pub fn add_actor(&mut self, character_id: &str) -> usize {
        let anchor = self
            .controlled()
            .map(|actor| actor.body.position)
            .unwrap_or(Vec2::new(0.0, self.tuning.ground_y));
        let offset = self.tuning.partner_offset_x;
        let ahead = anchor.x + offset;
        let x = if (self.tuning.min_x..=self.tuning.max_x).contains(&ahead) {
            ahead
        } else {
            (anchor.x - offset).clamp(self.tuning.min_x, self.tuning.max_x)
        };
        self.actors.push(Actor {
            character_id: character_id.to_string(),
            body: PhysicsBody::new(Vec2::new(x, anchor.y), Vec2::ZERO, ACTOR_HALF_EXTENTS),
            on_ground: anchor.y <= self.tuning.ground_y,
        });
        self.actors.len() - 1
    }

    pub fn switch_control(&mut self, character_id: &str) -> bool {
        match self
            .actors
            .iter()
            .position(|actor| actor.character_id == character_id)
        {
            Some(index) => {
                if let Some(actor) = self.actors.get_mut(self.controlled_index) {
                    actor.body.velocity.x = 0.0;
                }
                self.controlled_index = index;
                true
            }
            None => false,
        }
    }

    pub fn step(&mut self, dt_seconds: f32, controls: ExploreControls) -> Vec<WorldEvent> {
        let tuning = &self.tuning;
        let params = StepParams {
            drag: 1.0,
            max_speed: Vec2::new(tuning.move_speed, tuning.max_fall_speed.max(tuning.jump_speed)),
        };
        let gravity = Vec2::new(0.0, -tuning.gravity);

        for (index, actor) in self.actors.iter_mut().enumerate() {
            if index == self.controlled_index {
                actor.body.velocity.x = controls.move_axis.clamp(-1.0, 1.0) * tuning.move_speed;
                if controls.jump && actor.on_ground {
                    actor.body.velocity.y = tuning.jump_speed;
                    actor.on_ground = false;
                }
            } else {
                actor.body.velocity.x = 0.0;
            }

            integrate(&mut actor.body, gravity, dt_seconds, &params);
            if actor.body.velocity.y < -tuning.max_fall_speed {
                actor.body.velocity.y = -tuning.max_fall_speed;
            }
            if actor.body.position.y <= tuning.ground_y {
                actor.body.position.y = tuning.ground_y;
                actor.body.velocity.y = 0.0;
                actor.on_ground = true;
            } else {
                actor.on_ground = false;
            }
            actor.body.position.x = actor.body.position.x.clamp(tuning.min_x, tuning.max_x);
        }

        let Some(focus) = self.controlled().map(|actor| actor.body.position) else {
            return Vec::new();
        };
        let follow = self.tuning.camera_follow.clamp(0.0, 1.0);
        self.camera.position.x += (focus.x - self.camera.position.x) * follow;
        self.camera.position.y += (focus.y - self.camera.position.y) * follow;

        self.collect_items_near(focus)
    }

    fn collect_items_near(&mut self, focus: Vec2) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        for item in self.items.iter_mut().filter(|item| !item.collected) {
            if item.position.distance_to(focus) > self.tuning.pickup_radius {
                continue;
            }
            item.collected = true;
            *self
                .collected_item_counts
                .entry(item.item_type.clone())
                .or_insert(0) += 1;
            self.accumulated_rewards.add(Rewards {
                money: self.tuning.item_reward_money,
                exp: 0,
            });
            events.push(WorldEvent::ItemCollected {
                item_id: item.id.clone(),
                item_type: item.item_type.clone(),
            });
        }
        events
    }

    /// Talks to the nearest npc in range, or closes an open dialogue when
    /// nobody is close enough.
    pub fn interact(&mut self) -> Interaction {
        let Some(focus) = self.controlled().map(|actor| actor.body.position) else {
            return Interaction::Nothing;
        };
        let radius = self.tuning.interact_radius;
        let nearest = self
            .npcs
            .iter_mut()
            .map(|npc| (npc.position.distance_to(focus), npc))
            .filter(|(distance, _)| *distance <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, npc)| npc);

        match nearest {
            Some(npc) => {
                self.dialogue = DialogueState {
                    open: true,
                    npc_id: Some(npc.id.clone()),
                    node: npc.dialogue_index,
                };
                npc.dialogue_index += 1;
                Interaction::Talked {
                    npc_id: npc.id.clone(),
                }
            }
            None if self.dialogue.open => {
                self.dialogue = DialogueState::default();
                Interaction::Closed
            }
            None => Interaction::Nothing,
        }
    }

    pub fn close_dialogue(&mut self) {
        self.dialogue = DialogueState::default();
    }

    /// Records a quest-service verdict for `target`. Returns the quest reward
    /// when this check completed the quest.
    pub fn apply_objective(&mut self, target: &ObjectiveTarget, check: ObjectiveCheck) -> Option<Rewards> {
        let quest = self.active_quest.as_mut().filter(|quest| !quest.completed)?;
        if check.completed {
            if let Some(objective) = quest
                .objectives
                .iter_mut()
                .find(|objective| &objective.target == target && !objective.completed)
            {
                objective.completed = true;
            }
        }
        if !check.quest_complete {
            return None;
        }
        quest.completed = true;
        let reward = quest.reward;
        self.completed_quest_ids.push(quest.quest_id.clone());
        self.accumulated_rewards.add(reward);
        Some(reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> ExplorationWorld {
        ExplorationWorld::generate("paris", "jett", ExplorationTuning::default())
    }

    fn walk(world: &mut ExplorationWorld, axis: f32, ticks: usize) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(world.step(
                DT,
                ExploreControls {
                    move_axis: axis,
                    jump: false,
                },
            ));
        }
        events
    }

    #[test]
    fn generated_layout_is_consistent() {
        let world = world();
        assert_eq!(world.npcs().len(), 3);
        assert_eq!(world.items().len(), 4);
        let quest = world.active_quest().expect("quest");
        assert_eq!(quest.quest_id, "paris-quest");
        assert_eq!(world.npcs()[0].quest_ref.as_deref(), Some("paris-quest"));
        world.capture().validate().expect("valid layout");
    }

    #[test]
    fn walking_over_an_item_collects_it_once() {
        let mut world = world();
        let events = walk(&mut world, -1.0, 60);
        assert_eq!(
            events,
            vec![WorldEvent::ItemCollected {
                item_id: "paris-item-0".to_string(),
                item_type: "parcel".to_string(),
            }]
        );
        assert_eq!(world.collected_item_counts().get("parcel"), Some(&1));
        assert_eq!(world.accumulated_rewards().money, 5);

        let more = walk(&mut world, 1.0, 5);
        assert!(more.is_empty());
    }

    #[test]
    fn interacting_near_an_npc_opens_dialogue_and_advances_lines() {
        let mut world = world();
        walk(&mut world, 1.0, 60);
        assert_eq!(
            world.interact(),
            Interaction::Talked {
                npc_id: "paris-npc-0".to_string()
            }
        );
        assert!(world.dialogue().open);
        assert_eq!(world.dialogue().node, 0);
        world.interact();
        assert_eq!(world.dialogue().node, 1);

        walk(&mut world, -1.0, 60);
        assert_eq!(world.interact(), Interaction::Closed);
        assert!(!world.dialogue().open);
    }

    #[test]
    fn completing_every_objective_pays_the_quest_reward() {
        let mut world = world();
        let npc = ObjectiveTarget::Npc("paris-npc-0".to_string());
        let parcel = ObjectiveTarget::Item("parcel".to_string());
        assert_eq!(
            world.apply_objective(
                &npc,
                ObjectiveCheck {
                    completed: true,
                    quest_complete: false
                }
            ),
            None
        );
        let reward = world.apply_objective(
            &parcel,
            ObjectiveCheck {
                completed: true,
                quest_complete: true,
            },
        );
        assert_eq!(reward, Some(Rewards { money: 100, exp: 50 }));
        assert_eq!(world.completed_quest_ids(), ["paris-quest".to_string()]);
        assert!(world.active_quest().expect("quest").completed);

        let again = world.apply_objective(
            &parcel,
            ObjectiveCheck {
                completed: true,
                quest_complete: true,
            },
        );
        assert_eq!(again, None);
        assert_eq!(world.accumulated_rewards().money, 100);
    }

    #[test]
    fn jump_leaves_the_ground_and_lands_again() {
        let mut world = world();
        world.step(
            DT,
            ExploreControls {
                move_axis: 0.0,
                jump: true,
            },
        );
        let actor = world.controlled().expect("actor");
        assert!(!actor.on_ground);
        assert!(actor.body.position.y > 0.0);

        walk(&mut world, 0.0, 120);
        let actor = world.controlled().expect("actor");
        assert!(actor.on_ground);
        assert_eq!(actor.body.position.y, 0.0);
    }

    #[test]
    fn partner_appears_beside_the_player_and_can_take_control() {
        let mut world = world();
        walk(&mut world, 1.0, 30);
        let player_x = world.controlled().expect("player").body.position.x;
        let index = world.add_actor("donnie");
        assert_eq!(index, 1);
        let partner = &world.actors()[1];
        assert!((partner.body.position.x - (player_x + 150.0)).abs() < 1e-3);
        assert_eq!(world.controlled_index(), 0);

        assert!(world.switch_control("donnie"));
        assert_eq!(world.controlled().expect("partner").character_id, "donnie");
        assert!(!world.switch_control("paul"));
    }

    #[test]
    fn partner_near_the_scene_edge_lands_behind_the_player() {
        let mut world = world();
        let mut snapshot = world.capture();
        let edge = ExplorationTuning::default().max_x;
        snapshot.actor_state.actors[0].position.x = edge - 50.0;
        world.restore(&snapshot).expect("restore");

        world.add_actor("donnie");
        let partner = &world.actors()[1];
        assert!((partner.body.position.x - (edge - 200.0)).abs() < 1e-3);
    }

    #[test]
    fn capture_then_restore_reproduces_the_scene() {
        let mut world = world();
        walk(&mut world, -1.0, 60);
        world.add_actor("donnie");
        let snapshot = world.capture();

        let restored =
            ExplorationWorld::from_snapshot(&snapshot, ExplorationTuning::default()).expect("restore");
        assert_eq!(restored.capture(), snapshot);
    }

    #[test]
    fn invalid_snapshot_leaves_world_unchanged() {
        let mut world = world();
        let before = world.capture();
        let mut broken = before.clone();
        broken.npcs.clear();
        assert!(world.restore(&broken).is_err());
        assert_eq!(world.capture(), before);
    }
}
