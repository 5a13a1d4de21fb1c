#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    /// Also drives thrust, lift and playback hold outside exploration.
    Jump,
    Interact,
    SummonMenu,
    Finish,
}

const ACTION_COUNT: usize = 6;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Jump,
        InputAction::Interact,
        InputAction::SummonMenu,
        InputAction::Finish,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Interact => 3,
            InputAction::SummonMenu => 4,
            InputAction::Finish => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

/// Input state sampled once per fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    down: ActionStates,
    pressed: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down.is_down(action)
    }

    /// True only on the tick the action went down.
    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    /// Horizontal intent in [-1, 1].
    pub fn move_axis(&self) -> f32 {
        let mut axis = 0.0;
        if self.is_down(InputAction::MoveLeft) {
            axis -= 1.0;
        }
        if self.is_down(InputAction::MoveRight) {
            axis += 1.0;
        }
        axis
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.down.set(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.down.set(action, true);
        self.pressed.set(action, true);
        self
    }
}

/// Accumulates press/release events between ticks and turns them into
/// edge-triggered snapshots.
#[derive(Debug, Default)]
pub struct InputCollector {
    down: ActionStates,
    pressed_edges: ActionStates,
}

impl InputCollector {
    pub fn press(&mut self, action: InputAction) {
        if !self.down.is_down(action) {
            self.pressed_edges.set(action, true);
        }
        self.down.set(action, true);
    }

    pub fn release(&mut self, action: InputAction) {
        self.down.set(action, false);
    }

    pub fn release_all(&mut self) {
        self.down = ActionStates::default();
    }

    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            down: self.down,
            pressed: self.pressed_edges,
        };
        self.pressed_edges = ActionStates::default();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        input.press(InputAction::Interact);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::Interact));
        assert!(!second.was_pressed(InputAction::Interact));
        assert!(second.is_down(InputAction::Interact));
    }

    #[test]
    fn repeated_press_while_held_does_not_retrigger() {
        let mut input = InputCollector::default();
        input.press(InputAction::Jump);
        input.snapshot_for_tick();
        input.press(InputAction::Jump);

        assert!(!input.snapshot_for_tick().was_pressed(InputAction::Jump));

        input.release(InputAction::Jump);
        input.press(InputAction::Jump);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::Jump));
    }

    #[test]
    fn opposing_directions_cancel_out() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::MoveRight, true);
        assert_eq!(snapshot.move_axis(), 0.0);

        let left = InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true);
        assert_eq!(left.move_axis(), -1.0);
    }

    #[test]
    fn each_action_owns_a_separate_slot() {
        for action in InputAction::ALL {
            let snapshot = InputSnapshot::empty().with_action_down(action, true);
            let others = InputAction::ALL
                .iter()
                .filter(|other| **other != action)
                .filter(|other| snapshot.is_down(**other))
                .count();
            assert!(snapshot.is_down(action));
            assert_eq!(others, 0, "{action:?} leaked into another slot");
        }
    }
}
