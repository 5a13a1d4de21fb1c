use crate::tuning::LaunchTuning;

use super::math::Vec2;
use super::physics::{integrate, PhysicsBody, StepParams};

const ROCKET_HALF_EXTENTS: Vec2 = Vec2::new(20.0, 40.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchReport {
    pub elapsed_seconds: f32,
    pub hold_seconds: f32,
    pub thrust_progress: f32,
    pub lift_off_speed: f32,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaunchStatus {
    Holding,
    LiftOff(LaunchReport),
}

/// Hold-to-thrust mini-game. Lift-off is the only outcome; releasing thrust
/// bleeds progress and restarts the hold clock.
#[derive(Debug, Clone)]
pub struct LaunchGame {
    tuning: LaunchTuning,
    body: PhysicsBody,
    thrust_progress: f32,
    hold_seconds: f32,
    elapsed_seconds: f32,
    report: Option<LaunchReport>,
}

impl LaunchGame {
    pub fn new(tuning: LaunchTuning) -> Self {
        Self {
            tuning,
            body: PhysicsBody::new(Vec2::ZERO, Vec2::ZERO, ROCKET_HALF_EXTENTS),
            thrust_progress: 0.0,
            hold_seconds: 0.0,
            elapsed_seconds: 0.0,
            report: None,
        }
    }

    pub fn body(&self) -> &PhysicsBody {
        &self.body
    }

    pub fn thrust_progress(&self) -> f32 {
        self.thrust_progress
    }

    pub fn hold_seconds(&self) -> f32 {
        self.hold_seconds
    }

    pub fn step(&mut self, dt_seconds: f32, thrust_held: bool) -> LaunchStatus {
        if let Some(report) = self.report {
            return LaunchStatus::LiftOff(report);
        }

        self.elapsed_seconds += dt_seconds;
        if thrust_held {
            self.hold_seconds += dt_seconds;
            self.thrust_progress += self.tuning.thrust_rate * dt_seconds;
        } else {
            self.hold_seconds = 0.0;
            self.thrust_progress =
                (self.thrust_progress - self.tuning.progress_decay_rate * dt_seconds).max(0.0);
        }

        let thrust = if thrust_held {
            self.tuning.thrust_accel
        } else {
            0.0
        };
        integrate(
            &mut self.body,
            Vec2::new(0.0, thrust - self.tuning.gravity),
            dt_seconds,
            &StepParams::uniform(self.tuning.drag, self.tuning.max_speed),
        );
        if self.body.position.y <= 0.0 {
            self.body.position.y = 0.0;
            self.body.velocity.y = self.body.velocity.y.max(0.0);
        }

        let ready = self.thrust_progress > self.tuning.progress_threshold
            && self.hold_seconds >= self.tuning.min_hold_seconds;
        if !ready {
            return LaunchStatus::Holding;
        }

        let report = LaunchReport {
            elapsed_seconds: self.elapsed_seconds,
            hold_seconds: self.hold_seconds,
            thrust_progress: self.thrust_progress,
            lift_off_speed: self.body.velocity.y.max(0.0),
            score: self.score_for(self.elapsed_seconds),
        };
        self.report = Some(report);
        LaunchStatus::LiftOff(report)
    }

    fn score_for(&self, elapsed_seconds: f32) -> u32 {
        let rate = self.tuning.thrust_rate.max(f32::EPSILON);
        let ideal = self
            .tuning
            .min_hold_seconds
            .max(self.tuning.progress_threshold / rate);
        let excess = (elapsed_seconds - ideal).max(0.0);
        let window = (self.tuning.perfect_window_seconds * 4.0).max(f32::EPSILON);
        (100.0 * (1.0 - excess / window)).clamp(0.0, 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn run_held(game: &mut LaunchGame, ticks: u32) -> LaunchStatus {
        let mut status = LaunchStatus::Holding;
        for _ in 0..ticks {
            status = game.step(DT, true);
            if matches!(status, LaunchStatus::LiftOff(_)) {
                break;
            }
        }
        status
    }

    #[test]
    fn continuous_hold_lifts_off_after_threshold_and_min_hold() {
        let mut game = LaunchGame::new(LaunchTuning::default());
        let status = run_held(&mut game, 600);
        let LaunchStatus::LiftOff(report) = status else {
            panic!("expected lift-off, got {status:?}");
        };
        assert!(report.thrust_progress > 250.0);
        assert!(report.hold_seconds >= 1.2);
        assert!(report.elapsed_seconds >= 1.2);
        assert!(report.lift_off_speed > 0.0);
        assert!(report.score >= 90);
    }

    #[test]
    fn min_hold_gates_lift_off_even_when_threshold_is_met() {
        let tuning = LaunchTuning {
            thrust_rate: 10_000.0,
            ..LaunchTuning::default()
        };
        let mut game = LaunchGame::new(tuning);
        for _ in 0..60 {
            assert_eq!(game.step(DT, true), LaunchStatus::Holding);
        }
        assert!(game.thrust_progress() > 250.0);
        assert!(matches!(run_held(&mut game, 30), LaunchStatus::LiftOff(_)));
    }

    #[test]
    fn releasing_thrust_restarts_the_hold_and_bleeds_progress() {
        let mut game = LaunchGame::new(LaunchTuning::default());
        for _ in 0..60 {
            game.step(DT, true);
        }
        let before = game.thrust_progress();
        game.step(DT, false);
        assert_eq!(game.hold_seconds(), 0.0);
        assert!(game.thrust_progress() < before);
        assert_eq!(game.body().position.y.min(0.0), 0.0);
    }

    #[test]
    fn lift_off_is_sticky() {
        let mut game = LaunchGame::new(LaunchTuning::default());
        let first = run_held(&mut game, 600);
        assert_eq!(game.step(DT, false), first);
    }

    #[test]
    fn late_lift_off_scores_lower() {
        let mut prompt = LaunchGame::new(LaunchTuning::default());
        let LaunchStatus::LiftOff(fast) = run_held(&mut prompt, 600) else {
            panic!("no lift-off");
        };

        let mut hesitant = LaunchGame::new(LaunchTuning::default());
        for _ in 0..60 {
            hesitant.step(DT, true);
        }
        for _ in 0..60 {
            hesitant.step(DT, false);
        }
        let LaunchStatus::LiftOff(slow) = run_held(&mut hesitant, 600) else {
            panic!("no lift-off");
        };
        assert!(slow.score < fast.score);
    }
}
