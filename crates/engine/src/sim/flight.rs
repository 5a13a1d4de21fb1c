use crate::tuning::FlightTuning;

use super::math::{Aabb, Vec2};
use super::physics::{integrate, PhysicsBody, StepParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleState {
    Ahead,
    Passed,
    Hit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub altitude: f32,
    pub state: ObstacleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightCompletion {
    Distance,
    CourseResolved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightReport {
    pub distance: f32,
    pub elapsed_seconds: f32,
    pub score: u32,
    pub passed: u32,
    pub hits: u32,
    pub completion: FlightCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightStatus {
    Flying,
    Complete(FlightReport),
}

/// Stable per-mission seed so the same mission id always flies the same course.
pub fn course_seed(mission_id: &str) -> u64 {
    mission_id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

pub fn build_course(tuning: &FlightTuning, seed: u64) -> Vec<Obstacle> {
    if tuning.obstacle_lanes.is_empty() {
        return Vec::new();
    }
    let lane_count = tuning.obstacle_lanes.len() as u64;
    (0..tuning.obstacle_count)
        .map(|index| {
            let lane = (seed.wrapping_add(u64::from(index) * 7) % lane_count) as usize;
            Obstacle {
                x: tuning.obstacle_start + index as f32 * tuning.obstacle_spacing,
                altitude: tuning.obstacle_lanes[lane],
                state: ObstacleState::Ahead,
            }
        })
        .collect()
}

/// Side-scrolling flight. `body.position.x` is the scrolled distance.
#[derive(Debug, Clone)]
pub struct FlightGame {
    tuning: FlightTuning,
    body: PhysicsBody,
    cruise_speed: f32,
    speed: f32,
    obstacles: Vec<Obstacle>,
    goal_distance: f32,
    score: u32,
    passed: u32,
    hits: u32,
    elapsed_seconds: f32,
    report: Option<FlightReport>,
}

impl FlightGame {
    pub fn new(tuning: FlightTuning, initial_speed: f32, obstacles: Vec<Obstacle>) -> Self {
        let goal_distance = if obstacles.is_empty() {
            tuning.min_distance
        } else {
            tuning.target_distance
        };
        let body = PhysicsBody::new(
            Vec2::new(0.0, tuning.start_altitude),
            Vec2::new(initial_speed, 0.0),
            tuning.player_half_extents,
        );
        Self {
            tuning,
            body,
            cruise_speed: initial_speed,
            speed: initial_speed,
            obstacles,
            goal_distance,
            score: 0,
            passed: 0,
            hits: 0,
            elapsed_seconds: 0.0,
            report: None,
        }
    }

    pub fn body(&self) -> &PhysicsBody {
        &self.body
    }

    pub fn distance(&self) -> f32 {
        self.body.position.x
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn step(&mut self, dt_seconds: f32, lift_held: bool) -> FlightStatus {
        if let Some(report) = self.report {
            return FlightStatus::Complete(report);
        }

        self.elapsed_seconds += dt_seconds;
        if self.speed < self.cruise_speed {
            self.speed =
                (self.speed + self.tuning.speed_recovery_accel * dt_seconds).min(self.cruise_speed);
        }

        let lift = if lift_held {
            self.tuning.lift_accel
        } else {
            0.0
        };
        self.body.velocity.x = self.speed;
        integrate(
            &mut self.body,
            Vec2::new(0.0, lift - self.tuning.gravity),
            dt_seconds,
            &StepParams {
                drag: self.tuning.drag,
                max_speed: Vec2::new(f32::MAX, self.tuning.max_vertical_speed),
            },
        );
        self.body.velocity.x = self.speed;
        self.clamp_altitude();
        self.resolve_obstacles();

        let distance = self.distance();
        let completion = if distance >= self.goal_distance {
            Some(FlightCompletion::Distance)
        } else if distance >= self.tuning.min_distance
            && !self.obstacles.is_empty()
            && self
                .obstacles
                .iter()
                .all(|obstacle| obstacle.state != ObstacleState::Ahead)
        {
            Some(FlightCompletion::CourseResolved)
        } else {
            None
        };

        match completion {
            Some(completion) => {
                let report = FlightReport {
                    distance,
                    elapsed_seconds: self.elapsed_seconds,
                    score: self.score,
                    passed: self.passed,
                    hits: self.hits,
                    completion,
                };
                self.report = Some(report);
                FlightStatus::Complete(report)
            }
            None => FlightStatus::Flying,
        }
    }

    fn clamp_altitude(&mut self) {
        let low = self.tuning.floor_y + self.body.half_extents.y;
        let high = self.tuning.ceiling_y - self.body.half_extents.y;
        if self.body.position.y < low {
            self.body.position.y = low;
            self.body.velocity.y = self.body.velocity.y.max(0.0);
        } else if self.body.position.y > high {
            self.body.position.y = high;
            self.body.velocity.y = self.body.velocity.y.min(0.0);
        }
    }

    fn resolve_obstacles(&mut self) {
        let player = self.body.bounds();
        let half = self.tuning.obstacle_half_extents;
        for obstacle in &mut self.obstacles {
            if obstacle.state != ObstacleState::Ahead {
                continue;
            }
            let zone = Aabb::new(Vec2::new(obstacle.x, obstacle.altitude), half);
            if player.overlaps(&zone) {
                obstacle.state = ObstacleState::Hit;
                self.hits += 1;
                self.score = self.score.saturating_sub(self.tuning.hit_penalty);
                self.speed *= self.tuning.hit_slowdown;
            } else if player.min().x > zone.max().x {
                obstacle.state = ObstacleState::Passed;
                self.passed += 1;
                self.score = self.score.saturating_add(self.tuning.pass_score);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn level_tuning(lanes: Vec<f32>, obstacle_count: u32) -> FlightTuning {
        FlightTuning {
            gravity: 0.0,
            lift_accel: 0.0,
            obstacle_lanes: lanes,
            obstacle_count,
            ..FlightTuning::default()
        }
    }

    fn fly(game: &mut FlightGame, max_ticks: u32) -> FlightStatus {
        let mut status = FlightStatus::Flying;
        for _ in 0..max_ticks {
            status = game.step(DT, false);
            if matches!(status, FlightStatus::Complete(_)) {
                break;
            }
        }
        status
    }

    #[test]
    fn course_is_deterministic_per_mission_id() {
        let tuning = FlightTuning::default();
        let a = build_course(&tuning, course_seed("mission-7"));
        let b = build_course(&tuning, course_seed("mission-7"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.iter().all(|obstacle| tuning.obstacle_lanes.contains(&obstacle.altitude)));
    }

    #[test]
    fn obstacle_in_lane_is_hit_and_slows_the_scroll() {
        let tuning = level_tuning(vec![200.0], 1);
        let course = build_course(&tuning, 0);
        let mut game = FlightGame::new(tuning, 220.0, course);
        let mut hit_speed = None;
        for _ in 0..600 {
            game.step(DT, false);
            if game.obstacles()[0].state == ObstacleState::Hit {
                hit_speed = Some(game.speed());
                break;
            }
        }
        let hit_speed = hit_speed.expect("obstacle should be hit");
        assert!(hit_speed < 220.0);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn cleared_course_completes_after_min_distance_with_score() {
        let tuning = level_tuning(vec![380.0], 3);
        let course = build_course(&tuning, 0);
        let mut game = FlightGame::new(tuning, 300.0, course);
        let status = fly(&mut game, 5_000);
        let FlightStatus::Complete(report) = status else {
            panic!("flight should complete");
        };
        assert_eq!(report.passed, 3);
        assert_eq!(report.hits, 0);
        assert_eq!(report.score, 30);
        assert!(report.distance >= 3000.0);
        assert_eq!(report.completion, FlightCompletion::CourseResolved);
    }

    #[test]
    fn empty_course_completes_on_min_distance() {
        let tuning = FlightTuning::default();
        let mut game = FlightGame::new(tuning, 400.0, Vec::new());
        let FlightStatus::Complete(report) = fly(&mut game, 5_000) else {
            panic!("flight should complete");
        };
        assert_eq!(report.completion, FlightCompletion::Distance);
        assert!(report.distance >= 3000.0);
        assert!(report.distance < 3100.0);
    }

    #[test]
    fn altitude_stays_inside_the_corridor() {
        let tuning = FlightTuning::default();
        let mut game = FlightGame::new(tuning, 220.0, Vec::new());
        for _ in 0..300 {
            game.step(DT, true);
        }
        assert!(game.body().position.y <= 400.0 - 16.0 + f32::EPSILON);
        for _ in 0..600 {
            game.step(DT, false);
        }
        assert!(game.body().position.y >= 16.0 - f32::EPSILON);
    }
}
