use crate::tuning::LandingTuning;

use super::math::{Aabb, Vec2};
use super::physics::{integrate, PhysicsBody, StepParams};

const CRAFT_HALF_EXTENTS: Vec2 = Vec2::new(24.0, 16.0);
const RUNWAY_CONTACT_HALF_HEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingZone {
    pub runway_x: f32,
    pub ground_y: f32,
    pub runway_half_width: f32,
    pub speed_threshold: f32,
}

impl LandingZone {
    pub fn from_tuning(tuning: &LandingTuning) -> Self {
        Self {
            runway_x: tuning.runway_x,
            ground_y: tuning.ground_y,
            runway_half_width: tuning.runway_half_width,
            speed_threshold: tuning.speed_threshold,
        }
    }

    pub fn runway(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.runway_x, self.ground_y),
            Vec2::new(self.runway_half_width, RUNWAY_CONTACT_HALF_HEIGHT),
        )
    }

    fn safe_velocity(&self) -> Aabb {
        Aabb::new(
            Vec2::ZERO,
            Vec2::new(self.speed_threshold, self.speed_threshold),
        )
    }

    /// Touchdown succeeds iff the craft is strictly inside the runway and both
    /// velocity components are strictly under the threshold.
    pub fn accepts(&self, touchdown_x: f32, velocity: Vec2) -> bool {
        self.runway()
            .contains(Vec2::new(touchdown_x, self.ground_y))
            && self.safe_velocity().contains(velocity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandingControls {
    pub left: bool,
    pub right: bool,
    pub thrust: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchdownReport {
    pub attempt: u32,
    pub touchdown_x: f32,
    pub touchdown_velocity: Vec2,
    pub elapsed_seconds: f32,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LandingStatus {
    Descending,
    Landed(TouchdownReport),
    Crashed(TouchdownReport),
}

#[derive(Debug, Clone)]
pub struct LandingGame {
    tuning: LandingTuning,
    zone: LandingZone,
    body: PhysicsBody,
    attempt: u32,
    elapsed_seconds: f32,
    landed: Option<TouchdownReport>,
}

impl LandingGame {
    pub fn new(tuning: LandingTuning) -> Self {
        let zone = LandingZone::from_tuning(&tuning);
        let body = Self::start_body(&tuning);
        Self {
            tuning,
            zone,
            body,
            attempt: 1,
            elapsed_seconds: 0.0,
            landed: None,
        }
    }

    fn start_body(tuning: &LandingTuning) -> PhysicsBody {
        PhysicsBody::new(
            Vec2::new(
                tuning.runway_x + tuning.start_offset_x,
                tuning.ground_y + tuning.start_altitude,
            ),
            tuning.start_velocity,
            CRAFT_HALF_EXTENTS,
        )
    }

    pub fn body(&self) -> &PhysicsBody {
        &self.body
    }

    pub fn zone(&self) -> &LandingZone {
        &self.zone
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Puts the craft back at the approach start for another attempt.
    pub fn reset_for_retry(&mut self) {
        self.body = Self::start_body(&self.tuning);
        self.elapsed_seconds = 0.0;
        self.landed = None;
        self.attempt = self.attempt.saturating_add(1);
    }

    pub fn step(&mut self, dt_seconds: f32, controls: LandingControls) -> LandingStatus {
        if let Some(report) = self.landed {
            return LandingStatus::Landed(report);
        }

        self.elapsed_seconds += dt_seconds;
        let lateral = match (controls.left, controls.right) {
            (true, false) => -self.tuning.lateral_accel,
            (false, true) => self.tuning.lateral_accel,
            _ => 0.0,
        };
        let vertical = if controls.thrust {
            self.tuning.thrust_accel
        } else {
            0.0
        } - self.tuning.gravity;
        integrate(
            &mut self.body,
            Vec2::new(lateral, vertical),
            dt_seconds,
            &StepParams::uniform(self.tuning.drag, self.tuning.max_speed),
        );

        if self.body.position.x < self.tuning.min_x {
            self.body.position.x = self.tuning.min_x;
            self.body.velocity.x = self.body.velocity.x.max(0.0);
        } else if self.body.position.x > self.tuning.max_x {
            self.body.position.x = self.tuning.max_x;
            self.body.velocity.x = self.body.velocity.x.min(0.0);
        }

        if self.body.position.y > self.zone.ground_y {
            return LandingStatus::Descending;
        }

        let touchdown_velocity = self.body.velocity;
        self.body.position.y = self.zone.ground_y;
        self.body.velocity = Vec2::ZERO;
        let touchdown_x = self.body.position.x;
        let accepted = self.zone.accepts(touchdown_x, touchdown_velocity);
        let offset_ratio =
            (touchdown_x - self.zone.runway_x).abs() / self.zone.runway_half_width.max(f32::EPSILON);
        let report = TouchdownReport {
            attempt: self.attempt,
            touchdown_x,
            touchdown_velocity,
            elapsed_seconds: self.elapsed_seconds,
            score: if accepted {
                (100.0 * (1.0 - offset_ratio)).clamp(0.0, 100.0).round() as u32
            } else {
                0
            },
        };
        if accepted {
            self.landed = Some(report);
            LandingStatus::Landed(report)
        } else {
            LandingStatus::Crashed(report)
        }
    }
}
