use serde::{Deserialize, Serialize};

use super::math::{Aabb, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub half_extents: Vec2,
}

impl PhysicsBody {
    pub fn new(position: Vec2, velocity: Vec2, half_extents: Vec2) -> Self {
        Self {
            position,
            velocity,
            half_extents,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.half_extents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Multiplier applied to velocity once per tick after integration.
    pub drag: f32,
    pub max_speed: Vec2,
}

impl StepParams {
    pub fn uniform(drag: f32, max_speed: f32) -> Self {
        Self {
            drag,
            max_speed: Vec2::new(max_speed, max_speed),
        }
    }
}

/// Semi-implicit Euler step followed by drag and a per-axis speed clamp.
pub fn integrate(body: &mut PhysicsBody, acceleration: Vec2, dt_seconds: f32, params: &StepParams) {
    body.velocity.x += acceleration.x * dt_seconds;
    body.velocity.y += acceleration.y * dt_seconds;
    body.position.x += body.velocity.x * dt_seconds;
    body.position.y += body.velocity.y * dt_seconds;

    body.velocity.x *= params.drag;
    body.velocity.y *= params.drag;
    body.velocity.x = clamp_axis(body.velocity.x, params.max_speed.x);
    body.velocity.y = clamp_axis(body.velocity.y, params.max_speed.y);
}

fn clamp_axis(value: f32, limit: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let limit = limit.abs();
    value.clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn velocity_updates_before_position() {
        let mut body = PhysicsBody::default();
        integrate(
            &mut body,
            Vec2::new(60.0, 0.0),
            DT,
            &StepParams::uniform(1.0, 1000.0),
        );
        assert!((body.velocity.x - 1.0).abs() < 1e-6);
        assert!((body.position.x - DT).abs() < 1e-6);
    }

    #[test]
    fn drag_and_clamp_apply_after_the_step() {
        let mut body = PhysicsBody::new(Vec2::ZERO, Vec2::new(100.0, -100.0), Vec2::ZERO);
        integrate(&mut body, Vec2::ZERO, DT, &StepParams::uniform(0.5, 30.0));
        assert!((body.position.x - 100.0 * DT).abs() < 1e-5);
        assert_eq!(body.velocity, Vec2::new(30.0, -30.0));
    }

    #[test]
    fn identical_inputs_are_deterministic() {
        let run = || {
            let mut body = PhysicsBody::new(Vec2::new(3.0, 7.0), Vec2::new(1.0, 2.0), Vec2::ZERO);
            for tick in 0..600 {
                let thrust = if tick % 3 == 0 { 40.0 } else { -25.0 };
                integrate(
                    &mut body,
                    Vec2::new(thrust, -9.8),
                    DT,
                    &StepParams::uniform(0.99, 120.0),
                );
            }
            body
        };
        assert_eq!(run(), run());
    }
}
