use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle described by its center and half extents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Aabb {
    pub const fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            center: Vec2::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5),
            half_extents: Vec2::new((max.x - min.x) * 0.5, (max.y - min.y) * 0.5),
        }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(
            self.center.x - self.half_extents.x,
            self.center.y - self.half_extents.y,
        )
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(
            self.center.x + self.half_extents.x,
            self.center.y + self.half_extents.y,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() < self.half_extents.x
            && (point.y - self.center.y).abs() < self.half_extents.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center.x - other.center.x).abs() < self.half_extents.x + other.half_extents.x
            && (self.center.y - other.center.y).abs() < self.half_extents.y + other.half_extents.y
    }

    pub fn translated(&self, to: Vec2) -> Self {
        Self {
            center: to,
            half_extents: self.half_extents,
        }
    }
}
