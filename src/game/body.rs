//! Rigid body state and the per-tick integrator for moving entities.

use serde::{Serialize, Deserialize};

use crate::core::angle::{normalize_angle, signed_angle_delta};
use crate::core::polygon::Bounds;
use crate::core::vec2::Vec2;

/// Per-dt velocity retention. Must stay below 1 so velocity decays.
pub const LINEAR_FRICTION: f32 = 0.965;

/// Angular damping rate. Angular velocity is divided by `1 + rate * dt`.
pub const ANGULAR_FRICTION: f32 = 0.775;

/// Default move speed for bodies without genetics.
pub const DEFAULT_MOVE_SPEED: f32 = 0.15;

/// Transform and motion state of one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Center position
    pub position: Vec2,
    /// Position at the start of the current tick
    pub previous_position: Vec2,
    /// Bounding extents (diameter on both axes for circles)
    pub size: Vec2,
    /// Facing angle in `[0, 2π)`
    pub angle: f32,
    /// Linear velocity
    pub velocity: Vec2,
    /// Angular velocity
    pub angular_velocity: f32,
    /// Heading to accelerate along, if any
    pub moving_direction: Option<f32>,
    /// Heading to turn towards, if any
    pub target_angle: Option<f32>,
    /// Acceleration per dt while moving
    pub move_speed: f32,
    /// Turn gain per dt
    pub rotation_speed: f32,
    /// Linear friction, in (0, 1)
    pub linear_friction: f32,
    /// Angular friction, in (0, 1)
    pub angular_friction: f32,
}

impl Body {
    /// Body at rest.
    pub fn new(position: Vec2, size: Vec2, angle: f32) -> Self {
        Self {
            position,
            previous_position: position,
            size,
            angle: normalize_angle(angle),
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            moving_direction: None,
            target_angle: None,
            move_speed: DEFAULT_MOVE_SPEED,
            rotation_speed: 0.0,
            linear_friction: LINEAR_FRICTION,
            angular_friction: ANGULAR_FRICTION,
        }
    }

    /// Circle radius derived from the horizontal extent.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size.x / 2.0
    }

    /// Aim both movement and facing at `angle`.
    #[inline]
    pub fn steer(&mut self, angle: f32) {
        let angle = normalize_angle(angle);
        self.moving_direction = Some(angle);
        self.target_angle = Some(angle);
    }

    /// Advance one step of `dt` and clamp into `bounds`.
    pub fn integrate(&mut self, dt: f32, bounds: &Bounds) {
        self.previous_position = self.position;
        self.apply_movement(dt);
        self.apply_rotation(dt);
        self.position = bounds.constrain(self.position);
    }

    fn apply_movement(&mut self, dt: f32) {
        if let Some(direction) = self.moving_direction {
            self.velocity += Vec2::from_polar(direction, self.move_speed * dt);
        }
        self.velocity = self.velocity.scale(self.linear_friction.powf(dt));
        self.position += self.velocity.scale(dt);
    }

    fn apply_rotation(&mut self, dt: f32) {
        if let Some(target) = self.target_angle {
            let delta = signed_angle_delta(self.angle, target);
            self.angular_velocity += delta * self.rotation_speed * dt;
        }
        self.angular_velocity /= 1.0 + self.angular_friction * dt;
        self.angle = normalize_angle(self.angle + self.angular_velocity * dt);
    }
}
