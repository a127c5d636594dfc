//! Collision Detection and Resolution
//!
//! Shape-pair dispatch over circles and oriented rectangles.
//!
//! ```text
//!              │ Circle        │ Rectangle
//! ─────────────┼───────────────┼──────────────────────
//!  Circle      │ resolve       │ resolve + torque
//!  Rectangle   │ resolve+torque│ detect only (SAT)
//! ```
//!
//! Resolution pushes the bodies apart along the contact normal, split by
//! inverse mass, then exchanges velocity along that normal when the bodies
//! are approaching. An infinite mass never moves.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::error::{SimError, SimResult};
use crate::game::body::Body;

/// Restitution used when a collider does not set one.
pub const DEFAULT_RESTITUTION: f32 = 0.5;

/// Gain applied to the torque impulse on rectangles.
const TORQUE_GAIN: f32 = 3.0;

/// Collider shape. Dimensions come from the owning body's size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Radius is `size.x / 2`
    Circle,
    /// Width `size.x`, height `size.y`, rotated by the body angle
    Rectangle,
}

/// Shape plus physical properties attached to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Shape tag
    pub shape: ShapeKind,
    /// Mass (`f32::INFINITY` for immovable bodies)
    pub mass: f32,
    /// Coefficient of restitution in [0, 1]
    pub restitution: f32,
}

impl Collider {
    /// Circle collider with default restitution.
    pub fn circle(mass: f32) -> Self {
        Self { shape: ShapeKind::Circle, mass, restitution: DEFAULT_RESTITUTION }
    }

    /// Rectangle collider with default restitution.
    pub fn rectangle(mass: f32) -> Self {
        Self { shape: ShapeKind::Rectangle, mass, restitution: DEFAULT_RESTITUTION }
    }

    /// Override restitution.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// `1 / mass`, zero for immovable bodies.
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.mass.is_finite() && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

/// Detect and resolve contact between two bodies.
///
/// Returns whether the pair was overlapping before resolution.
pub fn collide(
    body_a: &mut Body,
    collider_a: &Collider,
    body_b: &mut Body,
    collider_b: &Collider,
) -> SimResult<bool> {
    match (collider_a.shape, collider_b.shape) {
        (ShapeKind::Circle, ShapeKind::Circle) => {
            Ok(resolve_circles(body_a, collider_a, body_b, collider_b))
        }
        (ShapeKind::Circle, ShapeKind::Rectangle) => {
            Ok(resolve_circle_rect(body_a, collider_a, body_b, collider_b))
        }
        (ShapeKind::Rectangle, ShapeKind::Circle) => {
            Ok(resolve_circle_rect(body_b, collider_b, body_a, collider_a))
        }
        (a, b) => Err(SimError::UnsupportedShapePair { a, b }),
    }
}

/// Overlap test without resolution. Every shape pair is supported.
pub fn intersects(
    body_a: &Body,
    collider_a: &Collider,
    body_b: &Body,
    collider_b: &Collider,
) -> bool {
    match (collider_a.shape, collider_b.shape) {
        (ShapeKind::Circle, ShapeKind::Circle) => {
            let r = body_a.radius() + body_b.radius();
            body_a.position.distance_squared(body_b.position) < r * r
        }
        (ShapeKind::Circle, ShapeKind::Rectangle) => circle_rect_contact(body_a, body_b).is_some(),
        (ShapeKind::Rectangle, ShapeKind::Circle) => circle_rect_contact(body_b, body_a).is_some(),
        (ShapeKind::Rectangle, ShapeKind::Rectangle) => rects_overlap(body_a, body_b),
    }
}

/// Circle-circle resolution.
fn resolve_circles(a: &mut Body, ca: &Collider, b: &mut Body, cb: &Collider) -> bool {
    let min_dist = a.radius() + b.radius();
    let delta = a.position - b.position;
    let dist_sq = delta.length_squared();
    if dist_sq >= min_dist * min_dist {
        return false;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { delta.scale(1.0 / dist) } else { Vec2::RIGHT };
    apply_contact(a, ca, b, cb, normal, min_dist - dist);
    true
}

/// Closest-point contact between a circle and a rotated rectangle.
///
/// Returns the normal (pointing from rectangle to circle), the penetration
/// depth and the contact point relative to the rectangle center.
fn circle_rect_contact(circle: &Body, rect: &Body) -> Option<(Vec2, f32, Vec2)> {
    let radius = circle.radius();
    let half = rect.size.scale(0.5);
    let local = (circle.position - rect.position).rotate(-rect.angle);
    let closest = local.clamp(-half, half);
    let offset = local - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > 0.0 {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = offset.scale(1.0 / dist).rotate(rect.angle);
        return Some((normal, radius - dist, closest.rotate(rect.angle)));
    }

    // Center inside the rectangle: leave through the nearest face.
    let gap_x = half.x - local.x.abs();
    let gap_y = half.y - local.y.abs();
    let (normal_local, depth, contact) = if gap_x < gap_y {
        let sign = if local.x >= 0.0 { 1.0 } else { -1.0 };
        (Vec2::new(sign, 0.0), radius + gap_x, Vec2::new(sign * half.x, local.y))
    } else {
        let sign = if local.y >= 0.0 { 1.0 } else { -1.0 };
        (Vec2::new(0.0, sign), radius + gap_y, Vec2::new(local.x, sign * half.y))
    };
    Some((normal_local.rotate(rect.angle), depth, contact.rotate(rect.angle)))
}

/// Circle-rectangle resolution with torque on the rectangle.
fn resolve_circle_rect(circle: &mut Body, cc: &Collider, rect: &mut Body, cr: &Collider) -> bool {
    let Some((normal, depth, lever)) = circle_rect_contact(circle, rect) else {
        return false;
    };

    let impulse = apply_contact(circle, cc, rect, cr, normal, depth);

    if cr.mass.is_finite() && impulse != 0.0 {
        let inertia = cr.mass * (rect.size.x * rect.size.x + rect.size.y * rect.size.y) / 12.0;
        if inertia > 0.0 {
            let torque = lever.cross(normal.scale(impulse));
            rect.angular_velocity -= torque * TORQUE_GAIN / inertia;
        }
    }
    true
}

/// Positional correction and velocity exchange along `normal` (from b to a).
///
/// Returns the impulse magnitude applied (zero when separating).
fn apply_contact(
    a: &mut Body,
    ca: &Collider,
    b: &mut Body,
    cb: &Collider,
    normal: Vec2,
    depth: f32,
) -> f32 {
    let inv_a = ca.inverse_mass();
    let inv_b = cb.inverse_mass();
    let total_inv = inv_a + inv_b;
    if total_inv == 0.0 {
        return 0.0;
    }

    a.position += normal.scale(depth * inv_a / total_inv);
    b.position -= normal.scale(depth * inv_b / total_inv);

    let relative = (a.velocity - b.velocity).dot(normal);
    if relative > 0.0 {
        return 0.0;
    }

    let restitution = ca.restitution.min(cb.restitution);
    let impulse = -(1.0 + restitution) * relative / total_inv;
    a.velocity += normal.scale(impulse * inv_a);
    b.velocity -= normal.scale(impulse * inv_b);
    impulse
}

/// Separating axis test for two oriented rectangles.
fn rects_overlap(a: &Body, b: &Body) -> bool {
    let axes = [
        Vec2::RIGHT.rotate(a.angle),
        Vec2::RIGHT.rotate(a.angle + std::f32::consts::FRAC_PI_2),
        Vec2::RIGHT.rotate(b.angle),
        Vec2::RIGHT.rotate(b.angle + std::f32::consts::FRAC_PI_2),
    ];
    let delta = b.position - a.position;

    axes.iter().all(|axis| {
        let extent = |body: &Body| {
            let ux = Vec2::RIGHT.rotate(body.angle).scale(body.size.x / 2.0);
            let uy = Vec2::RIGHT
                .rotate(body.angle + std::f32::consts::FRAC_PI_2)
                .scale(body.size.y / 2.0);
            ux.dot(*axis).abs() + uy.dot(*axis).abs()
        };
        delta.dot(*axis).abs() < extent(a) + extent(b)
    })
}

// =============================================================================
// TESTS
// =============================================================================
