//! Polygon Geometry
//!
//! Biome outlines, the convex world shape, axis-aligned bounds and
//! area-weighted random sampling for the spawner.

use serde::{Serialize, Deserialize};

use super::rng::DeterministicRng;
use super::vec2::Vec2;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from two corners.
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Width and height.
    #[inline]
    pub fn extent(&self) -> Vec2 {
        self.max - self.min
    }

    /// True if `point` lies inside (inclusive).
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Clamp a point into the box.
    #[inline]
    pub fn constrain(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

/// Closed polygon given by its vertices in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    /// Build from raw points, mapping each `p` to `offset + p * scale`.
    pub fn from_points(points: &[Vec2], offset: f32, scale: f32) -> Self {
        let points = points
            .iter()
            .map(|p| Vec2::new(offset + p.x * scale, offset + p.y * scale))
            .collect();
        Self { points }
    }

    /// Build an axis-aligned rectangle centered at `(x, y)`.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32, offset: f32, scale: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::from_points(
            &[
                Vec2::new(x - hw, y - hh),
                Vec2::new(x + hw, y - hh),
                Vec2::new(x + hw, y + hh),
                Vec2::new(x - hw, y + hh),
            ],
            offset,
            scale,
        )
    }

    /// Convex hull (Graham scan) of the vertices of every polygon given.
    pub fn convex_hull<'a>(polygons: impl IntoIterator<Item = &'a Polygon>) -> Self {
        let all: Vec<Vec2> = polygons
            .into_iter()
            .flat_map(|p| p.points.iter().copied())
            .collect();

        let Some(start) = all.iter().copied().reduce(|best, p| {
            if p.y < best.y || (p.y == best.y && p.x < best.x) {
                p
            } else {
                best
            }
        }) else {
            return Self::default();
        };

        let mut sorted = all;
        sorted.sort_by(|a, b| {
            let angle_a = (*a - start).angle();
            let angle_b = (*b - start).angle();
            angle_a
                .total_cmp(&angle_b)
                .then_with(|| a.distance_squared(start).total_cmp(&b.distance_squared(start)))
        });

        let mut hull: Vec<Vec2> = Vec::with_capacity(sorted.len());
        for point in sorted {
            while hull.len() > 1 {
                let a = hull[hull.len() - 2];
                let b = hull[hull.len() - 1];
                if (b - a).cross(point - a) <= 0.0 {
                    hull.pop();
                } else {
                    break;
                }
            }
            hull.push(point);
        }

        Self { points: hull }
    }

    /// Vertices in order.
    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// True if the polygon has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounds of the vertices.
    pub fn bounds(&self) -> Bounds {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for p in &self.points {
            min = Vec2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vec2::new(max.x.max(p.x), max.y.max(p.y));
        }
        if self.points.is_empty() {
            return Bounds::new(Vec2::ZERO, Vec2::ZERO);
        }
        Bounds::new(min, max)
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, point: Vec2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (pi, pj) = (self.points[i], self.points[j]);
            if (pi.y > point.y) != (pj.y > point.y) {
                let x_cross = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
                if point.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Centroid of the vertices.
    pub fn center(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::ZERO;
        }
        let sum = self.points.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        sum.scale(1.0 / self.points.len() as f32)
    }

    /// Enclosed area (fan triangulation; exact for convex polygons).
    pub fn area(&self) -> f32 {
        self.triangle_areas().iter().sum()
    }

    /// Uniform random point inside the polygon.
    ///
    /// Fan-triangulates from the first vertex, picks a triangle weighted by
    /// area and samples inside it.
    pub fn random_point(&self, rng: &mut DeterministicRng) -> Vec2 {
        let areas = self.triangle_areas();
        let total: f32 = areas.iter().sum();
        if total <= 0.0 {
            return self.points.first().copied().unwrap_or(Vec2::ZERO);
        }

        let mut pick = rng.random() * total;
        let mut index = areas.len() - 1;
        for (i, area) in areas.iter().enumerate() {
            if pick < *area {
                index = i;
                break;
            }
            pick -= area;
        }

        let a = self.points[0];
        let b = self.points[index + 1];
        let c = self.points[index + 2];

        let mut u = rng.random();
        let mut v = rng.random();
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        a + (b - a).scale(u) + (c - a).scale(v)
    }

    fn triangle_areas(&self) -> Vec<f32> {
        if self.points.len() < 3 {
            return Vec::new();
        }
        let a = self.points[0];
        self.points
            .windows(2)
            .skip(1)
            .map(|w| ((w[0] - a).cross(w[1] - a) / 2.0).abs())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
