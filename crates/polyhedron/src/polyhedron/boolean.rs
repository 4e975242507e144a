//! Containment, intersection and subtraction between convex polyhedra.

use brushwork_config::POINT_STATUS_EPSILON;
use glam::DVec3;
use tracing::debug;

use super::types::ClipResult;
use super::Polyhedron;
use crate::math::PlaneStatus;

impl Polyhedron {
    /// Whether the point lies inside or on the boundary
    pub fn contains_point(&self, point: DVec3) -> bool {
        if !self.is_polyhedron() || !self.bounds().expand(POINT_STATUS_EPSILON).contains_point(point) {
            return false;
        }
        self.faces
            .iter()
            .all(|f| f.plane.point_status(point) != PlaneStatus::Above)
    }

    /// Whether every vertex of `other` lies inside this polyhedron
    pub fn contains(&self, other: &Polyhedron) -> bool {
        if !self
            .bounds()
            .expand(POINT_STATUS_EPSILON)
            .contains(&other.bounds())
        {
            return false;
        }
        other.vertices.iter().all(|v| self.contains_point(v.position))
    }

    /// Separating axis test. Touching polyhedra count as intersecting.
    pub fn intersects(&self, other: &Polyhedron) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if !self
            .bounds()
            .expand(POINT_STATUS_EPSILON)
            .intersects(&other.bounds())
        {
            return false;
        }

        let mut axes: Vec<DVec3> = self
            .faces
            .iter()
            .chain(other.faces.iter())
            .map(|f| f.plane.normal)
            .collect();

        let directions = |p: &Polyhedron| -> Vec<DVec3> {
            p.edge_segments()
                .iter()
                .map(|s| (s.end - s.start).normalize_or_zero())
                .collect()
        };
        let ours = directions(self);
        let theirs = directions(other);
        for a in &ours {
            for b in &theirs {
                let axis = a.cross(*b);
                if axis.length_squared() > POINT_STATUS_EPSILON {
                    axes.push(axis.normalize());
                }
            }
        }

        !axes.iter().any(|axis| separated_along(self, other, *axis))
    }

    /// Split this polyhedron into convex pieces covering `self - other`
    ///
    /// Each face plane of `other` in turn cuts off the part of the
    /// remainder that lies in front of it. The part left at the end is the
    /// intersection and is discarded.
    pub fn subtract(&self, other: &Polyhedron) -> Vec<Polyhedron> {
        if !self.intersects(other) {
            return vec![self.clone()];
        }

        let mut fragments = Vec::new();
        let mut remainder = self.clone();

        for face in other.faces() {
            let mut outside = remainder.clone();
            if outside.clip(&face.plane.flip(), None, |_| {}) != ClipResult::Empty
                && outside.is_polyhedron()
            {
                fragments.push(outside);
            }

            if remainder.clip(&face.plane, None, |_| {}) == ClipResult::Empty {
                // Nothing of `self` is behind this plane, so `other` did not
                // actually overlap it
                return vec![self.clone()];
            }
        }

        debug!("subtract: {} fragments", fragments.len());
        fragments
    }
}

fn separated_along(a: &Polyhedron, b: &Polyhedron, axis: DVec3) -> bool {
    let project = |p: &Polyhedron| {
        p.vertices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            let d = v.position.dot(axis);
            (min.min(d), max.max(d))
        })
    };
    let (a_min, a_max) = project(a);
    let (b_min, b_max) = project(b);
    a_max < b_min - POINT_STATUS_EPSILON || b_max < a_min - POINT_STATUS_EPSILON
}
