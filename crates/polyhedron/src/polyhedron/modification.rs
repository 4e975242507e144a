//! Modification operations for Polyhedron: plane clipping, vertex
//! correction and edge healing.
//!
//! Every operation rewrites the face loops and reassembles the half-edge
//! structure from them, so ids are not stable across modifications. Face
//! payloads travel with their loops.

use std::collections::HashMap;

use brushwork_config::{CORRECT_EPSILON, MIN_EDGE_LENGTH, POINT_STATUS_EPSILON};
use glam::DVec3;
use tracing::{debug, trace};

use super::construction::{convex_loop, position_key, FaceLoop};
use super::types::{ClipResult, FaceId, GeometryEvent, PayloadId};
use super::Polyhedron;
use crate::math::{correct, Plane, PlaneStatus};

/// Normals closer than this are treated as parallel when merging faces
const COPLANAR_NORMAL_EPSILON: f64 = 1e-6;

impl Polyhedron {
    /// Face loops of the current faces, paired with their face ids
    fn face_loops(&self) -> Vec<(FaceId, FaceLoop)> {
        self.faces
            .iter()
            .map(|f| (f.id, FaceLoop::new(self.face_positions(f.id), f.plane, f.payload)))
            .collect()
    }

    /// Cut away the part of the polyhedron above `plane`
    ///
    /// The face created on the plane gets `payload`. Faces that end up
    /// entirely above the plane are reported as deleted before they go.
    pub fn clip(
        &mut self,
        plane: &Plane,
        payload: Option<PayloadId>,
        mut handler: impl FnMut(GeometryEvent),
    ) -> ClipResult {
        let statuses: Vec<PlaneStatus> = self
            .vertices
            .iter()
            .map(|v| plane.point_status(v.position))
            .collect();

        if !statuses.contains(&PlaneStatus::Above) {
            return ClipResult::Unchanged;
        }
        if !statuses.contains(&PlaneStatus::Below) {
            for face in &self.faces {
                handler(GeometryEvent::FaceWillBeDeleted {
                    face: face.id,
                    payload: face.payload,
                });
            }
            *self = Self::empty();
            return ClipResult::Empty;
        }

        if !self.is_polyhedron() {
            self.clip_degenerate(plane);
            return ClipResult::Success;
        }

        let mut loops = Vec::with_capacity(self.faces.len() + 1);
        // Directed edges of the kept faces that lie on the plane
        let mut seam: HashMap<[u64; 3], DVec3> = HashMap::new();
        let mut seam_start = None;

        for (face_id, face_loop) in self.face_loops() {
            let clipped = clip_loop(&face_loop.positions, plane);
            if clipped.len() < 3 {
                trace!("clip: face {:?} lies above the plane", face_id);
                handler(GeometryEvent::FaceWillBeDeleted {
                    face: face_id,
                    payload: face_loop.payload,
                });
                continue;
            }

            let count = clipped.len();
            for i in 0..count {
                let a = clipped[i];
                let b = clipped[(i + 1) % count];
                let on_plane = |p: DVec3| plane.point_status(p) == PlaneStatus::Inside;
                if on_plane(a) && on_plane(b) {
                    // The cap runs the other way round
                    seam.insert(position_key(b), a);
                    seam_start.get_or_insert(b);
                }
            }

            loops.push(FaceLoop::new(clipped, face_loop.plane, face_loop.payload));
        }

        let cap = seam_start.and_then(|start| chain_seam(&seam, start));
        let cap = match cap {
            Some(cap) => cap,
            None => {
                // Fall back to the hull of everything on the plane
                let on_plane: Vec<DVec3> = loops
                    .iter()
                    .flat_map(|l| l.positions.iter().copied())
                    .filter(|p| plane.point_status(*p) == PlaneStatus::Inside)
                    .collect();
                trace!("clip: seam did not close, using hull of {} points", on_plane.len());
                convex_loop(&on_plane, plane.normal)
                    .into_iter()
                    .map(|i| on_plane[i])
                    .collect()
            }
        };

        let has_cap = cap.len() >= 3;
        if has_cap {
            loops.push(FaceLoop::new(cap, *plane, payload));
        }

        *self = Self::from_face_loops(loops);

        if has_cap {
            if let Some(face) = self.faces.last().filter(|f| f.plane == *plane) {
                handler(GeometryEvent::FaceCreated {
                    face: face.id,
                    payload: face.payload,
                });
            }
        }

        ClipResult::Success
    }

    /// Clip a point, edge or polygon by rebuilding from the kept points
    fn clip_degenerate(&mut self, plane: &Plane) {
        let mut points: Vec<DVec3> = self
            .vertices
            .iter()
            .map(|v| v.position)
            .filter(|p| plane.point_status(*p) != PlaneStatus::Above)
            .collect();
        for segment in self.edge_segments() {
            if let Some(crossing) = crossing_point(segment.start, segment.end, plane) {
                points.push(crossing);
            }
        }
        *self = Self::from_points(points);
    }

    /// Snap vertex coordinates that are within `CORRECT_EPSILON` of an integer
    pub fn correct_vertex_positions(&mut self) {
        for vertex in &mut self.vertices {
            vertex.position = correct(vertex.position, CORRECT_EPSILON);
        }
    }

    /// Remove numerical debris left behind by clipping
    ///
    /// Edges shorter than `MIN_EDGE_LENGTH` are collapsed, faces that lose
    /// their area are deleted, and adjacent faces on the same plane are
    /// merged. Returns whether the result is a closed polyhedron.
    pub fn heal_edges(&mut self, mut handler: impl FnMut(GeometryEvent)) -> bool {
        let mut collapsed = 0;
        while let Some((keep, remove)) = self.find_short_edge() {
            self.collapse(keep, remove, &mut handler);
            collapsed += 1;
        }

        let mut merged = 0;
        while let Some((kept, removed)) = self.find_coplanar_neighbours() {
            self.merge_faces(kept, removed, &mut handler);
            merged += 1;
        }

        if collapsed > 0 || merged > 0 {
            debug!(
                "heal_edges: collapsed {} edges, merged {} faces",
                collapsed, merged
            );
        }

        self.is_polyhedron() && self.closed()
    }

    fn find_short_edge(&self) -> Option<(DVec3, DVec3)> {
        self.edge_segments()
            .into_iter()
            .find(|s| s.length() < MIN_EDGE_LENGTH)
            .map(|s| (s.start, s.end))
    }

    /// Merge the vertex at `remove` into the vertex at `keep`
    fn collapse(&mut self, keep: DVec3, remove: DVec3, handler: &mut impl FnMut(GeometryEvent)) {
        trace!("heal_edges: collapsing edge {:?} -> {:?}", remove, keep);
        let removed_key = position_key(remove);

        let mut loops = Vec::with_capacity(self.faces.len());
        for (face_id, mut face_loop) in self.face_loops() {
            for position in &mut face_loop.positions {
                if position_key(*position) == removed_key {
                    *position = keep;
                }
            }
            face_loop.positions.dedup();
            while face_loop.positions.len() > 1
                && face_loop.positions.first() == face_loop.positions.last()
            {
                face_loop.positions.pop();
            }

            if face_loop.positions.len() < 3 {
                handler(GeometryEvent::FaceWillBeDeleted {
                    face: face_id,
                    payload: face_loop.payload,
                });
                continue;
            }
            loops.push(face_loop);
        }

        *self = Self::from_face_loops(loops);
    }

    fn find_coplanar_neighbours(&self) -> Option<(FaceId, FaceId)> {
        self.edges.iter().find_map(|edge| {
            let (Some(first), Some(second)) = self.edge_faces(edge.id) else {
                return None;
            };
            let a = self.face(first)?.plane;
            let b = self.face(second)?.plane;
            let coplanar = a.normal.dot(b.normal) > 1.0 - COPLANAR_NORMAL_EPSILON
                && (a.distance - b.distance).abs() <= POINT_STATUS_EPSILON;
            (first != second && coplanar).then_some((first.min(second), first.max(second)))
        })
    }

    /// Replace two adjacent coplanar faces by one, keeping `kept`'s plane and
    /// payload. Vertices left with only two incident faces are dropped.
    fn merge_faces(&mut self, kept: FaceId, removed: FaceId, handler: &mut impl FnMut(GeometryEvent)) {
        let removed_payload = self.face(removed).and_then(|f| f.payload);
        handler(GeometryEvent::FacesWillBeMerged {
            kept,
            removed,
            removed_payload,
        });

        let mut loops = self.face_loops();
        let mut combined: Vec<DVec3> = Vec::new();
        let mut kept_plane = None;
        for (face_id, face_loop) in &loops {
            if *face_id == kept || *face_id == removed {
                combined.extend(face_loop.positions.iter().copied());
            }
            if *face_id == kept {
                kept_plane = Some(face_loop.plane);
            }
        }
        let Some(kept_plane) = kept_plane else {
            return;
        };

        let hull: Vec<DVec3> = convex_loop(&combined, kept_plane.normal)
            .into_iter()
            .map(|i| combined[i])
            .collect();

        loops.retain(|(face_id, _)| *face_id != removed);
        for (face_id, face_loop) in &mut loops {
            if *face_id == kept {
                face_loop.positions = hull.clone();
            }
        }

        // Count how many faces use each position
        let mut degree: HashMap<[u64; 3], usize> = HashMap::new();
        for (_, face_loop) in &loops {
            for position in &face_loop.positions {
                *degree.entry(position_key(*position)).or_default() += 1;
            }
        }
        let loops = loops
            .into_iter()
            .map(|(_, mut face_loop)| {
                face_loop
                    .positions
                    .retain(|p| degree.get(&position_key(*p)).copied().unwrap_or(0) > 2);
                face_loop
            })
            .collect();

        *self = Self::from_face_loops(loops);
    }
}

/// Sutherland-Hodgman step for one convex loop, keeping the part below the plane
fn clip_loop(positions: &[DVec3], plane: &Plane) -> Vec<DVec3> {
    let count = positions.len();
    let mut result = Vec::with_capacity(count + 1);
    for i in 0..count {
        let current = positions[i];
        let next = positions[(i + 1) % count];
        if plane.point_status(current) != PlaneStatus::Above {
            result.push(current);
        }
        if let Some(crossing) = crossing_point(current, next, plane) {
            result.push(crossing);
        }
    }
    result
}

/// Where the segment crosses from one side of the plane strictly to the
/// other. The result does not depend on the direction of the segment, so the
/// two faces sharing an edge compute the same point.
fn crossing_point(a: DVec3, b: DVec3, plane: &Plane) -> Option<DVec3> {
    let status_a = plane.point_status(a);
    let status_b = plane.point_status(b);
    let crosses = matches!(
        (status_a, status_b),
        (PlaneStatus::Above, PlaneStatus::Below) | (PlaneStatus::Below, PlaneStatus::Above)
    );
    if !crosses {
        return None;
    }

    let (start, end) = if lexicographic_less(a, b) { (a, b) } else { (b, a) };
    let start_distance = plane.point_distance(start);
    let end_distance = plane.point_distance(end);
    let t = start_distance / (start_distance - end_distance);
    Some(start + (end - start) * t)
}

fn lexicographic_less(a: DVec3, b: DVec3) -> bool {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
        .is_lt()
}

/// Follow seam edges from `start` until the loop closes
fn chain_seam(seam: &HashMap<[u64; 3], DVec3>, start: DVec3) -> Option<Vec<DVec3>> {
    let mut result = vec![start];
    let mut current = start;
    loop {
        let next = *seam.get(&position_key(current))?;
        if position_key(next) == position_key(start) {
            break;
        }
        if result.len() > seam.len() {
            return None;
        }
        result.push(next);
        current = next;
    }
    (result.len() == seam.len()).then_some(result)
}
