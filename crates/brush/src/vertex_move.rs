//! Feasibility of moving a subset of a brush's vertices
//!
//! The vertices that move and the vertices that stay are each treated as a
//! convex fragment of their own. Depending on how degenerate the two
//! fragments are, a move is accepted outright, or checked for whether a
//! moving vertex would travel through the stationary fragment and come out
//! the other side.
//!
//! | moving \ remaining | empty | point  | edge   | polygon | polyhedron |
//! |--------------------|-------|--------|--------|---------|------------|
//! | empty              | n/a   | n/a    | n/a    | n/a     | no         |
//! | point              | n/a   | n/a    | n/a    | ok      | check      |
//! | edge               | n/a   | n/a    | ok     | check   | check      |
//! | polygon            | n/a   | invert | invert | check   | check      |
//! | polyhedron         | ok    | invert | invert | invert  | check      |
//!
//! `invert` swaps the fragments and negates the delta, which turns the
//! cell at (row, column) into the cell at (column, row).

use brushwork_config::ALMOST_ZERO;
use glam::DVec3;
use polyhedron::{is_zero, BBox3, PlaneStatus, Polyhedron, Ray3, Shape, Side};
use tracing::trace;

/// Why a vertex move was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("no vertices to move or zero delta")]
    NothingToMove,
    #[error("none of the positions is a vertex of the brush")]
    Forbidden,
    #[error("result leaves the world bounds")]
    OutOfWorldBounds,
    #[error("a moved vertex would disappear")]
    VertexRemoved,
    #[error("result is not a polyhedron")]
    NotAPolyhedron,
    #[error("a vertex would pass through the brush")]
    PassesThrough,
}

/// Result of analysing a vertex move
#[derive(Debug, Clone)]
pub enum VertexMoveOutcome {
    /// The move is fine, this is the geometry it produces
    Accept(Polyhedron),
    Reject(MoveRejection),
}

impl VertexMoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, VertexMoveOutcome::Accept(_))
    }

    pub fn geometry(&self) -> Option<&Polyhedron> {
        match self {
            VertexMoveOutcome::Accept(geometry) => Some(geometry),
            VertexMoveOutcome::Reject(_) => None,
        }
    }

    fn reject(reason: MoveRejection) -> Self {
        trace!("vertex move rejected: {}", reason);
        VertexMoveOutcome::Reject(reason)
    }
}

/// What to do for a combination of fragment shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCase {
    /// Always allowed as long as the result is a polyhedron
    Accept,
    /// Never allowed
    Forbid,
    /// Swap the fragments and negate the delta, then check
    Invert,
    /// Check whether a moving vertex passes through the remaining fragment
    Check,
}

/// Look up the case for a moving and a remaining fragment
pub fn move_case(moving: Shape, remaining: Shape) -> MoveCase {
    use Shape::*;
    match (moving, remaining) {
        (Empty, Polyhedron) => MoveCase::Forbid,
        (Point, Polygon) | (Edge, Edge) | (Polyhedron, Empty) => MoveCase::Accept,
        (Polygon, Point) | (Polygon, Edge) => MoveCase::Invert,
        (Polyhedron, Point) | (Polyhedron, Edge) | (Polyhedron, Polygon) => MoveCase::Invert,
        // The combinations that cannot occur for a valid brush are checked too
        _ => MoveCase::Check,
    }
}

/// Decide whether moving the vertices at `positions` by `delta` keeps the
/// geometry a valid polyhedron inside `world_bounds`
///
/// With `allow_vertex_removal` moved vertices may end up inside the result
/// and vanish.
pub fn analyze_vertex_move(
    geometry: &Polyhedron,
    world_bounds: &BBox3,
    positions: &[DVec3],
    delta: DVec3,
    allow_vertex_removal: bool,
) -> VertexMoveOutcome {
    if positions.is_empty() || is_zero(delta, ALMOST_ZERO) {
        return VertexMoveOutcome::reject(MoveRejection::NothingToMove);
    }

    let is_moving = |p: DVec3| positions.iter().any(|q| q.abs_diff_eq(p, ALMOST_ZERO));

    let mut remaining_points = Vec::new();
    let mut moving_points = Vec::new();
    let mut result_points = Vec::new();
    for position in geometry.vertex_positions() {
        if is_moving(position) {
            moving_points.push(position);
            result_points.push(position + delta);
        } else {
            remaining_points.push(position);
            result_points.push(position);
        }
    }

    let result = Polyhedron::from_points(result_points);
    if !world_bounds.contains(&result.bounds()) {
        return VertexMoveOutcome::reject(MoveRejection::OutOfWorldBounds);
    }

    // The whole brush moves
    if !moving_points.is_empty() && moving_points.len() == geometry.vertex_count() {
        return VertexMoveOutcome::Accept(result);
    }

    if !allow_vertex_removal
        && moving_points
            .iter()
            .any(|p| !result.has_vertex(*p + delta, ALMOST_ZERO))
    {
        return VertexMoveOutcome::reject(MoveRejection::VertexRemoved);
    }

    if !result.is_polyhedron() {
        return VertexMoveOutcome::reject(MoveRejection::NotAPolyhedron);
    }

    let mut moving = Polyhedron::from_points(moving_points);
    let mut remaining = Polyhedron::from_points(remaining_points);
    let mut delta = delta;

    match move_case(moving.shape(), remaining.shape()) {
        MoveCase::Accept => return VertexMoveOutcome::Accept(result),
        MoveCase::Forbid => return VertexMoveOutcome::reject(MoveRejection::Forbidden),
        MoveCase::Invert => {
            std::mem::swap(&mut moving, &mut remaining);
            delta = -delta;
        }
        MoveCase::Check => {}
    }

    if passes_through(&moving, &remaining, delta) {
        return VertexMoveOutcome::reject(MoveRejection::PassesThrough);
    }

    VertexMoveOutcome::Accept(result)
}

/// Whether a vertex of `moving` crosses a face of `remaining` from behind
///
/// A polygon has no inside, so it is crossed from either side.
fn passes_through(moving: &Polyhedron, remaining: &Polyhedron, delta: DVec3) -> bool {
    let two_sided = remaining.is_polygon();

    moving.vertices().iter().any(|vertex| {
        let old_position = vertex.position;
        let new_position = old_position + delta;
        let ray = Ray3::new(old_position, (new_position - old_position).normalize());

        remaining.faces().iter().any(|face| {
            let from = face.plane.point_status(old_position);
            let to = face.plane.point_status(new_position);
            let side = match (from, to) {
                (PlaneStatus::Below, PlaneStatus::Above) => Side::Back,
                (PlaneStatus::Above, PlaneStatus::Below) if two_sided => Side::Front,
                _ => return false,
            };
            remaining.face_intersect_with_ray(face.id, &ray, side).is_some()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Polyhedron {
        Polyhedron::from_bounds(&BBox3::new(DVec3::ZERO, DVec3::splat(16.0)))
    }

    fn world() -> BBox3 {
        BBox3::cube(4096.0)
    }

    fn top_face() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 16.0),
            DVec3::new(16.0, 0.0, 16.0),
            DVec3::new(16.0, 16.0, 16.0),
            DVec3::new(0.0, 16.0, 16.0),
        ]
    }

    fn base() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(16.0, 0.0, 0.0),
            DVec3::new(16.0, 16.0, 0.0),
            DVec3::new(0.0, 16.0, 0.0),
        ]
    }

    fn with_base(extra: &[DVec3]) -> Polyhedron {
        Polyhedron::from_points(base().into_iter().chain(extra.iter().copied()))
    }

    const APEX: DVec3 = DVec3::new(8.0, 8.0, 16.0);
    const RIDGE: [DVec3; 2] = [DVec3::new(4.0, 8.0, 16.0), DVec3::new(12.0, 8.0, 16.0)];

    fn shapes(geometry: &Polyhedron, moving: &[DVec3]) -> (Shape, Shape) {
        let (moved, kept): (Vec<DVec3>, Vec<DVec3>) = geometry
            .vertex_positions()
            .into_iter()
            .partition(|p| moving.iter().any(|q| q.abs_diff_eq(*p, ALMOST_ZERO)));
        (
            Polyhedron::from_points(moved).shape(),
            Polyhedron::from_points(kept).shape(),
        )
    }

    #[test]
    fn test_move_case_table() {
        use Shape::*;
        assert_eq!(move_case(Empty, Polyhedron), MoveCase::Forbid);
        assert_eq!(move_case(Point, Polygon), MoveCase::Accept);
        assert_eq!(move_case(Point, Polyhedron), MoveCase::Check);
        assert_eq!(move_case(Edge, Edge), MoveCase::Accept);
        assert_eq!(move_case(Edge, Polygon), MoveCase::Check);
        assert_eq!(move_case(Edge, Polyhedron), MoveCase::Check);
        assert_eq!(move_case(Polygon, Point), MoveCase::Invert);
        assert_eq!(move_case(Polygon, Edge), MoveCase::Invert);
        assert_eq!(move_case(Polygon, Polygon), MoveCase::Check);
        assert_eq!(move_case(Polygon, Polyhedron), MoveCase::Check);
        assert_eq!(move_case(Polyhedron, Empty), MoveCase::Accept);
        assert_eq!(move_case(Polyhedron, Point), MoveCase::Invert);
        assert_eq!(move_case(Polyhedron, Edge), MoveCase::Invert);
        assert_eq!(move_case(Polyhedron, Polygon), MoveCase::Invert);
        assert_eq!(move_case(Polyhedron, Polyhedron), MoveCase::Check);
    }

    #[test]
    fn test_rejects_nothing_to_move() {
        let cube = cube();
        let outcome = analyze_vertex_move(&cube, &world(), &[], DVec3::X, true);
        assert!(matches!(outcome, VertexMoveOutcome::Reject(MoveRejection::NothingToMove)));

        let outcome = analyze_vertex_move(&cube, &world(), &[DVec3::ZERO], DVec3::splat(0.0001), true);
        assert!(matches!(outcome, VertexMoveOutcome::Reject(MoveRejection::NothingToMove)));
    }

    #[test]
    fn test_single_vertex_move() {
        // Point moving against a polyhedron: checked, nothing in the way
        let outcome = analyze_vertex_move(&cube(), &world(), &[DVec3::splat(16.0)], DVec3::new(0.0, 0.0, 8.0), false);
        let geometry = outcome.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 8);
        assert_eq!(geometry.face_count(), 7);
        assert!(geometry.has_vertex(DVec3::new(16.0, 16.0, 24.0), ALMOST_ZERO));
    }

    #[test]
    fn test_vertex_through_brush_is_rejected() {
        let outcome = analyze_vertex_move(
            &cube(),
            &world(),
            &[DVec3::splat(16.0)],
            DVec3::new(-24.0, -8.0, -8.0),
            true,
        );
        assert!(matches!(outcome, VertexMoveOutcome::Reject(MoveRejection::PassesThrough)));
    }

    #[test]
    fn test_whole_brush_translation() {
        let cube = cube();
        let outcome = analyze_vertex_move(&cube, &world(), &cube.vertex_positions(), DVec3::new(100.0, -50.0, 3.0), false);
        let geometry = outcome.geometry().unwrap();
        assert!(geometry
            .bounds()
            .is_equal(&BBox3::new(DVec3::new(100.0, -50.0, 3.0), DVec3::new(116.0, -34.0, 19.0)), 1e-9));
    }

    #[test]
    fn test_out_of_world_bounds() {
        let cube = cube();
        let outcome = analyze_vertex_move(&cube, &BBox3::cube(32.0), &[DVec3::splat(16.0)], DVec3::splat(20.0), true);
        assert!(matches!(outcome, VertexMoveOutcome::Reject(MoveRejection::OutOfWorldBounds)));
    }

    #[test]
    fn test_vertex_removal_flag() {
        // Pushing a corner into the brush makes it vanish
        let cube = cube();
        let corner = [DVec3::splat(16.0)];
        let delta = DVec3::splat(-8.0);

        let outcome = analyze_vertex_move(&cube, &world(), &corner, delta, false);
        assert!(matches!(outcome, VertexMoveOutcome::Reject(MoveRejection::VertexRemoved)));

        let outcome = analyze_vertex_move(&cube, &world(), &corner, delta, true);
        assert!(outcome.is_accepted());
        assert_eq!(outcome.geometry().unwrap().vertex_count(), 7);
    }

    #[test]
    fn test_polygon_against_polygon() {
        // Top face moving against the bottom face, both quads
        let cube = cube();
        let up = analyze_vertex_move(&cube, &world(), &top_face(), DVec3::new(0.0, 0.0, 8.0), false);
        assert!(up.is_accepted());

        let through = analyze_vertex_move(&cube, &world(), &top_face(), DVec3::new(0.0, 0.0, -24.0), true);
        assert!(matches!(through, VertexMoveOutcome::Reject(MoveRejection::PassesThrough)));
    }

    #[test]
    fn test_edge_against_polyhedron() {
        let cube = cube();
        let edge = [DVec3::new(16.0, 0.0, 16.0), DVec3::new(16.0, 16.0, 16.0)];
        let outcome = analyze_vertex_move(&cube, &world(), &edge, DVec3::new(4.0, 0.0, 0.0), false);
        let geometry = outcome.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 8);
        assert_eq!(geometry.face_count(), 6);
        assert!(geometry.has_edge(DVec3::new(20.0, 0.0, 16.0), DVec3::new(20.0, 16.0, 16.0), ALMOST_ZERO));
    }

    #[test]
    fn test_inverted_polyhedron_against_point() {
        // A tetrahedron on top of the cube: moving everything but the apex
        // leaves a point, which is handled by swapping the fragments
        let mut points = BBox3::new(DVec3::ZERO, DVec3::splat(16.0)).corners().to_vec();
        let apex = DVec3::new(8.0, 8.0, 32.0);
        points.push(apex);
        let geometry = Polyhedron::from_points(points);
        let moving: Vec<DVec3> = geometry
            .vertex_positions()
            .into_iter()
            .filter(|p| *p != apex)
            .collect();

        let down = analyze_vertex_move(&geometry, &world(), &moving, DVec3::new(0.0, 0.0, -8.0), false);
        assert!(down.is_accepted());

        // Lifting the base past the apex turns the brush inside out
        let up = analyze_vertex_move(&geometry, &world(), &moving, DVec3::new(0.0, 0.0, 40.0), true);
        assert!(matches!(up, VertexMoveOutcome::Reject(MoveRejection::PassesThrough)));
    }

    #[test]
    fn test_positions_off_the_brush_are_forbidden() {
        let outcome = analyze_vertex_move(&cube(), &world(), &[DVec3::splat(100.0)], DVec3::X, true);
        assert!(matches!(outcome, VertexMoveOutcome::Reject(MoveRejection::Forbidden)));
    }

    #[test]
    fn test_apex_over_base() {
        let pyramid = with_base(&[APEX]);
        assert_eq!(shapes(&pyramid, &[APEX]), (Shape::Point, Shape::Polygon));

        let outcome = analyze_vertex_move(&pyramid, &world(), &[APEX], DVec3::new(4.0, 0.0, 0.0), false);
        let geometry = outcome.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 5);
        assert!(geometry.has_vertex(DVec3::new(12.0, 8.0, 16.0), ALMOST_ZERO));
    }

    #[test]
    fn test_tetrahedron_edge_against_opposite_edge() {
        let tetrahedron = Polyhedron::from_points([
            DVec3::ZERO,
            DVec3::new(16.0, 0.0, 0.0),
            DVec3::new(0.0, 16.0, 0.0),
            DVec3::new(0.0, 0.0, 16.0),
        ]);
        let edge = [DVec3::new(16.0, 0.0, 0.0), DVec3::new(0.0, 16.0, 0.0)];
        assert_eq!(shapes(&tetrahedron, &edge), (Shape::Edge, Shape::Edge));

        let outcome = analyze_vertex_move(&tetrahedron, &world(), &edge, DVec3::new(4.0, 4.0, 0.0), false);
        let geometry = outcome.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 4);
        assert!(geometry.has_edge(DVec3::new(20.0, 4.0, 0.0), DVec3::new(4.0, 20.0, 0.0), ALMOST_ZERO));
    }

    #[test]
    fn test_ridge_against_base() {
        let wedge = with_base(&RIDGE);
        assert_eq!(shapes(&wedge, &RIDGE), (Shape::Edge, Shape::Polygon));

        let up = analyze_vertex_move(&wedge, &world(), &RIDGE, DVec3::new(0.0, 0.0, 8.0), false);
        assert!(up.is_accepted());

        let through = analyze_vertex_move(&wedge, &world(), &RIDGE, DVec3::new(0.0, 0.0, -32.0), true);
        assert!(matches!(through, VertexMoveOutcome::Reject(MoveRejection::PassesThrough)));
    }

    #[test]
    fn test_base_against_apex() {
        let pyramid = with_base(&[APEX]);
        assert_eq!(shapes(&pyramid, &base()), (Shape::Polygon, Shape::Point));

        let down = analyze_vertex_move(&pyramid, &world(), &base(), DVec3::new(0.0, 0.0, -8.0), false);
        assert!(down.is_accepted());

        // Lifting the base above the apex turns the pyramid upside down
        let up = analyze_vertex_move(&pyramid, &world(), &base(), DVec3::new(0.0, 0.0, 32.0), true);
        assert!(matches!(up, VertexMoveOutcome::Reject(MoveRejection::PassesThrough)));
    }

    #[test]
    fn test_base_against_ridge() {
        let wedge = with_base(&RIDGE);
        assert_eq!(shapes(&wedge, &base()), (Shape::Polygon, Shape::Edge));

        let outcome = analyze_vertex_move(&wedge, &world(), &base(), DVec3::new(0.0, 0.0, -8.0), false);
        let geometry = outcome.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 6);
        assert!(geometry.has_vertex(DVec3::new(16.0, 16.0, -8.0), ALMOST_ZERO));
    }

    #[test]
    fn test_box_against_roof_ridge() {
        let corners = BBox3::new(DVec3::ZERO, DVec3::splat(16.0)).corners().to_vec();
        let ridge = RIDGE.map(|p| p + DVec3::new(0.0, 0.0, 8.0));
        let geometry = Polyhedron::from_points(corners.iter().copied().chain(ridge));
        assert_eq!(shapes(&geometry, &corners), (Shape::Polyhedron, Shape::Edge));

        let outcome = analyze_vertex_move(&geometry, &world(), &corners, DVec3::new(0.0, 0.0, -8.0), false);
        let geometry = outcome.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 10);
        assert!(geometry.has_vertex(ridge[0], ALMOST_ZERO));
    }

    #[test]
    fn test_box_against_roof_square() {
        let corners = BBox3::new(DVec3::ZERO, DVec3::splat(16.0)).corners().to_vec();
        let roof = [
            DVec3::new(4.0, 4.0, 24.0),
            DVec3::new(12.0, 4.0, 24.0),
            DVec3::new(12.0, 12.0, 24.0),
            DVec3::new(4.0, 12.0, 24.0),
        ];
        let geometry = Polyhedron::from_points(corners.iter().copied().chain(roof));
        assert_eq!(shapes(&geometry, &corners), (Shape::Polyhedron, Shape::Polygon));

        let down = analyze_vertex_move(&geometry, &world(), &corners, DVec3::new(0.0, 0.0, -8.0), false);
        assert_eq!(down.geometry().unwrap().vertex_count(), 12);

        // The box rises past the roof, the roof comes out below the box
        let up = analyze_vertex_move(&geometry, &world(), &corners, DVec3::new(0.0, 0.0, 40.0), true);
        assert!(matches!(up, VertexMoveOutcome::Reject(MoveRejection::PassesThrough)));
    }
}
