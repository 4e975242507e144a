//! Vertex, edge and face editing
//!
//! These edits work on point sets rather than planes. The new point set is
//! turned into a polyhedron, the new faces are matched to the old ones to
//! carry texture settings over, and the brush is rebuilt from the new face
//! planes.
//!
//! The mutators expect the matching `can_*` predicate to have been checked
//! by the caller and do not repeat the feasibility analysis in release
//! builds.

use brushwork_config::ALMOST_ZERO;
use glam::{DMat4, DVec3};
use polyhedron::{
    points_transformation_matrix, snap_to_grid, BBox3, FaceId, Polygon3, Polyhedron, PolyhedronMatcher, Segment3,
};
use tracing::trace;

use super::Brush;
use crate::error::BrushError;
use crate::face::BrushFace;
use crate::tex_coords::WrapStyle;
use crate::vertex_move::{analyze_vertex_move, VertexMoveOutcome};

impl Brush {
    // ========================================================================
    // Moving
    // ========================================================================

    /// Whether the vertices at `positions` can move by `delta`
    ///
    /// Moved vertices may end up inside the brush and disappear.
    pub fn can_move_vertices(&self, world_bounds: &BBox3, positions: &[DVec3], delta: DVec3) -> bool {
        analyze_vertex_move(&self.geometry, world_bounds, positions, delta, true).is_accepted()
    }

    /// Move vertices and return where they ended up
    ///
    /// Vertices that were absorbed by the new geometry are not reported.
    pub fn move_vertices(
        &mut self,
        world_bounds: &BBox3,
        positions: &[DVec3],
        delta: DVec3,
        uv_lock: bool,
    ) -> Result<Vec<DVec3>, BrushError> {
        debug_assert!(self.can_move_vertices(world_bounds, positions, delta));
        self.move_vertex_positions(world_bounds, positions, delta, uv_lock)?;

        Ok(positions
            .iter()
            .filter_map(|p| self.find_closest_vertex(*p + delta, ALMOST_ZERO))
            .collect())
    }

    /// Whether the edges can move by `delta` and all still exist afterwards
    pub fn can_move_edges(&self, world_bounds: &BBox3, edges: &[Segment3], delta: DVec3) -> bool {
        let positions = Segment3::collect_vertices(edges);
        match analyze_vertex_move(&self.geometry, world_bounds, &positions, delta, false) {
            VertexMoveOutcome::Accept(result) => edges
                .iter()
                .all(|e| result.has_edge(e.start + delta, e.end + delta, ALMOST_ZERO)),
            VertexMoveOutcome::Reject(_) => false,
        }
    }

    pub fn move_edges(
        &mut self,
        world_bounds: &BBox3,
        edges: &[Segment3],
        delta: DVec3,
        uv_lock: bool,
    ) -> Result<Vec<Segment3>, BrushError> {
        debug_assert!(self.can_move_edges(world_bounds, edges, delta));
        let positions = Segment3::collect_vertices(edges);
        self.move_vertex_positions(world_bounds, &positions, delta, uv_lock)?;

        Ok(edges
            .iter()
            .filter_map(|e| {
                let edge = self
                    .geometry
                    .find_closest_edge(e.start + delta, e.end + delta, ALMOST_ZERO)?;
                self.geometry.edge_segment(edge)
            })
            .collect())
    }

    /// Whether the faces can move by `delta` and all still exist afterwards
    pub fn can_move_faces(&self, world_bounds: &BBox3, polygons: &[Polygon3], delta: DVec3) -> bool {
        let positions = Polygon3::collect_vertices(polygons);
        match analyze_vertex_move(&self.geometry, world_bounds, &positions, delta, false) {
            VertexMoveOutcome::Accept(result) => polygons
                .iter()
                .all(|p| result.has_face(p.translate(delta).vertices(), ALMOST_ZERO)),
            VertexMoveOutcome::Reject(_) => false,
        }
    }

    pub fn move_faces(
        &mut self,
        world_bounds: &BBox3,
        polygons: &[Polygon3],
        delta: DVec3,
        uv_lock: bool,
    ) -> Result<Vec<Polygon3>, BrushError> {
        debug_assert!(self.can_move_faces(world_bounds, polygons, delta));
        let positions = Polygon3::collect_vertices(polygons);
        self.move_vertex_positions(world_bounds, &positions, delta, uv_lock)?;

        Ok(polygons
            .iter()
            .filter_map(|p| {
                let face = self
                    .geometry
                    .find_closest_face(p.translate(delta).vertices(), ALMOST_ZERO)?;
                Some(self.geometry.face_polygon(face))
            })
            .collect())
    }

    fn move_vertex_positions(
        &mut self,
        world_bounds: &BBox3,
        positions: &[DVec3],
        delta: DVec3,
        uv_lock: bool,
    ) -> Result<(), BrushError> {
        let is_moving = |p: DVec3| positions.iter().any(|q| q.abs_diff_eq(p, ALMOST_ZERO));
        let targets: Vec<(DVec3, DVec3)> = self
            .geometry
            .vertex_positions()
            .into_iter()
            .map(|p| (p, if is_moving(p) { p + delta } else { p }))
            .collect();

        let new_geometry = Polyhedron::from_points(targets.iter().map(|(_, target)| *target));
        let mapping: Vec<(DVec3, DVec3)> = targets
            .iter()
            .filter_map(|(old, target)| {
                let vertex = new_geometry.find_closest_vertex(*target, ALMOST_ZERO)?;
                new_geometry.vertex(vertex).map(|v| (*old, v.position))
            })
            .collect();

        self.set_new_geometry(world_bounds, &new_geometry, &mapping, uv_lock)
    }

    // ========================================================================
    // Adding, removing and snapping
    // ========================================================================

    /// Whether a vertex can be added at `position`, which must lie outside
    /// the brush
    pub fn can_add_vertex(&self, world_bounds: &BBox3, position: DVec3) -> bool {
        world_bounds.contains_point(position) && !self.geometry.contains_point(position)
    }

    pub fn add_vertex(&mut self, world_bounds: &BBox3, position: DVec3) -> Result<DVec3, BrushError> {
        debug_assert!(self.can_add_vertex(world_bounds, position));
        let mut new_geometry = self.geometry.clone();
        new_geometry.add_point(position);
        self.set_new_geometry(world_bounds, &new_geometry, &[], false)?;

        self.find_closest_vertex(position, ALMOST_ZERO)
            .ok_or(BrushError::Invalid)
    }

    pub fn can_remove_vertices(&self, positions: &[DVec3]) -> bool {
        !positions.is_empty() && self.geometry_without(positions).is_polyhedron()
    }

    pub fn remove_vertices(&mut self, world_bounds: &BBox3, positions: &[DVec3]) -> Result<(), BrushError> {
        debug_assert!(self.can_remove_vertices(positions));
        let new_geometry = self.geometry_without(positions);
        self.set_new_geometry(world_bounds, &new_geometry, &[], false)
    }

    fn geometry_without(&self, positions: &[DVec3]) -> Polyhedron {
        Polyhedron::from_points(
            self.geometry
                .vertex_positions()
                .into_iter()
                .filter(|p| !positions.iter().any(|q| q.abs_diff_eq(*p, ALMOST_ZERO))),
        )
    }

    /// Whether snapping every vertex to a grid of size `grid` keeps a solid
    pub fn can_snap_vertices(&self, grid: f64) -> bool {
        Polyhedron::from_points(self.snapped_positions(grid).into_iter().map(|(_, snapped)| snapped))
            .is_polyhedron()
    }

    pub fn snap_vertices(&mut self, world_bounds: &BBox3, grid: f64, uv_lock: bool) -> Result<(), BrushError> {
        debug_assert!(self.can_snap_vertices(grid));
        let snapped = self.snapped_positions(grid);
        let new_geometry = Polyhedron::from_points(snapped.iter().map(|(_, p)| *p));
        let mapping: Vec<(DVec3, DVec3)> = snapped
            .into_iter()
            .filter(|(_, destination)| new_geometry.has_vertex(*destination, ALMOST_ZERO))
            .collect();
        self.set_new_geometry(world_bounds, &new_geometry, &mapping, uv_lock)
    }

    fn snapped_positions(&self, grid: f64) -> Vec<(DVec3, DVec3)> {
        self.geometry
            .vertex_positions()
            .into_iter()
            .map(|p| (p, snap_to_grid(p, grid)))
            .collect()
    }

    // ========================================================================
    // Applying new geometry
    // ========================================================================

    /// Rebuild the brush around `new_geometry`
    ///
    /// Every new face takes its texture settings from the old face it
    /// matches best. `mapping` pairs old vertex positions with new ones;
    /// vertices it leaves out are paired by position.
    fn set_new_geometry(
        &mut self,
        world_bounds: &BBox3,
        new_geometry: &Polyhedron,
        mapping: &[(DVec3, DVec3)],
        uv_lock: bool,
    ) -> Result<(), BrushError> {
        let faces = {
            let matcher = PolyhedronMatcher::with_vertex_mapping(&self.geometry, new_geometry, mapping);
            self.faces_for_new_geometry(&matcher, uv_lock)
        };
        self.commit_faces(world_bounds, faces)
    }

    fn faces_for_new_geometry(&self, matcher: &PolyhedronMatcher<'_>, uv_lock: bool) -> Vec<BrushFace> {
        let left = matcher.left();
        let right = matcher.right();
        let mut faces = Vec::with_capacity(right.face_count());

        matcher.process_right_faces(|left_face, right_face| {
            let Some(source) = left
                .face(left_face)
                .and_then(|f| f.payload)
                .and_then(|p| self.faces.get(p.index()))
            else {
                return;
            };

            let mut face = source.clone();
            if let Err(err) = face.update_points_from_vertices(&right.face_positions(right_face)) {
                trace!("skipping new face {:?}: {}", right_face, err);
                return;
            }
            if uv_lock {
                if let Some(matrix) = find_transform_for_uv_lock(matcher, left_face, right_face) {
                    apply_uv_lock(&matrix, source, &mut face);
                }
            }
            faces.push(face);
        });

        faces
    }
}

/// Affine transform taking the old face onto the new one, if the matched
/// vertices pin one down
///
/// Unmoved vertices are used first. With three or more of them the face
/// was only partly moved and no single transform keeps its texture in
/// place.
fn find_transform_for_uv_lock(matcher: &PolyhedronMatcher<'_>, left_face: FaceId, right_face: FaceId) -> Option<DMat4> {
    let left = matcher.left();
    let right = matcher.right();
    let mut unmoved = Vec::new();
    let mut moved = Vec::new();

    matcher.visit_matching_vertex_pairs(left_face, right_face, |left_vertex, right_vertex| {
        let (Some(old), Some(new)) = (left.vertex(left_vertex), right.vertex(right_vertex)) else {
            return;
        };
        if old.position.abs_diff_eq(new.position, ALMOST_ZERO) {
            unmoved.push((old.position, old.position));
        } else {
            moved.push((old.position, new.position));
        }
    });

    if unmoved.len() >= 3 {
        return None;
    }

    // TODO: prefer well spread moved vertices when there are more than three to pick from
    let references: Vec<(DVec3, DVec3)> = unmoved.into_iter().chain(moved).take(3).collect();
    let [a, b, c] = references.as_slice() else {
        return None;
    };

    let matrix = points_transformation_matrix([a.0, b.0, c.0], [a.1, b.1, c.1]);
    matrix.is_finite().then_some(matrix)
}

/// Give `target` the texture settings `source` has after being moved by
/// `matrix` with texture lock
fn apply_uv_lock(matrix: &DMat4, source: &BrushFace, target: &mut BrushFace) {
    let mut locked = source.clone();
    if locked.transform(matrix, true).is_err() {
        return;
    }
    target.copy_tex_coord_system_from_face(
        &locked.take_tex_coord_snapshot(),
        locked.attributes(),
        locked.boundary(),
        WrapStyle::Rotation,
    );
}

#[cfg(test)]
mod tests {
    use super::super::tests::{cube16, cuboid, world};
    use super::*;
    use crate::tex_coords::BrushFaceAttributes;

    fn top_polygon() -> Polygon3 {
        Polygon3::new(vec![
            DVec3::new(0.0, 0.0, 16.0),
            DVec3::new(16.0, 0.0, 16.0),
            DVec3::new(16.0, 16.0, 16.0),
            DVec3::new(0.0, 16.0, 16.0),
        ])
    }

    #[test]
    fn test_move_single_vertex() {
        let mut brush = cube16();
        let corner = [DVec3::splat(16.0)];
        let delta = DVec3::new(0.0, 0.0, 8.0);
        assert!(brush.can_move_vertices(&world(), &corner, delta));

        let moved = brush.move_vertices(&world(), &corner, delta, false).unwrap();
        assert_eq!(moved, vec![DVec3::new(16.0, 16.0, 24.0)]);
        assert_eq!(brush.vertex_count(), 8);
        assert_eq!(brush.face_count(), 7);
        assert!(brush.closed());
        assert!(brush.fully_specified());
        assert!(brush.faces().iter().all(|f| f.texture_name() == "wall"));
    }

    #[test]
    fn test_vertex_through_brush_is_rejected() {
        let brush = cube16();
        assert!(!brush.can_move_vertices(&world(), &[DVec3::splat(16.0)], DVec3::new(-24.0, -8.0, -8.0)));
    }

    #[test]
    fn test_whole_brush_translation() {
        let mut brush = cube16();
        let positions = brush.vertex_positions();
        let delta = DVec3::new(32.0, 16.0, -8.0);
        assert!(brush.can_move_vertices(&world(), &positions, delta));

        let moved = brush.move_vertices(&world(), &positions, delta, true).unwrap();
        assert_eq!(moved.len(), 8);
        assert!(brush.bounds().is_equal(
            &BBox3::new(DVec3::new(32.0, 16.0, -8.0), DVec3::new(48.0, 32.0, 8.0)),
            ALMOST_ZERO
        ));
    }

    #[test]
    fn test_move_vertex_out_of_world() {
        let brush = cube16();
        assert!(!brush.can_move_vertices(&BBox3::cube(20.0), &[DVec3::splat(16.0)], DVec3::splat(8.0)));
    }

    #[test]
    fn test_move_edge() {
        let mut brush = cube16();
        let edge = Segment3::new(DVec3::new(16.0, 0.0, 16.0), DVec3::new(16.0, 16.0, 16.0));
        let delta = DVec3::new(4.0, 0.0, 0.0);
        assert!(brush.can_move_edges(&world(), &[edge], delta));

        let moved = brush.move_edges(&world(), &[edge], delta, false).unwrap();
        assert_eq!(moved.len(), 1);
        assert!(moved[0].is_equal(&edge.translate(delta), ALMOST_ZERO));
        assert_eq!(brush.vertex_count(), 8);
        assert_eq!(brush.face_count(), 6);
    }

    #[test]
    fn test_edge_that_would_vanish_cannot_move() {
        // Pushing the edge into the brush leaves it inside the hull
        let brush = cube16();
        let edge = Segment3::new(DVec3::new(16.0, 0.0, 16.0), DVec3::new(16.0, 16.0, 16.0));
        assert!(!brush.can_move_edges(&world(), &[edge], DVec3::new(-8.0, 0.0, -8.0)));
    }

    #[test]
    fn test_move_face() {
        let mut brush = cube16();
        let delta = DVec3::new(0.0, 0.0, 8.0);
        assert!(brush.can_move_faces(&world(), &[top_polygon()], delta));

        let moved = brush.move_faces(&world(), &[top_polygon()], delta, false).unwrap();
        assert_eq!(moved.len(), 1);
        assert!(moved[0].is_equal(&top_polygon().translate(delta), ALMOST_ZERO));
        assert!(brush
            .bounds()
            .is_equal(&BBox3::new(DVec3::ZERO, DVec3::new(16.0, 16.0, 24.0)), ALMOST_ZERO));
        assert_eq!(brush.face_count(), 6);
    }

    #[test]
    fn test_face_cannot_pass_through_brush() {
        let brush = cube16();
        assert!(!brush.can_move_faces(&world(), &[top_polygon()], DVec3::new(0.0, 0.0, -24.0)));
    }

    #[test]
    fn test_move_face_keeps_textures() {
        let mut brush = cube16();
        let top = brush.find_face_by_normal(DVec3::Z).unwrap();
        brush.faces[top].set_attributes(BrushFaceAttributes::new("roof"));

        brush
            .move_faces(&world(), &[top_polygon()], DVec3::new(2.0, 0.0, 0.0), true)
            .unwrap();
        let top = brush.find_face_by_normal(DVec3::Z).unwrap();
        assert_eq!(brush.face(top).unwrap().texture_name(), "roof");
        assert_eq!(brush.faces().iter().filter(|f| f.texture_name() == "roof").count(), 1);
    }

    #[test]
    fn test_uv_lock_on_face_move() {
        // Sliding the top face sideways keeps the top texture in place on it
        let mut brush = cube16();
        let top = brush.find_face_by_normal(DVec3::Z).unwrap();
        let corner = DVec3::new(0.0, 0.0, 16.0);
        let before = brush.face(top).unwrap().tex_coords(corner);

        let delta = DVec3::new(4.0, 2.0, 0.0);
        brush.move_faces(&world(), &[top_polygon()], delta, true).unwrap();
        let top = brush.find_face_by_normal(DVec3::Z).unwrap();
        let after = brush.face(top).unwrap().tex_coords(corner + delta);
        assert!(before.abs_diff_eq(after, 1e-6));
    }

    #[test]
    fn test_add_vertex() {
        let mut brush = cube16();
        let apex = DVec3::new(8.0, 8.0, 24.0);
        assert!(brush.can_add_vertex(&world(), apex));
        assert!(!brush.can_add_vertex(&world(), DVec3::splat(8.0)));
        assert!(!brush.can_add_vertex(&BBox3::cube(20.0), DVec3::splat(30.0)));

        let added = brush.add_vertex(&world(), apex).unwrap();
        assert!(added.abs_diff_eq(apex, ALMOST_ZERO));
        assert_eq!(brush.vertex_count(), 9);
        assert_eq!(brush.face_count(), 9);
        assert!(brush.fully_specified());
    }

    #[test]
    fn test_remove_vertices() {
        let mut brush = cube16();
        let corner = [DVec3::splat(16.0)];
        assert!(brush.can_remove_vertices(&corner));
        assert!(!brush.can_remove_vertices(&[]));
        let top: Vec<DVec3> = top_polygon().vertices().to_vec();
        assert!(!brush.can_remove_vertices(&top));

        brush.remove_vertices(&world(), &corner).unwrap();
        assert_eq!(brush.vertex_count(), 7);
        assert_eq!(brush.face_count(), 7);
        assert!(!brush.has_vertex(DVec3::splat(16.0), ALMOST_ZERO));
    }

    #[test]
    fn test_snap_on_grid_is_a_no_op() {
        let mut brush = cuboid(DVec3::new(-8.0, 0.0, 4.0), DVec3::new(24.0, 8.0, 20.0));
        let mut before = brush.vertex_positions();
        assert!(brush.can_snap_vertices(1.0));

        brush.snap_vertices(&world(), 1.0, false).unwrap();
        let mut after = brush.vertex_positions();
        let order = |a: &DVec3, b: &DVec3| a.to_array().partial_cmp(&b.to_array()).unwrap();
        before.sort_by(order);
        after.sort_by(order);
        assert_eq!(before, after);
        assert_eq!(brush.face_count(), 6);
    }

    #[test]
    fn test_snap_off_grid_vertex() {
        let mut brush = cube16();
        let corner = [DVec3::splat(16.0)];
        brush
            .move_vertices(&world(), &corner, DVec3::new(0.3, 0.2, 0.4), false)
            .unwrap();
        assert!(brush.can_snap_vertices(1.0));
        brush.snap_vertices(&world(), 1.0, false).unwrap();
        assert!(brush
            .vertex_positions()
            .iter()
            .all(|p| p.abs_diff_eq(p.round(), ALMOST_ZERO)));
    }

    #[test]
    fn test_snap_too_coarse_collapses() {
        let brush = cuboid(DVec3::ZERO, DVec3::splat(4.0));
        assert!(!brush.can_snap_vertices(16.0));
    }

    #[test]
    fn test_uv_lock_transform_needs_moved_vertices() {
        let old = Polyhedron::from_bounds(&BBox3::new(DVec3::ZERO, DVec3::splat(16.0)));
        let new = Polyhedron::from_bounds(&BBox3::new(DVec3::ZERO, DVec3::new(16.0, 16.0, 24.0)));
        let mapping: Vec<(DVec3, DVec3)> = old
            .vertex_positions()
            .into_iter()
            .filter(|p| p.z > 8.0)
            .map(|p| (p, p + DVec3::new(0.0, 0.0, 8.0)))
            .collect();
        let matcher = PolyhedronMatcher::with_vertex_mapping(&old, &new, &mapping);

        let mut checked = 0;
        matcher.process_right_faces(|left, right| {
            let normal = new.face(right).unwrap().plane.normal;
            let transform = find_transform_for_uv_lock(&matcher, left, right);
            if normal.z.abs() > 0.5 {
                // Top moved as a whole, bottom did not move at all
                assert_eq!(transform.is_some(), normal.z > 0.5);
            } else {
                // Sides have two moved and two unmoved vertices
                let matrix = transform.unwrap();
                for (from, to) in &mapping {
                    if to.x == 0.0 && normal.x < -0.5 {
                        assert!(matrix.transform_point3(*from).abs_diff_eq(*to, 1e-9));
                    }
                }
            }
            checked += 1;
        });
        assert_eq!(checked, 6);
    }
}
