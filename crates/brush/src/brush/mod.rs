//! The brush: a convex solid bounded by the planes of its faces
//!
//! A brush owns its faces and the polyhedron they carve out of the world.
//! Polyhedron faces refer back to brush faces through `PayloadId`s, which
//! are indices into the face list. Every structural edit builds a new face
//! list and a new polyhedron on the side and only replaces the old ones once
//! the build succeeded, so a failed edit leaves the brush untouched.

mod operations;
mod vertices;

use brushwork_config::{ALMOST_ZERO, WORLD_BOUNDS_PADDING};
use glam::DVec3;
use polyhedron::{
    BBox3, FaceId, GeometryEvent, Plane, PlaneStatus, Polygon3, Polyhedron, PayloadId, Segment3,
};
use tracing::{debug, trace, warn};

use crate::error::BrushError;
use crate::face::{sort_faces, BrushFace};
use crate::tex_coords::WrapStyle;

#[derive(Debug, Clone)]
pub struct Brush {
    faces: Vec<BrushFace>,
    geometry: Polyhedron,
}

impl Brush {
    /// Build a brush from its faces
    ///
    /// The faces are sorted by normal weight, then a box slightly larger than
    /// `world_bounds` is clipped by each face plane in turn. Faces whose plane
    /// does not contribute to the solid are dropped.
    pub fn new(world_bounds: &BBox3, faces: Vec<BrushFace>) -> Result<Self, BrushError> {
        let mut faces = faces;
        sort_faces(&mut faces);
        let (faces, geometry) = build_geometry(world_bounds, faces)?;
        Ok(Self { faces, geometry })
    }

    /// Build the geometry again from the current faces
    pub fn rebuild_geometry(&mut self, world_bounds: &BBox3) -> Result<(), BrushError> {
        self.commit_faces(world_bounds, self.faces.clone())
    }

    /// Replace the faces and geometry with those built from `faces`, or
    /// leave the brush as it is if the build fails
    pub(crate) fn commit_faces(&mut self, world_bounds: &BBox3, faces: Vec<BrushFace>) -> Result<(), BrushError> {
        *self = Self::new(world_bounds, faces)?;
        Ok(())
    }

    // ========================================================================
    // Faces
    // ========================================================================

    pub fn faces(&self) -> &[BrushFace] {
        &self.faces
    }

    pub fn face(&self, index: usize) -> Option<&BrushFace> {
        self.faces.get(index)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Vertex loop of a face
    pub fn face_polygon(&self, index: usize) -> Option<Polygon3> {
        let face_id = self.faces.get(index)?.geometry()?;
        Some(self.geometry.face_polygon(face_id))
    }

    pub fn find_face_by_texture(&self, texture_name: &str) -> Option<usize> {
        self.faces.iter().position(|f| f.texture_name() == texture_name)
    }

    pub fn find_face_by_normal(&self, normal: DVec3) -> Option<usize> {
        self.faces
            .iter()
            .position(|f| f.normal().abs_diff_eq(normal, ALMOST_ZERO))
    }

    pub fn find_face_by_plane(&self, plane: &Plane) -> Option<usize> {
        self.faces
            .iter()
            .position(|f| f.boundary().is_equal(plane, ALMOST_ZERO))
    }

    /// Face whose vertex loop matches `polygon` in any rotation or winding
    pub fn find_face_by_polygon(&self, polygon: &Polygon3) -> Option<usize> {
        (0..self.faces.len()).find(|&index| {
            self.face_polygon(index)
                .is_some_and(|p| p.is_equal(polygon, ALMOST_ZERO))
        })
    }

    /// First face matching any of `polygons`
    pub fn find_face_by_polygons(&self, polygons: &[Polygon3]) -> Option<usize> {
        polygons.iter().find_map(|p| self.find_face_by_polygon(p))
    }

    pub fn find_face_by_geometry(&self, face_id: FaceId) -> Option<usize> {
        self.faces.iter().position(|f| f.geometry() == Some(face_id))
    }

    /// Copy texture settings from faces of `other` on the same plane
    pub fn clone_face_attributes_from(&mut self, other: &Brush) {
        for face in &mut self.faces {
            let Some(source) = other
                .find_face_by_plane(face.boundary())
                .and_then(|index| other.face(index))
            else {
                continue;
            };
            face.copy_tex_coord_system_from_face(
                &source.take_tex_coord_snapshot(),
                source.attributes(),
                source.boundary(),
                WrapStyle::Projection,
            );
        }
    }

    /// Copy texture settings from faces of `other` that lie on the same
    /// plane but face the other way
    pub fn clone_inverted_face_attributes_from(&mut self, other: &Brush) {
        for face in &mut self.faces {
            let Some(source) = other
                .find_face_by_plane(&face.boundary().flip())
                .and_then(|index| other.face(index))
            else {
                continue;
            };
            let target = *face.boundary();
            face.copy_tex_coord_system_from_face(
                &source.take_tex_coord_snapshot(),
                source.attributes(),
                &target,
                WrapStyle::Projection,
            );
        }
    }

    // ========================================================================
    // Geometry queries
    // ========================================================================

    pub fn geometry(&self) -> &Polyhedron {
        &self.geometry
    }

    pub fn bounds(&self) -> BBox3 {
        self.geometry.bounds()
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.geometry.edge_count()
    }

    pub fn vertex_positions(&self) -> Vec<DVec3> {
        self.geometry.vertex_positions()
    }

    pub fn edges(&self) -> Vec<Segment3> {
        self.geometry.edge_segments()
    }

    pub fn has_vertex(&self, position: DVec3, epsilon: f64) -> bool {
        self.geometry.has_vertex(position, epsilon)
    }

    pub fn has_edge(&self, edge: &Segment3, epsilon: f64) -> bool {
        self.geometry.has_edge(edge.start, edge.end, epsilon)
    }

    pub fn has_face(&self, polygon: &Polygon3, epsilon: f64) -> bool {
        self.geometry.has_face(polygon.vertices(), epsilon)
    }

    /// Position of the vertex closest to `position` within `max_distance`
    pub fn find_closest_vertex(&self, position: DVec3, max_distance: f64) -> Option<DVec3> {
        let vertex = self.geometry.find_closest_vertex(position, max_distance)?;
        self.geometry.vertex(vertex).map(|v| v.position)
    }

    /// Indices of the faces that meet at the vertex at `position`
    pub fn incident_faces(&self, position: DVec3) -> Vec<usize> {
        let Some(vertex) = self.geometry.find_vertex_by_position(position, ALMOST_ZERO) else {
            return Vec::new();
        };
        self.geometry
            .incident_faces(vertex)
            .into_iter()
            .filter_map(|face_id| self.find_face_by_geometry(face_id))
            .collect()
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        self.bounds().contains_point(point)
            && self
                .faces
                .iter()
                .all(|f| f.boundary().point_status(point) != PlaneStatus::Above)
    }

    pub fn contains_bounds(&self, bounds: &BBox3) -> bool {
        self.bounds().contains(bounds) && bounds.corners().iter().all(|c| self.contains_point(*c))
    }

    pub fn contains_brush(&self, other: &Brush) -> bool {
        self.geometry.contains(&other.geometry)
    }

    pub fn intersects_bounds(&self, bounds: &BBox3) -> bool {
        self.bounds().intersects(bounds)
    }

    pub fn intersects_brush(&self, other: &Brush) -> bool {
        self.geometry.intersects(&other.geometry)
    }

    pub fn closed(&self) -> bool {
        self.geometry.closed()
    }

    /// Every polyhedron face is bound to a brush face and back
    pub fn fully_specified(&self) -> bool {
        self.geometry.faces().iter().all(|g| {
            g.payload
                .and_then(|p| self.faces.get(p.index()))
                .is_some_and(|f| f.geometry() == Some(g.id))
        })
    }
}

/// Liveness of brush faces while the geometry is built
///
/// A face is live once clipping created a polyhedron face for it and until
/// that polyhedron face is deleted or merged into a neighbour. Only live
/// faces end up in the brush.
struct FaceTracker {
    live: Vec<bool>,
}

impl FaceTracker {
    fn new(count: usize) -> Self {
        Self {
            live: vec![false; count],
        }
    }

    fn set(&mut self, payload: Option<PayloadId>, live: bool) {
        if let Some(slot) = payload.and_then(|p| self.live.get_mut(p.index())) {
            *slot = live;
        }
    }

    fn handle(&mut self, event: GeometryEvent) {
        trace!("geometry event {:?}", event);
        match event {
            GeometryEvent::FaceCreated { payload, .. } => self.set(payload, true),
            GeometryEvent::FaceWillBeDeleted { payload, .. } => self.set(payload, false),
            GeometryEvent::FacesWillBeMerged { removed_payload, .. } => self.set(removed_payload, false),
        }
    }

    fn is_live(&self, payload: PayloadId) -> bool {
        self.live.get(payload.index()).copied().unwrap_or(false)
    }
}

/// Clip the padded world box by every face and bind the surviving faces to
/// the polyhedron faces they produced
fn build_geometry(
    world_bounds: &BBox3,
    mut faces: Vec<BrushFace>,
) -> Result<(Vec<BrushFace>, Polyhedron), BrushError> {
    for face in &mut faces {
        face.set_geometry(None);
    }

    let mut geometry = Polyhedron::from_bounds(&world_bounds.expand(WORLD_BOUNDS_PADDING));
    let mut tracker = FaceTracker::new(faces.len());

    for (index, face) in faces.iter().enumerate() {
        let result = geometry.clip(face.boundary(), Some(PayloadId(index as u32)), |event| {
            tracker.handle(event)
        });
        if result.is_empty() {
            debug!("brush is empty after clipping by face {}", index);
            return Err(BrushError::Empty);
        }
    }

    geometry.correct_vertex_positions();
    if !geometry.heal_edges(|event| tracker.handle(event)) {
        debug!("brush is invalid after healing edges");
        return Err(BrushError::Invalid);
    }

    let faces = bind_faces(&mut geometry, faces, &tracker)?;
    debug!(
        "built brush with {} vertices, {} edges, {} faces",
        geometry.vertex_count(),
        geometry.edge_count(),
        faces.len()
    );
    Ok((faces, geometry))
}

/// Keep the live faces in their current order and point the geometry at
/// their new indices
///
/// Every polyhedron face must carry the payload of a live brush face.
fn bind_faces(
    geometry: &mut Polyhedron,
    faces: Vec<BrushFace>,
    tracker: &FaceTracker,
) -> Result<Vec<BrushFace>, BrushError> {
    let mut geometry_of: Vec<Option<FaceId>> = vec![None; faces.len()];
    for face_geometry in geometry.faces() {
        let Some(payload) = face_geometry.payload else {
            debug!("face {:?} has no brush face", face_geometry.id);
            return Err(BrushError::NotFullySpecified);
        };
        if !tracker.is_live(payload) {
            debug!(
                "face {:?} refers to brush face {:?}, which was never created or is gone",
                face_geometry.id, payload
            );
            return Err(BrushError::NotFullySpecified);
        }
        let Some(slot) = geometry_of
            .get_mut(payload.index())
            .filter(|slot| slot.is_none())
        else {
            debug!("brush face {:?} is bound to more than one face", payload);
            return Err(BrushError::NotFullySpecified);
        };
        *slot = Some(face_geometry.id);
    }

    let mut bound = Vec::with_capacity(geometry.face_count());
    for (index, (mut face, face_id)) in faces.into_iter().zip(geometry_of).enumerate() {
        if !tracker.is_live(PayloadId(index as u32)) {
            trace!("dropping face on {:?}, it does not bound the brush", face.boundary());
            continue;
        }
        let Some(face_id) = face_id else {
            warn!("face on {:?} was created but has no geometry, dropping it", face.boundary());
            continue;
        };
        face.set_geometry(Some(face_id));
        geometry.set_face_payload(face_id, Some(PayloadId(bound.len() as u32)));
        bound.push(face);
    }
    Ok(bound)
}
