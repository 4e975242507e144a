//! Edits that rebuild the brush from its face planes

use glam::{DMat4, DVec3};
use polyhedron::{BBox3, Polyhedron};
use tracing::debug;

use super::Brush;
use crate::error::BrushError;
use crate::face::{best_plane_points, BrushFace};
use crate::factory::FaceFactory;
use crate::tex_coords::BrushFaceAttributes;

impl Brush {
    /// Add a face and rebuild
    ///
    /// Returns false and leaves the brush alone if the face would cut it
    /// away entirely or leave it invalid.
    pub fn clip(&mut self, world_bounds: &BBox3, face: BrushFace) -> bool {
        let mut faces = self.faces.clone();
        faces.push(face);
        match self.commit_faces(world_bounds, faces) {
            Ok(()) => !self.faces.is_empty(),
            Err(err) => {
                debug!("clip failed: {}", err);
                false
            }
        }
    }

    /// Whether moving one face by `delta` keeps the brush inside the world
    /// with all of its faces
    pub fn can_move_boundary(&self, world_bounds: &BBox3, face_index: usize, delta: DVec3) -> bool {
        let Ok(faces) = self.faces_with_moved_boundary(face_index, delta, false) else {
            return false;
        };
        match Brush::new(world_bounds, faces) {
            Ok(test) => {
                world_bounds.contains(&test.bounds())
                    && test.closed()
                    && test.face_count() == self.face_count()
            }
            Err(_) => false,
        }
    }

    pub fn move_boundary(
        &mut self,
        world_bounds: &BBox3,
        face_index: usize,
        delta: DVec3,
        lock_texture: bool,
    ) -> Result<(), BrushError> {
        debug_assert!(self.can_move_boundary(world_bounds, face_index, delta));
        let faces = self.faces_with_moved_boundary(face_index, delta, lock_texture)?;
        self.commit_faces(world_bounds, faces)
    }

    fn faces_with_moved_boundary(
        &self,
        face_index: usize,
        delta: DVec3,
        lock_texture: bool,
    ) -> Result<Vec<BrushFace>, BrushError> {
        let mut faces = self.faces.clone();
        faces
            .get_mut(face_index)
            .ok_or(BrushError::FaceIndexOutOfRange(face_index))?
            .translate(delta, lock_texture)?;
        Ok(faces)
    }

    pub fn can_expand(&self, world_bounds: &BBox3, delta: f64) -> bool {
        self.clone().expand(world_bounds, delta, false)
    }

    /// Push every face outwards along its normal by `delta`
    ///
    /// Negative deltas shrink the brush. Returns false and leaves the brush
    /// alone if it would vanish.
    pub fn expand(&mut self, world_bounds: &BBox3, delta: f64, lock_texture: bool) -> bool {
        let mut faces = self.faces.clone();
        for face in &mut faces {
            let offset = face.normal() * delta;
            if let Err(err) = face.translate(offset, lock_texture) {
                debug!("expand failed: {}", err);
                return false;
            }
        }
        match self.commit_faces(world_bounds, faces) {
            Ok(()) => !self.faces.is_empty(),
            Err(err) => {
                debug!("expand failed: {}", err);
                false
            }
        }
    }

    pub fn can_transform(&self, world_bounds: &BBox3, matrix: &DMat4) -> bool {
        self.clone().transform(world_bounds, matrix, false).is_ok()
    }

    /// Apply an affine transform to every face and rebuild
    pub fn transform(&mut self, world_bounds: &BBox3, matrix: &DMat4, lock_textures: bool) -> Result<(), BrushError> {
        let mut faces = self.faces.clone();
        for face in &mut faces {
            face.transform(matrix, lock_textures)?;
        }
        self.commit_faces(world_bounds, faces)
    }

    /// Cut this brush down to its overlap with `other`
    pub fn intersect(&mut self, world_bounds: &BBox3, other: &Brush) -> Result<(), BrushError> {
        let mut faces = self.faces.clone();
        faces.extend(other.faces.iter().cloned());
        self.commit_faces(world_bounds, faces)
    }

    /// The parts of this brush outside all of `subtrahends`, as convex
    /// brushes
    ///
    /// Faces on this brush's planes keep their textures, faces cut by a
    /// subtrahend take the texture of the subtrahend face that cut them and
    /// the rest get `default_texture`. Fragments that do not form a valid
    /// brush are left out.
    pub fn subtract(
        &self,
        factory: &impl FaceFactory,
        world_bounds: &BBox3,
        default_texture: &str,
        subtrahends: &[&Brush],
    ) -> Vec<Brush> {
        let mut fragments = vec![self.geometry.clone()];
        for subtrahend in subtrahends {
            fragments = fragments
                .iter()
                .flat_map(|fragment| fragment.subtract(&subtrahend.geometry))
                .collect();
        }

        let brushes: Vec<Brush> = fragments
            .iter()
            .filter_map(|geometry| {
                self.create_fragment(factory, world_bounds, default_texture, geometry, subtrahends)
                    .map_err(|err| debug!("dropping subtraction fragment: {}", err))
                    .ok()
            })
            .collect();
        debug!("subtraction produced {} of {} fragments", brushes.len(), fragments.len());
        brushes
    }

    fn create_fragment(
        &self,
        factory: &impl FaceFactory,
        world_bounds: &BBox3,
        default_texture: &str,
        geometry: &Polyhedron,
        subtrahends: &[&Brush],
    ) -> Result<Brush, BrushError> {
        let attributes = BrushFaceAttributes::new(default_texture);
        let faces = geometry
            .faces()
            .iter()
            .map(|face| {
                let positions = geometry.face_positions(face.id);
                let [p0, p1, p2] = best_plane_points(&positions).ok_or(BrushError::Invalid)?;
                factory.create_face(p0, p1, p2, &attributes)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut brush = Brush::new(world_bounds, faces)?;
        brush.clone_face_attributes_from(self);
        for subtrahend in subtrahends {
            brush.clone_inverted_face_attributes_from(subtrahend);
        }
        Ok(brush)
    }

    /// Move all plane points onto integer coordinates and rebuild
    pub fn find_integer_plane_points(&mut self, world_bounds: &BBox3) -> Result<(), BrushError> {
        let mut faces = self.faces.clone();
        for face in &mut faces {
            face.find_integer_plane_points();
        }
        self.commit_faces(world_bounds, faces)
    }
}
