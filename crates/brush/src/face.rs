//! Brush faces: a boundary plane given by three points plus texture state

use glam::{DMat3, DMat4, DVec2, DVec3};
use polyhedron::{plane_normal_weight, FaceId, Plane};

use crate::error::BrushError;
use crate::tex_coords::{BrushFaceAttributes, TexCoordSnapshot, TexCoordSystem, WrapStyle};

/// Offset between the integer plane points of a face
const INTEGER_POINT_SPACING: f64 = 128.0;

/// One bounding plane of a brush
///
/// The plane runs through `points`; its normal is
/// `(points[1] - points[0]) x (points[2] - points[0])` and points out of the
/// brush.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushFace {
    points: [DVec3; 3],
    boundary: Plane,
    attributes: BrushFaceAttributes,
    tex_coord_system: TexCoordSystem,
    /// Face of the owning brush's geometry, None until the brush is built
    geometry: Option<FaceId>,
}

impl BrushFace {
    pub fn new(points: [DVec3; 3], attributes: BrushFaceAttributes) -> Result<Self, BrushError> {
        let boundary = plane_from_points(points)?;
        Ok(Self {
            points,
            boundary,
            attributes,
            tex_coord_system: TexCoordSystem::paraxial(boundary.normal),
            geometry: None,
        })
    }

    pub fn points(&self) -> &[DVec3; 3] {
        &self.points
    }

    pub fn boundary(&self) -> &Plane {
        &self.boundary
    }

    pub fn normal(&self) -> DVec3 {
        self.boundary.normal
    }

    pub fn attributes(&self) -> &BrushFaceAttributes {
        &self.attributes
    }

    pub fn set_attributes(&mut self, attributes: BrushFaceAttributes) {
        self.attributes = attributes;
    }

    pub fn texture_name(&self) -> &str {
        &self.attributes.texture_name
    }

    pub fn tex_coord_system(&self) -> &TexCoordSystem {
        &self.tex_coord_system
    }

    pub fn geometry(&self) -> Option<FaceId> {
        self.geometry
    }

    pub(crate) fn set_geometry(&mut self, geometry: Option<FaceId>) {
        self.geometry = geometry;
    }

    pub fn tex_coords(&self, point: DVec3) -> DVec2 {
        self.tex_coord_system.tex_coords(point, &self.attributes)
    }

    pub fn take_tex_coord_snapshot(&self) -> TexCoordSnapshot {
        self.tex_coord_system.snapshot()
    }

    /// Copy texture alignment from a face with plane `source`
    pub fn copy_tex_coord_system_from_face(
        &mut self,
        snapshot: &TexCoordSnapshot,
        attributes: &BrushFaceAttributes,
        source: &Plane,
        wrap: WrapStyle,
    ) {
        self.attributes = attributes.clone();
        self.tex_coord_system
            .restore(snapshot, source.normal, self.boundary.normal, wrap);
    }

    /// Apply an affine transform to the plane points
    ///
    /// Mirroring transforms flip the winding of the points, so two of them
    /// are swapped to keep the normal pointing out of the brush.
    pub fn transform(&mut self, matrix: &DMat4, lock_texture: bool) -> Result<(), BrushError> {
        let mut points = self.points.map(|p| matrix.transform_point3(p));
        if DMat3::from_mat4(*matrix).determinant() < 0.0 {
            points.swap(1, 2);
        }
        let boundary = plane_from_points(points)?;

        self.tex_coord_system
            .transform(matrix, &mut self.attributes, boundary.normal, lock_texture);
        self.points = points;
        self.boundary = boundary;
        Ok(())
    }

    pub fn translate(&mut self, delta: DVec3, lock_texture: bool) -> Result<(), BrushError> {
        self.transform(&DMat4::from_translation(delta), lock_texture)
    }

    /// Turn the face around, it now bounds the other side of its plane
    pub fn invert(&mut self) {
        self.points.swap(1, 2);
        self.boundary = self.boundary.flip();
    }

    /// Re-derive the plane points from the face's vertex loop
    pub fn update_points_from_vertices(&mut self, positions: &[DVec3]) -> Result<(), BrushError> {
        let Some(points) = best_plane_points(positions) else {
            return Err(BrushError::DegenerateFace([
                positions.first().copied().unwrap_or_default(),
                positions.get(1).copied().unwrap_or_default(),
                positions.get(2).copied().unwrap_or_default(),
            ]));
        };
        let boundary = plane_from_points(points)?;
        self.points = points;
        self.boundary = boundary;
        Ok(())
    }

    /// Move the plane points onto integer coordinates close to the plane
    ///
    /// The two coordinates across the dominant normal axis are rounded and
    /// spread apart; the third is solved from the plane and rounded. The face
    /// is left alone if that would flip or degenerate it.
    pub fn find_integer_plane_points(&mut self) {
        let normal = self.boundary.normal;
        let abs = normal.abs();
        let axis = if abs.x >= abs.y && abs.x >= abs.z {
            0
        } else if abs.y >= abs.z {
            1
        } else {
            2
        };
        let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);

        let anchor = self.points[0].round();
        let solve = |a: f64, b: f64| {
            let mut p = DVec3::ZERO;
            p[i] = a;
            p[j] = b;
            p[axis] = ((self.boundary.distance - normal[i] * a - normal[j] * b) / normal[axis]).round();
            p
        };

        let mut points = [
            solve(anchor[i], anchor[j]),
            solve(anchor[i] + INTEGER_POINT_SPACING, anchor[j]),
            solve(anchor[i], anchor[j] + INTEGER_POINT_SPACING),
        ];
        let Some(plane) = Plane::from_points(points[0], points[1], points[2]) else {
            return;
        };
        if plane.normal.dot(normal) < 0.0 {
            points.swap(1, 2);
        }
        if let Ok(boundary) = plane_from_points(points) {
            self.points = points;
            self.boundary = boundary;
        }
    }
}

fn plane_from_points(points: [DVec3; 3]) -> Result<Plane, BrushError> {
    Plane::from_points(points[0], points[1], points[2]).ok_or(BrushError::DegenerateFace(points))
}

/// Three consecutive corners of a counter-clockwise loop that span the
/// plane best
pub(crate) fn best_plane_points(positions: &[DVec3]) -> Option<[DVec3; 3]> {
    let count = positions.len();
    if count < 3 {
        return None;
    }

    (0..count)
        .map(|i| {
            let prev = positions[(i + count - 1) % count];
            let current = positions[i];
            let next = positions[(i + 1) % count];
            let area = (current - prev).cross(next - prev).length();
            ([prev, current, next], area)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(points, _)| Plane::from_points(points[0], points[1], points[2]).is_some())
        .map(|(points, _)| points)
}

/// Order faces the way QBSP does, by the weight of their normals
///
/// The order decides which of several nearly identical planes survives
/// clipping, so it must stay stable.
pub fn sort_faces(faces: &mut [BrushFace]) {
    faces.sort_by_key(|f| plane_normal_weight(f.normal()));
}
