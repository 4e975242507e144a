//! Creating brushes from boxes and point clouds
//!
//! The builder also carries the editor defaults from [`KernelConfig`], so
//! grid snapping and transforms can be applied with the configured grid and
//! texture lock.

use brushwork_config::{KernelConfig, DEFAULT_GRID_SIZE};
use glam::{DMat4, DVec3};
use polyhedron::{BBox3, Polyhedron};
use tracing::debug;

use crate::brush::Brush;
use crate::error::BrushError;
use crate::face::best_plane_points;
use crate::factory::{FaceFactory, StandardFaceFactory};
use crate::tex_coords::BrushFaceAttributes;

pub struct BrushBuilder<F: FaceFactory = StandardFaceFactory> {
    world_bounds: BBox3,
    default_texture: String,
    grid_size: f64,
    lock_textures: bool,
    factory: F,
}

impl BrushBuilder {
    pub fn new(world_bounds: BBox3, default_texture: impl Into<String>) -> Self {
        Self {
            world_bounds,
            default_texture: default_texture.into(),
            grid_size: DEFAULT_GRID_SIZE,
            lock_textures: false,
            factory: StandardFaceFactory,
        }
    }

    pub fn from_config(config: &KernelConfig) -> Self {
        let (min, max) = config.world_bounds();
        Self::new(BBox3::new(min, max), config.default_texture.clone())
            .with_grid_size(config.grid_size)
            .with_texture_lock(config.lock_textures)
    }
}

impl<F: FaceFactory> BrushBuilder<F> {
    /// Use another factory for the faces of new brushes
    pub fn with_factory<G: FaceFactory>(self, factory: G) -> BrushBuilder<G> {
        BrushBuilder {
            world_bounds: self.world_bounds,
            default_texture: self.default_texture,
            grid_size: self.grid_size,
            lock_textures: self.lock_textures,
            factory,
        }
    }

    pub fn with_grid_size(mut self, grid_size: f64) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_texture_lock(mut self, lock_textures: bool) -> Self {
        self.lock_textures = lock_textures;
        self
    }

    pub fn world_bounds(&self) -> &BBox3 {
        &self.world_bounds
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn lock_textures(&self) -> bool {
        self.lock_textures
    }

    /// Axis aligned cube of edge length `size` centered on the origin
    pub fn create_cube(&self, size: f64) -> Result<Brush, BrushError> {
        self.create_cuboid(&BBox3::cube(size / 2.0))
    }

    pub fn create_cuboid(&self, bounds: &BBox3) -> Result<Brush, BrushError> {
        self.create_brush(bounds.corners())
    }

    /// Brush around the convex hull of `points`
    ///
    /// Fails with [`BrushError::Invalid`] if the points do not span a
    /// volume.
    pub fn create_brush(&self, points: impl IntoIterator<Item = DVec3>) -> Result<Brush, BrushError> {
        let hull = Polyhedron::from_points(points);
        if !hull.is_polyhedron() {
            debug!("cannot create a brush from a {:?}", hull.shape());
            return Err(BrushError::Invalid);
        }

        let attributes = BrushFaceAttributes::new(self.default_texture.as_str());
        let faces = hull
            .faces()
            .iter()
            .map(|face| {
                let positions = hull.face_positions(face.id);
                let [p0, p1, p2] = best_plane_points(&positions).ok_or(BrushError::Invalid)?;
                self.factory.create_face(p0, p1, p2, &attributes)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Brush::new(&self.world_bounds, faces)
    }

    // ========================================================================
    // Edits with the configured defaults
    // ========================================================================

    /// Snap every vertex of `brush` to the configured grid
    ///
    /// Fails with [`BrushError::Invalid`] and leaves the brush alone if the
    /// snapped vertices do not span a volume.
    pub fn snap_to_grid(&self, brush: &mut Brush) -> Result<(), BrushError> {
        if !brush.can_snap_vertices(self.grid_size) {
            debug!("snapping to grid {} collapses the brush", self.grid_size);
            return Err(BrushError::Invalid);
        }
        brush.snap_vertices(&self.world_bounds, self.grid_size, self.lock_textures)
    }

    /// Transform `brush`, keeping textures in place if texture lock is on
    pub fn transform(&self, brush: &mut Brush, matrix: &DMat4) -> Result<(), BrushError> {
        brush.transform(&self.world_bounds, matrix, self.lock_textures)
    }
}

#[cfg(test)]
mod tests {
    use brushwork_config::ALMOST_ZERO;

    use super::*;
    use crate::face::BrushFace;

    fn builder() -> BrushBuilder {
        BrushBuilder::new(BBox3::cube(8192.0), "brick")
    }

    #[test]
    fn test_create_cube() {
        let brush = builder().create_cube(32.0).unwrap();
        assert_eq!(brush.face_count(), 6);
        assert!(brush.bounds().is_equal(&BBox3::cube(16.0), ALMOST_ZERO));
        assert!(brush.faces().iter().all(|f| f.texture_name() == "brick"));
        for face in brush.faces() {
            // Outward normals: the center is below every face
            assert!(face.boundary().point_distance(DVec3::ZERO) < 0.0);
        }
    }

    #[test]
    fn test_create_brush_from_points() {
        let points = [
            DVec3::ZERO,
            DVec3::new(32.0, 0.0, 0.0),
            DVec3::new(0.0, 32.0, 0.0),
            DVec3::new(0.0, 0.0, 32.0),
            DVec3::new(4.0, 4.0, 4.0),
        ];
        let brush = builder().create_brush(points).unwrap();
        assert_eq!(brush.vertex_count(), 4);
        assert_eq!(brush.edge_count(), 6);
        assert_eq!(brush.face_count(), 4);
        assert!(!brush.has_vertex(DVec3::new(4.0, 4.0, 4.0), ALMOST_ZERO));
    }

    #[test]
    fn test_flat_points_are_invalid() {
        let points = [DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::ONE.with_z(0.0)];
        assert_eq!(builder().create_brush(points).unwrap_err(), BrushError::Invalid);
    }

    #[test]
    fn test_from_config_json() {
        let config = KernelConfig::from_json(r#"{ "world_extent": 64.0, "default_texture": "stone" }"#).unwrap();
        let builder = BrushBuilder::from_config(&config);
        assert!(builder.world_bounds().is_equal(&BBox3::cube(64.0), 0.0));

        let brush = builder.create_cube(16.0).unwrap();
        assert!(brush.faces().iter().all(|f| f.texture_name() == "stone"));
    }

    #[test]
    fn test_from_config_edit_defaults() {
        let config = KernelConfig::from_json(r#"{ "grid_size": 8.0, "lock_textures": true }"#).unwrap();
        let builder = BrushBuilder::from_config(&config);
        assert_eq!(builder.grid_size(), 8.0);
        assert!(builder.lock_textures());

        let builder = BrushBuilder::from_config(&KernelConfig::default());
        assert_eq!(builder.grid_size(), DEFAULT_GRID_SIZE);
        assert!(!builder.lock_textures());
    }

    #[test]
    fn test_snap_to_configured_grid() {
        let builder = builder().with_grid_size(8.0);
        let mut brush = builder
            .create_cuboid(&BBox3::new(DVec3::new(1.0, -2.0, 3.0), DVec3::new(17.0, 13.0, 30.0)))
            .unwrap();
        builder.snap_to_grid(&mut brush).unwrap();
        assert!(brush
            .bounds()
            .is_equal(&BBox3::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(16.0, 16.0, 32.0)), ALMOST_ZERO));
        assert!(brush.fully_specified());

        // A thin slab collapses onto one grid plane
        let builder = builder.with_grid_size(64.0);
        let mut slab = builder
            .create_cuboid(&BBox3::new(DVec3::new(0.0, 0.0, 1.0), DVec3::new(64.0, 64.0, 4.0)))
            .unwrap();
        let before = slab.bounds();
        assert_eq!(builder.snap_to_grid(&mut slab).unwrap_err(), BrushError::Invalid);
        assert!(slab.bounds().is_equal(&before, 0.0));
    }

    #[test]
    fn test_transform_uses_texture_lock() {
        let delta = DVec3::new(8.0, 4.0, 0.0);
        let point = DVec3::new(5.0, 3.0, 16.0);
        let matrix = DMat4::from_translation(delta);

        let tex_coords_after = |lock: bool| {
            let builder = builder().with_texture_lock(lock);
            let mut brush = builder.create_cube(32.0).unwrap();
            let top = brush.find_face_by_normal(DVec3::Z).unwrap();
            let before = brush.face(top).unwrap().tex_coords(point);
            builder.transform(&mut brush, &matrix).unwrap();
            let top = brush.find_face_by_normal(DVec3::Z).unwrap();
            (before, brush.face(top).unwrap().tex_coords(point + delta))
        };

        let (before, after) = tex_coords_after(true);
        assert!(after.abs_diff_eq(before, 1e-9));
        let (before, after) = tex_coords_after(false);
        assert!(!after.abs_diff_eq(before, 1e-9));
    }

    #[test]
    fn test_attributes_survive_json() {
        let brush = builder().create_cube(16.0).unwrap();
        let attributes = brush.face(0).unwrap().attributes();
        let json = serde_json::to_string(attributes).unwrap();
        let parsed: BrushFaceAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, attributes);
    }

    struct Tagged;

    impl FaceFactory for Tagged {
        fn create_face(
            &self,
            p0: DVec3,
            p1: DVec3,
            p2: DVec3,
            attributes: &BrushFaceAttributes,
        ) -> Result<BrushFace, BrushError> {
            let mut attributes = attributes.clone();
            attributes.texture_name.push_str("_tagged");
            BrushFace::new([p0, p1, p2], attributes)
        }
    }

    #[test]
    fn test_custom_factory() {
        let brush = builder().with_factory(Tagged).create_cube(16.0).unwrap();
        assert!(brush.faces().iter().all(|f| f.texture_name() == "brick_tagged"));
    }
}
