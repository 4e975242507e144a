//! Convex brushes for level editing
//!
//! A brush is a convex solid given by a set of bounding planes, each carried
//! by a face with texture settings. The geometry of the solid lives in a
//! [`polyhedron::Polyhedron`] that is rebuilt after every edit.
//!
//! - [`brush`] - The brush type, its queries and edits
//! - [`face`] - Faces: plane points and texture state
//! - [`tex_coords`] - Texture axes, scale, offset and texture lock
//! - [`vertex_move`] - Deciding whether a set of vertices can move
//! - [`builder`] / [`factory`] - Creating brushes and faces

pub mod brush;
pub mod builder;
pub mod error;
pub mod face;
pub mod factory;
pub mod tex_coords;
pub mod vertex_move;

pub use brush::Brush;
pub use builder::BrushBuilder;
pub use error::BrushError;
pub use face::{sort_faces, BrushFace};
pub use factory::{FaceFactory, StandardFaceFactory};
pub use tex_coords::{BrushFaceAttributes, TexCoordSnapshot, TexCoordSystem, WrapStyle};
pub use vertex_move::{analyze_vertex_move, move_case, MoveCase, MoveRejection, VertexMoveOutcome};
