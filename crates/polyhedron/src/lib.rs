//! Convex polyhedron kernel for brush editing
//!
//! This crate provides the geometry the brush layer is built on:
//! - [`math`] - Planes, boxes, rays, segments and polygons with tolerance aware equality
//! - [`polyhedron`] - Half-edge convex polyhedron with hull construction, plane
//!   clipping, healing, containment and subtraction
//! - [`matcher`] - Pairs faces of a polyhedron before and after an edit
//! - [`raycast`] - Ray / face intersection with side culling

pub mod math;
pub mod matcher;
pub mod polyhedron;
pub mod raycast;

pub use math::*;
pub use matcher::*;
pub use polyhedron::*;
pub use raycast::*;
