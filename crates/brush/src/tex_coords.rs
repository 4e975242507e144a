//! Texture mapping state of a brush face
//!
//! A face maps world positions to texture coordinates by projecting them
//! onto two axes, dividing by the scale and adding the offset. The axes
//! start out paraxial (aligned with the world axis closest to the face) and
//! are carried along when the face is transformed with texture lock.

use brushwork_config::DEFAULT_TEXTURE;
use glam::{DMat3, DMat4, DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Below this the texture axes count as lying in the face normal's direction
const DEGENERATE_AXES_EPSILON: f64 = 0.01;

/// Quake base axes: face normal, u axis, v axis
const BASE_AXES: [[DVec3; 3]; 6] = [
    [DVec3::Z, DVec3::X, DVec3::NEG_Y],
    [DVec3::NEG_Z, DVec3::X, DVec3::NEG_Y],
    [DVec3::X, DVec3::Y, DVec3::NEG_Z],
    [DVec3::NEG_X, DVec3::Y, DVec3::NEG_Z],
    [DVec3::Y, DVec3::X, DVec3::NEG_Z],
    [DVec3::NEG_Y, DVec3::X, DVec3::NEG_Z],
];

/// Texture settings of a face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushFaceAttributes {
    pub texture_name: String,
    pub offset: DVec2,
    pub scale: DVec2,
}

impl BrushFaceAttributes {
    pub fn new(texture_name: impl Into<String>) -> Self {
        Self {
            texture_name: texture_name.into(),
            offset: DVec2::ZERO,
            scale: DVec2::ONE,
        }
    }

    /// Scale with zero components replaced by one
    fn safe_scale(&self) -> DVec2 {
        DVec2::new(
            if self.scale.x == 0.0 { 1.0 } else { self.scale.x },
            if self.scale.y == 0.0 { 1.0 } else { self.scale.y },
        )
    }
}

impl Default for BrushFaceAttributes {
    fn default() -> Self {
        Self::new(DEFAULT_TEXTURE)
    }
}

/// How texture axes are carried over to a face with a different normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapStyle {
    /// Keep the axes, project them onto the target face
    Projection,
    /// Rotate the axes by the rotation taking one normal onto the other
    Rotation,
}

/// Saved texture axes, used to copy texture alignment between faces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TexCoordSnapshot {
    u_axis: DVec3,
    v_axis: DVec3,
}

/// The two axes texture coordinates are measured along
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TexCoordSystem {
    u_axis: DVec3,
    v_axis: DVec3,
}

impl TexCoordSystem {
    pub fn new(u_axis: DVec3, v_axis: DVec3) -> Self {
        Self { u_axis, v_axis }
    }

    /// Axes of the world plane closest to a face with the given normal
    pub fn paraxial(normal: DVec3) -> Self {
        let mut best = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, axes) in BASE_AXES.iter().enumerate() {
            let dot = normal.dot(axes[0]);
            if dot > best_dot {
                best_dot = dot;
                best = i;
            }
        }
        Self {
            u_axis: BASE_AXES[best][1],
            v_axis: BASE_AXES[best][2],
        }
    }

    pub fn u_axis(&self) -> DVec3 {
        self.u_axis
    }

    pub fn v_axis(&self) -> DVec3 {
        self.v_axis
    }

    /// Texture coordinates of a world position
    pub fn tex_coords(&self, point: DVec3, attributes: &BrushFaceAttributes) -> DVec2 {
        let scale = attributes.safe_scale();
        DVec2::new(
            point.dot(self.u_axis) / scale.x,
            point.dot(self.v_axis) / scale.y,
        ) + attributes.offset
    }

    /// Whether the axes cannot project onto a face with this normal
    pub fn is_degenerate_for(&self, normal: DVec3) -> bool {
        self.u_axis
            .cross(self.v_axis)
            .normalize_or_zero()
            .dot(normal)
            .abs()
            < DEGENERATE_AXES_EPSILON
    }

    /// Follow an affine transform of the face
    ///
    /// With `lock` the axes, scale and offset are recomputed so every point
    /// keeps its texture coordinates after being transformed. Without it the
    /// mapping stays fixed in world space and only falls back to paraxial
    /// axes if the current ones no longer fit the face.
    pub fn transform(
        &mut self,
        matrix: &DMat4,
        attributes: &mut BrushFaceAttributes,
        new_normal: DVec3,
        lock: bool,
    ) {
        let linear = DMat3::from_mat4(*matrix);
        if !lock || linear.determinant().abs() < f64::EPSILON {
            if self.is_degenerate_for(new_normal) {
                *self = Self::paraxial(new_normal);
            }
            return;
        }

        let inverse = linear.inverse();
        let inverse_transpose = inverse.transpose();
        let moved_origin = inverse * matrix.w_axis.truncate();
        let scale = attributes.safe_scale();

        let carry = |axis: DVec3, scale: f64, offset: f64| -> Option<(DVec3, f64, f64)> {
            let image = inverse_transpose * axis;
            let length = image.length();
            if length < f64::EPSILON {
                return None;
            }
            Some((
                image / length,
                scale / length,
                offset - moved_origin.dot(axis) / scale,
            ))
        };

        if let (Some((u_axis, u_scale, u_offset)), Some((v_axis, v_scale, v_offset))) = (
            carry(self.u_axis, scale.x, attributes.offset.x),
            carry(self.v_axis, scale.y, attributes.offset.y),
        ) {
            self.u_axis = u_axis;
            self.v_axis = v_axis;
            attributes.scale = DVec2::new(u_scale, v_scale);
            attributes.offset = DVec2::new(u_offset, v_offset);
        }
    }

    pub fn snapshot(&self) -> TexCoordSnapshot {
        TexCoordSnapshot {
            u_axis: self.u_axis,
            v_axis: self.v_axis,
        }
    }

    /// Take over saved axes from a face with `source_normal` onto a face
    /// with `target_normal`
    pub fn restore(
        &mut self,
        snapshot: &TexCoordSnapshot,
        source_normal: DVec3,
        target_normal: DVec3,
        wrap: WrapStyle,
    ) {
        match wrap {
            WrapStyle::Projection => {
                self.u_axis = snapshot.u_axis;
                self.v_axis = snapshot.v_axis;
            }
            WrapStyle::Rotation => {
                let rotation = DQuat::from_rotation_arc(source_normal.normalize(), target_normal.normalize());
                self.u_axis = rotation * snapshot.u_axis;
                self.v_axis = rotation * snapshot.v_axis;
            }
        }

        if self.is_degenerate_for(target_normal) {
            *self = Self::paraxial(target_normal);
        }
    }
}
