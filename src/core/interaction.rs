//! The geometry of a particular point on a surface. Shapes produce a
//! `SurfaceInteraction` from a hit so that the rest of a renderer can
//! shade without knowing which primitive was struck: position with
//! error bounds, parametric coordinates, partial derivatives of the
//! position and normal, and a shading frame that may differ from the
//! true geometric frame when per-vertex normals are interpolated.

use crate::core::geometry::{
    nrm_faceforward_nrm, pnt3_offset_ray_origin, vec3_cross_vec3, Normal3f, Point2f, Point3f, Ray,
    Vector3f,
};
use crate::core::glint::Float;
use crate::core::interval::Point3fi;

/// The position, time, and orientation data shared by surface and
/// sample interactions.
#[derive(Debug, Default, Copy, Clone)]
pub struct InteractionCommon {
    pub pi: Point3fi,
    pub time: Float,
    pub wo: Vector3f,
    pub n: Normal3f,
    pub uv: Point2f,
}

impl InteractionCommon {
    pub fn new(pi: Point3fi, n: Normal3f, time: Float) -> Self {
        InteractionCommon {
            pi,
            time,
            wo: Vector3f::default(),
            n,
            uv: Point2f::default(),
        }
    }
    pub fn p(&self) -> Point3f {
        self.pi.midpoint()
    }
    pub fn p_error(&self) -> Vector3f {
        self.pi.error()
    }
    /// Spawn a ray leaving the surface in direction d, with the origin
    /// offset past the point's error bounds so the ray does not
    /// re-intersect the surface it starts on.
    pub fn spawn_ray(&self, d: &Vector3f) -> Ray {
        let o: Point3f = pnt3_offset_ray_origin(&self.p(), &self.p_error(), &self.n, d);
        Ray {
            o,
            d: *d,
            time: self.time,
            medium: None,
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Shading {
    pub n: Normal3f,
    pub dpdu: Vector3f,
    pub dpdv: Vector3f,
    pub dndu: Normal3f,
    pub dndv: Normal3f,
}

#[derive(Debug, Default, Clone)]
pub struct SurfaceInteraction {
    pub common: InteractionCommon,
    pub dpdu: Vector3f,
    pub dpdv: Vector3f,
    pub dndu: Normal3f,
    pub dndv: Normal3f,
    pub shading: Shading,
    pub face_index: usize,
}

impl SurfaceInteraction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pi: Point3fi,
        uv: Point2f,
        wo: Vector3f,
        dpdu: Vector3f,
        dpdv: Vector3f,
        dndu: Normal3f,
        dndv: Normal3f,
        time: Float,
        flip_normal: bool,
    ) -> Self {
        let mut n = Normal3f::from(vec3_cross_vec3(&dpdu, &dpdv).normalize());
        // adjust normal based on orientation and handedness
        if flip_normal {
            n *= -1.0 as Float;
        }
        SurfaceInteraction {
            common: InteractionCommon {
                pi,
                time,
                wo,
                n,
                uv,
            },
            dpdu,
            dpdv,
            dndu,
            dndv,
            shading: Shading {
                n,
                dpdu,
                dpdv,
                dndu,
                dndv,
            },
            face_index: 0,
        }
    }
    pub fn p(&self) -> Point3f {
        self.common.p()
    }
    pub fn p_error(&self) -> Vector3f {
        self.common.p_error()
    }
    /// Install interpolated shading geometry. When the shading
    /// orientation is authoritative the geometric normal is flipped
    /// into the shading normal's hemisphere, otherwise the reverse.
    pub fn set_shading_geometry(
        &mut self,
        ns: Normal3f,
        dpdus: &Vector3f,
        dpdvs: &Vector3f,
        dndus: &Normal3f,
        dndvs: &Normal3f,
        shading_orientation_is_authoritative: bool,
    ) {
        self.shading.n = ns;
        if shading_orientation_is_authoritative {
            self.common.n = nrm_faceforward_nrm(&self.common.n, &self.shading.n);
        } else {
            self.shading.n = nrm_faceforward_nrm(&self.shading.n, &self.common.n);
        }
        self.shading.dpdu = *dpdus;
        self.shading.dpdv = *dpdvs;
        self.shading.dndu = *dndus;
        self.shading.dndv = *dndvs;
    }
    pub fn spawn_ray(&self, d: &Vector3f) -> Ray {
        self.common.spawn_ray(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::nrm_dot_nrmf;

    fn flat_interaction(flip: bool) -> SurfaceInteraction {
        SurfaceInteraction::new(
            Point3fi::from_point(&Point3f::default()),
            Point2f::default(),
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
            Vector3f {
                x: 1.0,
                y: 0.0,
                z: 0.0,
            },
            Vector3f {
                x: 0.0,
                y: 1.0,
                z: 0.0,
            },
            Normal3f::default(),
            Normal3f::default(),
            0.0,
            flip,
        )
    }

    #[test]
    fn normal_follows_partial_derivatives() {
        let si = flat_interaction(false);
        assert_eq!(
            si.common.n,
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: 1.0
            }
        );
        let si = flat_interaction(true);
        assert_eq!(
            si.common.n,
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: -1.0
            }
        );
    }

    #[test]
    fn shading_geometry_orients_geometric_normal() {
        let mut si = flat_interaction(false);
        let ns = Normal3f {
            x: 0.0,
            y: 0.1,
            z: -1.0,
        }
        .normalize();
        let dpdus = si.dpdu;
        let dpdvs = si.dpdv;
        si.set_shading_geometry(
            ns,
            &dpdus,
            &dpdvs,
            &Normal3f::default(),
            &Normal3f::default(),
            true,
        );
        // the geometric normal must end up in the shading hemisphere
        assert!(nrm_dot_nrmf(&si.common.n, &si.shading.n) > 0.0);
        assert!(si.common.n.z < 0.0);
    }
}
