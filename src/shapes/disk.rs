//! The disk is the one quadric whose intersection routine avoids the
//! quadratic equation entirely: intersect the plane z = height, then
//! clip the hit against the annulus radii and the azimuthal wedge.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::core::geometry::{
    nrm_abs_dot_vec3f, pnt3_distance_squaredf, Bounds3f, DirectionCone, Normal3f, Point2f,
    Point3f, Ray, Vector3f,
};
use crate::core::glint::{clamp_t, radians, Float};
use crate::core::interaction::{InteractionCommon, SurfaceInteraction};
use crate::core::interval::{Point3fi, Vector3fi};
use crate::core::paramset::ParamSet;
use crate::core::sampling::concentric_sample_disk;
use crate::core::shape::{
    QuadricIntersection, ShapeIntersection, ShapeSample, ShapeSampleContext,
};
use crate::core::transform::Transform;

#[derive(Debug, Clone)]
pub struct Disk {
    pub height: Float,
    pub radius: Float,
    pub inner_radius: Float,
    pub phi_max: Float,
    render_from_object: Transform,
    object_from_render: Transform,
    reverse_orientation: bool,
    transform_swaps_handedness: bool,
}

impl Disk {
    pub fn new(
        render_from_object: Transform,
        object_from_render: Transform,
        reverse_orientation: bool,
        height: Float,
        radius: Float,
        inner_radius: Float,
        phi_max: Float,
    ) -> Self {
        Disk {
            height,
            radius,
            inner_radius,
            phi_max: radians(clamp_t(phi_max, 0.0, 360.0)),
            transform_swaps_handedness: render_from_object.swaps_handedness(),
            render_from_object,
            object_from_render,
            reverse_orientation,
        }
    }
    pub fn create(
        render_from_object: &Transform,
        object_from_render: &Transform,
        reverse_orientation: bool,
        params: &ParamSet,
    ) -> Arc<Disk> {
        let height: Float = params.find_one_float("height", 0.0);
        let radius: Float = params.find_one_float("radius", 1.0);
        let inner_radius: Float = params.find_one_float("innerradius", 0.0);
        let phi_max: Float = params.find_one_float("phimax", 360.0);
        Arc::new(Disk::new(
            *render_from_object,
            *object_from_render,
            reverse_orientation,
            height,
            radius,
            inner_radius,
            phi_max,
        ))
    }
    pub fn object_bound(&self) -> Bounds3f {
        Bounds3f {
            p_min: Point3f {
                x: -self.radius,
                y: -self.radius,
                z: self.height,
            },
            p_max: Point3f {
                x: self.radius,
                y: self.radius,
                z: self.height,
            },
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.render_from_object.transform_bounds(&self.object_bound())
    }
    /// The disk's normal is the same everywhere, so the cone is exact.
    pub fn normal_bounds(&self) -> DirectionCone {
        let mut n: Normal3f = self
            .render_from_object
            .transform_normal(&Normal3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            })
            .normalize();
        if self.reverse_orientation {
            n *= -1.0 as Float;
        }
        DirectionCone::new(Vector3f::from(n))
    }
    pub fn basic_intersect(&self, r: &Ray, t_max: Float) -> Option<QuadricIntersection> {
        // transform ray to object space
        let oi: Point3fi = self
            .object_from_render
            .transform_point3fi(&Point3fi::from_point(&r.o));
        let di: Vector3fi = self
            .object_from_render
            .transform_vector3fi(&Vector3fi::from_vector(&r.d));
        let ray: Ray = Ray::new(oi.midpoint(), di.midpoint(), r.time);

        // reject disk intersections for rays parallel to the disk's plane
        if ray.d.z == 0.0 {
            return None;
        }
        let t_shape_hit: Float = (self.height - ray.o.z) / ray.d.z;
        if t_shape_hit <= 0.0 || t_shape_hit >= t_max {
            return None;
        }
        // see if hit point is inside disk radii and phimax
        let p_hit: Point3f = ray.position(t_shape_hit);
        let dist2: Float = p_hit.x * p_hit.x + p_hit.y * p_hit.y;
        if dist2 > self.radius * self.radius || dist2 < self.inner_radius * self.inner_radius {
            return None;
        }
        // test disk phi value against phimax
        let mut phi: Float = p_hit.y.atan2(p_hit.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        if phi > self.phi_max {
            return None;
        }
        Some(QuadricIntersection {
            t_hit: t_shape_hit,
            p_obj: p_hit,
            phi,
        })
    }
    pub fn interaction_from_intersection(
        &self,
        isect: &QuadricIntersection,
        wo: &Vector3f,
        time: Float,
    ) -> SurfaceInteraction {
        let mut p_hit: Point3f = isect.p_obj;
        let phi: Float = isect.phi;
        let dist2: Float = p_hit.x * p_hit.x + p_hit.y * p_hit.y;
        // find parametric representation of disk hit
        let u: Float = phi / self.phi_max;
        let r_hit: Float = dist2.sqrt();
        let v: Float = (self.radius - r_hit) / (self.radius - self.inner_radius);
        let dpdu: Vector3f = Vector3f {
            x: -self.phi_max * p_hit.y,
            y: self.phi_max * p_hit.x,
            z: 0.0,
        };
        let dpdv: Vector3f = Vector3f {
            x: p_hit.x,
            y: p_hit.y,
            z: 0.0,
        } * (self.inner_radius - self.radius)
            / r_hit;
        // refine disk intersection point; the hit is then exact
        p_hit.z = self.height;
        let p_error: Vector3f = Vector3f::default();
        let wo_object: Vector3f = self.object_from_render.transform_vector(wo);
        let si = SurfaceInteraction::new(
            Point3fi::from_point_and_error(&p_hit, &p_error),
            Point2f { x: u, y: v },
            wo_object,
            dpdu,
            dpdv,
            Normal3f::default(),
            Normal3f::default(),
            time,
            self.reverse_orientation ^ self.transform_swaps_handedness,
        );
        self.render_from_object.transform_surface_interaction(&si)
    }
    pub fn intersect(&self, r: &Ray, t_max: Float) -> Option<ShapeIntersection> {
        let isect = self.basic_intersect(r, t_max)?;
        let intr = self.interaction_from_intersection(&isect, &-r.d, r.time);
        Some(ShapeIntersection {
            intr,
            t_hit: isect.t_hit,
        })
    }
    pub fn intersect_p(&self, r: &Ray, t_max: Float) -> bool {
        self.basic_intersect(r, t_max).is_some()
    }
    pub fn area(&self) -> Float {
        self.phi_max * 0.5 * (self.radius * self.radius - self.inner_radius * self.inner_radius)
    }
    pub fn sample(&self, u: &Point2f) -> Option<ShapeSample> {
        let pd: Point2f = concentric_sample_disk(u);
        let p_obj: Point3f = Point3f {
            x: pd.x * self.radius,
            y: pd.y * self.radius,
            z: self.height,
        };
        let pi: Point3fi = self
            .render_from_object
            .transform_point3fi(&Point3fi::from_point(&p_obj));
        let mut n: Normal3f = self
            .render_from_object
            .transform_normal(&Normal3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            })
            .normalize();
        if self.reverse_orientation {
            n *= -1.0 as Float;
        }
        Some(ShapeSample {
            intr: InteractionCommon::new(pi, n, 0.0),
            pdf: 1.0 / self.area(),
        })
    }
    pub fn pdf(&self, _intr: &InteractionCommon) -> Float {
        1.0 / self.area()
    }
    pub fn sample_with_ref_point(
        &self,
        ctx: &ShapeSampleContext,
        u: &Point2f,
    ) -> Option<ShapeSample> {
        let mut ss = self.sample(u)?;
        ss.intr.time = ctx.time;
        let mut wi: Vector3f = ss.intr.p() - ctx.p();
        if wi.length_squared() == 0.0 {
            return None;
        }
        // convert from area measure to solid angle measure
        wi = wi.normalize();
        ss.pdf *=
            pnt3_distance_squaredf(&ctx.p(), &ss.intr.p()) / nrm_abs_dot_vec3f(&ss.intr.n, &-wi);
        if ss.pdf.is_infinite() {
            return None;
        }
        Some(ss)
    }
    pub fn pdf_with_ref_point(&self, ctx: &ShapeSampleContext, wi: &Vector3f) -> Float {
        // intersect sample ray with shape geometry
        let ray: Ray = ctx.spawn_ray(wi);
        if let Some(isect) = self.intersect(&ray, f32::INFINITY) {
            // convert light sample weight to solid angle measure
            let mut pdf: Float = pnt3_distance_squaredf(&ctx.p(), &isect.intr.p())
                / (nrm_abs_dot_vec3f(&isect.intr.common.n, &-(*wi)) * self.area());
            if pdf.is_infinite() {
                pdf = 0.0;
            }
            pdf
        } else {
            0.0
        }
    }
}
