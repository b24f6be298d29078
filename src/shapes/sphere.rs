//! Spheres are the simplest curved surface that is useful to a ray
//! tracer: a quadric centered at the object-space origin, optionally
//! clipped to an axial band [zmin, zmax] and an azimuthal wedge
//! [0, phimax]. The quadratic is solved in interval arithmetic with the
//! Ray Tracing Gems discriminant rewrite so that long rays that barely
//! miss do not report phantom intersections.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::core::geometry::{
    nrm_abs_dot_vec3f, pnt3_distance_squaredf, pnt3_distancef, spherical_direction_vec3,
    vec3_coordinate_system, vec3_cross_vec3, vec3_dot_vec3f, Bounds3f, DirectionCone, Normal3f,
    Point2f, Point3f, Ray, Vector3f,
};
use crate::core::glint::{clamp_t, gamma, radians, safe_acos, safe_sqrt, Float};
use crate::core::interaction::{InteractionCommon, SurfaceInteraction};
use crate::core::interval::{interval_sum_squares3, Interval, Point3fi, Vector3fi};
use crate::core::paramset::ParamSet;
use crate::core::sampling::uniform_sample_sphere;
use crate::core::shape::{
    QuadricIntersection, ShapeIntersection, ShapeSample, ShapeSampleContext,
};
use crate::core::transform::Transform;

// the cone sampler switches to a Taylor expansion below sin^2(1.5 deg)
const SIN2_THETA_SMALL: Float = 0.00068523;

#[derive(Debug, Clone)]
pub struct Sphere {
    pub radius: Float,
    pub z_min: Float,
    pub z_max: Float,
    pub theta_z_min: Float,
    pub theta_z_max: Float,
    pub phi_max: Float,
    render_from_object: Transform,
    object_from_render: Transform,
    reverse_orientation: bool,
    transform_swaps_handedness: bool,
}

impl Sphere {
    pub fn new(
        render_from_object: Transform,
        object_from_render: Transform,
        reverse_orientation: bool,
        radius: Float,
        z_min: Float,
        z_max: Float,
        phi_max: Float,
    ) -> Self {
        Sphere {
            radius,
            z_min: clamp_t(z_min.min(z_max), -radius, radius),
            z_max: clamp_t(z_min.max(z_max), -radius, radius),
            theta_z_min: clamp_t(z_min.min(z_max) / radius, -1.0, 1.0).acos(),
            theta_z_max: clamp_t(z_min.max(z_max) / radius, -1.0, 1.0).acos(),
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
    ) -> Arc<Sphere> {
        let radius: Float = params.find_one_float("radius", 1.0);
        let z_min: Float = params.find_one_float("zmin", -radius);
        let z_max: Float = params.find_one_float("zmax", radius);
        let phi_max: Float = params.find_one_float("phimax", 360.0);
        Arc::new(Sphere::new(
            *render_from_object,
            *object_from_render,
            reverse_orientation,
            radius,
            z_min,
            z_max,
            phi_max,
        ))
    }
    pub fn object_bound(&self) -> Bounds3f {
        Bounds3f {
            p_min: Point3f {
                x: -self.radius,
                y: -self.radius,
                z: self.z_min,
            },
            p_max: Point3f {
                x: self.radius,
                y: self.radius,
                z: self.z_max,
            },
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.render_from_object.transform_bounds(&self.object_bound())
    }
    pub fn normal_bounds(&self) -> DirectionCone {
        DirectionCone::entire_sphere()
    }
    /// Solve the sphere quadratic for the ray's t interval. The
    /// discriminant is computed as 4a(r - |fp|)(r + |fp|) with
    /// fp = o - (b/2a) d, which removes the large-magnitude c term from
    /// the subtraction (Ray Tracing Gems ch. 7).
    fn quadratic(&self, o: &Point3fi, d: &Vector3fi) -> Option<(Interval, Interval)> {
        let a: Interval = interval_sum_squares3(d.x, d.y, d.z);
        let b: Interval = (d.x * o.x + d.y * o.y + d.z * o.z) * 2.0;
        let c: Interval =
            interval_sum_squares3(o.x, o.y, o.z) - Interval::from(self.radius).sqr();
        let f: Interval = b / (a * 2.0);
        let fp: Point3fi = *o - *d * f;
        let sqrtf: Interval = interval_sum_squares3(fp.x, fp.y, fp.z).sqrt();
        let discrim: Interval = a
            * 4.0
            * (Interval::from(self.radius) - sqrtf)
            * (Interval::from(self.radius) + sqrtf);
        if discrim.lower_bound() < 0.0 {
            return None;
        }
        let root_discrim: Interval = discrim.sqrt();
        // compute quadratic t values
        let q: Interval = if b.midpoint() < 0.0 {
            (b - root_discrim) * -0.5
        } else {
            (b + root_discrim) * -0.5
        };
        let t0: Interval = q / a;
        let t1: Interval = c / q;
        if t0.lower_bound() > t1.lower_bound() {
            Some((t1, t0))
        } else {
            Some((t0, t1))
        }
    }
    pub fn basic_intersect(&self, r: &Ray, t_max: Float) -> Option<QuadricIntersection> {
        // transform ray to object space, preserving error intervals
        let oi: Point3fi = self
            .object_from_render
            .transform_point3fi(&Point3fi::from_point(&r.o));
        let di: Vector3fi = self
            .object_from_render
            .transform_vector3fi(&Vector3fi::from_vector(&r.d));
        let ray: Ray = Ray::new(oi.midpoint(), di.midpoint(), r.time);

        let (t0, t1) = self.quadratic(&oi, &di)?;
        // check quadric shape t0 and t1 for nearest intersection
        if t0.upper_bound() > t_max || t1.lower_bound() <= 0.0 {
            return None;
        }
        let mut t_shape_hit: Interval = t0;
        if t_shape_hit.lower_bound() <= 0.0 {
            t_shape_hit = t1;
            if t_shape_hit.upper_bound() > t_max {
                return None;
            }
        }
        // compute sphere hit position and phi
        let mut p_hit: Point3f = ray.position(t_shape_hit.midpoint());
        // refine sphere intersection point
        p_hit *= self.radius / pnt3_distancef(&p_hit, &Point3f::default());
        if p_hit.x == 0.0 && p_hit.y == 0.0 {
            p_hit.x = 1e-5 * self.radius;
        }
        let mut phi: Float = p_hit.y.atan2(p_hit.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        // test sphere intersection against clipping parameters
        if (self.z_min > -self.radius && p_hit.z < self.z_min)
            || (self.z_max < self.radius && p_hit.z > self.z_max)
            || phi > self.phi_max
        {
            if t_shape_hit == t1 {
                return None;
            }
            if t1.upper_bound() > t_max {
                return None;
            }
            t_shape_hit = t1;
            p_hit = ray.position(t_shape_hit.midpoint());
            p_hit *= self.radius / pnt3_distancef(&p_hit, &Point3f::default());
            if p_hit.x == 0.0 && p_hit.y == 0.0 {
                p_hit.x = 1e-5 * self.radius;
            }
            phi = p_hit.y.atan2(p_hit.x);
            if phi < 0.0 {
                phi += 2.0 * PI;
            }
            if (self.z_min > -self.radius && p_hit.z < self.z_min)
                || (self.z_max < self.radius && p_hit.z > self.z_max)
                || phi > self.phi_max
            {
                return None;
            }
        }
        Some(QuadricIntersection {
            t_hit: t_shape_hit.midpoint(),
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
        let p_hit: Point3f = isect.p_obj;
        let phi: Float = isect.phi;
        // find parametric representation of sphere hit
        let u: Float = phi / self.phi_max;
        let cos_theta: Float = p_hit.z / self.radius;
        let theta: Float = safe_acos(cos_theta);
        let v: Float = (theta - self.theta_z_min) / (self.theta_z_max - self.theta_z_min);
        // compute sphere dpdu and dpdv
        let z_radius: Float = (p_hit.x * p_hit.x + p_hit.y * p_hit.y).sqrt();
        let inv_z_radius: Float = 1.0 / z_radius;
        let cos_phi: Float = p_hit.x * inv_z_radius;
        let sin_phi: Float = p_hit.y * inv_z_radius;
        let dpdu: Vector3f = Vector3f {
            x: -self.phi_max * p_hit.y,
            y: self.phi_max * p_hit.x,
            z: 0.0,
        };
        let sin_theta: Float = safe_sqrt(1.0 - cos_theta * cos_theta);
        let dpdv: Vector3f = Vector3f {
            x: p_hit.z * cos_phi,
            y: p_hit.z * sin_phi,
            z: -self.radius * sin_theta,
        } * (self.theta_z_max - self.theta_z_min);
        // compute sphere dndu and dndv from the second fundamental form
        let d2p_duu: Vector3f = Vector3f {
            x: p_hit.x,
            y: p_hit.y,
            z: 0.0,
        } * -self.phi_max
            * self.phi_max;
        let d2p_duv: Vector3f = Vector3f {
            x: -sin_phi,
            y: cos_phi,
            z: 0.0,
        } * (self.theta_z_max - self.theta_z_min)
            * p_hit.z
            * self.phi_max;
        let d2p_dvv: Vector3f = Vector3f {
            x: p_hit.x,
            y: p_hit.y,
            z: p_hit.z,
        } * -(self.theta_z_max - self.theta_z_min)
            * (self.theta_z_max - self.theta_z_min);
        let ec: Float = vec3_dot_vec3f(&dpdu, &dpdu);
        let fc: Float = vec3_dot_vec3f(&dpdu, &dpdv);
        let gc: Float = vec3_dot_vec3f(&dpdv, &dpdv);
        let nc: Vector3f = vec3_cross_vec3(&dpdu, &dpdv).normalize();
        let el: Float = vec3_dot_vec3f(&nc, &d2p_duu);
        let fl: Float = vec3_dot_vec3f(&nc, &d2p_duv);
        let gl: Float = vec3_dot_vec3f(&nc, &d2p_dvv);
        let inv_egf2: Float = 1.0 / (ec * gc - fc * fc);
        let dndu = Normal3f::from(
            dpdu * ((fl * fc - el * gc) * inv_egf2) + dpdv * ((el * fc - fl * ec) * inv_egf2),
        );
        let dndv = Normal3f::from(
            dpdu * ((gl * fc - fl * gc) * inv_egf2) + dpdv * ((fl * fc - gl * ec) * inv_egf2),
        );
        // tight float-round bound on the reprojected hit point
        let p_error: Vector3f = Vector3f::from(p_hit).abs() * gamma(5);
        let wo_object: Vector3f = self.object_from_render.transform_vector(wo);
        let si = SurfaceInteraction::new(
            Point3fi::from_point_and_error(&p_hit, &p_error),
            Point2f { x: u, y: v },
            wo_object,
            dpdu,
            dpdv,
            dndu,
            dndv,
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
        self.phi_max * self.radius * (self.z_max - self.z_min)
    }
    /// Uniform sampling of the full sphere by area. Partial spheres are
    /// sampled as if unclipped; see the light-integration code before
    /// changing this.
    pub fn sample(&self, u: &Point2f) -> Option<ShapeSample> {
        let mut p_obj: Point3f = Point3f::default() + uniform_sample_sphere(u) * self.radius;
        // reproject p_obj to the sphere surface and compute its error
        p_obj *= self.radius / pnt3_distancef(&p_obj, &Point3f::default());
        let p_obj_error: Vector3f = Vector3f::from(p_obj).abs() * gamma(5);
        let pi: Point3fi = self
            .render_from_object
            .transform_point3fi(&Point3fi::from_point_and_error(&p_obj, &p_obj_error));
        let mut n: Normal3f = self
            .render_from_object
            .transform_normal(&Normal3f {
                x: p_obj.x,
                y: p_obj.y,
                z: p_obj.z,
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
        let p_center: Point3f = self.render_from_object.transform_point(&Point3f::default());
        // sample uniformly on sphere if the reference point is inside it
        let p_origin: Point3f = ctx.offset_ray_origin_to(&p_center);
        if pnt3_distance_squaredf(&p_origin, &p_center) <= self.radius * self.radius {
            let mut ss = self.sample(u)?;
            ss.intr.time = ctx.time;
            let mut wi: Vector3f = ss.intr.p() - ctx.p();
            if wi.length_squared() == 0.0 {
                return None;
            }
            // convert from area measure returned by sample() above to
            // solid angle measure
            wi = wi.normalize();
            ss.pdf *= pnt3_distance_squaredf(&ctx.p(), &ss.intr.p())
                / nrm_abs_dot_vec3f(&ss.intr.n, &-wi);
            if ss.pdf.is_infinite() {
                return None;
            }
            return Some(ss);
        }

        // compute coordinate system for cone sampling toward the sphere
        let wc: Vector3f = (p_center - ctx.p()).normalize();
        let mut wc_x: Vector3f = Vector3f::default();
        let mut wc_y: Vector3f = Vector3f::default();
        vec3_coordinate_system(&wc, &mut wc_x, &mut wc_y);

        // compute theta and phi for sample inside the subtended cone
        let dc: Float = pnt3_distancef(&ctx.p(), &p_center);
        let inv_dc: Float = 1.0 / dc;
        let sin_theta_max: Float = self.radius * inv_dc;
        let sin_theta_max2: Float = sin_theta_max * sin_theta_max;
        let inv_sin_theta_max: Float = 1.0 / sin_theta_max;
        let cos_theta_max: Float = safe_sqrt(1.0 - sin_theta_max2);
        let mut one_minus_cos_theta_max: Float = 1.0 - cos_theta_max;
        let mut cos_theta: Float = (cos_theta_max - 1.0) * u[0] + 1.0;
        let mut sin_theta2: Float = 1.0 - cos_theta * cos_theta;
        if sin_theta_max2 < SIN2_THETA_SMALL {
            // the standard terms cancel catastrophically for small
            // angles; switch to the Taylor expansion at 0
            sin_theta2 = sin_theta_max2 * u[0];
            cos_theta = (1.0 - sin_theta2).sqrt();
            one_minus_cos_theta_max = sin_theta_max2 / 2.0;
        }
        // compute angle alpha from center of sphere to sampled point
        let cos_alpha: Float = sin_theta2 * inv_sin_theta_max
            + cos_theta * safe_sqrt(1.0 - sin_theta2 * inv_sin_theta_max * inv_sin_theta_max);
        let sin_alpha: Float = safe_sqrt(1.0 - cos_alpha * cos_alpha);
        // compute surface normal and sampled point on sphere
        let phi: Float = u[1] * 2.0 * PI;
        let n_render: Vector3f =
            spherical_direction_vec3(sin_alpha, cos_alpha, phi, &-wc_x, &-wc_y, &-wc);
        let p_render: Point3f = p_center
            + Point3f {
                x: n_render.x,
                y: n_render.y,
                z: n_render.z,
            } * self.radius;
        let p_error: Vector3f = Vector3f::from(p_render).abs() * gamma(5);
        let pi = Point3fi::from_point_and_error(&p_render, &p_error);
        let mut n = Normal3f::from(n_render);
        if self.reverse_orientation {
            n *= -1.0 as Float;
        }
        debug_assert!(one_minus_cos_theta_max != 0.0);
        Some(ShapeSample {
            intr: InteractionCommon::new(pi, n, ctx.time),
            pdf: 1.0 / (2.0 * PI * one_minus_cos_theta_max),
        })
    }
    pub fn pdf_with_ref_point(&self, ctx: &ShapeSampleContext, wi: &Vector3f) -> Float {
        let p_center: Point3f = self.render_from_object.transform_point(&Point3f::default());
        // return the area-measure conversion if the point is inside
        let p_origin: Point3f = ctx.offset_ray_origin_to(&p_center);
        if pnt3_distance_squaredf(&p_origin, &p_center) <= self.radius * self.radius {
            let ray: Ray = ctx.spawn_ray(wi);
            if let Some(isect) = self.intersect(&ray, f32::INFINITY) {
                let mut pdf: Float = pnt3_distance_squaredf(&ctx.p(), &isect.intr.p())
                    / (nrm_abs_dot_vec3f(&isect.intr.common.n, &-(*wi)) * self.area());
                if pdf.is_infinite() {
                    pdf = 0.0;
                }
                return pdf;
            }
            return 0.0;
        }
        // compute general cone PDF for sphere
        let sin_theta_max2: Float =
            self.radius * self.radius / pnt3_distance_squaredf(&ctx.p(), &p_center);
        let cos_theta_max: Float = safe_sqrt(1.0 - sin_theta_max2);
        let mut one_minus_cos_theta_max: Float = 1.0 - cos_theta_max;
        if sin_theta_max2 < SIN2_THETA_SMALL {
            one_minus_cos_theta_max = sin_theta_max2 / 2.0;
        }
        1.0 / (2.0 * PI * one_minus_cos_theta_max)
    }
}
