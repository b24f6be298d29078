//! Thin geometry - hair, fur, grass - modeled as cubic Bezier curves
//! swept by a width that varies linearly along the curve. A curve is
//! intersected by projecting its control polygon into a coordinate
//! system looking down the ray, conservatively culling against slabs,
//! and recursively halving the u range until a segment is flat enough
//! to treat as a line with a width test. Flat curves face the ray,
//! ribbons interpolate their two endpoint normals, cylinders synthesize
//! a normal curving around the tangent.

use std::sync::Arc;

use crate::core::geometry::{
    bnd3_expand, bnd3_union_bnd3, nrm_abs_dot_vec3f, nrm_cross_vec3, nrm_dot_nrmf,
    pnt3_distance_squaredf, pnt3_distancef, pnt3_lerp, vec3_coordinate_system, vec3_cross_vec3,
    Bounds3f, DirectionCone, Normal3f, Point2f, Point3f, Ray, Vector3f,
};
use crate::core::glint::{clamp_t, gamma, lerp, log2_int, Float};
use crate::core::interaction::{InteractionCommon, SurfaceInteraction};
use crate::core::interval::Point3fi;
use crate::core::paramset::ParamSet;
use crate::core::shape::{Shape, ShapeIntersection, ShapeSample, ShapeSampleContext};
use crate::core::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveType {
    Flat,
    Cylinder,
    Ribbon,
}

/// Data shared by all segments split off one curve: control points,
/// endpoint widths, optional ribbon normals, and the transforms.
#[derive(Debug, Clone)]
pub struct CurveCommon {
    pub curve_type: CurveType,
    pub cp_obj: [Point3f; 4],
    pub width: [Float; 2],
    pub n: [Normal3f; 2],
    pub normal_angle: Float,
    pub inv_sin_normal_angle: Float,
    pub render_from_object: Transform,
    pub object_from_render: Transform,
    pub reverse_orientation: bool,
    pub transform_swaps_handedness: bool,
}

impl CurveCommon {
    pub fn new(
        c: &[Point3f; 4],
        width0: Float,
        width1: Float,
        curve_type: CurveType,
        norm: Option<[Normal3f; 2]>,
        render_from_object: Transform,
        object_from_render: Transform,
        reverse_orientation: bool,
    ) -> Self {
        let transform_swaps_handedness = render_from_object.swaps_handedness();
        if let Some(norm) = norm {
            let n0: Normal3f = norm[0].normalize();
            let n1: Normal3f = norm[1].normalize();
            let normal_angle: Float = clamp_t(nrm_dot_nrmf(&n0, &n1), 0.0, 1.0).acos();
            CurveCommon {
                curve_type,
                cp_obj: *c,
                width: [width0, width1],
                n: [n0, n1],
                normal_angle,
                inv_sin_normal_angle: 1.0 / normal_angle.sin(),
                render_from_object,
                object_from_render,
                reverse_orientation,
                transform_swaps_handedness,
            }
        } else {
            CurveCommon {
                curve_type,
                cp_obj: *c,
                width: [width0, width1],
                n: [Normal3f::default(); 2],
                normal_angle: 0.0,
                inv_sin_normal_angle: 0.0,
                render_from_object,
                object_from_render,
                reverse_orientation,
                transform_swaps_handedness,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Curve {
    pub common: Arc<CurveCommon>,
    pub u_min: Float,
    pub u_max: Float,
}

impl Curve {
    pub fn new(common: Arc<CurveCommon>, u_min: Float, u_max: Float) -> Self {
        Curve {
            common,
            u_min,
            u_max,
        }
    }
    /// Build curve segments from a parameter set ({P (4 control
    /// points), width0, width1, type, N? (2)}); the curve is split into
    /// 2^splitdepth segments so the per-segment bounds stay tight.
    pub fn create(
        render_from_object: &Transform,
        object_from_render: &Transform,
        reverse_orientation: bool,
        params: &ParamSet,
    ) -> Vec<Shape> {
        let width: Float = params.find_one_float("width", 1.0);
        let width0: Float = params.find_one_float("width0", width);
        let width1: Float = params.find_one_float("width1", width);
        let cp: Vec<Point3f> = params.find_point3f("P");
        if cp.len() != 4 {
            log::error!(
                "must provide 4 control points for cubic curve, given {}",
                cp.len()
            );
            return Vec::new();
        }
        let curve_type = match params.find_one_string("type", "flat").as_str() {
            "flat" => CurveType::Flat,
            "cylinder" => CurveType::Cylinder,
            "ribbon" => CurveType::Ribbon,
            other => {
                log::error!("unknown curve type \"{}\"; using \"flat\"", other);
                CurveType::Flat
            }
        };
        let norms: Vec<Normal3f> = params.find_normal3f("N");
        let norm: Option<[Normal3f; 2]> = match curve_type {
            CurveType::Ribbon => {
                if norms.len() != 2 {
                    log::error!(
                        "must provide 2 normals (\"N\") for ribbon curves, given {}",
                        norms.len()
                    );
                    return Vec::new();
                }
                Some([norms[0], norms[1]])
            }
            _ => {
                if !norms.is_empty() {
                    log::warn!("curve normals are only used with \"ribbon\" type curves");
                }
                None
            }
        };
        let split_depth: i32 = params.find_one_int("splitdepth", 3);
        let common = Arc::new(CurveCommon::new(
            &[cp[0], cp[1], cp[2], cp[3]],
            width0,
            width1,
            curve_type,
            norm,
            *render_from_object,
            *object_from_render,
            reverse_orientation,
        ));
        let n_segments: usize = 1usize << split_depth;
        (0..n_segments)
            .map(|i| {
                let u_min = i as Float / n_segments as Float;
                let u_max = (i + 1) as Float / n_segments as Float;
                Shape::Curve(Arc::new(Curve::new(common.clone(), u_min, u_max)))
            })
            .collect()
    }
    /// Object-space control points of this segment of the full curve.
    fn segment_control_points(&self) -> [Point3f; 4] {
        [
            blossom_bezier(&self.common.cp_obj, self.u_min, self.u_min, self.u_min),
            blossom_bezier(&self.common.cp_obj, self.u_min, self.u_min, self.u_max),
            blossom_bezier(&self.common.cp_obj, self.u_min, self.u_max, self.u_max),
            blossom_bezier(&self.common.cp_obj, self.u_max, self.u_max, self.u_max),
        ]
    }
    pub fn object_bound(&self) -> Bounds3f {
        let cp = self.segment_control_points();
        let b = bnd3_union_bnd3(&Bounds3f::new(cp[0], cp[1]), &Bounds3f::new(cp[2], cp[3]));
        let width = [
            lerp(self.u_min, self.common.width[0], self.common.width[1]),
            lerp(self.u_max, self.common.width[0], self.common.width[1]),
        ];
        bnd3_expand(&b, width[0].max(width[1]) * 0.5)
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.common
            .render_from_object
            .transform_bounds(&self.object_bound())
    }
    pub fn normal_bounds(&self) -> DirectionCone {
        DirectionCone::entire_sphere()
    }
    pub fn intersect(&self, r: &Ray, t_max: Float) -> Option<ShapeIntersection> {
        let mut best: Option<ShapeIntersection> = None;
        self.intersect_impl(r, t_max, false, &mut best);
        best
    }
    pub fn intersect_p(&self, r: &Ray, t_max: Float) -> bool {
        let mut best: Option<ShapeIntersection> = None;
        self.intersect_impl(r, t_max, true, &mut best)
    }
    fn intersect_impl(
        &self,
        r: &Ray,
        t_max: Float,
        predicate_only: bool,
        best: &mut Option<ShapeIntersection>,
    ) -> bool {
        // transform ray to the curve's object space
        let ray: Ray = self.common.object_from_render.transform_ray(r);
        let cp_obj = self.segment_control_points();

        // project curve control points to plane perpendicular to ray;
        // orienting the frame's x axis along the chord keeps the curve
        // roughly parallel to x so the y extent, tested first, is tiny
        let mut dx: Vector3f = vec3_cross_vec3(&ray.d, &(cp_obj[3] - cp_obj[0]));
        if dx.length_squared() == 0.0 {
            let mut dy: Vector3f = Vector3f::default();
            vec3_coordinate_system(&ray.d, &mut dx, &mut dy);
        }
        let ray_from_object: Transform =
            Transform::look_at(&ray.o, &(ray.o + ray.d), &dx);
        let cp: [Point3f; 4] = [
            ray_from_object.transform_point(&cp_obj[0]),
            ray_from_object.transform_point(&cp_obj[1]),
            ray_from_object.transform_point(&cp_obj[2]),
            ray_from_object.transform_point(&cp_obj[3]),
        ];

        let max_width: Float = lerp(self.u_min, self.common.width[0], self.common.width[1])
            .max(lerp(self.u_max, self.common.width[0], self.common.width[1]));
        // check for non-overlap in y
        if cp[0].y.max(cp[1].y).max(cp[2].y.max(cp[3].y)) + 0.5 * max_width < 0.0
            || cp[0].y.min(cp[1].y).min(cp[2].y.min(cp[3].y)) - 0.5 * max_width > 0.0
        {
            return false;
        }
        // check for non-overlap in x
        if cp[0].x.max(cp[1].x).max(cp[2].x.max(cp[3].x)) + 0.5 * max_width < 0.0
            || cp[0].x.min(cp[1].x).min(cp[2].x.min(cp[3].x)) - 0.5 * max_width > 0.0
        {
            return false;
        }
        // check for non-overlap in z
        let ray_length: Float = ray.d.length();
        let z_max: Float = ray_length * t_max;
        if cp[0].z.max(cp[1].z).max(cp[2].z.max(cp[3].z)) + 0.5 * max_width < 0.0
            || cp[0].z.min(cp[1].z).min(cp[2].z.min(cp[3].z)) - 0.5 * max_width > z_max
        {
            return false;
        }

        // compute refinement depth for curve
        let mut l0: Float = 0.0;
        for i in 0..2 {
            l0 = l0.max(
                (cp[i].x - 2.0 * cp[i + 1].x + cp[i + 2].x)
                    .abs()
                    .max((cp[i].y - 2.0 * cp[i + 1].y + cp[i + 2].y).abs())
                    .max((cp[i].z - 2.0 * cp[i + 1].z + cp[i + 2].z).abs()),
            );
        }
        let mut max_depth: i32 = 0;
        if l0 > 0.0 {
            // terminate once a segment is within width / 20 of flat;
            // log base 4 because each split quarters the deviation
            let eps: Float = self.common.width[0].max(self.common.width[1]) * 0.05;
            let r0: i32 = log2_int(1.414_213_56 * 6.0 * l0 / (8.0 * eps)) / 2;
            max_depth = clamp_t(r0, 0, 10);
        }
        self.recursive_intersect(
            &ray,
            t_max,
            &cp,
            &Transform::inverse(&ray_from_object),
            self.u_min,
            self.u_max,
            max_depth,
            ray_length,
            predicate_only,
            best,
        )
    }
    #[allow(clippy::too_many_arguments)]
    fn recursive_intersect(
        &self,
        ray: &Ray,
        t_max: Float,
        cp: &[Point3f; 4],
        object_from_ray: &Transform,
        u0: Float,
        u1: Float,
        depth: i32,
        ray_length: Float,
        predicate_only: bool,
        best: &mut Option<ShapeIntersection>,
    ) -> bool {
        if depth > 0 {
            // split curve segment into subsegments and test each
            let cp_split: [Point3f; 7] = subdivide_bezier(cp);
            let u: [Float; 3] = [u0, (u0 + u1) / 2.0, u1];
            let mut hit = false;
            for seg in 0..2 {
                let cps: [Point3f; 4] = [
                    cp_split[3 * seg],
                    cp_split[3 * seg + 1],
                    cp_split[3 * seg + 2],
                    cp_split[3 * seg + 3],
                ];
                let max_width: Float = lerp(u[seg], self.common.width[0], self.common.width[1])
                    .max(lerp(u[seg + 1], self.common.width[0], self.common.width[1]));
                // cull the subsegment's slab bounds before recursing
                if cps[0].y.max(cps[1].y).max(cps[2].y.max(cps[3].y)) + 0.5 * max_width < 0.0
                    || cps[0].y.min(cps[1].y).min(cps[2].y.min(cps[3].y)) - 0.5 * max_width > 0.0
                {
                    continue;
                }
                if cps[0].x.max(cps[1].x).max(cps[2].x.max(cps[3].x)) + 0.5 * max_width < 0.0
                    || cps[0].x.min(cps[1].x).min(cps[2].x.min(cps[3].x)) - 0.5 * max_width > 0.0
                {
                    continue;
                }
                let z_max: Float = ray_length * t_max;
                if cps[0].z.max(cps[1].z).max(cps[2].z.max(cps[3].z)) + 0.5 * max_width < 0.0
                    || cps[0].z.min(cps[1].z).min(cps[2].z.min(cps[3].z)) - 0.5 * max_width > z_max
                {
                    continue;
                }
                hit |= self.recursive_intersect(
                    ray,
                    t_max,
                    &cps,
                    object_from_ray,
                    u[seg],
                    u[seg + 1],
                    depth - 1,
                    ray_length,
                    predicate_only,
                    best,
                );
                // a predicate query can stop at the first hit
                if hit && predicate_only {
                    return true;
                }
            }
            return hit;
        }

        // intersect ray with curve segment

        // test ray against segment endpoint boundaries
        let mut edge: Float = (cp[1].y - cp[0].y) * -cp[0].y + cp[0].x * (cp[0].x - cp[1].x);
        if edge < 0.0 {
            return false;
        }
        edge = (cp[2].y - cp[3].y) * -cp[3].y + cp[3].x * (cp[3].x - cp[2].x);
        if edge < 0.0 {
            return false;
        }
        // find line w that gives minimum distance to sample point
        let segment_dir_x: Float = cp[3].x - cp[0].x;
        let segment_dir_y: Float = cp[3].y - cp[0].y;
        let denom: Float = segment_dir_x * segment_dir_x + segment_dir_y * segment_dir_y;
        if denom == 0.0 {
            return false;
        }
        let w: Float = -(cp[0].x * segment_dir_x + cp[0].y * segment_dir_y) / denom;

        // compute u coordinate of curve intersection point and hit width
        let u: Float = clamp_t(lerp(w, u0, u1), u0, u1);
        let mut hit_width: Float = lerp(u, self.common.width[0], self.common.width[1]);
        let mut n_hit: Normal3f = Normal3f::default();
        if self.common.curve_type == CurveType::Ribbon {
            // scale hit_width based on ribbon orientation
            if self.common.normal_angle == 0.0 {
                n_hit = self.common.n[0];
            } else {
                let sin0: Float =
                    ((1.0 - u) * self.common.normal_angle).sin() * self.common.inv_sin_normal_angle;
                let sin1: Float =
                    (u * self.common.normal_angle).sin() * self.common.inv_sin_normal_angle;
                n_hit = self.common.n[0] * sin0 + self.common.n[1] * sin1;
            }
            hit_width *= nrm_abs_dot_vec3f(&n_hit, &ray.d) / ray_length;
        }

        // test intersection point against curve width
        let mut dpcdw: Vector3f = Vector3f::default();
        let pc: Point3f = eval_bezier(cp, clamp_t(w, 0.0, 1.0), Some(&mut dpcdw));
        let pt_curve_dist2: Float = pc.x * pc.x + pc.y * pc.y;
        if pt_curve_dist2 > hit_width * hit_width * 0.25 {
            return false;
        }
        let z_max: Float = ray_length * t_max;
        if pc.z < 0.0 || pc.z > z_max {
            return false;
        }
        if predicate_only {
            return true;
        }

        // compute v coordinate of curve intersection point
        let pt_curve_dist: Float = pt_curve_dist2.sqrt();
        let edge_func: Float = dpcdw.x * -pc.y + pc.x * dpcdw.y;
        let v: Float = if edge_func > 0.0 {
            0.5 + pt_curve_dist / hit_width
        } else {
            0.5 - pt_curve_dist / hit_width
        };

        // compute hit t and partial derivatives for curve intersection
        let t_hit: Float = pc.z / ray_length;
        if let Some(ref prev) = best {
            if t_hit > prev.t_hit {
                return false;
            }
        }
        // compute dpdu and dpdv for curve intersection
        let mut dpdu: Vector3f = Vector3f::default();
        eval_bezier(&self.common.cp_obj, u, Some(&mut dpdu));
        let dpdv: Vector3f;
        if self.common.curve_type == CurveType::Ribbon {
            dpdv = nrm_cross_vec3(&n_hit, &dpdu).normalize() * hit_width;
        } else {
            // compute curve dpdv for flat and cylinder curves
            let dpdu_plane: Vector3f =
                Transform::inverse(object_from_ray).transform_vector(&dpdu);
            let mut dpdv_plane: Vector3f = Vector3f {
                x: -dpdu_plane.y,
                y: dpdu_plane.x,
                z: 0.0,
            }
            .normalize()
                * hit_width;
            if self.common.curve_type == CurveType::Cylinder {
                // rotate dpdv_plane to give cylindrical appearance
                let theta: Float = lerp(v, -90.0, 90.0);
                let rot: Transform = Transform::rotate(-theta, &dpdu_plane);
                dpdv_plane = rot.transform_vector(&dpdv_plane);
            }
            dpdv = object_from_ray.transform_vector(&dpdv_plane);
        }
        // the hit point is only known to within the curve's width
        let p_error: Vector3f = Vector3f {
            x: 2.0 * hit_width,
            y: 2.0 * hit_width,
            z: 2.0 * hit_width,
        };
        let flip: bool =
            self.common.reverse_orientation ^ self.common.transform_swaps_handedness;
        let p_hit: Point3f = ray.position(t_hit);
        let si = SurfaceInteraction::new(
            Point3fi::from_point_and_error(&p_hit, &p_error),
            Point2f { x: u, y: v },
            -ray.d,
            dpdu,
            dpdv,
            Normal3f::default(),
            Normal3f::default(),
            ray.time,
            flip,
        );
        *best = Some(ShapeIntersection {
            intr: self
                .common
                .render_from_object
                .transform_surface_interaction(&si),
            t_hit,
        });
        true
    }
    pub fn area(&self) -> Float {
        let cp_obj = self.segment_control_points();
        let width0: Float = lerp(self.u_min, self.common.width[0], self.common.width[1]);
        let width1: Float = lerp(self.u_max, self.common.width[0], self.common.width[1]);
        let avg_width: Float = (width0 + width1) * 0.5;
        let mut approx_length: Float = 0.0;
        for i in 0..3 {
            approx_length += pnt3_distancef(&cp_obj[i], &cp_obj[i + 1]);
        }
        approx_length * avg_width
    }
    /// Area sampling over the (u, cross-width) ribbon parameterization:
    /// u picks a point along the curve, the second dimension offsets it
    /// across the width.
    pub fn sample(&self, u: &Point2f) -> Option<ShapeSample> {
        let u_curve: Float = lerp(u[0], self.u_min, self.u_max);
        let mut dpdu: Vector3f = Vector3f::default();
        let p_center: Point3f = eval_bezier(&self.common.cp_obj, u_curve, Some(&mut dpdu));
        if dpdu.length_squared() == 0.0 {
            return None;
        }
        let width: Float = lerp(u_curve, self.common.width[0], self.common.width[1]);
        let tangent: Vector3f = dpdu.normalize();
        let (across, mut n_obj) = match self.common.curve_type {
            CurveType::Ribbon => {
                let n_hit: Normal3f = if self.common.normal_angle == 0.0 {
                    self.common.n[0]
                } else {
                    let sin0: Float = ((1.0 - u_curve) * self.common.normal_angle).sin()
                        * self.common.inv_sin_normal_angle;
                    let sin1: Float = (u_curve * self.common.normal_angle).sin()
                        * self.common.inv_sin_normal_angle;
                    self.common.n[0] * sin0 + self.common.n[1] * sin1
                };
                (nrm_cross_vec3(&n_hit, &tangent).normalize(), n_hit)
            }
            _ => {
                let mut v1: Vector3f = Vector3f::default();
                let mut v2: Vector3f = Vector3f::default();
                vec3_coordinate_system(&tangent, &mut v1, &mut v2);
                (v1, Normal3f::from(v2))
            }
        };
        let p_obj: Point3f = p_center + across * ((u[1] - 0.5) * width);
        if self.common.reverse_orientation {
            n_obj *= -1.0 as Float;
        }
        let p_error: Vector3f = Vector3f::from(p_obj).abs() * gamma(6);
        let pi: Point3fi = self
            .common
            .render_from_object
            .transform_point3fi(&Point3fi::from_point_and_error(&p_obj, &p_error));
        let n: Normal3f = self
            .common
            .render_from_object
            .transform_normal(&n_obj)
            .normalize();
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
        let ray: Ray = ctx.spawn_ray(wi);
        if let Some(isect) = self.intersect(&ray, f32::INFINITY) {
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

// Curve utility functions

/// Evaluate the curve at (u0, u1, u2); with all three equal this is a
/// point on the curve, and mixing endpoints yields the control points
/// of the subdivided segment.
fn blossom_bezier(p: &[Point3f; 4], u0: Float, u1: Float, u2: Float) -> Point3f {
    let a: [Point3f; 3] = [
        pnt3_lerp(u0, &p[0], &p[1]),
        pnt3_lerp(u0, &p[1], &p[2]),
        pnt3_lerp(u0, &p[2], &p[3]),
    ];
    let b: [Point3f; 2] = [pnt3_lerp(u1, &a[0], &a[1]), pnt3_lerp(u1, &a[1], &a[2])];
    pnt3_lerp(u2, &b[0], &b[1])
}

/// Control points of the two halves of a cubic Bezier segment.
fn subdivide_bezier(cp: &[Point3f; 4]) -> [Point3f; 7] {
    [
        cp[0],
        (cp[0] + cp[1]) / 2.0,
        (cp[0] + cp[1] * 2.0 + cp[2]) / 4.0,
        (cp[0] + cp[1] * 3.0 + cp[2] * 3.0 + cp[3]) / 8.0,
        (cp[1] + cp[2] * 2.0 + cp[3]) / 4.0,
        (cp[2] + cp[3]) / 2.0,
        cp[3],
    ]
}

fn eval_bezier(cp: &[Point3f; 4], u: Float, deriv: Option<&mut Vector3f>) -> Point3f {
    let cp1: [Point3f; 3] = [
        pnt3_lerp(u, &cp[0], &cp[1]),
        pnt3_lerp(u, &cp[1], &cp[2]),
        pnt3_lerp(u, &cp[2], &cp[3]),
    ];
    let cp2: [Point3f; 2] = [pnt3_lerp(u, &cp1[0], &cp1[1]), pnt3_lerp(u, &cp1[1], &cp1[2])];
    if let Some(deriv) = deriv {
        if (cp2[1] - cp2[0]).length_squared() > 0.0 {
            *deriv = (cp2[1] - cp2[0]) * 3.0;
        } else {
            // for a degenerate derivative fall back to the chord
            *deriv = cp[3] - cp[0];
        }
    }
    pnt3_lerp(u, &cp2[0], &cp2[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::Rng;

    fn straight_curve(curve_type: CurveType, norm: Option<[Normal3f; 2]>) -> Curve {
        let cp = [
            Point3f::default(),
            Point3f {
                x: 1.0 / 3.0,
                y: 0.0,
                z: 0.0,
            },
            Point3f {
                x: 2.0 / 3.0,
                y: 0.0,
                z: 0.0,
            },
            Point3f {
                x: 1.0,
                y: 0.0,
                z: 0.0,
            },
        ];
        Curve::new(
            Arc::new(CurveCommon::new(
                &cp,
                0.2,
                0.2,
                curve_type,
                norm,
                Transform::default(),
                Transform::default(),
                false,
            )),
            0.0,
            1.0,
        )
    }

    #[test]
    fn flat_curve_hit_and_miss() {
        let curve = straight_curve(CurveType::Flat, None);
        let hit_ray = Ray::new(
            Point3f {
                x: 0.5,
                y: 0.05,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        let si = curve.intersect(&hit_ray, f32::INFINITY).unwrap();
        assert!((si.t_hit - 1.0).abs() < 1e-3);
        assert!((si.intr.common.uv.x - 0.5).abs() < 0.02);
        assert!(si.intr.p().z.abs() < 1e-3);
        assert!(curve.intersect_p(&hit_ray, f32::INFINITY));
        // beyond the half-width
        let miss_ray = Ray::new(
            Point3f {
                x: 0.5,
                y: 0.15,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        assert!(curve.intersect(&miss_ray, f32::INFINITY).is_none());
        assert!(!curve.intersect_p(&miss_ray, f32::INFINITY));
    }

    #[test]
    fn cylinder_and_ribbon_variants_hit() {
        let cyl = straight_curve(CurveType::Cylinder, None);
        let ribbon = straight_curve(
            CurveType::Ribbon,
            Some([
                Normal3f {
                    x: 0.0,
                    y: 0.0,
                    z: 1.0,
                },
                Normal3f {
                    x: 0.0,
                    y: 0.0,
                    z: 1.0,
                },
            ]),
        );
        let r = Ray::new(
            Point3f {
                x: 0.4,
                y: 0.0,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        assert!(cyl.intersect_p(&r, f32::INFINITY));
        let si = ribbon.intersect(&r, f32::INFINITY).unwrap();
        // ribbon faces +z here, so the normal does too
        assert!(si.intr.common.n.z.abs() > 0.9);
    }

    #[test]
    fn intersect_and_intersect_p_agree() {
        let curve = straight_curve(CurveType::Flat, None);
        let mut rng = Rng::new();
        rng.set_sequence(51);
        for _ in 0..1000 {
            let o = Point3f {
                x: 1.5 * rng.uniform_float() - 0.25,
                y: 0.5 * (rng.uniform_float() - 0.5),
                z: 1.0,
            };
            let d = Vector3f {
                x: 0.2 * (rng.uniform_float() - 0.5),
                y: 0.2 * (rng.uniform_float() - 0.5),
                z: -1.0,
            };
            let r = Ray::new(o, d, 0.0);
            assert_eq!(
                curve.intersect(&r, f32::INFINITY).is_some(),
                curve.intersect_p(&r, f32::INFINITY)
            );
        }
    }

    #[test]
    fn bounds_contain_hits() {
        let cp = [
            Point3f::default(),
            Point3f {
                x: 0.3,
                y: 0.5,
                z: 0.0,
            },
            Point3f {
                x: 0.7,
                y: -0.5,
                z: 0.2,
            },
            Point3f {
                x: 1.0,
                y: 0.0,
                z: 0.3,
            },
        ];
        let curve = Curve::new(
            Arc::new(CurveCommon::new(
                &cp,
                0.1,
                0.05,
                CurveType::Flat,
                None,
                Transform::default(),
                Transform::default(),
                false,
            )),
            0.0,
            1.0,
        );
        let b = curve.world_bound();
        let mut rng = Rng::new();
        rng.set_sequence(53);
        let mut hits = 0;
        for _ in 0..2000 {
            let o = Point3f {
                x: 1.4 * rng.uniform_float() - 0.2,
                y: rng.uniform_float() - 0.5,
                z: 2.0,
            };
            let r = Ray::new(
                o,
                Vector3f {
                    x: 0.0,
                    y: 0.0,
                    z: -1.0,
                },
                0.0,
            );
            if let Some(si) = curve.intersect(&r, f32::INFINITY) {
                hits += 1;
                let p = si.intr.p();
                let err = si.intr.p_error();
                assert!(
                    p.x >= b.p_min.x - err.x
                        && p.x <= b.p_max.x + err.x
                        && p.y >= b.p_min.y - err.y
                        && p.y <= b.p_max.y + err.y
                        && p.z >= b.p_min.z - err.z
                        && p.z <= b.p_max.z + err.z
                );
            }
        }
        assert!(hits > 50);
    }

    #[test]
    fn create_splits_into_segments() {
        let mut params = ParamSet::default();
        params.add_point3fs(
            "P",
            vec![0.0, 0.0, 0.0, 0.3, 0.2, 0.0, 0.7, -0.2, 0.0, 1.0, 0.0, 0.0],
        );
        params.add_float("width0", 0.1);
        params.add_float("width1", 0.02);
        params.add_string("type", "cylinder");
        let segments = Curve::create(
            &Transform::default(),
            &Transform::default(),
            false,
            &params,
        );
        assert_eq!(segments.len(), 8);
        let total: Float = segments.iter().map(|s| s.area()).sum();
        assert!(total > 0.0);
        // adjacent segments abut in u, so their bounds overlap pairwise
        for pair in segments.windows(2) {
            let b0 = pair[0].world_bound();
            let b1 = pair[1].world_bound();
            assert!(b0.p_max.x >= b1.p_min.x);
        }
    }

    #[test]
    fn ribbon_without_normals_is_rejected() {
        let mut params = ParamSet::default();
        params.add_point3fs(
            "P",
            vec![0.0, 0.0, 0.0, 0.3, 0.2, 0.0, 0.7, -0.2, 0.0, 1.0, 0.0, 0.0],
        );
        params.add_string("type", "ribbon");
        let segments = Curve::create(
            &Transform::default(),
            &Transform::default(),
            false,
            &params,
        );
        assert!(segments.is_empty());
    }

    #[test]
    fn area_and_sampling() {
        let curve = straight_curve(CurveType::Flat, None);
        assert!((curve.area() - 0.2).abs() < 1e-5);
        let mut rng = Rng::new();
        rng.set_sequence(55);
        for _ in 0..500 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let ss = curve.sample(&u).unwrap();
            assert!((ss.pdf - 1.0 / curve.area()).abs() < 1e-5);
            let p = ss.intr.p();
            assert!((-0.11..=1.11).contains(&p.x));
            assert!(p.y.abs() <= 0.11 && p.z.abs() <= 0.11);
        }
    }
}
