//! The polymorphic shape handle and the records shapes produce. The set
//! of primitive kinds is small and closed, so the handle is a tagged
//! union rather than a trait object: every public operation is a
//! one-line `match` that the compiler can inline into the hot path.

use std::sync::Arc;

use crate::core::geometry::{
    pnt3_offset_ray_origin, Bounds3f, DirectionCone, Normal3f, Point2f, Point3f, Ray, Vector3f,
};
use crate::core::glint::Float;
use crate::core::interaction::{InteractionCommon, SurfaceInteraction};
use crate::core::interval::Point3fi;
use crate::shapes::bilinear::BilinearPatch;
use crate::shapes::curve::Curve;
use crate::shapes::cylinder::Cylinder;
use crate::shapes::disk::Disk;
use crate::shapes::sphere::Sphere;
use crate::shapes::triangle::Triangle;

/// A point on a shape together with the density with which it was
/// sampled. The measure is documented by the producing call: area for
/// `sample(u)`, solid angle about the reference point for
/// `sample_with_ref_point`.
#[derive(Debug, Clone)]
pub struct ShapeSample {
    pub intr: InteractionCommon,
    pub pdf: Float,
}

/// The reference point a light sample is taken for: position with error
/// bounds, geometric and (optionally zero) shading normal, and time.
#[derive(Debug, Default, Copy, Clone)]
pub struct ShapeSampleContext {
    pub pi: Point3fi,
    pub n: Normal3f,
    pub ns: Normal3f,
    pub time: Float,
}

impl ShapeSampleContext {
    pub fn new(pi: Point3fi, n: Normal3f, ns: Normal3f, time: Float) -> Self {
        ShapeSampleContext { pi, n, ns, time }
    }
    pub fn from_surface_interaction(si: &SurfaceInteraction) -> Self {
        ShapeSampleContext {
            pi: si.common.pi,
            n: si.common.n,
            ns: si.shading.n,
            time: si.common.time,
        }
    }
    pub fn p(&self) -> Point3f {
        self.pi.midpoint()
    }
    pub fn offset_ray_origin(&self, w: &Vector3f) -> Point3f {
        pnt3_offset_ray_origin(&self.p(), &self.pi.error(), &self.n, w)
    }
    pub fn offset_ray_origin_to(&self, pt: &Point3f) -> Point3f {
        self.offset_ray_origin(&(*pt - self.p()))
    }
    pub fn spawn_ray(&self, w: &Vector3f) -> Ray {
        Ray {
            o: self.offset_ray_origin(w),
            d: *w,
            time: self.time,
            medium: None,
        }
    }
}

/// A full surface record plus the parametric distance of the hit.
#[derive(Debug, Clone)]
pub struct ShapeIntersection {
    pub intr: SurfaceInteraction,
    pub t_hit: Float,
}

/// Cheap hit record shared by the quadrics; inflated into a
/// `SurfaceInteraction` only when the caller asks for one.
#[derive(Debug, Default, Copy, Clone)]
pub struct QuadricIntersection {
    pub t_hit: Float,
    pub p_obj: Point3f,
    pub phi: Float,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct TriangleIntersection {
    pub b0: Float,
    pub b1: Float,
    pub b2: Float,
    pub t: Float,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct BilinearIntersection {
    pub uv: Point2f,
    pub t: Float,
}

/// Tagged union over the six primitive kinds. Mesh-backed primitives
/// are stored inline (they are two indices); the others are shared
/// through `Arc` so the handle stays cheap to copy.
#[derive(Clone)]
pub enum Shape {
    Sphere(Arc<Sphere>),
    Disk(Arc<Disk>),
    Cylinder(Arc<Cylinder>),
    Triangle(Triangle),
    BilinearPatch(BilinearPatch),
    Curve(Arc<Curve>),
}

impl Shape {
    pub fn object_bound(&self) -> Bounds3f {
        match self {
            Shape::Sphere(s) => s.object_bound(),
            Shape::Disk(s) => s.object_bound(),
            Shape::Cylinder(s) => s.object_bound(),
            Shape::Triangle(s) => s.object_bound(),
            Shape::BilinearPatch(s) => s.object_bound(),
            Shape::Curve(s) => s.object_bound(),
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        match self {
            Shape::Sphere(s) => s.world_bound(),
            Shape::Disk(s) => s.world_bound(),
            Shape::Cylinder(s) => s.world_bound(),
            Shape::Triangle(s) => s.world_bound(),
            Shape::BilinearPatch(s) => s.world_bound(),
            Shape::Curve(s) => s.world_bound(),
        }
    }
    pub fn normal_bounds(&self) -> DirectionCone {
        match self {
            Shape::Sphere(s) => s.normal_bounds(),
            Shape::Disk(s) => s.normal_bounds(),
            Shape::Cylinder(s) => s.normal_bounds(),
            Shape::Triangle(s) => s.normal_bounds(),
            Shape::BilinearPatch(s) => s.normal_bounds(),
            Shape::Curve(s) => s.normal_bounds(),
        }
    }
    pub fn intersect(&self, r: &Ray, t_max: Float) -> Option<ShapeIntersection> {
        match self {
            Shape::Sphere(s) => s.intersect(r, t_max),
            Shape::Disk(s) => s.intersect(r, t_max),
            Shape::Cylinder(s) => s.intersect(r, t_max),
            Shape::Triangle(s) => s.intersect(r, t_max),
            Shape::BilinearPatch(s) => s.intersect(r, t_max),
            Shape::Curve(s) => s.intersect(r, t_max),
        }
    }
    pub fn intersect_p(&self, r: &Ray, t_max: Float) -> bool {
        match self {
            Shape::Sphere(s) => s.intersect_p(r, t_max),
            Shape::Disk(s) => s.intersect_p(r, t_max),
            Shape::Cylinder(s) => s.intersect_p(r, t_max),
            Shape::Triangle(s) => s.intersect_p(r, t_max),
            Shape::BilinearPatch(s) => s.intersect_p(r, t_max),
            Shape::Curve(s) => s.intersect_p(r, t_max),
        }
    }
    pub fn area(&self) -> Float {
        match self {
            Shape::Sphere(s) => s.area(),
            Shape::Disk(s) => s.area(),
            Shape::Cylinder(s) => s.area(),
            Shape::Triangle(s) => s.area(),
            Shape::BilinearPatch(s) => s.area(),
            Shape::Curve(s) => s.area(),
        }
    }
    pub fn sample(&self, u: &Point2f) -> Option<ShapeSample> {
        match self {
            Shape::Sphere(s) => s.sample(u),
            Shape::Disk(s) => s.sample(u),
            Shape::Cylinder(s) => s.sample(u),
            Shape::Triangle(s) => s.sample(u),
            Shape::BilinearPatch(s) => s.sample(u),
            Shape::Curve(s) => s.sample(u),
        }
    }
    pub fn pdf(&self, intr: &InteractionCommon) -> Float {
        match self {
            Shape::Sphere(s) => s.pdf(intr),
            Shape::Disk(s) => s.pdf(intr),
            Shape::Cylinder(s) => s.pdf(intr),
            Shape::Triangle(s) => s.pdf(intr),
            Shape::BilinearPatch(s) => s.pdf(intr),
            Shape::Curve(s) => s.pdf(intr),
        }
    }
    pub fn sample_with_ref_point(
        &self,
        ctx: &ShapeSampleContext,
        u: &Point2f,
    ) -> Option<ShapeSample> {
        match self {
            Shape::Sphere(s) => s.sample_with_ref_point(ctx, u),
            Shape::Disk(s) => s.sample_with_ref_point(ctx, u),
            Shape::Cylinder(s) => s.sample_with_ref_point(ctx, u),
            Shape::Triangle(s) => s.sample_with_ref_point(ctx, u),
            Shape::BilinearPatch(s) => s.sample_with_ref_point(ctx, u),
            Shape::Curve(s) => s.sample_with_ref_point(ctx, u),
        }
    }
    pub fn pdf_with_ref_point(&self, ctx: &ShapeSampleContext, wi: &Vector3f) -> Float {
        match self {
            Shape::Sphere(s) => s.pdf_with_ref_point(ctx, wi),
            Shape::Disk(s) => s.pdf_with_ref_point(ctx, wi),
            Shape::Cylinder(s) => s.pdf_with_ref_point(ctx, wi),
            Shape::Triangle(s) => s.pdf_with_ref_point(ctx, wi),
            Shape::BilinearPatch(s) => s.pdf_with_ref_point(ctx, wi),
            Shape::Curve(s) => s.pdf_with_ref_point(ctx, wi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::pnt3_inside_bnd3f;
    use crate::core::paramset::ParamSet;
    use crate::core::rng::Rng;
    use crate::core::sampling::uniform_sample_sphere;
    use crate::core::transform::Transform;
    use crate::shapes::bilinear::create_bilinear_mesh;
    use crate::shapes::curve::Curve;
    use crate::shapes::cylinder::Cylinder;
    use crate::shapes::disk::Disk;
    use crate::shapes::sphere::Sphere;
    use crate::shapes::triangle::create_triangle_mesh;

    fn all_kinds() -> Vec<Shape> {
        let identity = Transform::default();
        let mut shapes: Vec<Shape> = Vec::new();
        let sphere_params = ParamSet::default();
        shapes.push(Shape::Sphere(Sphere::create(
            &identity,
            &identity,
            false,
            &sphere_params,
        )));
        let mut disk_params = ParamSet::default();
        disk_params.add_float("innerradius", 0.25);
        shapes.push(Shape::Disk(Disk::create(
            &identity,
            &identity,
            false,
            &disk_params,
        )));
        shapes.push(Shape::Cylinder(Cylinder::create(
            &identity,
            &identity,
            false,
            &ParamSet::default(),
        )));
        let mut tri_params = ParamSet::default();
        tri_params.add_ints("indices", vec![0, 1, 2]);
        tri_params.add_point3fs(
            "P",
            vec![-0.8, -0.8, 0.1, 0.8, -0.8, 0.1, 0.0, 0.8, 0.1],
        );
        shapes.extend(create_triangle_mesh(&identity, false, &tri_params));
        let mut blp_params = ParamSet::default();
        blp_params.add_ints("indices", vec![0, 1, 2, 3]);
        blp_params.add_point3fs(
            "P",
            vec![
                -0.7, -0.7, -0.2, 0.7, -0.7, -0.1, -0.7, 0.7, -0.2, 0.7, 0.7, -0.3,
            ],
        );
        shapes.extend(create_bilinear_mesh(&identity, false, &blp_params));
        let mut curve_params = ParamSet::default();
        curve_params.add_point3fs(
            "P",
            vec![-0.5, 0.0, 0.4, -0.2, 0.3, 0.4, 0.2, -0.3, 0.4, 0.5, 0.0, 0.4],
        );
        curve_params.add_float("width0", 0.1);
        curve_params.add_float("width1", 0.05);
        shapes.extend(Curve::create(&identity, &identity, false, &curve_params));
        shapes
    }

    #[test]
    fn create_paths_yield_all_six_kinds() {
        let shapes = all_kinds();
        // 3 quadrics + 1 triangle + 1 patch + 8 curve segments
        assert_eq!(shapes.len(), 13);
        for s in &shapes {
            assert!(s.area() > 0.0);
        }
    }

    #[test]
    fn intersect_and_intersect_p_agree_for_every_kind() {
        let shapes = all_kinds();
        let mut rng = Rng::new();
        rng.set_sequence(71);
        for shape in &shapes {
            for _ in 0..500 {
                let o = Point3f {
                    x: 6.0 * (rng.uniform_float() - 0.5),
                    y: 6.0 * (rng.uniform_float() - 0.5),
                    z: 6.0 * (rng.uniform_float() - 0.5),
                };
                let d = uniform_sample_sphere(&Point2f {
                    x: rng.uniform_float(),
                    y: rng.uniform_float(),
                });
                let r = Ray::new(o, d, 0.0);
                let hit = shape.intersect(&r, f32::INFINITY);
                assert_eq!(hit.is_some(), shape.intersect_p(&r, f32::INFINITY));
                if let Some(si) = hit {
                    // the hit lies inside the world bound inflated by
                    // the reported error
                    let b = shape.world_bound();
                    let err = si.intr.p_error();
                    let slack = Vector3f {
                        x: err.x + 1e-4,
                        y: err.y + 1e-4,
                        z: err.z + 1e-4,
                    };
                    let inflated = Bounds3f {
                        p_min: b.p_min - slack,
                        p_max: b.p_max + slack,
                    };
                    assert!(pnt3_inside_bnd3f(&si.intr.p(), &inflated));
                }
            }
        }
    }

    #[test]
    fn samples_respect_normal_bounds() {
        let shapes = all_kinds();
        let mut rng = Rng::new();
        rng.set_sequence(73);
        for shape in &shapes {
            let cone = shape.normal_bounds();
            for _ in 0..200 {
                let u = Point2f {
                    x: rng.uniform_float(),
                    y: rng.uniform_float(),
                };
                if let Some(ss) = shape.sample(&u) {
                    assert!(cone.contains(&Vector3f::from(ss.intr.n)));
                }
            }
        }
    }

    #[test]
    fn handle_dispatch_matches_direct_calls() {
        let identity = Transform::default();
        let sphere = Sphere::create(&identity, &identity, false, &ParamSet::default());
        let handle = Shape::Sphere(sphere.clone());
        assert_eq!(handle.area(), sphere.area());
        let r = Ray::new(
            Point3f {
                x: 0.0,
                y: 0.0,
                z: -5.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
            0.0,
        );
        let a = handle.intersect(&r, f32::INFINITY).unwrap();
        let b = sphere.intersect(&r, f32::INFINITY).unwrap();
        assert_eq!(a.t_hit, b.t_hit);
    }
}
