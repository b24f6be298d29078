//! Triangles of an indexed mesh. Each triangle is two 32-bit indices -
//! one naming a mesh in the global table, one the triangle inside it -
//! so storing millions of them stays cheap. Intersection is the
//! watertight translate/permute/shear formulation; reference-point
//! sampling works directly over the triangle's subtended solid angle
//! when that is well conditioned.

use std::mem;

use crate::core::geometry::{
    bnd3_union_pnt3, nrm_abs_dot_vec3f, nrm_cross_vec3, nrm_faceforward_nrm,
    pnt3_distance_squaredf, pnt3_permutef, spherical_triangle_area, vec3_coordinate_system,
    vec3_cross_nrm, vec3_cross_vec3, vec3_max_componentf, vec3_max_dimensionf, vec3_permutef,
    Bounds3f, DirectionCone, Normal3f, Point2f, Point3f, Ray, Vector2f, Vector3f,
};
use crate::core::glint::{difference_of_products, gamma, Float};
use crate::core::interaction::{InteractionCommon, SurfaceInteraction};
use crate::core::interval::Point3fi;
use crate::core::mesh::{register_triangle_mesh, triangle_mesh, TriangleMesh};
use crate::core::paramset::ParamSet;
use crate::core::sampling::{
    bilinear_pdf, invert_spherical_triangle_sample, sample_bilinear, sample_spherical_triangle,
    sample_uniform_triangle,
};
use crate::core::shape::{
    Shape, ShapeIntersection, ShapeSample, ShapeSampleContext, TriangleIntersection,
};
use crate::core::transform::Transform;

/// Spherical sampling misbehaves for triangles subtending very small or
/// very large solid angles; both ends fall back to area sampling.
pub const MIN_SPHERICAL_SAMPLE_AREA: Float = 1e-4;
pub const MAX_SPHERICAL_SAMPLE_AREA: Float = 6.28;

/// Build a triangle mesh from its parameter set ({indices, P, N?, S?,
/// uv?, faceIndices?}), register it, and return one shape handle per
/// triangle.
pub fn create_triangle_mesh(
    render_from_object: &Transform,
    reverse_orientation: bool,
    params: &ParamSet,
) -> Vec<Shape> {
    let vi: Vec<i32> = params.find_int("indices");
    let p: Vec<Point3f> = params.find_point3f("P");
    let uvs: Vec<Point2f> = params.find_point2f("uv");
    let s: Vec<Vector3f> = params.find_vector3f("S");
    let n: Vec<Normal3f> = params.find_normal3f("N");
    let face_indices: Vec<i32> = params.find_int("faceIndices");
    if vi.is_empty() || p.is_empty() {
        log::error!("triangle mesh must have both \"indices\" and \"P\"");
        return Vec::new();
    }
    if vi.len() % 3 != 0 {
        log::error!(
            "number of vertex indices ({}) for triangle mesh must be a multiple of 3",
            vi.len()
        );
        return Vec::new();
    }
    if let Some(bad) = vi.iter().find(|&&i| i < 0 || i as usize >= p.len()) {
        log::error!(
            "vertex index {} out of bounds for mesh with {} vertices",
            bad,
            p.len()
        );
        return Vec::new();
    }
    let mesh = TriangleMesh::new(
        render_from_object,
        reverse_orientation,
        vi.iter().map(|&i| i as usize).collect(),
        p,
        s,
        n,
        uvs,
        face_indices.iter().map(|&i| i as usize).collect(),
    );
    create_triangles(register_triangle_mesh(mesh))
}

/// One shape handle per triangle of an already registered mesh.
pub fn create_triangles(mesh_index: u32) -> Vec<Shape> {
    let mesh = triangle_mesh(mesh_index);
    (0..mesh.n_triangles)
        .map(|i| Shape::Triangle(Triangle::new(mesh_index, i as u32)))
        .collect()
}

#[derive(Debug, Copy, Clone)]
pub struct Triangle {
    mesh_index: u32,
    tri_index: u32,
}

impl Triangle {
    pub fn new(mesh_index: u32, tri_index: u32) -> Self {
        Triangle {
            mesh_index,
            tri_index,
        }
    }
    fn get_mesh(&self) -> std::sync::Arc<TriangleMesh> {
        triangle_mesh(self.mesh_index)
    }
    fn vertices(&self, mesh: &TriangleMesh) -> (Point3f, Point3f, Point3f) {
        let v = &mesh.vertex_indices[3 * self.tri_index as usize..3 * self.tri_index as usize + 3];
        (mesh.p[v[0]], mesh.p[v[1]], mesh.p[v[2]])
    }
    fn get_uvs(mesh: &TriangleMesh, tri_index: u32) -> [Point2f; 3] {
        if mesh.uv.is_empty() {
            [
                Point2f { x: 0.0, y: 0.0 },
                Point2f { x: 1.0, y: 0.0 },
                Point2f { x: 1.0, y: 1.0 },
            ]
        } else {
            let v = &mesh.vertex_indices[3 * tri_index as usize..3 * tri_index as usize + 3];
            [mesh.uv[v[0]], mesh.uv[v[1]], mesh.uv[v[2]]]
        }
    }
    pub fn object_bound(&self) -> Bounds3f {
        // mesh vertices are stored in render space already
        self.world_bound()
    }
    pub fn world_bound(&self) -> Bounds3f {
        let mesh = self.get_mesh();
        let (p0, p1, p2) = self.vertices(&mesh);
        bnd3_union_pnt3(&Bounds3f::new(p0, p1), &p2)
    }
    pub fn normal_bounds(&self) -> DirectionCone {
        let mesh = self.get_mesh();
        let v = &mesh.vertex_indices[3 * self.tri_index as usize..3 * self.tri_index as usize + 3];
        let (p0, p1, p2) = self.vertices(&mesh);
        let mut n = Normal3f::from(vec3_cross_vec3(&(p1 - p0), &(p2 - p0)).normalize());
        // orient the cone axis the way intersections orient the normal
        if !mesh.n.is_empty() {
            let ns: Normal3f = mesh.n[v[0]] + mesh.n[v[1]] + mesh.n[v[2]];
            n = nrm_faceforward_nrm(&n, &ns);
        } else if mesh.reverse_orientation ^ mesh.transform_swaps_handedness {
            n *= -1.0 as Float;
        }
        DirectionCone::new(Vector3f::from(n))
    }
    pub fn intersect(&self, r: &Ray, t_max: Float) -> Option<ShapeIntersection> {
        let mesh = self.get_mesh();
        let (p0, p1, p2) = self.vertices(&mesh);
        let ti = intersect_triangle(r, t_max, &p0, &p1, &p2)?;
        let intr = interaction_from_intersection(
            &mesh,
            self.tri_index,
            [ti.b0, ti.b1, ti.b2],
            r.time,
            &-r.d,
        )?;
        Some(ShapeIntersection {
            intr,
            t_hit: ti.t,
        })
    }
    pub fn intersect_p(&self, r: &Ray, t_max: Float) -> bool {
        let mesh = self.get_mesh();
        let (p0, p1, p2) = self.vertices(&mesh);
        intersect_triangle(r, t_max, &p0, &p1, &p2).is_some()
    }
    pub fn area(&self) -> Float {
        let mesh = self.get_mesh();
        let (p0, p1, p2) = self.vertices(&mesh);
        0.5 * vec3_cross_vec3(&(p1 - p0), &(p2 - p0)).length()
    }
    /// Solid angle the triangle subtends as seen from p.
    pub fn solid_angle(&self, p: &Point3f) -> Float {
        let mesh = self.get_mesh();
        let (p0, p1, p2) = self.vertices(&mesh);
        spherical_triangle_area(
            &(p0 - *p).normalize(),
            &(p1 - *p).normalize(),
            &(p2 - *p).normalize(),
        )
    }
    pub fn sample(&self, u: &Point2f) -> Option<ShapeSample> {
        let mesh = self.get_mesh();
        let v = &mesh.vertex_indices[3 * self.tri_index as usize..3 * self.tri_index as usize + 3];
        let (p0, p1, p2) = self.vertices(&mesh);
        // sample point on triangle uniformly by area
        let b = sample_uniform_triangle(u);
        let p: Point3f = p0 * b[0] + p1 * b[1] + p2 * b[2];
        // compute surface normal for sampled point on triangle
        let mut n = Normal3f::from(vec3_cross_vec3(&(p1 - p0), &(p2 - p0)).normalize());
        if !mesh.n.is_empty() {
            let ns: Normal3f = mesh.n[v[0]] * b[0] + mesh.n[v[1]] * b[1] + mesh.n[v[2]] * b[2];
            n = nrm_faceforward_nrm(&n, &ns);
        } else if mesh.reverse_orientation ^ mesh.transform_swaps_handedness {
            n *= -1.0 as Float;
        }
        // compute error bounds for sampled point on triangle
        let p_abs_sum: Point3f =
            (p0 * b[0]).abs() + (p1 * b[1]).abs() + (p2 * b[2]).abs();
        let p_error: Vector3f = Vector3f::from(p_abs_sum) * gamma(6);
        let pi = Point3fi::from_point_and_error(&p, &p_error);
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
        uo: &Point2f,
    ) -> Option<ShapeSample> {
        let mesh = self.get_mesh();
        let v = &mesh.vertex_indices[3 * self.tri_index as usize..3 * self.tri_index as usize + 3];
        let (p0, p1, p2) = self.vertices(&mesh);
        // use uniform area sampling for numerically difficult solid
        // angles
        let sa: Float = self.solid_angle(&ctx.p());
        if !(MIN_SPHERICAL_SAMPLE_AREA..=MAX_SPHERICAL_SAMPLE_AREA).contains(&sa) {
            let mut ss = self.sample(uo)?;
            ss.intr.time = ctx.time;
            let mut wi: Vector3f = ss.intr.p() - ctx.p();
            if wi.length_squared() == 0.0 {
                return None;
            }
            // convert from area measure to solid angle measure
            wi = wi.normalize();
            ss.pdf *= pnt3_distance_squaredf(&ctx.p(), &ss.intr.p())
                / nrm_abs_dot_vec3f(&ss.intr.n, &-wi);
            if ss.pdf.is_infinite() {
                return None;
            }
            return Some(ss);
        }

        // sample spherical triangle from reference point
        let mut pdf: Float = 1.0;
        let mut u: Point2f = *uo;
        if ctx.ns != Normal3f::default() {
            // warp the square so directions near the shading horizon
            // are chosen less often
            let rp: Point3f = ctx.p();
            let wi: [Vector3f; 3] = [
                (p0 - rp).normalize(),
                (p1 - rp).normalize(),
                (p2 - rp).normalize(),
            ];
            let w: [Float; 4] = [
                nrm_abs_dot_vec3f(&ctx.ns, &wi[1]).max(0.01),
                nrm_abs_dot_vec3f(&ctx.ns, &wi[1]).max(0.01),
                nrm_abs_dot_vec3f(&ctx.ns, &wi[0]).max(0.01),
                nrm_abs_dot_vec3f(&ctx.ns, &wi[2]).max(0.01),
            ];
            u = sample_bilinear(&u, &w);
            pdf *= bilinear_pdf(&u, &w);
        }
        let (b, tri_pdf) = sample_spherical_triangle(&[p0, p1, p2], &ctx.p(), &u)?;
        if tri_pdf == 0.0 {
            return None;
        }
        pdf *= tri_pdf;

        // compute surface normal for sampled point on triangle
        let mut n = Normal3f::from(vec3_cross_vec3(&(p1 - p0), &(p2 - p0)).normalize());
        if !mesh.n.is_empty() {
            let ns: Normal3f = mesh.n[v[0]] * b[0] + mesh.n[v[1]] * b[1] + mesh.n[v[2]] * b[2];
            n = nrm_faceforward_nrm(&n, &ns);
        } else if mesh.reverse_orientation ^ mesh.transform_swaps_handedness {
            n *= -1.0 as Float;
        }
        // compute error bounds for sampled point on triangle
        let ps: Point3f = p0 * b[0] + p1 * b[1] + p2 * b[2];
        let p_abs_sum: Point3f =
            (p0 * b[0]).abs() + (p1 * b[1]).abs() + (p2 * b[2]).abs();
        let p_error: Vector3f = Vector3f::from(p_abs_sum) * gamma(6);
        let pi = Point3fi::from_point_and_error(&ps, &p_error);
        Some(ShapeSample {
            intr: InteractionCommon::new(pi, n, ctx.time),
            pdf,
        })
    }
    pub fn pdf_with_ref_point(&self, ctx: &ShapeSampleContext, wi: &Vector3f) -> Float {
        let sa: Float = self.solid_angle(&ctx.p());
        if !(MIN_SPHERICAL_SAMPLE_AREA..=MAX_SPHERICAL_SAMPLE_AREA).contains(&sa) {
            // intersect sample ray with shape geometry
            let ray: Ray = ctx.spawn_ray(wi);
            if let Some(isect) = self.intersect(&ray, f32::INFINITY) {
                // convert light sample weight to solid angle measure
                let mut pdf: Float = pnt3_distance_squaredf(&ctx.p(), &isect.intr.p())
                    / (nrm_abs_dot_vec3f(&isect.intr.common.n, &-(*wi)) * self.area());
                if pdf.is_infinite() {
                    pdf = 0.0;
                }
                return pdf;
            }
            return 0.0;
        }
        // the direction must actually reach this triangle
        if !self.intersect_p(&ctx.spawn_ray(wi), f32::INFINITY) {
            return 0.0;
        }
        let mut pdf: Float = 1.0 / sa;
        if ctx.ns != Normal3f::default() {
            let mesh = self.get_mesh();
            let (p0, p1, p2) = self.vertices(&mesh);
            let rp: Point3f = ctx.p();
            let wit: [Vector3f; 3] = [
                (p0 - rp).normalize(),
                (p1 - rp).normalize(),
                (p2 - rp).normalize(),
            ];
            let w: [Float; 4] = [
                nrm_abs_dot_vec3f(&ctx.ns, &wit[1]).max(0.01),
                nrm_abs_dot_vec3f(&ctx.ns, &wit[1]).max(0.01),
                nrm_abs_dot_vec3f(&ctx.ns, &wit[0]).max(0.01),
                nrm_abs_dot_vec3f(&ctx.ns, &wit[2]).max(0.01),
            ];
            let u: Point2f = invert_spherical_triangle_sample(&[p0, p1, p2], &rp, wi);
            pdf *= bilinear_pdf(&u, &w);
        }
        pdf
    }
}

/// Watertight ray-triangle intersection: translate so the ray origin is
/// at the origin, permute so the ray's dominant axis is +z, shear the
/// ray to (0, 0, 1), then evaluate the 2D edge functions. Conservative
/// error bounds on the scaled t keep hits behind the origin from
/// leaking through.
pub fn intersect_triangle(
    ray: &Ray,
    t_max: Float,
    p0: &Point3f,
    p1: &Point3f,
    p2: &Point3f,
) -> Option<TriangleIntersection> {
    // return no intersection if triangle is degenerate
    if vec3_cross_vec3(&(*p2 - *p0), &(*p1 - *p0)).length_squared() == 0.0 {
        return None;
    }
    // translate vertices based on ray origin
    let o: Vector3f = Vector3f::from(ray.o);
    let mut p0t: Point3f = *p0 - o;
    let mut p1t: Point3f = *p1 - o;
    let mut p2t: Point3f = *p2 - o;
    // permute components of triangle vertices and ray direction
    let kz: usize = vec3_max_dimensionf(&ray.d.abs());
    let mut kx: usize = kz + 1;
    if kx == 3 {
        kx = 0;
    }
    let mut ky: usize = kx + 1;
    if ky == 3 {
        ky = 0;
    }
    let d: Vector3f = vec3_permutef(&ray.d, kx, ky, kz);
    p0t = pnt3_permutef(&p0t, kx, ky, kz);
    p1t = pnt3_permutef(&p1t, kx, ky, kz);
    p2t = pnt3_permutef(&p2t, kx, ky, kz);
    // apply shear transformation to translated vertex positions
    let sx: Float = -d.x / d.z;
    let sy: Float = -d.y / d.z;
    let sz: Float = 1.0 / d.z;
    p0t.x += sx * p0t.z;
    p0t.y += sy * p0t.z;
    p1t.x += sx * p1t.z;
    p1t.y += sy * p1t.z;
    p2t.x += sx * p2t.z;
    p2t.y += sy * p2t.z;
    // compute edge function coefficients e0, e1, and e2
    let mut e0: Float = difference_of_products(p1t.x, p2t.y, p1t.y, p2t.x);
    let mut e1: Float = difference_of_products(p2t.x, p0t.y, p2t.y, p0t.x);
    let mut e2: Float = difference_of_products(p0t.x, p1t.y, p0t.y, p1t.x);
    // fall back to double precision test at triangle edges
    if mem::size_of::<Float>() == mem::size_of::<f32>() && (e0 == 0.0 || e1 == 0.0 || e2 == 0.0)
    {
        let p2txp1ty: f64 = p2t.x as f64 * p1t.y as f64;
        let p2typ1tx: f64 = p2t.y as f64 * p1t.x as f64;
        e0 = (p2typ1tx - p2txp1ty) as Float;
        let p0txp2ty: f64 = p0t.x as f64 * p2t.y as f64;
        let p0typ2tx: f64 = p0t.y as f64 * p2t.x as f64;
        e1 = (p0typ2tx - p0txp2ty) as Float;
        let p1txp0ty: f64 = p1t.x as f64 * p0t.y as f64;
        let p1typ0tx: f64 = p1t.y as f64 * p0t.x as f64;
        e2 = (p1typ0tx - p1txp0ty) as Float;
    }
    // perform triangle edge and determinant tests
    if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
        return None;
    }
    let det: Float = e0 + e1 + e2;
    if det == 0.0 {
        return None;
    }
    // compute scaled hit distance to triangle and test against t range
    p0t.z *= sz;
    p1t.z *= sz;
    p2t.z *= sz;
    let t_scaled: Float = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
    if det < 0.0 && (t_scaled >= 0.0 || t_scaled < t_max * det) {
        return None;
    } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > t_max * det) {
        return None;
    }
    // compute barycentric coordinates and t value for intersection
    let inv_det: Float = 1.0 / det;
    let b0: Float = e0 * inv_det;
    let b1: Float = e1 * inv_det;
    let b2: Float = e2 * inv_det;
    let t: Float = t_scaled * inv_det;

    // ensure that computed triangle t is conservatively greater than
    // zero

    // compute delta_z term for triangle t error bounds
    let max_zt: Float = vec3_max_componentf(
        &Vector3f {
            x: p0t.z,
            y: p1t.z,
            z: p2t.z,
        }
        .abs(),
    );
    let delta_z: Float = gamma(3) * max_zt;
    // compute delta_x and delta_y terms for triangle t error bounds
    let max_xt: Float = vec3_max_componentf(
        &Vector3f {
            x: p0t.x,
            y: p1t.x,
            z: p2t.x,
        }
        .abs(),
    );
    let max_yt: Float = vec3_max_componentf(
        &Vector3f {
            x: p0t.y,
            y: p1t.y,
            z: p2t.y,
        }
        .abs(),
    );
    let delta_x: Float = gamma(5) * (max_xt + max_zt);
    let delta_y: Float = gamma(5) * (max_yt + max_zt);
    // compute delta_e term for triangle t error bounds
    let delta_e: Float = 2.0 * (gamma(2) * max_xt * max_yt + delta_y * max_xt + delta_x * max_yt);
    // compute delta_t term for triangle t error bounds and check t
    let max_e: Float = vec3_max_componentf(
        &Vector3f {
            x: e0,
            y: e1,
            z: e2,
        }
        .abs(),
    );
    let delta_t: Float =
        3.0 * (gamma(3) * max_e * max_zt + delta_e * max_zt + delta_z * max_e) * inv_det.abs();
    if t <= delta_t {
        return None;
    }
    Some(TriangleIntersection { b0, b1, b2, t })
}

/// Inflate barycentrics into a full surface record: interpolated
/// position and uv, partial derivatives from the uv parameterization,
/// and shading geometry from per-vertex normals and tangents when the
/// mesh carries them. Returns None for triangles whose geometric
/// normal vanishes.
pub fn interaction_from_intersection(
    mesh: &TriangleMesh,
    tri_index: u32,
    b: [Float; 3],
    time: Float,
    wo: &Vector3f,
) -> Option<SurfaceInteraction> {
    let v = &mesh.vertex_indices[3 * tri_index as usize..3 * tri_index as usize + 3];
    let p0: Point3f = mesh.p[v[0]];
    let p1: Point3f = mesh.p[v[1]];
    let p2: Point3f = mesh.p[v[2]];
    // compute triangle partial derivatives
    let triuv = Triangle::get_uvs(mesh, tri_index);
    let duv02: Vector2f = triuv[0] - triuv[2];
    let duv12: Vector2f = triuv[1] - triuv[2];
    let dp02: Vector3f = p0 - p2;
    let dp12: Vector3f = p1 - p2;
    let determinant: Float = difference_of_products(duv02.x, duv12.y, duv02.y, duv12.x);
    let degenerate_uv: bool = determinant.abs() < 1e-12;
    let mut dpdu: Vector3f = Vector3f::default();
    let mut dpdv: Vector3f = Vector3f::default();
    if !degenerate_uv {
        let invdet: Float = 1.0 / determinant;
        dpdu = (dp02 * duv12.y - dp12 * duv02.y) * invdet;
        dpdv = (dp02 * -duv12.x + dp12 * duv02.x) * invdet;
    }
    if degenerate_uv || vec3_cross_vec3(&dpdu, &dpdv).length_squared() == 0.0 {
        let ng: Vector3f = vec3_cross_vec3(&(p2 - p0), &(p1 - p0));
        if ng.length_squared() == 0.0 {
            return None;
        }
        // handle zero determinant for triangle partial derivative matrix
        vec3_coordinate_system(&ng.normalize(), &mut dpdu, &mut dpdv);
    }

    // interpolate (u,v) parametric coordinates and hit point
    let p_hit: Point3f = p0 * b[0] + p1 * b[1] + p2 * b[2];
    let uv_hit: Point2f = triuv[0] * b[0] + triuv[1] * b[1] + triuv[2] * b[2];
    // compute error bounds for triangle intersection
    let x_abs_sum: Float = (b[0] * p0.x).abs() + (b[1] * p1.x).abs() + (b[2] * p2.x).abs();
    let y_abs_sum: Float = (b[0] * p0.y).abs() + (b[1] * p1.y).abs() + (b[2] * p2.y).abs();
    let z_abs_sum: Float = (b[0] * p0.z).abs() + (b[1] * p1.z).abs() + (b[2] * p2.z).abs();
    let p_error: Vector3f = Vector3f {
        x: x_abs_sum,
        y: y_abs_sum,
        z: z_abs_sum,
    } * gamma(7);

    let flip: bool = mesh.reverse_orientation ^ mesh.transform_swaps_handedness;
    let mut si = SurfaceInteraction::new(
        Point3fi::from_point_and_error(&p_hit, &p_error),
        uv_hit,
        *wo,
        dpdu,
        dpdv,
        Normal3f::default(),
        Normal3f::default(),
        time,
        flip,
    );
    if !mesh.face_indices.is_empty() {
        si.face_index = mesh.face_indices[tri_index as usize];
    }
    // override surface normal in si for triangle
    let mut surface_normal = Normal3f::from(vec3_cross_vec3(&dp02, &dp12).normalize());
    if flip {
        surface_normal = -surface_normal;
    }
    si.common.n = surface_normal;
    si.shading.n = surface_normal;

    if !mesh.n.is_empty() || !mesh.s.is_empty() {
        // initialize triangle shading geometry

        // compute shading normal ns for triangle
        let ns: Normal3f = if !mesh.n.is_empty() {
            let ns: Normal3f = mesh.n[v[0]] * b[0] + mesh.n[v[1]] * b[1] + mesh.n[v[2]] * b[2];
            if ns.length_squared() > 0.0 {
                ns.normalize()
            } else {
                si.common.n
            }
        } else {
            si.common.n
        };
        // compute shading tangent ss for triangle
        let mut ss: Vector3f = if !mesh.s.is_empty() {
            let ss: Vector3f = mesh.s[v[0]] * b[0] + mesh.s[v[1]] * b[1] + mesh.s[v[2]] * b[2];
            if ss.length_squared() == 0.0 {
                si.dpdu
            } else {
                ss
            }
        } else {
            si.dpdu
        };
        // compute shading bitangent ts for triangle and adjust ss
        let mut ts: Vector3f = nrm_cross_vec3(&ns, &ss);
        if ts.length_squared() > 0.0 {
            ss = vec3_cross_nrm(&ts, &ns);
        } else {
            vec3_coordinate_system(&Vector3f::from(ns), &mut ss, &mut ts);
        }
        // compute dndu and dndv for triangle shading geometry
        let (dndu, dndv) = if !mesh.n.is_empty() {
            let dn1: Normal3f = mesh.n[v[0]] - mesh.n[v[2]];
            let dn2: Normal3f = mesh.n[v[1]] - mesh.n[v[2]];
            let determinant: Float =
                difference_of_products(duv02.x, duv12.y, duv02.y, duv12.x);
            if determinant.abs() < 1e-32 {
                // keep ray differentials reasonable for degenerate
                // parameterizations by using an arbitrary frame
                let dn: Vector3f = vec3_cross_vec3(
                    &Vector3f::from(mesh.n[v[2]] - mesh.n[v[0]]),
                    &Vector3f::from(mesh.n[v[1]] - mesh.n[v[0]]),
                );
                if dn.length_squared() == 0.0 {
                    (Normal3f::default(), Normal3f::default())
                } else {
                    let mut dnu = Vector3f::default();
                    let mut dnv = Vector3f::default();
                    vec3_coordinate_system(&dn, &mut dnu, &mut dnv);
                    (Normal3f::from(dnu), Normal3f::from(dnv))
                }
            } else {
                let inv_det: Float = 1.0 / determinant;
                (
                    (dn1 * duv12.y - dn2 * duv02.y) * inv_det,
                    (dn1 * -duv12.x + dn2 * duv02.x) * inv_det,
                )
            }
        } else {
            (Normal3f::default(), Normal3f::default())
        };
        si.set_shading_geometry(ns, &ss, &ts, &dndu, &dndv, true);
    }
    Some(si)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::nrm_dot_vec3f;
    use crate::core::rng::Rng;

    fn register_unit_triangle(reverse: bool, with_normals: bool) -> Triangle {
        let mut n = Vec::new();
        if with_normals {
            n = vec![
                Normal3f {
                    x: 0.0,
                    y: 0.1,
                    z: 1.0,
                };
                3
            ];
        }
        let mesh = TriangleMesh::new(
            &Transform::default(),
            reverse,
            vec![0, 1, 2],
            vec![
                Point3f::default(),
                Point3f {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point3f {
                    x: 0.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            n,
            Vec::new(),
            Vec::new(),
        );
        Triangle::new(register_triangle_mesh(mesh), 0)
    }

    #[test]
    fn perpendicular_ray_reports_barycentrics() {
        let tri = register_unit_triangle(false, false);
        let r = Ray::new(
            Point3f {
                x: 0.2,
                y: 0.3,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        let si = tri.intersect(&r, f32::INFINITY).unwrap();
        assert!((si.t_hit - 1.0).abs() < 1e-5);
        let p = si.intr.p();
        assert!((p.x - 0.2).abs() < 1e-5 && (p.y - 0.3).abs() < 1e-5 && p.z.abs() < 1e-5);
        assert!((si.intr.common.n.z - 1.0).abs() < 1e-5);
        assert!(tri.intersect_p(&r, f32::INFINITY));
        // default uvs: (0,0), (1,0), (1,1) blended by (0.5, 0.2, 0.3)
        assert!((si.intr.common.uv.x - 0.5).abs() < 1e-5);
        assert!((si.intr.common.uv.y - 0.3).abs() < 1e-5);
        // and the raw barycentrics from the low-level test
        let mesh = triangle_mesh(tri.mesh_index);
        let (p0, p1, p2) = tri.vertices(&mesh);
        let ti = intersect_triangle(&r, f32::INFINITY, &p0, &p1, &p2).unwrap();
        assert!((ti.b0 - 0.5).abs() < 1e-5);
        assert!((ti.b1 - 0.2).abs() < 1e-5);
        assert!((ti.b2 - 0.3).abs() < 1e-5);
    }

    #[test]
    fn shared_edge_is_watertight() {
        // a unit quad split along the diagonal; rays through the
        // diagonal must hit at least one of the two triangles
        let mesh = TriangleMesh::new(
            &Transform::default(),
            false,
            vec![0, 1, 2, 0, 2, 3],
            vec![
                Point3f::default(),
                Point3f {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point3f {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
                Point3f {
                    x: 0.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let idx = register_triangle_mesh(mesh);
        let t0 = Triangle::new(idx, 0);
        let t1 = Triangle::new(idx, 1);
        let mut rng = Rng::new();
        rng.set_sequence(41);
        for _ in 0..500 {
            let s = rng.uniform_float();
            let r = Ray::new(
                Point3f {
                    x: s,
                    y: s,
                    z: 1.0,
                },
                Vector3f {
                    x: 0.0,
                    y: 0.0,
                    z: -1.0,
                },
                0.0,
            );
            assert!(
                t0.intersect_p(&r, f32::INFINITY) || t1.intersect_p(&r, f32::INFINITY),
                "leak through the shared edge at s = {}",
                s
            );
        }
    }

    #[test]
    fn degenerate_triangle_reports_no_hit() {
        let mesh = TriangleMesh::new(
            &Transform::default(),
            false,
            vec![0, 1, 2],
            vec![
                Point3f::default(),
                Point3f {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
                Point3f {
                    x: 2.0,
                    y: 2.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let tri = Triangle::new(register_triangle_mesh(mesh), 0);
        let r = Ray::new(
            Point3f {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        assert!(tri.intersect(&r, f32::INFINITY).is_none());
        assert!(!tri.intersect_p(&r, f32::INFINITY));
    }

    #[test]
    fn orientation_flips_with_reverse_orientation() {
        let tri = register_unit_triangle(false, false);
        let tri_rev = register_unit_triangle(true, false);
        let u = Point2f { x: 0.4, y: 0.7 };
        let n = tri.sample(&u).unwrap().intr.n;
        let n_rev = tri_rev.sample(&u).unwrap().intr.n;
        assert!(nrm_dot_vec3f(&n, &Vector3f::from(n_rev)) < -0.999);
        assert!(tri.normal_bounds().contains(&Vector3f::from(n)));
        assert!(tri_rev.normal_bounds().contains(&Vector3f::from(n_rev)));
    }

    #[test]
    fn shading_normals_orient_geometric_normal() {
        let tri = register_unit_triangle(false, true);
        let r = Ray::new(
            Point3f {
                x: 0.2,
                y: 0.2,
                z: -1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
            0.0,
        );
        let si = tri.intersect(&r, f32::INFINITY).unwrap();
        // per-vertex normals are authoritative for sidedness
        assert!(nrm_dot_vec3f(&si.intr.common.n, &Vector3f::from(si.intr.shading.n)) > 0.0);
        assert!(si.intr.shading.n.z > 0.9);
    }

    #[test]
    fn area_sampling_integrates_to_area() {
        let tri = register_unit_triangle(false, false);
        assert!((tri.area() - 0.5).abs() < 1e-6);
        let mut rng = Rng::new();
        rng.set_sequence(43);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let ss = tri
                .sample(&Point2f {
                    x: rng.uniform_float(),
                    y: rng.uniform_float(),
                })
                .unwrap();
            let p = ss.intr.p();
            // inside the triangle: x, y >= 0 and x + y <= 1
            assert!(p.x >= -1e-6 && p.y >= -1e-6 && p.x + p.y <= 1.0 + 1e-5);
            sum += 1.0 / ss.pdf as f64;
        }
        let estimate = sum / n as f64;
        assert!((estimate - 0.5).abs() / 0.5 < 0.01);
    }

    #[test]
    fn spherical_sampling_integrates_to_solid_angle() {
        let tri = register_unit_triangle(false, false);
        let ctx = ShapeSampleContext::new(
            Point3fi::from_point(&Point3f {
                x: 0.3,
                y: 0.3,
                z: 1.0,
            }),
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        let sa = tri.solid_angle(&ctx.p());
        assert!(sa > MIN_SPHERICAL_SAMPLE_AREA && sa < MAX_SPHERICAL_SAMPLE_AREA);
        let mut rng = Rng::new();
        rng.set_sequence(45);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            if let Some(ss) = tri.sample_with_ref_point(&ctx, &u) {
                sum += 1.0 / ss.pdf as f64;
            }
        }
        let estimate = sum / n as f64;
        assert!(
            (estimate - sa as f64).abs() / (sa as f64) < 0.01,
            "estimate {} vs solid angle {}",
            estimate,
            sa
        );
    }

    #[test]
    fn sample_and_pdf_agree_through_inversion() {
        let tri = register_unit_triangle(false, false);
        let ctx = ShapeSampleContext::new(
            Point3fi::from_point(&Point3f {
                x: 0.2,
                y: 0.4,
                z: 0.8,
            }),
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            Normal3f {
                x: 0.1,
                y: 0.0,
                z: -1.0,
            }
            .normalize(),
            0.0,
        );
        let mut rng = Rng::new();
        rng.set_sequence(47);
        for _ in 0..300 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let ss = match tri.sample_with_ref_point(&ctx, &u) {
                Some(ss) => ss,
                None => continue,
            };
            let wi = (ss.intr.p() - ctx.p()).normalize();
            let pdf = tri.pdf_with_ref_point(&ctx, &wi);
            assert!(
                (pdf - ss.pdf).abs() / ss.pdf < 0.01,
                "pdf {} vs sample pdf {}",
                pdf,
                ss.pdf
            );
        }
    }

    #[test]
    fn distant_reference_uses_area_fallback() {
        let tri = register_unit_triangle(false, false);
        let ctx = ShapeSampleContext::new(
            Point3fi::from_point(&Point3f {
                x: 0.3,
                y: 0.3,
                z: 200.0,
            }),
            Normal3f::default(),
            Normal3f::default(),
            0.0,
        );
        assert!(tri.solid_angle(&ctx.p()) < MIN_SPHERICAL_SAMPLE_AREA);
        let mut rng = Rng::new();
        rng.set_sequence(49);
        for _ in 0..100 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let ss = tri.sample_with_ref_point(&ctx, &u).unwrap();
            let wi = (ss.intr.p() - ctx.p()).normalize();
            let pdf = tri.pdf_with_ref_point(&ctx, &wi);
            assert!(
                pdf > 0.0 && (pdf - ss.pdf).abs() / ss.pdf < 0.02,
                "pdf {} vs sample pdf {}",
                pdf,
                ss.pdf
            );
        }
    }
}
