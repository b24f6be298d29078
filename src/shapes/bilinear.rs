//! Bilinear patches of an indexed mesh: four corners interpolated as
//! S(u,v) = (1-u)(1-v) p00 + u(1-v) p10 + (1-u)v p01 + uv p11. Like
//! triangles, a patch is two 32-bit indices into a global mesh table
//! (plus its precomputed area). The ray intersection reduces to a
//! scalar quadratic in u (Ramsey-Hanrahan), so no quartic solver is
//! needed.

use crate::core::geometry::{
    bnd3_union_bnd3, nrm_abs_dot_vec3f, nrm_dot_nrmf, nrm_faceforward_nrm, pnt2_lerp, pnt3_lerp,
    pnt3_distance_squaredf, pnt3_distancef, vec3_cross_vec3, vec3_dot_vec3f, Bounds3f,
    DirectionCone, Normal3f, Point2f, Point3f, Ray, Vector3f,
};
use crate::core::glint::{clamp_t, difference_of_products, gamma, safe_sqrt, Float};
use crate::core::interaction::{InteractionCommon, SurfaceInteraction};
use crate::core::interval::Point3fi;
use crate::core::mesh::{bilinear_mesh, register_bilinear_mesh, BilinearPatchMesh};
use crate::core::paramset::ParamSet;
use crate::core::sampling::{bilinear_pdf, invert_bilinear, sample_bilinear};
use crate::core::shape::{
    BilinearIntersection, Shape, ShapeIntersection, ShapeSample, ShapeSampleContext,
};
use crate::core::transform::Transform;

/// Build a bilinear patch mesh from its parameter set ({indices, P, N?,
/// uv?, faceIndices?}, four vertices per patch), register it, and
/// return one shape handle per patch.
pub fn create_bilinear_mesh(
    render_from_object: &Transform,
    reverse_orientation: bool,
    params: &ParamSet,
) -> Vec<Shape> {
    let vi: Vec<i32> = params.find_int("indices");
    let p: Vec<Point3f> = params.find_point3f("P");
    let uvs: Vec<Point2f> = params.find_point2f("uv");
    let n: Vec<Normal3f> = params.find_normal3f("N");
    let face_indices: Vec<i32> = params.find_int("faceIndices");
    if vi.is_empty() || p.is_empty() {
        log::error!("bilinear patch mesh must have both \"indices\" and \"P\"");
        return Vec::new();
    }
    if vi.len() % 4 != 0 {
        log::error!(
            "number of vertex indices ({}) for bilinear patch mesh must be a multiple of 4",
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
    let mesh = BilinearPatchMesh::new(
        render_from_object,
        reverse_orientation,
        vi.iter().map(|&i| i as usize).collect(),
        p,
        n,
        uvs,
        face_indices.iter().map(|&i| i as usize).collect(),
    );
    create_patches(register_bilinear_mesh(mesh))
}

/// One shape handle per patch of an already registered mesh.
pub fn create_patches(mesh_index: u32) -> Vec<Shape> {
    let mesh = bilinear_mesh(mesh_index);
    (0..mesh.n_patches)
        .map(|i| Shape::BilinearPatch(BilinearPatch::new(mesh_index, i as u32)))
        .collect()
}

#[derive(Debug, Copy, Clone)]
pub struct BilinearPatch {
    mesh_index: u32,
    blp_index: u32,
    area: Float,
}

impl BilinearPatch {
    pub fn new(mesh_index: u32, blp_index: u32) -> Self {
        let mesh = bilinear_mesh(mesh_index);
        let (p00, p10, p01, p11) = vertices(&mesh, blp_index);
        // store the patch area: exact for rectangles, a Riemann sum
        // over a 3x3 grid otherwise
        let area: Float;
        if is_rectangle(&mesh, blp_index) {
            area = pnt3_distancef(&p00, &p01) * pnt3_distancef(&p00, &p10);
        } else {
            const NA: usize = 3;
            let mut p = [[Point3f::default(); NA + 1]; NA + 1];
            for (i, row) in p.iter_mut().enumerate() {
                let u = i as Float / NA as Float;
                for (j, pij) in row.iter_mut().enumerate() {
                    let v = j as Float / NA as Float;
                    *pij = pnt3_lerp(
                        u,
                        &pnt3_lerp(v, &p00, &p01),
                        &pnt3_lerp(v, &p10, &p11),
                    );
                }
            }
            let mut sum: Float = 0.0;
            for i in 0..NA {
                for j in 0..NA {
                    sum += 0.5
                        * vec3_cross_vec3(
                            &(p[i + 1][j + 1] - p[i][j]),
                            &(p[i + 1][j] - p[i][j + 1]),
                        )
                        .length();
                }
            }
            area = sum;
        }
        BilinearPatch {
            mesh_index,
            blp_index,
            area,
        }
    }
    fn get_mesh(&self) -> std::sync::Arc<BilinearPatchMesh> {
        bilinear_mesh(self.mesh_index)
    }
    pub fn object_bound(&self) -> Bounds3f {
        // mesh vertices are stored in render space already
        self.world_bound()
    }
    pub fn world_bound(&self) -> Bounds3f {
        let mesh = self.get_mesh();
        let (p00, p10, p01, p11) = vertices(&mesh, self.blp_index);
        bnd3_union_bnd3(&Bounds3f::new(p00, p11), &Bounds3f::new(p10, p01))
    }
    pub fn normal_bounds(&self) -> DirectionCone {
        let mesh = self.get_mesh();
        let v = patch_indices(&mesh, self.blp_index);
        let (p00, p10, p01, p11) = vertices(&mesh, self.blp_index);
        // corner normals from the corner partial derivatives
        let mut n00 = vec3_cross_vec3(&(p10 - p00), &(p01 - p00)).normalize();
        let mut n10 = vec3_cross_vec3(&(p10 - p00), &(p11 - p10)).normalize();
        let mut n01 = vec3_cross_vec3(&(p11 - p01), &(p01 - p00)).normalize();
        let mut n11 = vec3_cross_vec3(&(p11 - p01), &(p11 - p10)).normalize();
        if !mesh.n.is_empty() {
            // orient each corner the way intersections will
            n00 = face_forward_vec(n00, &mesh.n[v[0]]);
            n10 = face_forward_vec(n10, &mesh.n[v[1]]);
            n01 = face_forward_vec(n01, &mesh.n[v[2]]);
            n11 = face_forward_vec(n11, &mesh.n[v[3]]);
        } else if mesh.reverse_orientation ^ mesh.transform_swaps_handedness {
            n00 = -n00;
            n10 = -n10;
            n01 = -n01;
            n11 = -n11;
        }
        let n: Vector3f = (n00 + n10 + n01 + n11).normalize();
        let cos_theta: Float = vec3_dot_vec3f(&n, &n00)
            .min(vec3_dot_vec3f(&n, &n10))
            .min(vec3_dot_vec3f(&n, &n01).min(vec3_dot_vec3f(&n, &n11)));
        DirectionCone::new_with_angle(n, clamp_t(cos_theta, -1.0, 1.0))
    }
    pub fn intersect(&self, r: &Ray, t_max: Float) -> Option<ShapeIntersection> {
        let mesh = self.get_mesh();
        let (p00, p10, p01, p11) = vertices(&mesh, self.blp_index);
        let bi = intersect_bilinear_patch(r, t_max, &p00, &p10, &p01, &p11)?;
        let intr =
            interaction_from_intersection(&mesh, self.blp_index, &bi.uv, r.time, &-r.d);
        Some(ShapeIntersection { intr, t_hit: bi.t })
    }
    pub fn intersect_p(&self, r: &Ray, t_max: Float) -> bool {
        let mesh = self.get_mesh();
        let (p00, p10, p01, p11) = vertices(&mesh, self.blp_index);
        intersect_bilinear_patch(r, t_max, &p00, &p10, &p01, &p11).is_some()
    }
    pub fn area(&self) -> Float {
        self.area
    }
    pub fn sample(&self, u: &Point2f) -> Option<ShapeSample> {
        let mesh = self.get_mesh();
        let v = patch_indices(&mesh, self.blp_index);
        let (p00, p10, p01, p11) = vertices(&mesh, self.blp_index);
        let mut uv: Point2f = *u;
        let mut pdf: Float = 1.0;
        if !is_rectangle(&mesh, self.blp_index) {
            // warp the square toward the larger-area corners so the
            // sample distribution approximates uniform area
            let w: [Float; 4] = [
                vec3_cross_vec3(&(p10 - p00), &(p01 - p00)).length(),
                vec3_cross_vec3(&(p10 - p00), &(p11 - p10)).length(),
                vec3_cross_vec3(&(p01 - p00), &(p11 - p01)).length(),
                vec3_cross_vec3(&(p11 - p10), &(p11 - p01)).length(),
            ];
            uv = sample_bilinear(u, &w);
            pdf = bilinear_pdf(&uv, &w);
        }
        // compute patch geometric quantities at sampled (u,v)
        let pu0: Point3f = pnt3_lerp(uv.y, &p00, &p01);
        let pu1: Point3f = pnt3_lerp(uv.y, &p10, &p11);
        let p: Point3f = pnt3_lerp(uv.x, &pu0, &pu1);
        let dpdu: Vector3f = pu1 - pu0;
        let dpdv: Vector3f = pnt3_lerp(uv.x, &p01, &p11) - pnt3_lerp(uv.x, &p00, &p10);
        if dpdu.length_squared() == 0.0 || dpdv.length_squared() == 0.0 {
            return None;
        }
        let mut uv_sample: Point2f = uv;
        if !mesh.uv.is_empty() {
            uv_sample = pnt2_lerp(
                uv.x,
                &pnt2_lerp(uv.y, &mesh.uv[v[0]], &mesh.uv[v[2]]),
                &pnt2_lerp(uv.y, &mesh.uv[v[1]], &mesh.uv[v[3]]),
            );
        }
        let mut n = Normal3f::from(vec3_cross_vec3(&dpdu, &dpdv).normalize());
        if !mesh.n.is_empty() {
            let ns: Normal3f = bilerp_normal(&mesh, v, &uv);
            n = nrm_faceforward_nrm(&n, &ns);
        } else if mesh.reverse_orientation ^ mesh.transform_swaps_handedness {
            n *= -1.0 as Float;
        }
        let p_abs_sum: Point3f = p00.abs() + p01.abs() + p10.abs() + p11.abs();
        let p_error: Vector3f = Vector3f::from(p_abs_sum) * gamma(6);
        let mut intr = InteractionCommon::new(
            Point3fi::from_point_and_error(&p, &p_error),
            n,
            0.0,
        );
        intr.uv = uv_sample;
        Some(ShapeSample {
            intr,
            pdf: pdf / vec3_cross_vec3(&dpdu, &dpdv).length(),
        })
    }
    /// Area-measure density of a previously sampled or intersected
    /// point, identified by its uv coordinates.
    pub fn pdf(&self, intr: &InteractionCommon) -> Float {
        let mesh = self.get_mesh();
        let v = patch_indices(&mesh, self.blp_index);
        let (p00, p10, p01, p11) = vertices(&mesh, self.blp_index);
        // recover parametric (u,v) of the point on the patch
        let mut uv: Point2f = intr.uv;
        if !mesh.uv.is_empty() {
            uv = invert_bilinear(
                &uv,
                &[mesh.uv[v[0]], mesh.uv[v[1]], mesh.uv[v[2]], mesh.uv[v[3]]],
            );
        }
        let mut pdf: Float = 1.0;
        if !is_rectangle(&mesh, self.blp_index) {
            let w: [Float; 4] = [
                vec3_cross_vec3(&(p10 - p00), &(p01 - p00)).length(),
                vec3_cross_vec3(&(p10 - p00), &(p11 - p10)).length(),
                vec3_cross_vec3(&(p01 - p00), &(p11 - p01)).length(),
                vec3_cross_vec3(&(p11 - p10), &(p11 - p01)).length(),
            ];
            pdf = bilinear_pdf(&uv, &w);
        }
        let pu0: Point3f = pnt3_lerp(uv.y, &p00, &p01);
        let pu1: Point3f = pnt3_lerp(uv.y, &p10, &p11);
        let dpdu: Vector3f = pu1 - pu0;
        let dpdv: Vector3f = pnt3_lerp(uv.x, &p01, &p11) - pnt3_lerp(uv.x, &p00, &p10);
        pdf / vec3_cross_vec3(&dpdu, &dpdv).length()
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
            // convert the area density at the hit to solid angle
            let mut pdf: Float = self.pdf(&isect.intr.common)
                * pnt3_distance_squaredf(&ctx.p(), &isect.intr.p())
                / nrm_abs_dot_vec3f(&isect.intr.common.n, &-(*wi));
            if pdf.is_infinite() {
                pdf = 0.0;
            }
            pdf
        } else {
            0.0
        }
    }
}

fn patch_indices(mesh: &BilinearPatchMesh, blp_index: u32) -> &[usize] {
    &mesh.vertex_indices[4 * blp_index as usize..4 * blp_index as usize + 4]
}

fn vertices(mesh: &BilinearPatchMesh, blp_index: u32) -> (Point3f, Point3f, Point3f, Point3f) {
    let v = patch_indices(mesh, blp_index);
    (mesh.p[v[0]], mesh.p[v[1]], mesh.p[v[2]], mesh.p[v[3]])
}

fn face_forward_vec(n: Vector3f, reference: &Normal3f) -> Vector3f {
    if vec3_dot_vec3f(&n, &Vector3f::from(*reference)) < 0.0 {
        -n
    } else {
        n
    }
}

fn bilerp_normal(mesh: &BilinearPatchMesh, v: &[usize], uv: &Point2f) -> Normal3f {
    let n0 = mesh.n[v[0]] * (1.0 - uv.y) + mesh.n[v[2]] * uv.y;
    let n1 = mesh.n[v[1]] * (1.0 - uv.y) + mesh.n[v[3]] * uv.y;
    n0 * (1.0 - uv.x) + n1 * uv.x
}

/// Do the four corners form a (planar) rectangle, within tolerance?
/// Rectangles get exact area and plain uniform sampling.
fn is_rectangle(mesh: &BilinearPatchMesh, blp_index: u32) -> bool {
    let (p00, p10, p01, p11) = vertices(mesh, blp_index);
    if p00 == p01 || p01 == p11 || p11 == p10 || p10 == p00 {
        return false;
    }
    // the four corners must be coplanar
    let n = vec3_cross_vec3(&(p10 - p00), &(p01 - p00));
    if n.length_squared() == 0.0 {
        return false;
    }
    let n = n.normalize();
    if vec3_dot_vec3f(&(p11 - p00).normalize(), &n).abs() > 1e-5 {
        return false;
    }
    // and the planar vertices must form a rectangle
    let p_center: Point3f = (p00 + p01 + p10 + p11) * 0.25;
    let d2: [Float; 4] = [
        pnt3_distance_squaredf(&p00, &p_center),
        pnt3_distance_squaredf(&p10, &p_center),
        pnt3_distance_squaredf(&p01, &p_center),
        pnt3_distance_squaredf(&p11, &p_center),
    ];
    for d in &d2[1..] {
        if (d - d2[0]).abs() / d2[0] > 1e-4 {
            return false;
        }
    }
    true
}

fn vec3_lerp(t: Float, a: &Vector3f, b: &Vector3f) -> Vector3f {
    *a * (1.0 as Float - t) + *b * t
}

/// Ray-bilinear-patch intersection via the Ramsey-Hanrahan reduction:
/// a scalar quadratic a + b u + c u^2 = 0 in the patch's u parameter,
/// solved with the numerically stable root and Viete's formula, then v
/// and t recovered per root by projecting onto the u-isoline.
pub fn intersect_bilinear_patch(
    ray: &Ray,
    t_max: Float,
    p00: &Point3f,
    p10: &Point3f,
    p01: &Point3f,
    p11: &Point3f,
) -> Option<BilinearIntersection> {
    let qn: Vector3f = vec3_cross_vec3(&(*p10 - *p00), &(*p01 - *p11));
    let e11: Vector3f = *p11 - *p10;
    let e00: Vector3f = *p01 - *p00;
    let q00: Vector3f = *p00 - ray.o;
    let q10: Vector3f = *p10 - ray.o;
    let a: Float = vec3_dot_vec3f(&vec3_cross_vec3(&q00, &ray.d), &e00);
    let c: Float = vec3_dot_vec3f(&qn, &ray.d);
    let b: Float = vec3_dot_vec3f(&vec3_cross_vec3(&q10, &ray.d), &e11) - (a + c);
    let mut det: Float = difference_of_products(b, b, 4.0 * a, c);
    if det < 0.0 {
        return None;
    }
    det = det.sqrt();
    // two roots in u; the smallest positive t wins
    let u1: Float;
    let u2: Float;
    if c == 0.0 {
        // a trapezoid only has a single root
        u1 = -a / b;
        u2 = -1.0;
    } else {
        let q = (-b - det.copysign(b)) / 2.0;
        u1 = q / c;
        u2 = a / q;
    }
    let mut t: Float = t_max;
    let mut u: Float = 0.0;
    let mut v: Float = 0.0;
    let mut found: bool = false;
    if (0.0..=1.0).contains(&u1) {
        // recover v and t by projecting onto the u-isoline
        let pa: Vector3f = vec3_lerp(u1, &q00, &q10);
        let pb: Vector3f = vec3_lerp(u1, &e00, &e11);
        let n: Vector3f = vec3_cross_vec3(&ray.d, &pb);
        let det2: Float = vec3_dot_vec3f(&n, &n);
        let n: Vector3f = vec3_cross_vec3(&n, &pa);
        let t1: Float = vec3_dot_vec3f(&n, &pb);
        let v1: Float = vec3_dot_vec3f(&n, &ray.d);
        if t1 > 0.0 && v1 >= 0.0 && v1 <= det2 && det2 != 0.0 {
            t = t1 / det2;
            u = u1;
            v = v1 / det2;
            found = true;
        }
    }
    if (0.0..=1.0).contains(&u2) {
        let pa: Vector3f = vec3_lerp(u2, &q00, &q10);
        let pb: Vector3f = vec3_lerp(u2, &e00, &e11);
        let n: Vector3f = vec3_cross_vec3(&ray.d, &pb);
        let det2: Float = vec3_dot_vec3f(&n, &n);
        let n: Vector3f = vec3_cross_vec3(&n, &pa);
        let t2: Float = vec3_dot_vec3f(&n, &pb) / det2;
        let v2: Float = vec3_dot_vec3f(&n, &ray.d);
        if v2 >= 0.0 && v2 <= det2 && t > t2 && t2 > 0.0 {
            t = t2;
            u = u2;
            v = v2 / det2;
            found = true;
        }
    }
    if !found || t >= t_max {
        return None;
    }
    Some(BilinearIntersection {
        uv: Point2f { x: u, y: v },
        t,
    })
}

/// Inflate a (u, v, t) hit into the full surface record: position,
/// partial derivatives (reparameterized through the mesh uvs when
/// present), normal derivatives from the fundamental forms, and a
/// shading frame rotated onto the interpolated vertex normals.
pub fn interaction_from_intersection(
    mesh: &BilinearPatchMesh,
    blp_index: u32,
    uv_hit: &Point2f,
    time: Float,
    wo: &Vector3f,
) -> SurfaceInteraction {
    let v = patch_indices(mesh, blp_index);
    let (p00, p10, p01, p11) = vertices(mesh, blp_index);
    let p_hit: Point3f = pnt3_lerp(
        uv_hit.x,
        &pnt3_lerp(uv_hit.y, &p00, &p01),
        &pnt3_lerp(uv_hit.y, &p10, &p11),
    );
    let mut dpdu: Vector3f =
        pnt3_lerp(uv_hit.y, &p10, &p11) - pnt3_lerp(uv_hit.y, &p00, &p01);
    let mut dpdv: Vector3f =
        pnt3_lerp(uv_hit.x, &p01, &p11) - pnt3_lerp(uv_hit.x, &p00, &p10);

    // interpolate texture coordinates, if provided
    let mut uv: Point2f = *uv_hit;
    if !mesh.uv.is_empty() {
        let uv00: Point2f = mesh.uv[v[0]];
        let uv10: Point2f = mesh.uv[v[1]];
        let uv01: Point2f = mesh.uv[v[2]];
        let uv11: Point2f = mesh.uv[v[3]];
        let dsdu: Float =
            -uv00.x + uv10.x + uv.y * (uv00.x - uv01.x - uv10.x + uv11.x);
        let dsdv: Float =
            -uv00.x + uv01.x + uv.x * (uv00.x - uv01.x - uv10.x + uv11.x);
        let dtdu: Float =
            -uv00.y + uv10.y + uv.y * (uv00.y - uv01.y - uv10.y + uv11.y);
        let dtdv: Float =
            -uv00.y + uv01.y + uv.x * (uv00.y - uv01.y - uv10.y + uv11.y);
        let duds: Float = if dsdu.abs() < 1e-8 { 0.0 } else { 1.0 / dsdu };
        let dvds: Float = if dsdv.abs() < 1e-8 { 0.0 } else { 1.0 / dsdv };
        let dudt: Float = if dtdu.abs() < 1e-8 { 0.0 } else { 1.0 / dtdu };
        let dvdt: Float = if dtdv.abs() < 1e-8 { 0.0 } else { 1.0 / dtdv };
        uv = pnt2_lerp(
            uv.x,
            &pnt2_lerp(uv.y, &uv00, &uv01),
            &pnt2_lerp(uv.y, &uv10, &uv11),
        );
        // dpds = dpdu * duds + dpdv * dvds, and likewise for dpdt;
        // these are zero vectors when the mapping is degenerate
        let dpds: Vector3f = dpdu * duds + dpdv * dvds;
        let mut dpdt: Vector3f = dpdu * dudt + dpdv * dvdt;
        if vec3_cross_vec3(&dpds, &dpdt) != Vector3f::default() {
            // keep the normal in the same hemisphere
            if vec3_dot_vec3f(
                &vec3_cross_vec3(&dpdu, &dpdv),
                &vec3_cross_vec3(&dpds, &dpdt),
            ) < 0.0
            {
                dpdt = -dpdt;
            }
            dpdu = dpds;
            dpdv = dpdt;
        }
    }

    // compute coefficients for fundamental forms; the uu and vv second
    // derivatives of a bilinear surface vanish
    let ec: Float = vec3_dot_vec3f(&dpdu, &dpdu);
    let fc: Float = vec3_dot_vec3f(&dpdu, &dpdv);
    let gc: Float = vec3_dot_vec3f(&dpdv, &dpdv);
    let nc: Vector3f = vec3_cross_vec3(&dpdu, &dpdv).normalize();
    let d2p_duv: Vector3f = Vector3f {
        x: p00.x - p01.x - p10.x + p11.x,
        y: p00.y - p01.y - p10.y + p11.y,
        z: p00.z - p01.z - p10.z + p11.z,
    };
    let fl: Float = vec3_dot_vec3f(&nc, &d2p_duv);
    let egf2: Float = difference_of_products(ec, gc, fc, fc);
    let mut dndu = Normal3f::default();
    let mut dndv = Normal3f::default();
    if egf2 != 0.0 {
        let inv_egf2: Float = 1.0 / egf2;
        dndu = Normal3f::from(dpdu * (fl * fc * inv_egf2) + dpdv * (-fl * ec * inv_egf2));
        dndv = Normal3f::from(dpdu * (-fl * gc * inv_egf2) + dpdv * (fl * fc * inv_egf2));
    }

    // two lerps of the corner positions bound the rounding error
    let p_abs_max = Vector3f {
        x: p00.x.abs().max(p10.x.abs()).max(p01.x.abs().max(p11.x.abs())),
        y: p00.y.abs().max(p10.y.abs()).max(p01.y.abs().max(p11.y.abs())),
        z: p00.z.abs().max(p10.z.abs()).max(p01.z.abs().max(p11.z.abs())),
    };
    let p_error: Vector3f = p_abs_max * gamma(6);

    let flip: bool = mesh.reverse_orientation ^ mesh.transform_swaps_handedness;
    let mut si = SurfaceInteraction::new(
        Point3fi::from_point_and_error(&p_hit, &p_error),
        uv,
        *wo,
        dpdu,
        dpdv,
        dndu,
        dndv,
        time,
        flip,
    );
    if !mesh.face_indices.is_empty() {
        si.face_index = mesh.face_indices[blp_index as usize];
    }

    if !mesh.n.is_empty() {
        let n00: Normal3f = mesh.n[v[0]];
        let n10: Normal3f = mesh.n[v[1]];
        let n01: Normal3f = mesh.n[v[2]];
        let n11: Normal3f = mesh.n[v[3]];
        let dndu_s: Normal3f = (n10 * (1.0 - uv_hit.y) + n11 * uv_hit.y)
            - (n00 * (1.0 - uv_hit.y) + n01 * uv_hit.y);
        let dndv_s: Normal3f = (n01 * (1.0 - uv_hit.x) + n11 * uv_hit.x)
            - (n00 * (1.0 - uv_hit.x) + n10 * uv_hit.x);
        let ns: Normal3f = bilerp_normal(mesh, v, uv_hit);
        if ns.length_squared() > 0.0 {
            let ns: Normal3f = ns.normalize();
            let n: Normal3f = si.common.n;
            let axis: Vector3f = vec3_cross_vec3(&Vector3f::from(n), &Vector3f::from(ns));
            if axis.length_squared() > 1e-14 {
                // rotate dpdu and dpdv about the axis perpendicular to
                // the plane of n and ns, so their cross product equals
                // the shading normal
                let axis: Vector3f = axis.normalize();
                let cos_theta: Float = nrm_dot_nrmf(&n, &ns);
                let sin_theta: Float = safe_sqrt(1.0 - cos_theta * cos_theta);
                let r: Transform = Transform::rotate_sin_cos(sin_theta, cos_theta, &axis);
                let mut sdpdu: Vector3f = r.transform_vector(&si.dpdu);
                let sdpdv: Vector3f = r.transform_vector(&si.dpdv);
                // Gram-Schmidt so the shading tangent stays
                // perpendicular to the shading normal
                sdpdu = sdpdu
                    - Vector3f::from(ns) * vec3_dot_vec3f(&sdpdu, &Vector3f::from(ns));
                si.set_shading_geometry(ns, &sdpdu, &sdpdv, &dndu_s, &dndv_s, true);
            }
        }
    }
    si
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::Rng;
    use crate::core::shape::ShapeSampleContext;

    fn register_patch(
        p: [Point3f; 4],
        n: Vec<Normal3f>,
        uv: Vec<Point2f>,
        reverse: bool,
    ) -> BilinearPatch {
        let mesh = BilinearPatchMesh::new(
            &Transform::default(),
            reverse,
            vec![0, 1, 2, 3],
            p.to_vec(),
            n,
            uv,
            Vec::new(),
        );
        BilinearPatch::new(register_bilinear_mesh(mesh), 0)
    }

    fn unit_quad() -> BilinearPatch {
        register_patch(
            [
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
                Point3f {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
            false,
        )
    }

    fn twisted_patch() -> BilinearPatch {
        register_patch(
            [
                Point3f::default(),
                Point3f {
                    x: 1.0,
                    y: 0.0,
                    z: 0.1,
                },
                Point3f {
                    x: 0.0,
                    y: 1.0,
                    z: 0.0,
                },
                Point3f {
                    x: 1.0,
                    y: 1.0,
                    z: -0.1,
                },
            ],
            Vec::new(),
            Vec::new(),
            false,
        )
    }

    #[test]
    fn unit_quad_reports_uv_and_t() {
        let patch = unit_quad();
        let r = Ray::new(
            Point3f {
                x: 0.7,
                y: 0.6,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        let si = patch.intersect(&r, f32::INFINITY).unwrap();
        assert!((si.t_hit - 1.0).abs() < 1e-5);
        assert!((si.intr.common.uv.x - 0.7).abs() < 1e-5);
        assert!((si.intr.common.uv.y - 0.6).abs() < 1e-5);
        let p = si.intr.p();
        assert!((p.x - 0.7).abs() < 1e-5 && (p.y - 0.6).abs() < 1e-5 && p.z.abs() < 1e-6);
        assert!(patch.intersect_p(&r, f32::INFINITY));
        assert!((patch.area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn trapezoid_hits_through_linear_branch() {
        // parallel u-edges make the quadratic degenerate to linear
        let patch = register_patch(
            [
                Point3f::default(),
                Point3f {
                    x: 2.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point3f {
                    x: 0.5,
                    y: 1.0,
                    z: 0.0,
                },
                Point3f {
                    x: 1.5,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
            false,
        );
        let r = Ray::new(
            Point3f {
                x: 1.0,
                y: 0.5,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        let si = patch.intersect(&r, f32::INFINITY).unwrap();
        assert!((si.t_hit - 1.0).abs() < 1e-5);
        assert!((si.intr.common.uv.x - 0.5).abs() < 1e-4);
        assert!((si.intr.common.uv.y - 0.5).abs() < 1e-4);
    }

    #[test]
    fn intersect_and_intersect_p_agree() {
        let patch = twisted_patch();
        let mut rng = Rng::new();
        rng.set_sequence(61);
        for _ in 0..2000 {
            let o = Point3f {
                x: 2.0 * rng.uniform_float() - 0.5,
                y: 2.0 * rng.uniform_float() - 0.5,
                z: 1.0,
            };
            let d = Vector3f {
                x: 0.4 * (rng.uniform_float() - 0.5),
                y: 0.4 * (rng.uniform_float() - 0.5),
                z: -1.0,
            };
            let r = Ray::new(o, d, 0.0);
            assert_eq!(
                patch.intersect(&r, f32::INFINITY).is_some(),
                patch.intersect_p(&r, f32::INFINITY)
            );
        }
    }

    #[test]
    fn rectangle_sampling_is_uniform() {
        let patch = unit_quad();
        let mut rng = Rng::new();
        rng.set_sequence(63);
        for _ in 0..500 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let ss = patch.sample(&u).unwrap();
            assert!((ss.pdf - 1.0).abs() < 1e-5);
            assert!((patch.pdf(&ss.intr) - ss.pdf).abs() < 1e-5);
            let p = ss.intr.p();
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
            assert!(patch.normal_bounds().contains(&Vector3f::from(ss.intr.n)));
        }
    }

    #[test]
    fn nonplanar_sampling_matches_its_pdf() {
        let patch = twisted_patch();
        let mut rng = Rng::new();
        rng.set_sequence(65);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let ss = patch.sample(&u).unwrap();
            // the reported pdf matches the density the point was
            // actually drawn from
            let pdf = patch.pdf(&ss.intr);
            assert!((pdf - ss.pdf).abs() / ss.pdf < 1e-3);
            sum += 1.0 / ss.pdf as f64;
        }
        // the Monte Carlo estimate converges to the true area; the
        // stored 3x3 grid approximation is close for mild twists
        let estimate = sum / n as f64;
        assert!((estimate - patch.area() as f64).abs() / (patch.area() as f64) < 0.02);
    }

    #[test]
    fn solid_angle_pdf_consistency() {
        let patch = twisted_patch();
        let ctx = ShapeSampleContext::new(
            Point3fi::from_point(&Point3f {
                x: 0.4,
                y: 0.5,
                z: 1.5,
            }),
            Normal3f::default(),
            Normal3f::default(),
            0.0,
        );
        let mut rng = Rng::new();
        rng.set_sequence(67);
        for _ in 0..300 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let ss = match patch.sample_with_ref_point(&ctx, &u) {
                Some(ss) => ss,
                None => continue,
            };
            let wi = (ss.intr.p() - ctx.p()).normalize();
            let pdf = patch.pdf_with_ref_point(&ctx, &wi);
            assert!(
                (pdf - ss.pdf).abs() / ss.pdf < 0.01,
                "pdf {} vs sample pdf {}",
                pdf,
                ss.pdf
            );
        }
    }

    #[test]
    fn shading_normals_build_consistent_frame() {
        let tilt = Normal3f {
            x: 0.3,
            y: 0.0,
            z: 1.0,
        }
        .normalize();
        let patch = register_patch(
            [
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
                Point3f {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            vec![tilt; 4],
            Vec::new(),
            false,
        );
        let r = Ray::new(
            Point3f {
                x: 0.5,
                y: 0.5,
                z: 1.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: -1.0,
            },
            0.0,
        );
        let si = patch.intersect(&r, f32::INFINITY).unwrap();
        // the shading normal is the interpolated one
        assert!(nrm_dot_nrmf(&si.intr.shading.n, &tilt) > 0.999);
        // and the rotated shading dpdu is perpendicular to it
        assert!(
            vec3_dot_vec3f(&si.intr.shading.dpdu, &Vector3f::from(si.intr.shading.n)).abs()
                < 1e-4
        );
    }

    #[test]
    fn reversed_orientation_flips_normal() {
        let quad = unit_quad();
        let quad_rev = register_patch(
            [
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
                Point3f {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            Vec::new(),
            Vec::new(),
            true,
        );
        let u = Point2f { x: 0.3, y: 0.8 };
        let n = quad.sample(&u).unwrap().intr.n;
        let n_rev = quad_rev.sample(&u).unwrap().intr.n;
        assert!(nrm_dot_nrmf(&n, &n_rev) < -0.999);
    }
}
