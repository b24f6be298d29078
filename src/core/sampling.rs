//! Draw random samples from a chosen probability distribution: the
//! uniform sphere/disk/cone/triangle warps, linear and bilinear warps
//! with their inverses, and uniform sampling over a spherical triangle
//! (with the inverse map the pdf evaluation path needs).

use std::f32::consts::PI;

use crate::core::geometry::{
    spherical_direction, vec3_cross_vec3, vec3_dot_vec3f, vec3_gram_schmidt, Point2f, Point3f,
    Vector2f, Vector3f,
};
use crate::core::glint::{
    clamp_t, difference_of_products, lerp, safe_sqrt, sqr, sum_of_products, Float, INV_4_PI,
    ONE_MINUS_EPSILON, PI_OVER_2, PI_OVER_4,
};

/// Uniformly sample a direction on the full sphere.
pub fn uniform_sample_sphere(u: &Point2f) -> Vector3f {
    let z: Float = 1.0 - 2.0 * u[0];
    let r: Float = safe_sqrt(1.0 - z * z);
    let phi: Float = 2.0 * PI * u[1];
    Vector3f {
        x: r * phi.cos(),
        y: r * phi.sin(),
        z,
    }
}

pub fn uniform_sphere_pdf() -> Float {
    INV_4_PI
}

/// Uniformly distribute samples over a unit disk by mapping concentric
/// squares to concentric circles.
pub fn concentric_sample_disk(u: &Point2f) -> Point2f {
    // map uniform random numbers to [-1,1]^2
    let u_offset: Point2f = *u * 2.0
        - Vector2f {
            x: 1.0,
            y: 1.0,
        };
    // handle degeneracy at the origin
    if u_offset.x == 0.0 && u_offset.y == 0.0 {
        return Point2f::default();
    }
    // apply concentric mapping to point
    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, PI_OVER_4 * (u_offset.y / u_offset.x))
    } else {
        (u_offset.y, PI_OVER_2 - PI_OVER_4 * (u_offset.x / u_offset.y))
    };
    Point2f {
        x: theta.cos(),
        y: theta.sin(),
    } * r
}

/// Sample a direction inside a cone of directions about the +z axis.
pub fn uniform_sample_cone(u: &Point2f, cos_theta_max: Float) -> Vector3f {
    let cos_theta: Float = (1.0 - u[0]) + u[0] * cos_theta_max;
    let sin_theta: Float = safe_sqrt(1.0 - cos_theta * cos_theta);
    let phi: Float = u[1] * 2.0 * PI;
    spherical_direction(sin_theta, cos_theta, phi)
}

pub fn uniform_cone_pdf(cos_theta_max: Float) -> Float {
    1.0 / (2.0 * PI * (1.0 - cos_theta_max))
}

/// Map the unit square to barycentrics with uniform area density.
pub fn sample_uniform_triangle(u: &Point2f) -> [Float; 3] {
    let (b0, b1) = if u[0] < u[1] {
        let b0 = u[0] / 2.0;
        (b0, u[1] - b0)
    } else {
        let b1 = u[1] / 2.0;
        (u[0] - b1, b1)
    };
    [b0, b1, 1.0 - b0 - b1]
}

/// Sample x in [0,1] with density proportional to lerp(x, a, b);
/// a, b >= 0.
pub fn sample_linear(u: Float, a: Float, b: Float) -> Float {
    if u == 0.0 && a == 0.0 {
        return 0.0;
    }
    let x: Float = u * (a + b) / (a + lerp(u, sqr(a), sqr(b)).sqrt());
    x.min(ONE_MINUS_EPSILON)
}

pub fn linear_pdf(x: Float, a: Float, b: Float) -> Float {
    if !(0.0..=1.0).contains(&x) {
        return 0.0;
    }
    2.0 * lerp(x, a, b) / (a + b)
}

pub fn invert_linear_sample(x: Float, a: Float, b: Float) -> Float {
    x * (a * (2.0 - x) + b * x) / (a + b)
}

/// Sample the unit square with density bilinearly interpolating the
/// four corner weights w = [w(0,0), w(1,0), w(0,1), w(1,1)].
pub fn sample_bilinear(u: &Point2f, w: &[Float; 4]) -> Point2f {
    // sample y from the marginal, then x from the conditional
    let y = sample_linear(u[1], w[0] + w[1], w[2] + w[3]);
    let x = sample_linear(u[0], lerp(y, w[0], w[2]), lerp(y, w[1], w[3]));
    Point2f { x, y }
}

pub fn bilinear_pdf(p: &Point2f, w: &[Float; 4]) -> Float {
    if p.x < 0.0 || p.x > 1.0 || p.y < 0.0 || p.y > 1.0 {
        return 0.0;
    }
    if w[0] + w[1] + w[2] + w[3] == 0.0 {
        return 1.0;
    }
    4.0 * ((1.0 - p.x) * (1.0 - p.y) * w[0]
        + p.x * (1.0 - p.y) * w[1]
        + (1.0 - p.x) * p.y * w[2]
        + p.x * p.y * w[3])
        / (w[0] + w[1] + w[2] + w[3])
}

pub fn invert_bilinear_sample(p: &Point2f, w: &[Float; 4]) -> Point2f {
    Point2f {
        x: invert_linear_sample(p.x, lerp(p.y, w[0], w[2]), lerp(p.y, w[1], w[3])),
        y: invert_linear_sample(p.y, w[0] + w[1], w[2] + w[3]),
    }
}

fn cross2(a: &Vector2f, b: &Vector2f) -> Float {
    difference_of_products(a.x, b.y, a.y, b.x)
}

/// Recover (u, v) such that bilerp((u, v), q) = p, for corner points
/// q = [q(0,0), q(1,0), q(0,1), q(1,1)]. The v coordinate satisfies a
/// scalar quadratic; u follows from a division.
pub fn invert_bilinear(p: &Point2f, q: &[Point2f; 4]) -> Point2f {
    let a: Point2f = q[0];
    let b: Point2f = q[1];
    let c: Point2f = q[2];
    let d: Point2f = q[3];
    let e: Vector2f = b - a;
    let f: Vector2f = c - a;
    let g: Vector2f = (a - b) + (d - c);
    let h: Vector2f = *p - a;
    let k2: Float = cross2(&g, &f);
    let k1: Float = cross2(&e, &f) + cross2(&h, &g);
    let k0: Float = cross2(&h, &e);
    // if the edges are parallel the quadratic degenerates to linear
    if k2.abs() < 1e-10 {
        if k1 == 0.0 {
            return Point2f { x: 0.5, y: 0.5 };
        }
        let v: Float = -k0 / k1;
        let denom: Float = e.x + g.x * v;
        let u: Float = if denom.abs() > (e.y + g.y * v).abs() {
            (h.x - f.x * v) / denom
        } else {
            (h.y - f.y * v) / (e.y + g.y * v)
        };
        return Point2f {
            x: clamp_t(u, 0.0, 1.0),
            y: clamp_t(v, 0.0, 1.0),
        };
    }
    let w: Float = difference_of_products(k1, k1, 4.0 * k0, k2);
    if w < 0.0 {
        return Point2f { x: 0.5, y: 0.5 };
    }
    let w: Float = w.sqrt();
    let mut v: Float = (-k1 - w) / (2.0 * k2);
    if !(0.0..=1.0).contains(&v) {
        v = (-k1 + w) / (2.0 * k2);
    }
    let denom_x: Float = e.x + g.x * v;
    let denom_y: Float = e.y + g.y * v;
    let u: Float = if denom_x.abs() > denom_y.abs() {
        (h.x - f.x * v) / denom_x
    } else {
        (h.y - f.y * v) / denom_y
    };
    Point2f {
        x: clamp_t(u, 0.0, 1.0),
        y: clamp_t(v, 0.0, 1.0),
    }
}

fn normalized_or_none(v: Vector3f) -> Option<Vector3f> {
    if v.length_squared() == 0.0 {
        None
    } else {
        Some(v.normalize())
    }
}

/// Uniformly sample the solid angle subtended by the triangle (v0, v1,
/// v2) as seen from p, returning barycentric coordinates of the sampled
/// point and the solid-angle density (1 over the subtended area).
/// Returns None when the projected triangle is degenerate.
pub fn sample_spherical_triangle(
    v: &[Point3f; 3],
    p: &Point3f,
    u: &Point2f,
) -> Option<([Float; 3], Float)> {
    use crate::core::geometry::vec3_angle_between;
    // compute vectors a, b, and c to spherical triangle vertices
    let a = (v[0] - *p).normalize();
    let b = (v[1] - *p).normalize();
    let c = (v[2] - *p).normalize();
    // compute normalized cross products of all direction pairs
    let n_ab = normalized_or_none(vec3_cross_vec3(&a, &b))?;
    let n_bc = normalized_or_none(vec3_cross_vec3(&b, &c))?;
    let n_ca = normalized_or_none(vec3_cross_vec3(&c, &a))?;
    // find angles alpha, beta, and gamma at spherical triangle vertices
    let alpha = vec3_angle_between(&n_ab, &-n_ca);
    let beta = vec3_angle_between(&n_bc, &-n_ab);
    let gamma = vec3_angle_between(&n_ca, &-n_bc);
    // uniformly sample triangle area A to compute A'
    let a_pi = alpha + beta + gamma;
    let ap_pi = lerp(u[0], PI, a_pi);
    let area = a_pi - PI;
    if area <= 0.0 {
        return None;
    }
    let pdf = 1.0 / area;
    // find cos beta' for point along b for sampled area
    let cos_alpha = alpha.cos();
    let sin_alpha = alpha.sin();
    let sin_phi = ap_pi.sin() * cos_alpha - ap_pi.cos() * sin_alpha;
    let cos_phi = ap_pi.cos() * cos_alpha + ap_pi.sin() * sin_alpha;
    let k1 = cos_phi + cos_alpha;
    let k2 = sin_phi - sin_alpha * vec3_dot_vec3f(&a, &b);
    let cos_bp = (k2 + difference_of_products(k2, cos_phi, k1, sin_phi) * cos_alpha)
        / (sum_of_products(k2, sin_phi, k1, cos_phi) * sin_alpha);
    let cos_bp = clamp_t(cos_bp, -1.0, 1.0);
    // sample c' along the arc between b' and a
    let sin_bp = safe_sqrt(1.0 - sqr(cos_bp));
    let cp = a * cos_bp + vec3_gram_schmidt(&c, &a).normalize() * sin_bp;
    // compute sampled spherical triangle direction
    let cos_theta = 1.0 - u[1] * (1.0 - vec3_dot_vec3f(&cp, &b));
    let sin_theta = safe_sqrt(1.0 - sqr(cos_theta));
    let w = b * cos_theta + vec3_gram_schmidt(&cp, &b).normalize() * sin_theta;
    // find barycentric coordinates for sampled direction w
    let e1 = v[1] - v[0];
    let e2 = v[2] - v[0];
    let s1 = vec3_cross_vec3(&w, &e2);
    let divisor = vec3_dot_vec3f(&s1, &e1);
    if divisor == 0.0 {
        // the triangle covers (nearly) the whole hemisphere
        return Some(([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], pdf));
    }
    let inv_divisor = 1.0 / divisor;
    let s = *p - v[0];
    let mut b1 = vec3_dot_vec3f(&s, &s1) * inv_divisor;
    let mut b2 = vec3_dot_vec3f(&w, &vec3_cross_vec3(&s, &e1)) * inv_divisor;
    // return clamped barycentrics for sampled direction
    b1 = clamp_t(b1, 0.0, 1.0);
    b2 = clamp_t(b2, 0.0, 1.0);
    if b1 + b2 > 1.0 {
        let sum = b1 + b2;
        b1 /= sum;
        b2 /= sum;
    }
    Some(([1.0 - b1 - b2, b1, b2], pdf))
}

/// Recover the unit-square sample that would have produced the
/// direction w under `sample_spherical_triangle`.
pub fn invert_spherical_triangle_sample(v: &[Point3f; 3], p: &Point3f, w: &Vector3f) -> Point2f {
    use crate::core::geometry::vec3_angle_between;
    let a = (v[0] - *p).normalize();
    let b = (v[1] - *p).normalize();
    let c = (v[2] - *p).normalize();
    let center = Point2f { x: 0.5, y: 0.5 };
    let n_ab = match normalized_or_none(vec3_cross_vec3(&a, &b)) {
        Some(n) => n,
        None => return center,
    };
    let n_bc = match normalized_or_none(vec3_cross_vec3(&b, &c)) {
        Some(n) => n,
        None => return center,
    };
    let n_ca = match normalized_or_none(vec3_cross_vec3(&c, &a)) {
        Some(n) => n,
        None => return center,
    };
    let alpha = vec3_angle_between(&n_ab, &-n_ca);
    let beta = vec3_angle_between(&n_bc, &-n_ab);
    let gamma = vec3_angle_between(&n_ca, &-n_bc);
    // find vertex c' along the (a, c) arc for w
    let mut cp = vec3_cross_vec3(&vec3_cross_vec3(&b, w), &vec3_cross_vec3(&c, &a));
    if cp.length_squared() == 0.0 {
        return center;
    }
    cp = cp.normalize();
    if vec3_dot_vec3f(&cp, &(a + c)) < 0.0 {
        cp = -cp;
    }
    // invert uniform area sampling to find u0
    let u0 = if vec3_dot_vec3f(&a, &cp) > 0.999_998_5 {
        // within 0.1 degrees of a
        0.0
    } else {
        // compute area A' of subtriangle
        let n_cpb = match normalized_or_none(vec3_cross_vec3(&cp, &b)) {
            Some(n) => n,
            None => return center,
        };
        let n_acp = match normalized_or_none(vec3_cross_vec3(&a, &cp)) {
            Some(n) => n,
            None => return center,
        };
        let ap = alpha + vec3_angle_between(&n_ab, &n_cpb) + vec3_angle_between(&n_acp, &-n_cpb)
            - PI;
        // compute sample u0 that gives the area A'
        let area = alpha + beta + gamma - PI;
        ap / area
    };
    // invert arc sampling to find u1
    let u1 = (1.0 - vec3_dot_vec3f(w, &b)) / (1.0 - vec3_dot_vec3f(&cp, &b));
    Point2f {
        x: clamp_t(u0, 0.0, 1.0),
        y: clamp_t(u1, 0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::spherical_triangle_area;
    use crate::core::rng::Rng;

    #[test]
    fn uniform_triangle_barycentrics_are_valid() {
        let mut rng = Rng::new();
        rng.set_sequence(3);
        for _ in 0..1000 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let b = sample_uniform_triangle(&u);
            assert!(b[0] >= 0.0 && b[1] >= 0.0 && b[2] >= 0.0);
            assert!((b[0] + b[1] + b[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn linear_sample_inverts() {
        for &(a, b) in &[(1.0, 1.0), (0.5, 2.0), (3.0, 0.25)] {
            for i in 0..32 {
                let u = i as Float / 32.0;
                let x = sample_linear(u, a, b);
                let u2 = invert_linear_sample(x, a, b);
                assert!((u - u2).abs() < 1e-4, "a={} b={} u={} u2={}", a, b, u, u2);
            }
        }
    }

    #[test]
    fn bilinear_pdf_integrates_to_one() {
        let w = [1.0, 0.5, 2.0, 4.0];
        let n = 256;
        let mut sum = 0.0f64;
        for i in 0..n {
            for j in 0..n {
                let p = Point2f {
                    x: (i as Float + 0.5) / n as Float,
                    y: (j as Float + 0.5) / n as Float,
                };
                sum += bilinear_pdf(&p, &w) as f64;
            }
        }
        sum /= (n * n) as f64;
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn bilinear_sample_inverts() {
        let w = [0.25, 1.0, 1.5, 0.75];
        let mut rng = Rng::new();
        rng.set_sequence(11);
        for _ in 0..500 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let p = sample_bilinear(&u, &w);
            let u2 = invert_bilinear_sample(&p, &w);
            assert!((u.x - u2.x).abs() < 1e-3 && (u.y - u2.y).abs() < 1e-3);
        }
    }

    #[test]
    fn spherical_triangle_pdf_matches_subtended_area() {
        let v = [
            Point3f {
                x: 1.0,
                y: 0.0,
                z: 2.0,
            },
            Point3f {
                x: -1.0,
                y: 1.0,
                z: 2.0,
            },
            Point3f {
                x: 0.0,
                y: -1.0,
                z: 2.0,
            },
        ];
        let p = Point3f::default();
        let sa = spherical_triangle_area(
            &(v[0] - p).normalize(),
            &(v[1] - p).normalize(),
            &(v[2] - p).normalize(),
        );
        let (_, pdf) = sample_spherical_triangle(
            &v,
            &p,
            &Point2f { x: 0.3, y: 0.7 },
        )
        .unwrap();
        assert!((pdf - 1.0 / sa).abs() / pdf < 1e-3);
    }

    #[test]
    fn spherical_triangle_sample_inverts() {
        let v = [
            Point3f {
                x: 1.0,
                y: 0.1,
                z: 2.0,
            },
            Point3f {
                x: -0.8,
                y: 1.0,
                z: 2.5,
            },
            Point3f {
                x: 0.2,
                y: -1.1,
                z: 1.8,
            },
        ];
        let p = Point3f {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        let mut rng = Rng::new();
        rng.set_sequence(17);
        for _ in 0..200 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let (b, _) = sample_spherical_triangle(&v, &p, &u).unwrap();
            let ps = v[0] * b[0] + v[1] * b[1] + v[2] * b[2];
            let w = (ps - p).normalize();
            let u2 = invert_spherical_triangle_sample(&v, &p, &w);
            assert!(
                (u.x - u2.x).abs() < 5e-3 && (u.y - u2.y).abs() < 5e-3,
                "u=({}, {}) u2=({}, {})",
                u.x,
                u.y,
                u2.x,
                u2.y
            );
        }
    }

    #[test]
    fn bilinear_point_map_inverts() {
        let q = [
            Point2f { x: 0.1, y: 0.2 },
            Point2f { x: 0.9, y: 0.1 },
            Point2f { x: 0.0, y: 0.8 },
            Point2f { x: 1.0, y: 1.0 },
        ];
        let mut rng = Rng::new();
        rng.set_sequence(13);
        for _ in 0..500 {
            let uv = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            // forward map
            let p0 = q[0] * ((1.0 - uv.x) * (1.0 - uv.y));
            let p1 = q[1] * (uv.x * (1.0 - uv.y));
            let p2 = q[2] * ((1.0 - uv.x) * uv.y);
            let p3 = q[3] * (uv.x * uv.y);
            let p = p0 + p1 + p2 + p3;
            let uv2 = invert_bilinear(&p, &q);
            assert!(
                (uv.x - uv2.x).abs() < 1e-3 && (uv.y - uv2.y).abs() < 1e-3,
                "uv=({}, {}) uv2=({}, {})",
                uv.x,
                uv.y,
                uv2.x,
                uv2.y
            );
        }
    }

    #[test]
    fn concentric_disk_stays_inside_unit_circle() {
        let mut rng = Rng::new();
        rng.set_sequence(5);
        for _ in 0..1000 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let d = concentric_sample_disk(&u);
            assert!(d.x * d.x + d.y * d.y <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn cone_sampling_respects_half_angle() {
        let cos_theta_max = 0.8;
        let mut rng = Rng::new();
        rng.set_sequence(9);
        for _ in 0..1000 {
            let u = Point2f {
                x: rng.uniform_float(),
                y: rng.uniform_float(),
            };
            let w = uniform_sample_cone(&u, cos_theta_max);
            assert!(w.z >= cos_theta_max - 1e-6);
            assert!((w.length() - 1.0).abs() < 1e-5);
        }
    }
}
