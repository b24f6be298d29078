//! Points, vectors, normals, rays, and axis-aligned bounding boxes,
//! together with the spherical geometry helpers the sampling code is
//! built on. Normals are kept as their own type: they transform with the
//! inverse transpose and are not interchangeable with vectors.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub};

use crate::core::glint::{next_float_down, next_float_up, safe_asin, Float};

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector2f {
    pub x: Float,
    pub y: Float,
}

impl Vector2f {
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
}

impl Index<usize> for Vector2f {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            _ => &self.y,
        }
    }
}

impl Add for Vector2f {
    type Output = Vector2f;
    fn add(self, rhs: Vector2f) -> Vector2f {
        Vector2f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point2f {
    pub x: Float,
    pub y: Float,
}

impl Index<usize> for Point2f {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            _ => &self.y,
        }
    }
}

impl Add<Point2f> for Point2f {
    type Output = Point2f;
    fn add(self, rhs: Point2f) -> Point2f {
        Point2f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Add<Vector2f> for Point2f {
    type Output = Point2f;
    fn add(self, rhs: Vector2f) -> Point2f {
        Point2f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub<Point2f> for Point2f {
    type Output = Vector2f;
    fn sub(self, rhs: Point2f) -> Vector2f {
        Vector2f {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Sub<Vector2f> for Point2f {
    type Output = Point2f;
    fn sub(self, rhs: Vector2f) -> Point2f {
        Point2f {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<Float> for Point2f {
    type Output = Point2f;
    fn mul(self, rhs: Float) -> Point2f {
        Point2f {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

pub fn pnt2_lerp(t: Float, p0: &Point2f, p1: &Point2f) -> Point2f {
    *p0 * (1.0 as Float - t) + *p1 * t
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn abs(&self) -> Vector3f {
        Vector3f {
            x: self.x.abs(),
            y: self.y.abs(),
            z: self.z.abs(),
        }
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }
}

impl Index<usize> for Vector3f {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl Add for Vector3f {
    type Output = Vector3f;
    fn add(self, rhs: Vector3f) -> Vector3f {
        Vector3f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for Vector3f {
    fn add_assign(&mut self, rhs: Vector3f) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vector3f {
    type Output = Vector3f;
    fn sub(self, rhs: Vector3f) -> Vector3f {
        Vector3f {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<Float> for Vector3f {
    type Output = Vector3f;
    fn mul(self, rhs: Float) -> Vector3f {
        Vector3f {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Div<Float> for Vector3f {
    type Output = Vector3f;
    fn div(self, rhs: Float) -> Vector3f {
        let inv = 1.0 as Float / rhs;
        Vector3f {
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
        }
    }
}

impl Neg for Vector3f {
    type Output = Vector3f;
    fn neg(self) -> Vector3f {
        Vector3f {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl From<Point3f> for Vector3f {
    fn from(p: Point3f) -> Self {
        Vector3f {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Self {
        Vector3f {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }
}

pub fn vec3_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    v1.x * v2.x + v1.y * v2.y + v1.z * v2.z
}

pub fn vec3_dot_nrmf(v1: &Vector3f, n2: &Normal3f) -> Float {
    v1.x * n2.x + v1.y * n2.y + v1.z * n2.z
}

pub fn vec3_abs_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    vec3_dot_vec3f(v1, v2).abs()
}

/// The cross product is computed in f64 to protect against catastrophic
/// cancellation for nearly parallel operands.
pub fn vec3_cross_vec3(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    let v1x = v1.x as f64;
    let v1y = v1.y as f64;
    let v1z = v1.z as f64;
    let v2x = v2.x as f64;
    let v2y = v2.y as f64;
    let v2z = v2.z as f64;
    Vector3f {
        x: (v1y * v2z - v1z * v2y) as Float,
        y: (v1z * v2x - v1x * v2z) as Float,
        z: (v1x * v2y - v1y * v2x) as Float,
    }
}

pub fn vec3_cross_nrm(v1: &Vector3f, n2: &Normal3f) -> Vector3f {
    vec3_cross_vec3(v1, &Vector3f::from(*n2))
}

pub fn nrm_cross_vec3(n1: &Normal3f, v2: &Vector3f) -> Vector3f {
    vec3_cross_vec3(&Vector3f::from(*n1), v2)
}

pub fn vec3_max_componentf(v: &Vector3f) -> Float {
    v.x.max(v.y.max(v.z))
}

pub fn vec3_max_dimensionf(v: &Vector3f) -> usize {
    if v.x > v.y {
        if v.x > v.z {
            0
        } else {
            2
        }
    } else if v.y > v.z {
        1
    } else {
        2
    }
}

pub fn vec3_permutef(v: &Vector3f, x: usize, y: usize, z: usize) -> Vector3f {
    Vector3f {
        x: v[x],
        y: v[y],
        z: v[z],
    }
}

/// Construct a local coordinate system given only a single normalized
/// vector.
pub fn vec3_coordinate_system(v1: &Vector3f, v2: &mut Vector3f, v3: &mut Vector3f) {
    if v1.x.abs() > v1.y.abs() {
        *v2 = Vector3f {
            x: -v1.z,
            y: 0.0,
            z: v1.x,
        } / (v1.x * v1.x + v1.z * v1.z).sqrt();
    } else {
        *v2 = Vector3f {
            x: 0.0,
            y: v1.z,
            z: -v1.y,
        } / (v1.y * v1.y + v1.z * v1.z).sqrt();
    }
    *v3 = vec3_cross_vec3(v1, v2);
}

/// Angle between two unit vectors, computed in a form that stays
/// accurate for nearly parallel and nearly opposite operands.
pub fn vec3_angle_between(v1: &Vector3f, v2: &Vector3f) -> Float {
    if vec3_dot_vec3f(v1, v2) < 0.0 {
        PI - 2.0 * safe_asin((*v1 + *v2).length() / 2.0)
    } else {
        2.0 * safe_asin((*v2 - *v1).length() / 2.0)
    }
}

/// Remove from v its component parallel to the unit vector w.
pub fn vec3_gram_schmidt(v: &Vector3f, w: &Vector3f) -> Vector3f {
    *v - *w * vec3_dot_vec3f(v, w)
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub fn abs(&self) -> Point3f {
        Point3f {
            x: self.x.abs(),
            y: self.y.abs(),
            z: self.z.abs(),
        }
    }
}

impl Index<usize> for Point3f {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl Add<Point3f> for Point3f {
    type Output = Point3f;
    fn add(self, rhs: Point3f) -> Point3f {
        Point3f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Add<Vector3f> for Point3f {
    type Output = Point3f;
    fn add(self, rhs: Vector3f) -> Point3f {
        Point3f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub<Point3f> for Point3f {
    type Output = Vector3f;
    fn sub(self, rhs: Point3f) -> Vector3f {
        Vector3f {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Sub<Vector3f> for Point3f {
    type Output = Point3f;
    fn sub(self, rhs: Vector3f) -> Point3f {
        Point3f {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<Float> for Point3f {
    type Output = Point3f;
    fn mul(self, rhs: Float) -> Point3f {
        Point3f {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl MulAssign<Float> for Point3f {
    fn mul_assign(&mut self, rhs: Float) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl Div<Float> for Point3f {
    type Output = Point3f;
    fn div(self, rhs: Float) -> Point3f {
        let inv = 1.0 as Float / rhs;
        Point3f {
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
        }
    }
}

impl From<Vector3f> for Point3f {
    fn from(v: Vector3f) -> Self {
        Point3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

pub fn pnt3_permutef(p: &Point3f, x: usize, y: usize, z: usize) -> Point3f {
    Point3f {
        x: p[x],
        y: p[y],
        z: p[z],
    }
}

pub fn pnt3_lerp(t: Float, p0: &Point3f, p1: &Point3f) -> Point3f {
    *p0 * (1.0 as Float - t) + *p1 * t
}

pub fn pnt3_distancef(p1: &Point3f, p2: &Point3f) -> Float {
    (*p1 - *p2).length()
}

pub fn pnt3_distance_squaredf(p1: &Point3f, p2: &Point3f) -> Float {
    (*p1 - *p2).length_squared()
}

/// Offset a spawned ray's origin along the surface normal, past the
/// conservative error bounds of the starting point, and round the result
/// away from the surface.
pub fn pnt3_offset_ray_origin(
    p: &Point3f,
    p_error: &Vector3f,
    n: &Normal3f,
    w: &Vector3f,
) -> Point3f {
    let d: Float = vec3_dot_vec3f(&Vector3f::from(*n).abs(), p_error);
    let mut offset: Vector3f = Vector3f::from(*n) * d;
    if vec3_dot_nrmf(w, n) < 0.0 {
        offset = -offset;
    }
    let mut po: Point3f = *p + offset;
    if offset.x > 0.0 {
        po.x = next_float_up(po.x);
    } else if offset.x < 0.0 {
        po.x = next_float_down(po.x);
    }
    if offset.y > 0.0 {
        po.y = next_float_up(po.y);
    } else if offset.y < 0.0 {
        po.y = next_float_down(po.y);
    }
    if offset.z > 0.0 {
        po.z = next_float_up(po.z);
    } else if offset.z < 0.0 {
        po.z = next_float_down(po.z);
    }
    po
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Normal3f {
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    pub fn normalize(&self) -> Normal3f {
        let l = self.length();
        Normal3f {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }
}

impl Add for Normal3f {
    type Output = Normal3f;
    fn add(self, rhs: Normal3f) -> Normal3f {
        Normal3f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Normal3f {
    type Output = Normal3f;
    fn sub(self, rhs: Normal3f) -> Normal3f {
        Normal3f {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<Float> for Normal3f {
    type Output = Normal3f;
    fn mul(self, rhs: Float) -> Normal3f {
        Normal3f {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl MulAssign<Float> for Normal3f {
    fn mul_assign(&mut self, rhs: Float) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl Neg for Normal3f {
    type Output = Normal3f;
    fn neg(self) -> Normal3f {
        Normal3f {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Self {
        Normal3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

pub fn nrm_dot_nrmf(n1: &Normal3f, n2: &Normal3f) -> Float {
    n1.x * n2.x + n1.y * n2.y + n1.z * n2.z
}

pub fn nrm_dot_vec3f(n1: &Normal3f, v2: &Vector3f) -> Float {
    n1.x * v2.x + n1.y * v2.y + n1.z * v2.z
}

pub fn nrm_abs_dot_vec3f(n1: &Normal3f, v2: &Vector3f) -> Float {
    nrm_dot_vec3f(n1, v2).abs()
}

/// Flip a normal so it lies in the same hemisphere as another normal.
pub fn nrm_faceforward_nrm(n: &Normal3f, n2: &Normal3f) -> Normal3f {
    if nrm_dot_nrmf(n, n2) < 0.0 {
        -(*n)
    } else {
        *n
    }
}

/// Flip a normal so it lies in the same hemisphere as a vector.
pub fn nrm_faceforward_vec3(n: &Normal3f, v: &Vector3f) -> Normal3f {
    if nrm_dot_vec3f(n, v) < 0.0 {
        -(*n)
    } else {
        *n
    }
}

/// A direction from spherical coordinates, in the frame where theta is
/// measured from the +z axis.
pub fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float) -> Vector3f {
    Vector3f {
        x: sin_theta * phi.cos(),
        y: sin_theta * phi.sin(),
        z: cos_theta,
    }
}

pub fn spherical_direction_vec3(
    sin_theta: Float,
    cos_theta: Float,
    phi: Float,
    x: &Vector3f,
    y: &Vector3f,
    z: &Vector3f,
) -> Vector3f {
    *x * (sin_theta * phi.cos()) + *y * (sin_theta * phi.sin()) + *z * cos_theta
}

/// Solid angle of the spherical triangle with unit-vector vertices a, b,
/// c (Van Oosterom-Strang).
pub fn spherical_triangle_area(a: &Vector3f, b: &Vector3f, c: &Vector3f) -> Float {
    (2.0 as Float
        * vec3_dot_vec3f(a, &vec3_cross_vec3(b, c)).atan2(
            1.0 as Float + vec3_dot_vec3f(a, b) + vec3_dot_vec3f(a, c) + vec3_dot_vec3f(b, c),
        ))
    .abs()
}

#[derive(Debug, Copy, Clone)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Self {
        // an inverted box unions correctly with the first point
        Bounds3f {
            p_min: Point3f {
                x: f32::INFINITY,
                y: f32::INFINITY,
                z: f32::INFINITY,
            },
            p_max: Point3f {
                x: f32::NEG_INFINITY,
                y: f32::NEG_INFINITY,
                z: f32::NEG_INFINITY,
            },
        }
    }
}

impl Bounds3f {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Bounds3f {
            p_min: Point3f {
                x: p1.x.min(p2.x),
                y: p1.y.min(p2.y),
                z: p1.z.min(p2.z),
            },
            p_max: Point3f {
                x: p1.x.max(p2.x),
                y: p1.y.max(p2.y),
                z: p1.z.max(p2.z),
            },
        }
    }
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }
    pub fn corner(&self, i: usize) -> Point3f {
        Point3f {
            x: if i & 1 != 0 { self.p_max.x } else { self.p_min.x },
            y: if i & 2 != 0 { self.p_max.y } else { self.p_min.y },
            z: if i & 4 != 0 { self.p_max.z } else { self.p_min.z },
        }
    }
}

pub fn bnd3_union_pnt3(b: &Bounds3f, p: &Point3f) -> Bounds3f {
    Bounds3f {
        p_min: Point3f {
            x: b.p_min.x.min(p.x),
            y: b.p_min.y.min(p.y),
            z: b.p_min.z.min(p.z),
        },
        p_max: Point3f {
            x: b.p_max.x.max(p.x),
            y: b.p_max.y.max(p.y),
            z: b.p_max.z.max(p.z),
        },
    }
}

pub fn bnd3_union_bnd3(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    Bounds3f {
        p_min: Point3f {
            x: b1.p_min.x.min(b2.p_min.x),
            y: b1.p_min.y.min(b2.p_min.y),
            z: b1.p_min.z.min(b2.p_min.z),
        },
        p_max: Point3f {
            x: b1.p_max.x.max(b2.p_max.x),
            y: b1.p_max.y.max(b2.p_max.y),
            z: b1.p_max.z.max(b2.p_max.z),
        },
    }
}

pub fn bnd3_expand(b: &Bounds3f, delta: Float) -> Bounds3f {
    let d = Vector3f {
        x: delta,
        y: delta,
        z: delta,
    };
    Bounds3f {
        p_min: b.p_min - d,
        p_max: b.p_max + d,
    }
}

pub fn pnt3_inside_bnd3f(p: &Point3f, b: &Bounds3f) -> bool {
    p.x >= b.p_min.x
        && p.x <= b.p_max.x
        && p.y >= b.p_min.y
        && p.y <= b.p_max.y
        && p.z >= b.p_min.z
        && p.z <= b.p_max.z
}

/// Rays are parameterized by o + t*d for t >= 0; the direction is not
/// required to be of unit length. The medium is an index into a
/// caller-owned media table.
#[derive(Debug, Default, Copy, Clone)]
pub struct Ray {
    pub o: Point3f,
    pub d: Vector3f,
    pub time: Float,
    pub medium: Option<usize>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, time: Float) -> Self {
        Ray {
            o,
            d,
            time,
            medium: None,
        }
    }
    pub fn position(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

/// A bounding cone of directions: axis w and the cosine of the cone's
/// half-angle.
#[derive(Debug, Copy, Clone)]
pub struct DirectionCone {
    pub w: Vector3f,
    pub cos_theta: Float,
}

impl DirectionCone {
    /// The degenerate cone of a single direction.
    pub fn new(w: Vector3f) -> Self {
        DirectionCone { w, cos_theta: 1.0 }
    }
    pub fn new_with_angle(w: Vector3f, cos_theta: Float) -> Self {
        DirectionCone { w, cos_theta }
    }
    pub fn entire_sphere() -> Self {
        DirectionCone {
            w: Vector3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
            cos_theta: -1.0,
        }
    }
    pub fn contains(&self, w: &Vector3f) -> bool {
        // a hair of slack keeps directions right on the boundary inside
        let cos_eps: Float = 1e-5;
        vec3_dot_vec3f(&self.w, &w.normalize()) >= self.cos_theta - cos_eps
    }
}
