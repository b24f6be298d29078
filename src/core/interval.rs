//! Interval arithmetic for running error analysis: instead of working
//! out error bounds algebraically, every operation keeps a conservative
//! [low, high] bracket around the exact real value, rounded outward one
//! ulp per operation. The quadric intersection routines solve their
//! quadratics entirely in intervals so that a hit is only accepted when
//! the whole bracket passes the t-range tests.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::core::geometry::{Point3f, Vector3f};
use crate::core::glint::{next_float_down, next_float_up, Float};

/// A closed interval [low, high] guaranteed to contain the exact value.
#[derive(Debug, Default, Copy, Clone)]
pub struct Interval {
    pub low: Float,
    pub high: Float,
}

impl Interval {
    pub fn new(low: Float, high: Float) -> Self {
        Interval {
            low: low.min(high),
            high: low.max(high),
        }
    }
    pub fn from_value_and_error(v: Float, err: Float) -> Self {
        if err == 0.0 {
            Interval { low: v, high: v }
        } else {
            // round outward so the bracket stays conservative
            Interval {
                low: next_float_down(v - err),
                high: next_float_up(v + err),
            }
        }
    }
    pub fn lower_bound(&self) -> Float {
        self.low
    }
    pub fn upper_bound(&self) -> Float {
        self.high
    }
    /// The (F) cast: collapse the interval to its midpoint.
    pub fn midpoint(&self) -> Float {
        (self.low + self.high) * 0.5
    }
    pub fn width(&self) -> Float {
        self.high - self.low
    }
    pub fn contains(&self, v: Float) -> bool {
        v >= self.low && v <= self.high
    }
    pub fn sqr(&self) -> Interval {
        let alow = self.low.abs();
        let ahigh = self.high.abs();
        let (mut alow, mut ahigh) = if alow > ahigh {
            (ahigh, alow)
        } else {
            (alow, ahigh)
        };
        if self.contains(0.0) {
            alow = 0.0;
            ahigh = ahigh.max(0.0);
        }
        Interval {
            low: next_float_down(alow * alow),
            high: next_float_up(ahigh * ahigh),
        }
    }
    /// Square root over nonnegative intervals; negative lower bounds
    /// produced by rounding are clamped to zero.
    pub fn sqrt(&self) -> Interval {
        Interval {
            low: next_float_down(self.low.max(0.0).sqrt()),
            high: next_float_up(self.high.max(0.0).sqrt()),
        }
    }
}

impl From<Float> for Interval {
    fn from(v: Float) -> Self {
        Interval { low: v, high: v }
    }
}

impl PartialEq for Interval {
    fn eq(&self, rhs: &Interval) -> bool {
        self.low == rhs.low && self.high == rhs.high
    }
}

impl Add for Interval {
    type Output = Interval;
    fn add(self, rhs: Interval) -> Interval {
        Interval {
            low: next_float_down(self.low + rhs.low),
            high: next_float_up(self.high + rhs.high),
        }
    }
}

impl Sub for Interval {
    type Output = Interval;
    fn sub(self, rhs: Interval) -> Interval {
        Interval {
            low: next_float_down(self.low - rhs.high),
            high: next_float_up(self.high - rhs.low),
        }
    }
}

impl Mul for Interval {
    type Output = Interval;
    fn mul(self, rhs: Interval) -> Interval {
        let prod: [Float; 4] = [
            self.low * rhs.low,
            self.high * rhs.low,
            self.low * rhs.high,
            self.high * rhs.high,
        ];
        Interval {
            low: next_float_down(prod[0].min(prod[1]).min(prod[2].min(prod[3]))),
            high: next_float_up(prod[0].max(prod[1]).max(prod[2].max(prod[3]))),
        }
    }
}

impl Div for Interval {
    type Output = Interval;
    fn div(self, rhs: Interval) -> Interval {
        if rhs.low < 0.0 && rhs.high > 0.0 {
            // the divisor straddles zero, so the quotient can be anything
            return Interval {
                low: f32::NEG_INFINITY,
                high: f32::INFINITY,
            };
        }
        let quot: [Float; 4] = [
            self.low / rhs.low,
            self.high / rhs.low,
            self.low / rhs.high,
            self.high / rhs.high,
        ];
        Interval {
            low: next_float_down(quot[0].min(quot[1]).min(quot[2].min(quot[3]))),
            high: next_float_up(quot[0].max(quot[1]).max(quot[2].max(quot[3]))),
        }
    }
}

impl Neg for Interval {
    type Output = Interval;
    fn neg(self) -> Interval {
        Interval {
            low: -self.high,
            high: -self.low,
        }
    }
}

impl Add<Float> for Interval {
    type Output = Interval;
    fn add(self, rhs: Float) -> Interval {
        self + Interval::from(rhs)
    }
}

impl Sub<Float> for Interval {
    type Output = Interval;
    fn sub(self, rhs: Float) -> Interval {
        self - Interval::from(rhs)
    }
}

impl Mul<Float> for Interval {
    type Output = Interval;
    fn mul(self, rhs: Float) -> Interval {
        self * Interval::from(rhs)
    }
}

impl Mul<Interval> for Float {
    type Output = Interval;
    fn mul(self, rhs: Interval) -> Interval {
        Interval::from(self) * rhs
    }
}

impl Div<Float> for Interval {
    type Output = Interval;
    fn div(self, rhs: Float) -> Interval {
        self / Interval::from(rhs)
    }
}

pub fn interval_sum_squares2(a: Interval, b: Interval) -> Interval {
    a.sqr() + b.sqr()
}

pub fn interval_sum_squares3(a: Interval, b: Interval, c: Interval) -> Interval {
    a.sqr() + b.sqr() + c.sqr()
}

/// A point whose coordinates carry per-axis error bounds.
#[derive(Debug, Default, Copy, Clone)]
pub struct Point3fi {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Point3fi {
    pub fn from_point(p: &Point3f) -> Self {
        Point3fi {
            x: Interval::from(p.x),
            y: Interval::from(p.y),
            z: Interval::from(p.z),
        }
    }
    pub fn from_point_and_error(p: &Point3f, e: &Vector3f) -> Self {
        Point3fi {
            x: Interval::from_value_and_error(p.x, e.x),
            y: Interval::from_value_and_error(p.y, e.y),
            z: Interval::from_value_and_error(p.z, e.z),
        }
    }
    pub fn midpoint(&self) -> Point3f {
        Point3f {
            x: self.x.midpoint(),
            y: self.y.midpoint(),
            z: self.z.midpoint(),
        }
    }
    pub fn error(&self) -> Vector3f {
        Vector3f {
            x: self.x.width() * 0.5,
            y: self.y.width() * 0.5,
            z: self.z.width() * 0.5,
        }
    }
    pub fn is_exact(&self) -> bool {
        self.x.width() == 0.0 && self.y.width() == 0.0 && self.z.width() == 0.0
    }
}

impl Sub<Vector3fi> for Point3fi {
    type Output = Point3fi;
    fn sub(self, rhs: Vector3fi) -> Point3fi {
        Point3fi {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// A direction whose coordinates carry per-axis error bounds.
#[derive(Debug, Default, Copy, Clone)]
pub struct Vector3fi {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Vector3fi {
    pub fn from_vector(v: &Vector3f) -> Self {
        Vector3fi {
            x: Interval::from(v.x),
            y: Interval::from(v.y),
            z: Interval::from(v.z),
        }
    }
    pub fn from_vector_and_error(v: &Vector3f, e: &Vector3f) -> Self {
        Vector3fi {
            x: Interval::from_value_and_error(v.x, e.x),
            y: Interval::from_value_and_error(v.y, e.y),
            z: Interval::from_value_and_error(v.z, e.z),
        }
    }
    pub fn midpoint(&self) -> Vector3f {
        Vector3f {
            x: self.x.midpoint(),
            y: self.y.midpoint(),
            z: self.z.midpoint(),
        }
    }
}

impl Mul<Interval> for Vector3fi {
    type Output = Vector3fi;
    fn mul(self, rhs: Interval) -> Vector3fi {
        Vector3fi {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_exact(i: Interval, exact: f64) -> bool {
        (i.low as f64) <= exact && exact <= (i.high as f64)
    }

    #[test]
    fn arithmetic_stays_conservative() {
        let a = Interval::from_value_and_error(0.1, 1e-5);
        let b = Interval::from_value_and_error(0.3, 1e-5);
        let exact_a = 0.1_f32 as f64;
        let exact_b = 0.3_f32 as f64;
        assert!(contains_exact(a + b, exact_a + exact_b));
        assert!(contains_exact(a - b, exact_a - exact_b));
        assert!(contains_exact(a * b, exact_a * exact_b));
        assert!(contains_exact(a / b, exact_a / exact_b));
        assert!(contains_exact(a.sqr(), exact_a * exact_a));
        assert!(contains_exact(a.sqrt(), exact_a.sqrt()));
    }

    #[test]
    fn division_by_straddling_interval() {
        let a = Interval::from(1.0);
        let b = Interval::new(-0.5, 0.5);
        let q = a / b;
        assert_eq!(q.low, f32::NEG_INFINITY);
        assert_eq!(q.high, f32::INFINITY);
    }

    #[test]
    fn squaring_straddling_interval_is_nonnegative() {
        let i = Interval::new(-2.0, 1.0);
        let s = i.sqr();
        assert_eq!(s.low, 0.0);
        assert!(s.high >= 4.0);
    }

    #[test]
    fn point_error_roundtrip() {
        let p = Point3f {
            x: 1.0,
            y: -2.0,
            z: 3.0,
        };
        let e = Vector3f {
            x: 1e-4,
            y: 2e-4,
            z: 0.0,
        };
        let pi = Point3fi::from_point_and_error(&p, &e);
        let err = pi.error();
        assert!(err.x >= 1e-4 && err.y >= 2e-4);
        assert_eq!(err.z, 0.0);
        let m = pi.midpoint();
        assert!((m.x - p.x).abs() <= err.x);
    }
}
