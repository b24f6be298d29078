//! Global constants and the small floating-point utilities everything
//! else builds on: error bounds, bit-level float stepping, safe inverse
//! trigonometry, and the fused-multiply-add helpers used wherever a
//! determinant or discriminant would otherwise subtract near-equal
//! products.

use std::f32::consts::PI;

pub type Float = f32;

pub const MACHINE_EPSILON: Float = f32::EPSILON * 0.5;
pub const ONE_MINUS_EPSILON: Float = 1.0 - f32::EPSILON / 2.0;
pub const INV_PI: Float = 0.318_309_886_183_790_671_54;
pub const INV_2_PI: Float = 0.159_154_943_091_895_335_77;
pub const INV_4_PI: Float = 0.079_577_471_545_947_667_88;
pub const PI_OVER_2: Float = 1.570_796_326_794_896_619_23;
pub const PI_OVER_4: Float = 0.785_398_163_397_448_309_61;

pub fn float_to_bits(f: f32) -> u32 {
    f.to_bits()
}

pub fn bits_to_float(ui: u32) -> f32 {
    f32::from_bits(ui)
}

/// Bump a floating-point value up to the next greater representable
/// floating-point value.
pub fn next_float_up(v: f32) -> f32 {
    if v.is_infinite() && v > 0.0 {
        return v;
    }
    let v = if v == -0.0 { 0.0 } else { v };
    let mut ui: u32 = float_to_bits(v);
    if v >= 0.0 {
        ui += 1;
    } else {
        ui -= 1;
    }
    bits_to_float(ui)
}

/// Bump a floating-point value down to the next smaller representable
/// floating-point value.
pub fn next_float_down(v: f32) -> f32 {
    if v.is_infinite() && v < 0.0 {
        return v;
    }
    let v = if v == 0.0 { -0.0 } else { v };
    let mut ui: u32 = float_to_bits(v);
    if v > 0.0 {
        ui -= 1;
    } else {
        ui += 1;
    }
    bits_to_float(ui)
}

/// Conservative bound on the relative error after n dependent
/// floating-point operations.
pub fn gamma(n: i32) -> Float {
    (n as Float * MACHINE_EPSILON) / (1.0 - n as Float * MACHINE_EPSILON)
}

/// Clamp the given value *val* to lie between the values *low* and *high*.
pub fn clamp_t<T>(val: T, low: T, high: T) -> T
where
    T: PartialOrd,
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Interpolate linearly between two provided values.
pub fn lerp(t: Float, v1: Float, v2: Float) -> Float {
    (1.0 as Float - t) * v1 + t * v2
}

pub fn sqr(v: Float) -> Float {
    v * v
}

/// Convert from angles expressed in degrees to radians.
pub fn radians(deg: Float) -> Float {
    (PI / 180.0) * deg
}

/// Convert from angles expressed in radians to degrees.
pub fn degrees(rad: Float) -> Float {
    (180.0 / PI) * rad
}

/// sqrt() that tolerates slightly negative arguments produced by
/// floating-point rounding.
pub fn safe_sqrt(x: Float) -> Float {
    x.max(0.0).sqrt()
}

/// asin() clamped against arguments drifting just outside [-1, 1].
pub fn safe_asin(x: Float) -> Float {
    clamp_t(x, -1.0, 1.0).asin()
}

/// acos() clamped against arguments drifting just outside [-1, 1].
pub fn safe_acos(x: Float) -> Float {
    clamp_t(x, -1.0, 1.0).acos()
}

/// Compute a * b - c * d to within two ulps using fused multiply-adds
/// to compensate the rounding of the intermediate product.
pub fn difference_of_products(a: Float, b: Float, c: Float, d: Float) -> Float {
    let cd = c * d;
    let dop = a.mul_add(b, -cd);
    let err = (-c).mul_add(d, cd);
    dop + err
}

/// Compute a * b + c * d with the same compensation.
pub fn sum_of_products(a: Float, b: Float, c: Float, d: Float) -> Float {
    difference_of_products(a, b, -c, d)
}

/// Round an integer-valued float down to the exponent of its binary
/// representation, with an add so the result rounds to nearest.
pub fn log2_int(v: Float) -> i32 {
    if v < 1.0 {
        return 0;
    }
    let bits = float_to_bits(v) as i32;
    (bits >> 23) - 127 + if (bits & (1 << 22)) != 0 { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_float_brackets() {
        let v: Float = 1.0;
        assert!(next_float_up(v) > v);
        assert!(next_float_down(v) < v);
        assert_eq!(next_float_up(next_float_down(v)), v);
        // infinities are fixed points
        assert_eq!(next_float_up(f32::INFINITY), f32::INFINITY);
        assert_eq!(next_float_down(f32::NEG_INFINITY), f32::NEG_INFINITY);
    }

    #[test]
    fn difference_of_products_cancellation() {
        // catastrophic cancellation case: a*b and c*d nearly equal
        let a = 33962.035;
        let b = -30438.8;
        let c = 41563.4;
        let d = -24871.969;
        let exact = (a as f64) * (b as f64) - (c as f64) * (d as f64);
        let dop = difference_of_products(a, b, c, d);
        assert!((dop as f64 - exact).abs() / exact.abs() < 1e-6);
    }

    #[test]
    fn safe_trig_domain() {
        assert_eq!(safe_acos(1.0 + 1e-7), 0.0);
        assert_eq!(safe_sqrt(-1e-8), 0.0);
        assert!((safe_asin(-1.0 - 1e-7) + PI_OVER_2).abs() < 1e-6);
    }
}
