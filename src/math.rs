use std::f64::consts::PI;

use rand::Rng;

/// Draws an index with probability proportional to `weights[k]`.
///
/// `total` must be the sum of `weights`; the sampler hot loop already has it.
pub fn sample_index<R: Rng>(weights: &[f64], total: f64, rng: &mut R) -> usize {
    let x = rng.gen::<f64>() * total;

    let mut sum = 0.0;
    let mut ret = weights.len() - 1;
    for (k, &w) in weights.iter().enumerate() {
        sum += w;
        if x < sum {
            ret = k;
            break;
        }
    }
    ret
}

// The implementation is based on "[Algorithm AS 103] Psi (Digamma) Function",
// José-Miguel Bernardo, Applied Statistics, Volume 25, pp. 315--317, 1976.
// http://www.uv.es/~bernardo/1976AppStatist.pdf
//
// Precision was improved based on the implementations from the following materials:
// https://github.com/bos/math-functions/blob/master/Numeric/SpecFunctions/Internal.hs
// https://github.com/lawrennd/gca/blob/master/matlab/digamma.m
pub fn digamma(x: f64) -> f64 {
    const S:  f64 = 1e-6;
    const C:  f64 = 12.0;
    const S3: f64 = 1.0 / 12.0;
    const S4: f64 = 1.0 / 120.0;
    const S5: f64 = 1.0 / 252.0;
    const S6: f64 = 1.0 / 240.0;
    const S7: f64 = 1.0 / 132.0;
    const DIGAMMA1: f64 = -0.5772156649015328606065120;
    const TRIGAMMA1: f64 = PI * PI / 6.0;

    if x == f64::NEG_INFINITY || f64::is_nan(x) {
        f64::NAN
    }
    else if x <= 0.0 && f64::floor(x) == x {
        // x is zero or a negative integer
        f64::NAN
    }
    else if x < 0.0 {
        // Reflection: psi(1 - x) - psi(x) = pi * cot(pi * x)
        digamma(1.0 - x) + PI / f64::tan(-PI * x)
    }
    else if x <= S {
        DIGAMMA1 - 1.0 / x + TRIGAMMA1 * x
    }
    else {
        // Reduce to digamma(x + n), where y = x + n >= C
        let mut result = 0.0;
        let mut y = x;
        while y < C {
            // psi(x + 1) = psi(x) + 1 / x
            result -= 1.0 / y;
            y += 1.0;
        }
        let mut r = 1.0 / y;
        result += f64::ln(y) - 0.5 * r;
        r = r * r;
        result - r * (S3 - r * (S4 - r * (S5 - r * (S6 - r * S7))))
    }
}

// Lanczos approximation with g = 7, n = 9.
const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural logarithm of the gamma function for `x > 0`.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection: Gamma(x) Gamma(1 - x) = pi / sin(pi * x)
        f64::ln(PI / f64::sin(PI * x)) - ln_gamma(1.0 - x)
    }
    else {
        let x = x - 1.0;
        let t = x + LANCZOS_G + 0.5;
        let mut a = LANCZOS_COEFFS[0];
        for (i, &c) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        0.5 * f64::ln(2.0 * PI) + (x + 0.5) * f64::ln(t) - t + f64::ln(a)
    }
}
