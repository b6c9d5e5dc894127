// Distributions: special functions behind the hypothesis tests in `stat`

use std::f64::consts::PI;

const EPS: f64 = 3.0e-16;
const FPMIN: f64 = 1.0e-300;
const MAX_ITER: usize = 500;

// ============================================================================
// SPECIAL FUNCTIONS
// ============================================================================

const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the gamma function (Lanczos, g = 7)
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection
        return (PI / (PI * x).sin().abs()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + 7.5;
    let mut a = LANCZOS[0];
    for (i, c) in LANCZOS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// ln C(n, k)
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

fn guard(v: f64) -> f64 {
    if v.abs() < FPMIN {
        FPMIN
    } else {
        v
    }
}

fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta I_x(a, b)
pub fn betai(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_cf(a, b, x) / a
    } else {
        1.0 - front * beta_cf(b, a, 1.0 - x) / b
    }
}

fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut del = sum;
    for _ in 0..MAX_ITER {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn gamma_cf(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..MAX_ITER {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = 1.0 / guard(an * d + b);
        c = guard(b + an / c);
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Regularized lower incomplete gamma P(a, x)
pub fn gammp(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_cf(a, x)
    }
}

/// Regularized upper incomplete gamma Q(a, x)
pub fn gammq(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        1.0
    } else if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_cf(a, x)
    }
}

pub fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        1.0 + gammp(0.5, x * x)
    } else {
        gammq(0.5, x * x)
    }
}

// ============================================================================
// DISTRIBUTIONS
// ============================================================================

pub fn norm_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

pub fn norm_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

fn norm_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// P(T > t) for Student's t with `df` degrees of freedom
pub fn t_sf(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    let tail = 0.5 * betai(df / 2.0, 0.5, df / (df + t * t));
    if t >= 0.0 {
        tail
    } else {
        1.0 - tail
    }
}

pub fn t_cdf(t: f64, df: f64) -> f64 {
    1.0 - t_sf(t, df)
}

/// Two-sided p-value for a t statistic
pub fn t_two_sided(t: f64, df: f64) -> f64 {
    (2.0 * t_sf(t.abs(), df)).min(1.0)
}

/// P(F > f) for the F distribution
pub fn f_sf(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() || d1 <= 0.0 || d2 <= 0.0 {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    betai(d2 / 2.0, d1 / 2.0, d2 / (d2 + d1 * f))
}

/// Hypergeometric pmf: `k` successes in `n` draws from `total` items with `good` successes
pub fn hypergeom_pmf(k: u64, total: u64, good: u64, n: u64) -> f64 {
    if k > good || k > n || n - k > total - good {
        return 0.0;
    }
    (ln_choose(good, k) + ln_choose(total - good, n - k) - ln_choose(total, n)).exp()
}

// ============================================================================
// STUDENTIZED RANGE
// ============================================================================

const RANGE_STEPS: usize = 300;

fn simpson<F: Fn(f64) -> f64>(lo: f64, hi: f64, steps: usize, f: F) -> f64 {
    let h = (hi - lo) / steps as f64;
    let mut sum = 0.0;
    for i in 0..=steps {
        let weight = if i == 0 || i == steps {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        sum += weight * f(lo + i as f64 * h);
    }
    sum * h / 3.0
}

/// P(range of k standard normals <= w)
fn normal_range_cdf(w: f64, k: usize) -> f64 {
    let k_f = k as f64;
    k_f * simpson(-8.0, 8.0, RANGE_STEPS, |z| {
        norm_pdf(z) * (norm_cdf(z) - norm_cdf(z - w)).powi(k as i32 - 1)
    })
}

/// Survival function of the studentized range: P(Q > q) for `k` groups and `df`
/// error degrees of freedom. Integrates the normal range over the scaled chi density.
pub fn ptukey_sf(q: f64, k: usize, df: f64) -> f64 {
    if q.is_nan() || k < 2 || df <= 0.0 {
        return f64::NAN;
    }
    if q <= 0.0 {
        return 1.0;
    }
    let spread = 8.0 / (2.0 * df).sqrt();
    let lo = (1.0 - spread).max(0.0);
    let hi = 1.0 + 1.5 * spread;
    let log_norm = (df / 2.0) * df.ln() - ln_gamma(df / 2.0) - (df / 2.0 - 1.0) * 2f64.ln();
    let cdf = simpson(lo, hi, RANGE_STEPS, |s| {
        if s <= 0.0 {
            return 0.0;
        }
        let density = (log_norm + (df - 1.0) * s.ln() - df * s * s / 2.0).exp();
        density * normal_range_cdf(q * s, k)
    });
    (1.0 - cdf).clamp(0.0, 1.0)
}
