// SPDX: CC0-1.0

//! Roots of polynomials given by their coefficients.
//!
//! [`solve`] finds every complex root in closed form up to degree
//! [`MAX_CLOSED_FORM_DEGREE`]. [`rational_roots`] tests the candidates of the
//! rational root theorem exactly, for integer coefficients of any degree.

use crate::Number;
use core::{cmp::Ordering, fmt, num::ParseFloatError, ops, str::FromStr};
use log::debug;
use thiserror::Error;

/// Highest degree with a general closed-form solution.
pub const MAX_CLOSED_FORM_DEGREE: usize = 4;

/// Largest integer coefficient magnitude that [`rational_roots`] accepts.
pub const MAX_INTEGER_COEFF: u64 = 1 << 40;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RootsErr {
    #[error("no coefficients given")]
    Empty,
    #[error("invalid coefficient '{text}': {err}")]
    InvalidCoeff { text: String, err: ParseFloatError },
    #[error("coefficient {0} is not finite")]
    NonFinite(Number),
    #[error("nothing to solve for in a constant polynomial")]
    Constant,
    #[error("the rational root theorem needs integer coefficients")]
    NotInteger,
    #[error("coefficient magnitude exceeds 2^40")]
    TooLarge,
    #[error("candidate root {0} overflows exact evaluation")]
    Overflow(Ratio),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub re: Number,
    pub im: Number,
}

impl Complex {
    pub const fn new(re: Number, im: Number) -> Self {
        Self { re, im }
    }

    pub const fn real(re: Number) -> Self {
        Self::new(re, 0.0)
    }

    pub fn abs(self) -> Number {
        self.re.hypot(self.im)
    }

    /// Principal square root.
    pub fn sqrt(self) -> Self {
        let r = self.abs();
        let re = ((r + self.re) / 2.0).sqrt();
        let im = ((r - self.re) / 2.0).sqrt();
        Self::new(re, if self.im < 0.0 { -im } else { im })
    }
}

impl ops::Add for Complex {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl ops::Neg for Complex {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }
}

impl ops::Mul for Complex {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Round away float noise for display, and drop the sign of zero.
fn tidy(x: Number) -> Number {
    const SCALE: Number = 1e9;
    if x.abs() < SCALE {
        (x * SCALE).round() / SCALE + 0.0
    } else {
        x
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (re, im) = (tidy(self.re), tidy(self.im));
        if im == 0.0 {
            write!(f, "{re}")
        } else {
            let sign = if im < 0.0 { '-' } else { '+' };
            write!(f, "{re} {sign} {}i", im.abs())
        }
    }
}

/// Reduced fraction with a positive denominator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ratio {
    num: i64,
    den: i64,
}

impl Ratio {
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// `None` if `den` is zero.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i64;
        let sign = den.signum();
        Some(Self {
            num: sign * num / g,
            den: sign * den / g,
        })
    }

    pub const fn num(&self) -> i64 {
        self.num
    }

    pub const fn den(&self) -> i64 {
        self.den
    }

    pub fn to_number(self) -> Number {
        self.num as Number / self.den as Number
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        // denominators are positive, so cross-multiplying keeps the order
        (i128::from(self.num) * i128::from(other.den))
            .cmp(&(i128::from(other.num) * i128::from(self.den)))
    }
}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.den {
            1 => write!(f, "{}", self.num),
            den => write!(f, "{}/{den}", self.num),
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Polynomial with real coefficients, highest degree first. The leading
/// coefficient is never zero and the degree is at least one.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<Number>,
}

impl Polynomial {
    /// Leading zeros are dropped.
    pub fn new(coeffs: impl IntoIterator<Item = Number>) -> Result<Self, RootsErr> {
        let coeffs: Vec<Number> = coeffs.into_iter().collect();
        if coeffs.is_empty() {
            return Err(RootsErr::Empty);
        }
        if let Some(c) = coeffs.iter().find(|c| !c.is_finite()) {
            return Err(RootsErr::NonFinite(*c));
        }
        let coeffs: Vec<Number> = coeffs.into_iter().skip_while(|c| *c == 0.0).collect();
        if coeffs.len() < 2 {
            return Err(RootsErr::Constant);
        }
        Ok(Self { coeffs })
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeffs(&self) -> &[Number] {
        &self.coeffs
    }

    pub fn eval(&self, x: Number) -> Number {
        self.coeffs.iter().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn eval_complex(&self, z: Complex) -> Complex {
        self.coeffs
            .iter()
            .fold(Complex::real(0.0), |acc, c| acc * z + Complex::real(*c))
    }

    /// Coefficients as integers, if they all are small whole numbers.
    pub fn integer_coeffs(&self) -> Option<Vec<i64>> {
        self.coeffs
            .iter()
            .map(|c| {
                let whole = c.fract() == 0.0 && c.abs() <= MAX_INTEGER_COEFF as Number;
                whole.then_some(*c as i64)
            })
            .collect()
    }
}

impl FromStr for Polynomial {
    type Err = RootsErr;

    /// Coefficients separated by whitespace or commas, highest degree first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let coeffs = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<Number>().map_err(|err| RootsErr::InvalidCoeff {
                    text: t.to_string(),
                    err,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(coeffs)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.degree();
        let mut first = true;
        for (i, c) in self.coeffs.iter().enumerate() {
            if *c == 0.0 {
                continue;
            }
            let power = n - i;
            let mag = c.abs();
            match (first, *c < 0.0) {
                (true, true) => f.write_str("-")?,
                (true, false) => {}
                (false, true) => f.write_str(" - ")?,
                (false, false) => f.write_str(" + ")?,
            }
            first = false;
            if mag != 1.0 || power == 0 {
                write!(f, "{mag}")?;
            }
            match power {
                0 => {}
                1 => f.write_str("x")?,
                p => write!(f, "x^{p}")?,
            }
        }
        Ok(())
    }
}

/// Closed-form roots, with multiplicity.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosedForm {
    pub roots: Vec<Complex>,
    /// Set to the input degree when only the leading terms were solved.
    pub truncated_from: Option<usize>,
}

/// Roots of `poly` in closed form. Above degree four, only the five
/// highest-order coefficients are used.
pub fn solve(poly: &Polynomial) -> ClosedForm {
    let truncated_from = (poly.degree() > MAX_CLOSED_FORM_DEGREE).then_some(poly.degree());
    let c = &poly.coeffs[..poly.coeffs.len().min(MAX_CLOSED_FORM_DEGREE + 1)];
    let roots = match *c {
        [a, b] => vec![Complex::real(-b / a)],
        [a, b, c] => quadratic(a, b, c).to_vec(),
        [a, b, c, d] => cubic(a, b, c, d).to_vec(),
        [a, b, c, d, e] => quartic(a, b, c, d, e).to_vec(),
        _ => Vec::new(),
    };
    ClosedForm {
        roots,
        truncated_from,
    }
}

fn quadratic(a: Number, b: Number, c: Number) -> [Complex; 2] {
    let disc = b * b - 4.0 * a * c;
    let mid = -b / (2.0 * a);
    let half = disc.abs().sqrt() / (2.0 * a).abs();
    if disc < 0.0 {
        [Complex::new(mid, -half), Complex::new(mid, half)]
    } else {
        [Complex::real(mid - half), Complex::real(mid + half)]
    }
}

/// Cardano's method on the depressed cubic `t^3 + pt + q`, with the
/// trigonometric form when all three roots are real and distinct.
fn cubic(a: Number, b: Number, c: Number, d: Number) -> [Complex; 3] {
    let shift = -b / (3.0 * a);
    let p = (3.0 * a * c - b * b) / (3.0 * a * a);
    let q = (2.0 * b * b * b - 9.0 * a * b * c + 27.0 * a * a * d) / (27.0 * a * a * a);

    let half_q2 = q * q / 4.0;
    let third_p3 = p * p * p / 27.0;
    let disc = half_q2 + third_p3;
    let tol = 1e-12 * half_q2.max(third_p3.abs());

    let real = |t: Number| Complex::real(t + shift);
    if disc.abs() <= tol {
        if p == 0.0 {
            [real(0.0); 3]
        } else {
            let double = -3.0 * q / (2.0 * p);
            [real(3.0 * q / p), real(double), real(double)]
        }
    } else if disc < 0.0 {
        let r = 2.0 * (-p / 3.0).sqrt();
        let theta = ((3.0 * q / (2.0 * p)) * (-3.0 / p).sqrt())
            .clamp(-1.0, 1.0)
            .acos();
        let t = |k: Number| r * (theta / 3.0 - 2.0 * core::f64::consts::PI * k / 3.0).cos();
        [real(t(0.0)), real(t(1.0)), real(t(2.0))]
    } else {
        let s = disc.sqrt();
        let u = (-q / 2.0 + s).cbrt();
        let v = (-q / 2.0 - s).cbrt();
        let re = -(u + v) / 2.0 + shift;
        let im = 3.0_f64.sqrt() / 2.0 * (u - v);
        [
            real(u + v),
            Complex::new(re, im),
            Complex::new(re, -im),
        ]
    }
}

/// Ferrari's method on the depressed quartic `y^4 + py^2 + qy + r`.
fn quartic(a: Number, b: Number, c: Number, d: Number, e: Number) -> [Complex; 4] {
    let (b, c, d, e) = (b / a, c / a, d / a, e / a);
    let shift = -b / 4.0;
    let p = c - 3.0 * b * b / 8.0;
    let q = d - b * c / 2.0 + b * b * b / 8.0;
    let r = e - b * d / 4.0 + b * b * c / 16.0 - 3.0 * b * b * b * b / 256.0;

    let shifted = |y: Complex| y + Complex::real(shift);

    // a positive root of 8m^3 + 8pm^2 + (2p^2 - 8r)m - q^2 exists when q != 0
    let m = if q.abs() <= 1e-12 * p.abs().max(r.abs()).max(1.0) {
        None
    } else {
        cubic(8.0, 8.0 * p, 2.0 * p * p - 8.0 * r, -q * q)
            .into_iter()
            .filter(|z| z.im == 0.0 && z.re > 0.0)
            .map(|z| z.re)
            .reduce(Number::max)
    };

    match m {
        Some(m) => {
            // (y^2 + p/2 + m)^2 = 2m (y - q/4m)^2
            let s = (2.0 * m).sqrt();
            let k = s * q / (4.0 * m);
            let [y0, y1] = quadratic(1.0, -s, p / 2.0 + m + k);
            let [y2, y3] = quadratic(1.0, s, p / 2.0 + m - k);
            [shifted(y0), shifted(y1), shifted(y2), shifted(y3)]
        }
        None => {
            // biquadratic: z = y^2
            let [z0, z1] = quadratic(1.0, p, r);
            let (w0, w1) = (z0.sqrt(), z1.sqrt());
            [shifted(-w0), shifted(w0), shifted(-w1), shifted(w1)]
        }
    }
}

/// Candidates of the rational root theorem, and the ones that are roots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RationalRoots {
    /// Every `±p/q` with `p` dividing the constant term and `q` dividing the
    /// leading coefficient, ascending.
    pub candidates: Vec<Ratio>,
    /// Distinct rational roots, ascending. Zero is included when the
    /// constant term is zero.
    pub roots: Vec<Ratio>,
}

pub fn rational_roots(poly: &Polynomial) -> Result<RationalRoots, RootsErr> {
    let mut coeffs = poly.integer_coeffs().ok_or(RootsErr::NotInteger)?;

    let mut roots = Vec::new();
    let zeros = coeffs.iter().rev().take_while(|c| **c == 0).count();
    if zeros > 0 {
        roots.push(Ratio::ZERO);
        coeffs.truncate(coeffs.len() - zeros);
    }

    let mut candidates: Vec<Ratio> = Vec::new();
    if let [lead, .., constant] = coeffs.as_slice() {
        let nums = divisors(constant.unsigned_abs())?;
        let dens = divisors(lead.unsigned_abs())?;
        for q in &dens {
            for p in &nums {
                for num in [-(*p as i64), *p as i64] {
                    if let Some(r) = Ratio::new(num, *q as i64) {
                        if !candidates.contains(&r) {
                            candidates.push(r);
                        }
                    }
                }
            }
        }
    }
    candidates.sort();
    debug!("testing {} rational root candidates", candidates.len());

    for r in &candidates {
        if is_root(&coeffs, *r)? {
            roots.push(*r);
        }
    }
    roots.sort();
    Ok(RationalRoots { candidates, roots })
}

fn divisors(n: u64) -> Result<Vec<u64>, RootsErr> {
    if n > MAX_INTEGER_COEFF {
        return Err(RootsErr::TooLarge);
    }
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d * d != n {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    Ok(small)
}

/// Exact test of `P(p/q) == 0` by evaluating `q^n P(p/q)` in integers.
fn is_root(coeffs: &[i64], r: Ratio) -> Result<bool, RootsErr> {
    let (p, q) = (i128::from(r.num()), i128::from(r.den()));
    let overflow = || RootsErr::Overflow(r);

    let mut acc: i128 = 0;
    let mut q_pow: i128 = 1;
    for (i, c) in coeffs.iter().enumerate() {
        if i > 0 {
            q_pow = q_pow.checked_mul(q).ok_or_else(overflow)?;
        }
        acc = acc
            .checked_mul(p)
            .and_then(|acc| acc.checked_add(i128::from(*c).checked_mul(q_pow)?))
            .ok_or_else(overflow)?;
    }
    Ok(acc == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(src: &str) -> Polynomial {
        src.parse().unwrap()
    }

    fn sorted_real_parts(roots: &[Complex]) -> Vec<Number> {
        let mut re: Vec<Number> = roots.iter().map(|z| z.re).collect();
        re.sort_by(Number::total_cmp);
        re
    }

    fn assert_close(a: &[Number], b: &[Number]) {
        assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-6, "{a:?} vs {b:?}");
        }
    }

    fn assert_roots_of(p: &Polynomial, roots: &[Complex]) {
        for z in roots {
            assert!(p.eval_complex(*z).abs() < 1e-6, "{z} is not a root of {p}");
        }
    }

    #[test]
    fn parsing() {
        let p = poly(" 0, 2 -4 ");
        assert_eq!(p.coeffs(), [2.0, -4.0]);
        assert_eq!(p.degree(), 1);
        assert_eq!("".parse::<Polynomial>(), Err(RootsErr::Empty));
        assert_eq!("5".parse::<Polynomial>(), Err(RootsErr::Constant));
        assert_eq!("0 0 3".parse::<Polynomial>(), Err(RootsErr::Constant));
        assert!(matches!(
            "1 two".parse::<Polynomial>(),
            Err(RootsErr::InvalidCoeff { text, .. }) if text == "two"
        ));
        assert!(matches!(
            "1 inf".parse::<Polynomial>(),
            Err(RootsErr::NonFinite(_))
        ));
    }

    #[test]
    fn display() {
        assert_eq!(poly("1 -3 2").to_string(), "x^2 - 3x + 2");
        assert_eq!(poly("-1 0 0 1 -1").to_string(), "-x^4 + x - 1");
        assert_eq!(poly("2.5 0").to_string(), "2.5x");
        assert_eq!(Complex::new(-0.5, -1.25).to_string(), "-0.5 - 1.25i");
        assert_eq!(Complex::new(2.0000000000001, -1e-14).to_string(), "2");
        assert_eq!(Ratio::new(2, -4).unwrap().to_string(), "-1/2");
        assert_eq!(Ratio::new(6, 3).unwrap().to_string(), "2");
        assert!(Ratio::new(1, 0).is_none());
    }

    #[test]
    fn linear_and_quadratic() {
        assert_eq!(solve(&poly("2 -4")).roots, [Complex::real(2.0)]);

        let p = poly("1 -3 2");
        assert_eq!(solve(&p).roots, [Complex::real(1.0), Complex::real(2.0)]);

        let roots = solve(&poly("1 0 1")).roots;
        assert_eq!(roots, [Complex::new(0.0, -1.0), Complex::new(0.0, 1.0)]);
    }

    #[test]
    fn cubic_real_roots() {
        // (x-1)(x-2)(x-3)
        let p = poly("1 -6 11 -6");
        let roots = solve(&p).roots;
        assert!(roots.iter().all(|z| z.im == 0.0));
        assert_close(&sorted_real_parts(&roots), &[1.0, 2.0, 3.0]);

        // (x-1)^2 (x+2)
        let roots = solve(&poly("1 0 -3 2")).roots;
        assert_close(&sorted_real_parts(&roots), &[-2.0, 1.0, 1.0]);

        let roots = solve(&poly("1 -3 3 -1")).roots;
        assert_close(&sorted_real_parts(&roots), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn cubic_complex_roots() {
        let p = poly("1 0 0 -1");
        let roots = solve(&p).roots;
        assert_eq!(roots[0], Complex::real(1.0));
        assert!((roots[1].re + 0.5).abs() < 1e-12);
        assert!((roots[1].im.abs() - 3.0_f64.sqrt() / 2.0).abs() < 1e-12);
        assert_eq!(roots[1].im, -roots[2].im);
        assert_roots_of(&p, &roots);
    }

    #[test]
    fn quartic_roots() {
        // (x-1)(x-2)(x-3)(x+5)
        let p = poly("1 -1 -19 49 -30");
        let roots = solve(&p).roots;
        assert_eq!(roots.len(), 4);
        assert!(roots.iter().all(|z| z.im.abs() < 1e-6));
        assert_close(&sorted_real_parts(&roots), &[-5.0, 1.0, 2.0, 3.0]);

        for src in ["1 0 -5 0 4", "1 0 0 0 1", "2 3 -1 4 7", "1 -10 35 -50 24"] {
            let p = poly(src);
            let roots = solve(&p).roots;
            assert_eq!(roots.len(), 4, "{src}");
            assert_roots_of(&p, &roots);
        }
    }

    #[test]
    fn truncates_above_quartic() {
        let form = solve(&poly("1 0 0 0 -1 7"));
        assert_eq!(form.truncated_from, Some(5));
        assert_eq!(form.roots.len(), 4);
        assert_roots_of(&poly("1 0 0 0 -1"), &form.roots);
        assert_eq!(solve(&poly("1 1")).truncated_from, None);
    }

    #[test]
    fn rational_root_theorem() {
        // (2x+1)(x-1)
        let found = rational_roots(&poly("2 -1 -1")).unwrap();
        let r = |n, d| Ratio::new(n, d).unwrap();
        assert_eq!(
            found.candidates,
            [r(-1, 1), r(-1, 2), r(1, 2), r(1, 1)]
        );
        assert_eq!(found.roots, [r(-1, 2), r(1, 1)]);

        // negative leading coefficient, and no rational roots
        let found = rational_roots(&poly("-1 0 2")).unwrap();
        assert_eq!(found.candidates.len(), 4);
        assert!(found.roots.is_empty());
    }

    #[test]
    fn zero_constant_term() {
        // x(x-1)(x+1)
        let found = rational_roots(&poly("1 0 -1 0")).unwrap();
        let r = |n| Ratio::new(n, 1).unwrap();
        assert_eq!(found.roots, [r(-1), r(0), r(1)]);

        let found = rational_roots(&poly("3 0 0")).unwrap();
        assert!(found.candidates.is_empty());
        assert_eq!(found.roots, [Ratio::ZERO]);
    }

    #[test]
    fn rational_root_errors() {
        assert_eq!(
            rational_roots(&poly("0.5 1")),
            Err(RootsErr::NotInteger)
        );
        assert_eq!(
            rational_roots(&poly("1 2e12")),
            Err(RootsErr::NotInteger)
        );
        assert_eq!(divisors(12).unwrap(), [1, 2, 3, 4, 6, 12]);
        assert_eq!(divisors(1).unwrap(), [1]);
    }
}
