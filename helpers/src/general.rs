use std::cmp::Ordering;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. Incomparable values (NaN) are treated
/// as equal, the sort is stable.
pub fn argsort<T: PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => {
            indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal))
        }
        SortOrder::Descending => {
            indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap_or(Ordering::Equal))
        }
    }
    indices
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be increasing. Inspired by numpy.interp.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if xp.len() != fp.len() {
        panic!("Number of items in xp and fp must be equal!")
    }

    if x <= xp[0] {
        return fp[0];
    }

    for i in 1..xp.len() {
        if x <= xp[i] {
            return fp[i - 1] + (x - xp[i - 1]) * (fp[i] - fp[i - 1]) / (xp[i] - xp[i - 1]);
        }
    }

    fp[fp.len() - 1]
}

/// normalize_angle wraps an angle (rad) into [-pi, pi[. Non-finite input yields 0.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// clamp_finite clamps x into [lo, hi] and replaces NaN/Infinity by `fallback`.
pub fn clamp_finite(x: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x.clamp(lo, hi)
    } else {
        fallback.clamp(lo, hi)
    }
}

/// ordinal returns the english ordinal of a position, e.g. 1 -> "1st", 12 -> "12th".
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn argsort_descending_is_stable() {
        let x = [1.0, 3.0, 3.0, 2.0];
        assert_eq!(argsort(&x, SortOrder::Descending), vec![1, 2, 3, 0]);
        assert_eq!(argsort(&x, SortOrder::Ascending), vec![0, 3, 1, 2]);
    }

    #[test]
    fn argsort_tolerates_nan() {
        let x = [1.0, f64::NAN, 2.0];
        assert_eq!(argsort(&x, SortOrder::Ascending).len(), 3);
    }

    #[test]
    fn normalize_angle_wraps() {
        assert_abs_diff_eq!(normalize_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(0.25), 0.25, epsilon = 1e-12);
        assert_eq!(normalize_angle(f64::NAN), 0.0);
        for k in -20..20 {
            let a = normalize_angle(k as f64 * 0.77);
            assert!((-PI..=PI).contains(&a));
        }
    }

    #[test]
    fn lin_interp_clamps_to_ends() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [10.0, 20.0, 0.0];
        assert_abs_diff_eq!(lin_interp(-1.0, &xp, &fp), 10.0);
        assert_abs_diff_eq!(lin_interp(0.5, &xp, &fp), 15.0);
        assert_abs_diff_eq!(lin_interp(1.5, &xp, &fp), 10.0);
        assert_abs_diff_eq!(lin_interp(3.0, &xp, &fp), 0.0);
    }

    #[test]
    fn clamp_finite_replaces_nan() {
        assert_eq!(clamp_finite(f64::NAN, 0.0, 1.0, 0.5), 0.5);
        assert_eq!(clamp_finite(f64::INFINITY, 0.0, 1.0, 2.0), 1.0);
        assert_eq!(clamp_finite(-3.0, 0.0, 1.0, 0.5), 0.0);
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(112), "112th");
    }
}
