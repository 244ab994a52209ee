use std::f64::consts::PI;

/// Wrap an angle into `(-pi, pi]`.
pub fn wrap_phase(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

/// Remove 2*pi jumps between consecutive samples of one series.
///
/// The first sample is kept as is; every later sample is shifted by a
/// multiple of 2*pi so that consecutive differences lie in `(-pi, pi]`.
pub fn unwrap_in_place(series: &mut [f64]) {
    let Some(&first) = series.first() else {
        return;
    };
    let mut prev_raw = first;
    let mut acc = first;
    for value in series.iter_mut().skip(1) {
        let raw = *value;
        acc += wrap_phase(raw - prev_raw);
        prev_raw = raw;
        *value = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_principal_range() {
        assert!((wrap_phase(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_phase(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(-PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(2.0 * PI + 0.25) - 0.25).abs() < 1e-12);
        assert!((wrap_phase(-2.0 * PI - 0.25) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn unwrap_restores_linear_ramp() {
        let truth: Vec<f64> = (0..20).map(|t| 0.9 * t as f64 - 2.0).collect();
        let mut series: Vec<f64> = truth.iter().map(|&v| wrap_phase(v)).collect();
        unwrap_in_place(&mut series);
        let offset = series[0] - truth[0];
        for (u, t) in series.iter().zip(&truth) {
            assert!((u - t - offset).abs() < 1e-9);
        }
    }

    #[test]
    fn unwrap_empty_and_single() {
        let mut empty: Vec<f64> = Vec::new();
        unwrap_in_place(&mut empty);
        let mut one = vec![1.5];
        unwrap_in_place(&mut one);
        assert_eq!(one, vec![1.5]);
    }
}
