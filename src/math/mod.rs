use std::f64::consts::{PI, TAU};

/// Signed difference `alpha1 - alpha2` folded into [-pi, pi].
pub fn angle_difference(alpha1: f64, alpha2: f64) -> f64 {
    let diff = (alpha1 - alpha2) % TAU;
    match diff {
        d if d > PI => d - TAU,
        d if d < -PI => d + TAU,
        d => d,
    }
}
