//! Three-axis spherical rotation (lambda, phi, gamma), with exact inverse.

use foundation::math::normalize_rad;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rotation {
    delta_lambda: f64,
    delta_phi: f64,
    delta_gamma: f64,
}

impl Rotation {
    /// Build from a `[lambda, phi, gamma]` triplet in degrees.
    pub fn from_degrees(rotate: [f64; 3]) -> Self {
        Self {
            delta_lambda: rotate[0].to_radians(),
            delta_phi: rotate[1].to_radians(),
            delta_gamma: rotate[2].to_radians(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.delta_lambda == 0.0 && self.delta_phi == 0.0 && self.delta_gamma == 0.0
    }

    /// Rotate spherical coordinates (radians).
    pub fn forward(&self, lambda: f64, phi: f64) -> (f64, f64) {
        if self.is_identity() {
            return (lambda, phi);
        }
        let lambda = normalize_rad(lambda + self.delta_lambda);
        if self.delta_phi == 0.0 && self.delta_gamma == 0.0 {
            return (lambda, phi);
        }

        let (cos_dp, sin_dp) = (self.delta_phi.cos(), self.delta_phi.sin());
        let (cos_dg, sin_dg) = (self.delta_gamma.cos(), self.delta_gamma.sin());
        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * cos_dp + x * sin_dp;
        (
            (y * cos_dg - k * sin_dg).atan2(x * cos_dp - z * sin_dp),
            (k * cos_dg + y * sin_dg).clamp(-1.0, 1.0).asin(),
        )
    }

    /// Undo [`Rotation::forward`].
    pub fn invert(&self, lambda: f64, phi: f64) -> (f64, f64) {
        if self.is_identity() {
            return (lambda, phi);
        }
        let (lambda, phi) = if self.delta_phi == 0.0 && self.delta_gamma == 0.0 {
            (lambda, phi)
        } else {
            let (cos_dp, sin_dp) = (self.delta_phi.cos(), self.delta_phi.sin());
            let (cos_dg, sin_dg) = (self.delta_gamma.cos(), self.delta_gamma.sin());
            let cos_phi = phi.cos();
            let x = lambda.cos() * cos_phi;
            let y = lambda.sin() * cos_phi;
            let z = phi.sin();
            let k = z * cos_dg - y * sin_dg;
            (
                (y * cos_dg + z * sin_dg).atan2(x * cos_dp + k * sin_dp),
                (k * cos_dp - x * sin_dp).clamp(-1.0, 1.0).asin(),
            )
        };
        (normalize_rad(lambda - self.delta_lambda), phi)
    }
}
