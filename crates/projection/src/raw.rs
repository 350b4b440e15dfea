//! Raw projections on the unit sphere.
//!
//! A raw projection maps rotated spherical coordinates (radians) to planar
//! units, with y growing northward. Scaling, translation, and the y flip into
//! screen space happen in [`crate::projector::Projector`]. All variants are
//! plain value types; forward results may be non-finite near singularities
//! (poles for mercator, the antipode for azimuthals) and callers are expected
//! to discard those.

use foundation::math::{HALF_PI, QUARTER_PI, Vec2};

const CONE_EPS: f64 = 1e-10;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RawProjection {
    Mercator,
    Equirectangular,
    /// Lambert conformal conic. `n` is the cone constant, `f` the scaled
    /// cone apex distance.
    ConicConformal { n: f64, f: f64 },
    /// Albers equal-area conic. `n` is the cone constant.
    ConicEqualArea { n: f64, c: f64, r0: f64 },
    /// Degenerate conic where both standard parallels cancel out.
    CylindricalEqualArea { cos_phi0: f64 },
    AzimuthalEqualArea,
    AzimuthalEquidistant,
}

/// Conformal conic from two standard parallels (radians). Collapses to
/// mercator when the cone constant vanishes (parallels symmetric about the
/// equator).
pub fn conic_conformal(phi0: f64, phi1: f64) -> RawProjection {
    let cy0 = phi0.cos();
    let n = if (phi0 - phi1).abs() > CONE_EPS {
        (cy0 / phi1.cos()).ln()
            / ((QUARTER_PI + 0.5 * phi1).tan() / (QUARTER_PI + 0.5 * phi0).tan()).ln()
    } else {
        phi0.sin()
    };
    if n.abs() < CONE_EPS {
        return RawProjection::Mercator;
    }
    let f = cy0 * (QUARTER_PI + 0.5 * phi0).tan().powf(n) / n;
    RawProjection::ConicConformal { n, f }
}

/// Equal-area conic from two standard parallels (radians). Collapses to the
/// cylindrical equal-area form when the cone constant vanishes.
pub fn conic_equal_area(phi0: f64, phi1: f64) -> RawProjection {
    let sy0 = phi0.sin();
    let n = (sy0 + phi1.sin()) / 2.0;
    if n.abs() < CONE_EPS {
        return RawProjection::CylindricalEqualArea {
            cos_phi0: phi0.cos(),
        };
    }
    let c = 1.0 + sy0 * (2.0 * n - sy0);
    let r0 = c.sqrt() / n;
    RawProjection::ConicEqualArea { n, c, r0 }
}

impl RawProjection {
    pub fn forward(self, lambda: f64, phi: f64) -> Vec2 {
        match self {
            RawProjection::Mercator => {
                Vec2::new(lambda, (QUARTER_PI + 0.5 * phi).tan().ln())
            }
            RawProjection::Equirectangular => Vec2::new(lambda, phi),
            RawProjection::ConicConformal { n, f } => {
                let rho = f / (QUARTER_PI + 0.5 * phi).tan().powf(n);
                Vec2::new(rho * (n * lambda).sin(), f - rho * (n * lambda).cos())
            }
            RawProjection::ConicEqualArea { n, c, r0 } => {
                let rho = (c - 2.0 * n * phi.sin()).sqrt() / n;
                Vec2::new(rho * (n * lambda).sin(), r0 - rho * (n * lambda).cos())
            }
            RawProjection::CylindricalEqualArea { cos_phi0 } => {
                Vec2::new(lambda * cos_phi0, phi.sin() / cos_phi0)
            }
            RawProjection::AzimuthalEqualArea => {
                let (cx, cy) = (lambda.cos(), phi.cos());
                let k = (2.0 / (1.0 + cx * cy)).sqrt();
                Vec2::new(k * cy * lambda.sin(), k * phi.sin())
            }
            RawProjection::AzimuthalEquidistant => {
                let (cx, cy) = (lambda.cos(), phi.cos());
                let c = (cx * cy).clamp(-1.0, 1.0).acos();
                let k = if c == 0.0 { 1.0 } else { c / c.sin() };
                Vec2::new(k * cy * lambda.sin(), k * phi.sin())
            }
        }
    }

    /// Planar point back to rotated spherical coordinates, or `None` when
    /// the point lies outside the projection's image.
    pub fn invert(self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            RawProjection::Mercator => Some((x, 2.0 * y.exp().atan() - HALF_PI)),
            RawProjection::Equirectangular => Some((x, y)),
            RawProjection::ConicConformal { n, f } => {
                let fy = f - y;
                // Fold into the cone's half-plane for negative cone constants.
                let (xs, fys) = if n < 0.0 { (-x, -fy) } else { (x, fy) };
                let rho = (xs * xs + fys * fys).sqrt() * n.signum();
                let theta = xs.atan2(fys);
                let phi = 2.0 * (f / rho).powf(1.0 / n).atan() - HALF_PI;
                if !phi.is_finite() {
                    return None;
                }
                Some((theta / n, phi))
            }
            RawProjection::ConicEqualArea { n, c, r0 } => {
                let r0y = r0 - y;
                let (xs, r0ys) = if n < 0.0 { (-x, -r0y) } else { (x, r0y) };
                let rho2 = xs * xs + r0ys * r0ys;
                let sin_phi = (c - rho2 * n * n) / (2.0 * n);
                if sin_phi.abs() > 1.0 {
                    return None;
                }
                let theta = xs.atan2(r0ys);
                Some((theta / n, sin_phi.asin()))
            }
            RawProjection::CylindricalEqualArea { cos_phi0 } => {
                let sin_phi = y * cos_phi0;
                if sin_phi.abs() > 1.0 {
                    return None;
                }
                Some((x / cos_phi0, sin_phi.asin()))
            }
            RawProjection::AzimuthalEqualArea => {
                let z = (x * x + y * y).sqrt();
                if z > 2.0 {
                    return None;
                }
                let c = 2.0 * (z / 2.0).asin();
                azimuthal_invert(x, y, z, c)
            }
            RawProjection::AzimuthalEquidistant => {
                let z = (x * x + y * y).sqrt();
                if z > std::f64::consts::PI {
                    return None;
                }
                azimuthal_invert(x, y, z, z)
            }
        }
    }
}

fn azimuthal_invert(x: f64, y: f64, z: f64, c: f64) -> Option<(f64, f64)> {
    if z == 0.0 {
        return Some((0.0, 0.0));
    }
    let (sc, cc) = (c.sin(), c.cos());
    let sin_phi = (y * sc / z).clamp(-1.0, 1.0);
    Some(((x * sc).atan2(z * cc), sin_phi.asin()))
}
