//! Map projections for rendered frames.
//!
//! Each variant carries fixed parameters and maps geographic coordinates
//! (degrees) to projected plane coordinates (meters on a sphere) and back.
//! An unrecognised projection name falls back to [`ProjectionKind::Orthographic`].

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, SQRT_2};
use std::fmt;

/// Sphere radius (meters)
pub const EARTH_RADIUS: f64 = 6371229.0;

const LAMBERT_CENTRAL_LON: f64 = 260.0;
const LAMBERT_CENTRAL_LAT: f64 = 33.0;
const LAMBERT_PARALLELS: (f64, f64) = (33.0, 45.0);
/// Southernmost latitude drawn by the Lambert conic; the cone diverges toward the far pole.
const LAMBERT_CUTOFF_LAT: f64 = -30.0;

const ORTHO_CENTRAL_LON: f64 = -75.0;
const ORTHO_CENTRAL_LAT: f64 = 42.0;

const MOLLWEIDE_CENTRAL_LON: f64 = 180.0;

const MERCATOR_CENTRAL_LON: f64 = 180.0;
const MERCATOR_LAT_LIMITS: (f64, f64) = (-70.0, 70.0);

/// Closed set of supported projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectionKind {
    LambertConformal,
    #[default]
    Orthographic,
    Mollweide,
    Mercator,
}

impl ProjectionKind {
    pub const ALL: [ProjectionKind; 4] = [
        ProjectionKind::LambertConformal,
        ProjectionKind::Orthographic,
        ProjectionKind::Mollweide,
        ProjectionKind::Mercator,
    ];

    /// Case-sensitive lookup with Orthographic as the fallback.
    ///
    /// ```rust
    /// use nc2gif::projection::ProjectionKind;
    ///
    /// assert_eq!(ProjectionKind::parse("Mercator"), ProjectionKind::Mercator);
    /// assert_eq!(ProjectionKind::parse("mercator"), ProjectionKind::Orthographic);
    /// ```
    pub fn parse(name: &str) -> Self {
        Self::recognise(name).unwrap_or_default()
    }

    /// Exact lookup without fallback.
    pub fn recognise(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Name used in frame file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LambertConformal => "LambertConformal",
            Self::Orthographic => "Orthographic",
            Self::Mollweide => "Mollweide",
            Self::Mercator => "Mercator",
        }
    }

    /// Builds the projection with its fixed parameters.
    pub fn projection(&self) -> Projection {
        match self {
            Self::LambertConformal => Projection::LambertConformal(LambertConformal::new(
                LAMBERT_CENTRAL_LON,
                LAMBERT_CENTRAL_LAT,
                LAMBERT_PARALLELS.0,
                LAMBERT_PARALLELS.1,
                LAMBERT_CUTOFF_LAT,
            )),
            Self::Orthographic => {
                Projection::Orthographic(Orthographic::new(ORTHO_CENTRAL_LON, ORTHO_CENTRAL_LAT))
            }
            Self::Mollweide => Projection::Mollweide(Mollweide::new(MOLLWEIDE_CENTRAL_LON)),
            Self::Mercator => Projection::Mercator(Mercator::new(
                MERCATOR_CENTRAL_LON,
                MERCATOR_LAT_LIMITS.0,
                MERCATOR_LAT_LIMITS.1,
            )),
        }
    }
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ProjectionKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ProjectionKind> for String {
    fn from(kind: ProjectionKind) -> Self {
        kind.name().to_string()
    }
}

/// Extent of a projection in plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A configured projection.
#[derive(Debug, Clone)]
pub enum Projection {
    LambertConformal(LambertConformal),
    Orthographic(Orthographic),
    Mollweide(Mollweide),
    Mercator(Mercator),
}

impl Projection {
    /// Geographic (degrees) to plane coordinates; `None` where the point is not drawn.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        match self {
            Self::LambertConformal(p) => p.forward(lon, lat),
            Self::Orthographic(p) => p.forward(lon, lat),
            Self::Mollweide(p) => p.forward(lon, lat),
            Self::Mercator(p) => p.forward(lon, lat),
        }
    }

    /// Plane coordinates to geographic (degrees, longitude in [-180, 180)).
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            Self::LambertConformal(p) => p.inverse(x, y),
            Self::Orthographic(p) => p.inverse(x, y),
            Self::Mollweide(p) => p.inverse(x, y),
            Self::Mercator(p) => p.inverse(x, y),
        }
    }

    /// Outline of the drawable area, as a closed ring of plane coordinates.
    pub fn boundary(&self) -> Vec<(f64, f64)> {
        match self {
            Self::LambertConformal(p) => p.boundary(),
            Self::Orthographic(p) => p.boundary(),
            Self::Mollweide(p) => p.boundary(),
            Self::Mercator(p) => p.boundary(),
        }
    }

    /// Global extent, the bounding box of [`Projection::boundary`].
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in self.boundary() {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }
        bounds
    }
}

/// Wraps an angle in radians into [-π, π).
fn wrap_pi(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Wraps a longitude in degrees into [-180, 180).
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Lambert Conformal Conic on a sphere.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Southern cutoff latitude in degrees
    pub cutoff_lat: f64,
    /// Cone constant
    n: f64,
    /// R * F
    rf: f64,
    /// Rho at the origin latitude
    rho0: f64,
}

impl LambertConformal {
    pub fn new(
        central_lon: f64,
        central_lat: f64,
        parallel1: f64,
        parallel2: f64,
        cutoff_lat: f64,
    ) -> Self {
        let lat0 = central_lat.to_radians();
        let phi1 = parallel1.to_radians();
        let phi2 = parallel2.to_radians();

        let n = if (phi1 - phi2).abs() < 1e-10 {
            // Tangent cone
            phi1.sin()
        } else {
            (phi1.cos() / phi2.cos()).ln()
                / ((FRAC_PI_4 + phi2 / 2.0).tan() / (FRAC_PI_4 + phi1 / 2.0).tan()).ln()
        };
        let f = phi1.cos() * (FRAC_PI_4 + phi1 / 2.0).tan().powf(n) / n;
        let rf = EARTH_RADIUS * f;
        let rho0 = rf / (FRAC_PI_4 + lat0 / 2.0).tan().powf(n);

        Self {
            lon0: central_lon.to_radians(),
            cutoff_lat,
            n,
            rf,
            rho0,
        }
    }

    fn rho(&self, lat: f64) -> f64 {
        self.rf / (FRAC_PI_4 + lat / 2.0).tan().powf(self.n)
    }

    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if lat < self.cutoff_lat || lat > 90.0 {
            return None;
        }
        let lat_r = lat.to_radians().min(FRAC_PI_2 - 1e-9);
        let rho = self.rho(lat_r);
        let theta = self.n * wrap_pi(lon.to_radians() - self.lon0);
        Some((rho * theta.sin(), self.rho0 - rho * theta.cos()))
    }

    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let dy = self.rho0 - y;
        let sign = self.n.signum();
        let rho = sign * (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);
        if (theta / self.n).abs() > PI {
            return None;
        }
        let lat = if rho == 0.0 {
            sign * FRAC_PI_2
        } else {
            2.0 * (self.rf / rho).powf(1.0 / self.n).atan() - FRAC_PI_2
        };
        let lat = lat.to_degrees();
        if lat < self.cutoff_lat {
            return None;
        }
        let lon = wrap_lon((theta / self.n + self.lon0).to_degrees());
        Some((lon, lat))
    }

    pub fn boundary(&self) -> Vec<(f64, f64)> {
        let central = self.lon0.to_degrees();
        let west = central - 180.0 + 1e-6;
        let east = central + 180.0 - 1e-6;
        let mut ring = Vec::new();
        // Cutoff parallel west to east, then the cut meridian up to the pole and back down
        for step in 0..=360 {
            let lon = west + (east - west) * step as f64 / 360.0;
            ring.extend(self.forward(lon, self.cutoff_lat));
        }
        for step in 0..=120 {
            let lat = self.cutoff_lat + (90.0 - self.cutoff_lat) * step as f64 / 120.0;
            ring.extend(self.forward(east, lat));
        }
        for step in 0..=120 {
            let lat = 90.0 - (90.0 - self.cutoff_lat) * step as f64 / 120.0;
            ring.extend(self.forward(west, lat));
        }
        ring
    }
}

/// Orthographic (globe) view centred on a point.
#[derive(Debug, Clone)]
pub struct Orthographic {
    /// Central longitude in radians
    pub lon0: f64,
    /// Central latitude in radians
    pub lat0: f64,
}

impl Orthographic {
    pub fn new(central_lon: f64, central_lat: f64) -> Self {
        Self {
            lon0: central_lon.to_radians(),
            lat0: central_lat.to_radians(),
        }
    }

    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let phi = lat.to_radians();
        let dlambda = lon.to_radians() - self.lon0;
        let cos_c = self.lat0.sin() * phi.sin() + self.lat0.cos() * phi.cos() * dlambda.cos();
        // Far side of the globe
        if cos_c < 0.0 {
            return None;
        }
        let x = EARTH_RADIUS * phi.cos() * dlambda.sin();
        let y = EARTH_RADIUS
            * (self.lat0.cos() * phi.sin() - self.lat0.sin() * phi.cos() * dlambda.cos());
        Some((x, y))
    }

    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let rho = (x * x + y * y).sqrt();
        if rho > EARTH_RADIUS {
            return None;
        }
        if rho == 0.0 {
            return Some((wrap_lon(self.lon0.to_degrees()), self.lat0.to_degrees()));
        }
        let c = (rho / EARTH_RADIUS).asin();
        let (sin_c, cos_c) = c.sin_cos();
        let lat = (cos_c * self.lat0.sin() + y * sin_c * self.lat0.cos() / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lon = self.lon0
            + (x * sin_c).atan2(rho * cos_c * self.lat0.cos() - y * self.lat0.sin() * sin_c);
        Some((wrap_lon(lon.to_degrees()), lat.to_degrees()))
    }

    pub fn boundary(&self) -> Vec<(f64, f64)> {
        (0..=360)
            .map(|deg| {
                let a = (deg as f64).to_radians();
                (EARTH_RADIUS * a.cos(), EARTH_RADIUS * a.sin())
            })
            .collect()
    }
}

/// Mollweide equal-area projection.
#[derive(Debug, Clone)]
pub struct Mollweide {
    /// Central longitude in radians
    pub lon0: f64,
}

impl Mollweide {
    pub fn new(central_lon: f64) -> Self {
        Self {
            lon0: central_lon.to_radians(),
        }
    }

    /// Solves 2θ + sin 2θ = π sin φ by Newton iteration.
    fn auxiliary_angle(phi: f64) -> f64 {
        if (phi.abs() - FRAC_PI_2).abs() < 1e-12 {
            return phi;
        }
        let target = PI * phi.sin();
        let mut theta = phi;
        for _ in 0..50 {
            let delta = -(2.0 * theta + (2.0 * theta).sin() - target)
                / (2.0 + 2.0 * (2.0 * theta).cos());
            theta += delta;
            if delta.abs() < 1e-12 {
                break;
            }
        }
        theta
    }

    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        let theta = Self::auxiliary_angle(lat.to_radians());
        let dlambda = wrap_pi(lon.to_radians() - self.lon0);
        let x = EARTH_RADIUS * 2.0 * SQRT_2 / PI * dlambda * theta.cos();
        let y = EARTH_RADIUS * SQRT_2 * theta.sin();
        Some((x, y))
    }

    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let s = y / (EARTH_RADIUS * SQRT_2);
        if s.abs() > 1.0 {
            return None;
        }
        let theta = s.asin();
        let lat = ((2.0 * theta + (2.0 * theta).sin()) / PI).clamp(-1.0, 1.0).asin();
        let cos_theta = theta.cos();
        if cos_theta.abs() < 1e-12 {
            return if x.abs() < 1.0 {
                Some((wrap_lon(self.lon0.to_degrees()), lat.to_degrees()))
            } else {
                None
            };
        }
        let dlambda = PI * x / (2.0 * EARTH_RADIUS * SQRT_2 * cos_theta);
        if dlambda.abs() > PI {
            return None;
        }
        Some((wrap_lon((self.lon0 + dlambda).to_degrees()), lat.to_degrees()))
    }

    pub fn boundary(&self) -> Vec<(f64, f64)> {
        let a = 2.0 * SQRT_2 * EARTH_RADIUS;
        let b = SQRT_2 * EARTH_RADIUS;
        (0..=360)
            .map(|deg| {
                let t = (deg as f64).to_radians();
                (a * t.cos(), b * t.sin())
            })
            .collect()
    }
}

/// Spherical Mercator limited to a latitude band.
#[derive(Debug, Clone)]
pub struct Mercator {
    /// Central longitude in radians
    pub lon0: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Mercator {
    pub fn new(central_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            lon0: central_lon.to_radians(),
            min_lat,
            max_lat,
        }
    }

    fn y_of(lat: f64) -> f64 {
        EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
    }

    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if lat < self.min_lat || lat > self.max_lat {
            return None;
        }
        let x = EARTH_RADIUS * wrap_pi(lon.to_radians() - self.lon0);
        Some((x, Self::y_of(lat)))
    }

    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let dlambda = x / EARTH_RADIUS;
        if dlambda.abs() > PI {
            return None;
        }
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
        if lat < self.min_lat || lat > self.max_lat {
            return None;
        }
        Some((wrap_lon((self.lon0 + dlambda).to_degrees()), lat))
    }

    pub fn boundary(&self) -> Vec<(f64, f64)> {
        let half = EARTH_RADIUS * PI;
        let bottom = Self::y_of(self.min_lat);
        let top = Self::y_of(self.max_lat);
        vec![
            (-half, bottom),
            (half, bottom),
            (half, top),
            (-half, top),
            (-half, bottom),
        ]
    }
}
