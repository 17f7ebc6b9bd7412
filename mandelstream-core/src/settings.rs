use rug::Float;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Working precision for plane coordinates, in bits.
///
/// Comfortably above the 253 fractional bits of the wire format, so the
/// codec — not host arithmetic — is the precision bottleneck.
pub const PLANE_PRECISION: u32 = 320;

/// Build a plane coordinate from an `f64`.
pub fn coord(v: f64) -> Float {
    Float::with_val(PLANE_PRECISION, v)
}

/// Parse a plane coordinate from a decimal string at full working precision.
pub fn parse_coord(s: &str) -> crate::Result<Float> {
    Float::parse(s)
        .map(|p| Float::with_val(PLANE_PRECISION, p))
        .map_err(|_| CoreError::InvalidCoordinate(s.to_owned()))
}

/// Which set the accelerator kernels iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FractalMode {
    Mandelbrot,
    Julia,
}

/// Rendering hints carried alongside the geometry.
///
/// The core stores these for the colorizer but never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHints {
    pub mode: u32,
    pub hue: f64,
    pub sat: f64,
    pub val: f64,
    pub modulo: u32,
    /// Color used for interior (never-escaped) pixels, as `#rrggbb`.
    pub marker_color: String,
}

impl Default for ColorHints {
    fn default() -> Self {
        Self {
            mode: 1,
            hue: 1.0,
            sat: 1.0,
            val: 1.0,
            modulo: 255,
            marker_color: "#000000".to_owned(),
        }
    }
}

/// The plane-to-pixel mapping for one computation.
///
/// Serializes as a snapshot: coordinates become decimal strings so the full
/// arbitrary precision survives a save/load round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub size_x: u32,
    pub size_y: u32,
    pub max_iterations: u32,
    /// Upper-left corner of the plane rectangle.
    #[serde(with = "coord_string")]
    pub ul_x: Float,
    #[serde(with = "coord_string")]
    pub ul_y: Float,
    /// Lower-right corner of the plane rectangle.
    #[serde(with = "coord_string")]
    pub lr_x: Float,
    #[serde(with = "coord_string")]
    pub lr_y: Float,
    /// Julia center point (ignored by the kernels in Mandelbrot mode).
    #[serde(with = "coord_string")]
    pub c_x: Float,
    #[serde(with = "coord_string")]
    pub c_y: Float,
    pub mode: FractalMode,
    pub color: ColorHints,
}

impl GridSettings {
    /// Create settings with the default plane rectangle `[-2, 2] × [2, -2]`
    /// and the Julia center at the origin.
    pub fn new(
        size_x: u32,
        size_y: u32,
        max_iterations: u32,
        mode: FractalMode,
    ) -> crate::Result<Self> {
        if size_x == 0 || size_y == 0 {
            return Err(CoreError::InvalidGrid {
                reason: format!("dimensions must be > 0, got {size_x}×{size_y}"),
            });
        }
        Ok(Self {
            size_x,
            size_y,
            max_iterations,
            ul_x: coord(-2.0),
            ul_y: coord(2.0),
            lr_x: coord(2.0),
            lr_y: coord(-2.0),
            c_x: coord(0.0),
            c_y: coord(0.0),
            mode,
            color: ColorHints::default(),
        })
    }

    /// Replace the complex-plane rectangle.
    ///
    /// The corners must span a non-degenerate area: the horizontal extent
    /// is later used as a divisor when deriving the per-pixel step.
    pub fn set_plane_rect(
        &mut self,
        ul_x: Float,
        ul_y: Float,
        lr_x: Float,
        lr_y: Float,
    ) -> crate::Result<()> {
        if ul_x == lr_x || ul_y == lr_y {
            return Err(CoreError::InvalidGrid {
                reason: "plane rectangle is degenerate".to_owned(),
            });
        }
        self.ul_x = ul_x;
        self.ul_y = ul_y;
        self.lr_x = lr_x;
        self.lr_y = lr_y;
        Ok(())
    }

    /// Set the Julia center point.
    pub fn set_center(&mut self, c_x: Float, c_y: Float) {
        self.c_x = c_x;
        self.c_y = c_y;
    }

    /// Plane units per pixel, derived from the current state on every call.
    ///
    /// Square pixels: the same step serves both axes.
    pub fn h_step(&self) -> Float {
        let mut step = Float::with_val(PLANE_PRECISION, &self.lr_x - &self.ul_x);
        step /= self.size_x;
        step
    }
}

/// Serde adapter: arbitrary-precision coordinates as decimal strings.
mod coord_string {
    use rug::Float;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::PLANE_PRECISION;

    pub fn serialize<S: Serializer>(v: &Float, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&v.to_string_radix(10, None))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Float, D::Error> {
        let s = String::deserialize(de)?;
        Float::parse(&s)
            .map(|p| Float::with_val(PLANE_PRECISION, p))
            .map_err(|e| de::Error::custom(format!("bad coordinate {s:?}: {e}")))
    }
}
