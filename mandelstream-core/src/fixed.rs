use rug::integer::Order;
use rug::{Float, Integer};

/// Total width of the wire fixed-point format, in bits.
pub const FIXED_WIDTH_BITS: u32 = 256;

/// Integer bits above the binary point (two's complement, so the sign bit
/// lives here too). Three bits cover the ±3 coordinate domain.
pub const FIXED_INT_BITS: u32 = 3;

/// Fractional bits below the binary point.
pub const FIXED_FRAC_BITS: u32 = FIXED_WIDTH_BITS - FIXED_INT_BITS;

/// Number of 32-bit words one fixed-point value occupies on the wire.
pub const FIXED_WORDS: usize = (FIXED_WIDTH_BITS / 32) as usize;

/// Integer-part saturation bounds. Coordinates whose magnitude leaves the
/// domain of interest saturate here rather than wrapping.
const INT_MAX: i32 = 3;
const INT_MIN: i32 = -3;

/// A signed Q3.253 fixed-point coordinate, the accelerator's native number
/// format.
///
/// Encoding is deliberately asymmetric: [`encode`](Self::encode) saturates
/// the integer part to `[-3, 3]` and truncates the scaled value toward
/// zero, while the word serialization and [`to_float`](Self::to_float) are
/// exact integer arithmetic. Worst-case coordinate error is therefore one
/// unit in the last fractional bit, plus the saturation error for inputs
/// outside ±3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed256(Integer);

impl Fixed256 {
    /// Encode an arbitrary-precision value.
    ///
    /// The integer part is clamped to `[-3, 3]` before scaling by
    /// `2^253`; the scaled value is truncated (not rounded) toward zero.
    /// Non-finite inputs encode as zero.
    pub fn encode(x: &Float) -> Self {
        if !x.is_finite() {
            return Self(Integer::new());
        }
        let prec = x.prec().max(FIXED_WIDTH_BITS);
        let int_part = x.clone().trunc();
        let frac = Float::with_val(prec, x - &int_part);
        let int_clamped = int_part
            .to_i32_saturating()
            .unwrap_or(0)
            .clamp(INT_MIN, INT_MAX);
        let scaled = (frac + int_clamped) << FIXED_FRAC_BITS;
        // Finite by the check above, so the conversion cannot fail.
        Self(scaled.trunc().to_integer().unwrap_or_default())
    }

    /// Reconstruct from the raw 256-bit integer (in Q3.253 units).
    pub fn from_raw(raw: Integer) -> Self {
        Self(raw)
    }

    /// The raw fixed-point integer, in units of `2^-253`.
    pub fn raw(&self) -> &Integer {
        &self.0
    }

    /// Serialize into wire order: the value is laid out as a 256-bit
    /// two's-complement big-endian byte string, sliced into 32-bit groups,
    /// and the group holding the least significant bits is emitted first
    /// (little-endian word packing, as the accelerator expects).
    pub fn to_words(&self) -> [u32; FIXED_WORDS] {
        let mut v = self.0.clone();
        if v.is_negative() {
            // Wrap into the unsigned 256-bit space.
            v += Integer::from(1) << FIXED_WIDTH_BITS;
        }
        let digits = v.to_digits::<u32>(Order::Lsf);
        let mut words = [0u32; FIXED_WORDS];
        words[..digits.len()].copy_from_slice(&digits);
        words
    }

    /// Inverse of [`to_words`](Self::to_words). Exact.
    pub fn from_words(words: &[u32; FIXED_WORDS]) -> Self {
        let mut v = Integer::from_digits(words, Order::Lsf);
        if v.get_bit(FIXED_WIDTH_BITS - 1) {
            v -= Integer::from(1) << FIXED_WIDTH_BITS;
        }
        Self(v)
    }

    /// Exact conversion back to an arbitrary-precision value.
    pub fn to_float(&self) -> Float {
        Float::with_val(FIXED_WIDTH_BITS, &self.0) >> FIXED_FRAC_BITS
    }

    /// Lossy `f64` view, for software models and diagnostics.
    pub fn to_f64(&self) -> f64 {
        self.to_float().to_f64()
    }
}
