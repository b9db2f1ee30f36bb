//! Reduce factor configuration (PKZIP methods 2-5).

use pkcodec_core::error::{CodecError, Result};
use pkcodec_core::method::Method;

/// Reduce compression factor (1-4).
///
/// The factor splits the byte after an escape into a length part (low
/// bits) and the high bits of the distance. Higher factors trade length
/// range for distance range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReduceFactor(u8);

impl ReduceFactor {
    /// Factor 1 (method 2): 7 length bits, distances up to 512.
    pub const ONE: Self = Self(1);
    /// Factor 2 (method 3): 6 length bits, distances up to 1K.
    pub const TWO: Self = Self(2);
    /// Factor 3 (method 4): 5 length bits, distances up to 2K.
    pub const THREE: Self = Self(3);
    /// Factor 4 (method 5): 4 length bits, distances up to 4K.
    pub const FOUR: Self = Self(4);

    const L_TABLE: [u8; 5] = [0, 0x7f, 0x3f, 0x1f, 0x0f];
    const D_SHIFT: [u8; 5] = [0, 7, 6, 5, 4];
    const D_MASK: [u8; 5] = [0, 0x01, 0x03, 0x07, 0x0f];

    /// Create a factor, rejecting values outside 1-4.
    pub fn new(factor: u8) -> Result<Self> {
        if !(1..=4).contains(&factor) {
            return Err(CodecError::unsupported_method(format!(
                "Reduce factor {}",
                factor
            )));
        }
        Ok(Self(factor))
    }

    /// Factor for a Reduced method, `None` for any other method.
    pub fn from_method(method: Method) -> Option<Self> {
        method.reduce_factor().map(Self)
    }

    /// The factor value.
    pub fn factor(&self) -> u8 {
        self.0
    }

    /// Mask for the length bits of the escape byte.
    pub fn l_mask(&self) -> u8 {
        Self::L_TABLE[self.0 as usize]
    }

    /// Shift taking the escape byte to the high distance bits.
    pub fn d_shift(&self) -> u8 {
        Self::D_SHIFT[self.0 as usize]
    }

    /// Mask for the high distance bits after shifting.
    pub fn d_mask(&self) -> u8 {
        Self::D_MASK[self.0 as usize]
    }

    /// Largest back-reference distance.
    pub fn max_distance(&self) -> usize {
        ((self.d_mask() as usize) << 8) + 0xff + 1
    }
}

impl TryFrom<u8> for ReduceFactor {
    type Error = CodecError;

    fn try_from(factor: u8) -> Result<Self> {
        Self::new(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_tables() {
        let f = ReduceFactor::ONE;
        assert_eq!((f.l_mask(), f.d_shift(), f.d_mask()), (0x7f, 7, 1));
        assert_eq!(f.max_distance(), 512);

        let f = ReduceFactor::FOUR;
        assert_eq!((f.l_mask(), f.d_shift(), f.d_mask()), (0x0f, 4, 0x0f));
        assert_eq!(f.max_distance(), 4096);
    }

    #[test]
    fn test_length_and_distance_bits_fill_a_byte() {
        for factor in 1..=4 {
            let f = ReduceFactor::new(factor).unwrap();
            assert_eq!(f.l_mask() as u32 + 1, 1 << f.d_shift());
            assert_eq!(0xffu8 >> f.d_shift(), f.d_mask());
        }
    }

    #[test]
    fn test_invalid_factor() {
        assert_eq!(ReduceFactor::new(0).unwrap_err().code(), 8);
        assert!(ReduceFactor::try_from(5).is_err());
    }

    #[test]
    fn test_from_method() {
        assert_eq!(
            ReduceFactor::from_method(Method::Reduced3),
            Some(ReduceFactor::THREE)
        );
        assert_eq!(ReduceFactor::from_method(Method::Shrunk), None);
        assert_eq!(ReduceFactor::from_method(Method::from_u16(2)), Some(ReduceFactor::ONE));
    }
}
