//! PKZIP compression method identifiers.

use std::fmt;

/// Compression method as recorded in a ZIP entry header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// No compression (method 0).
    #[default]
    Stored,
    /// Dynamic LZW (method 1).
    Shrunk,
    /// Follower-set expansion, factor 1 (method 2).
    Reduced1,
    /// Follower-set expansion, factor 2 (method 3).
    Reduced2,
    /// Follower-set expansion, factor 3 (method 4).
    Reduced3,
    /// Follower-set expansion, factor 4 (method 5).
    Reduced4,
    /// Shannon-Fano coded sliding dictionary (method 6).
    Imploded,
    /// DEFLATE (method 8).
    Deflated,
    /// DEFLATE64 with a 64 KB window (method 9).
    Deflate64,
    /// Any other identifier.
    Unknown(u16),
}

impl Method {
    /// Create from a header value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            1 => Self::Shrunk,
            2 => Self::Reduced1,
            3 => Self::Reduced2,
            4 => Self::Reduced3,
            5 => Self::Reduced4,
            6 => Self::Imploded,
            8 => Self::Deflated,
            9 => Self::Deflate64,
            _ => Self::Unknown(value),
        }
    }

    /// Header value of this method.
    pub fn id(&self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Shrunk => 1,
            Self::Reduced1 => 2,
            Self::Reduced2 => 3,
            Self::Reduced3 => 4,
            Self::Reduced4 => 5,
            Self::Imploded => 6,
            Self::Deflated => 8,
            Self::Deflate64 => 9,
            Self::Unknown(id) => *id,
        }
    }

    /// Reduce factor (1-4) for the Reduced methods.
    pub fn reduce_factor(&self) -> Option<u8> {
        match self {
            Self::Reduced1 => Some(1),
            Self::Reduced2 => Some(2),
            Self::Reduced3 => Some(3),
            Self::Reduced4 => Some(4),
            _ => None,
        }
    }

    /// Check if this method is "stored" (no compression).
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }

    /// Get the method name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored => "Stored",
            Self::Shrunk => "Shrunk",
            Self::Reduced1 => "Reduced1",
            Self::Reduced2 => "Reduced2",
            Self::Reduced3 => "Reduced3",
            Self::Reduced4 => "Reduced4",
            Self::Imploded => "Imploded",
            Self::Deflated => "Deflated",
            Self::Deflate64 => "Deflate64",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u16> for Method {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "Unknown({})", id),
            _ => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_ids() {
        for id in 0..=12u16 {
            assert_eq!(Method::from_u16(id).id(), id);
        }
        assert_eq!(Method::from_u16(8), Method::Deflated);
        assert_eq!(Method::from_u16(7), Method::Unknown(7));
    }

    #[test]
    fn test_reduce_factor() {
        assert_eq!(Method::Reduced1.reduce_factor(), Some(1));
        assert_eq!(Method::Reduced4.reduce_factor(), Some(4));
        assert_eq!(Method::Shrunk.reduce_factor(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Method::Deflate64.to_string(), "Deflate64");
        assert_eq!(Method::Unknown(99).to_string(), "Unknown(99)");
    }
}
