use std::fmt;

/// Default render size when the consumer does not request one.
pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 512;

/// Canonical size descriptor: appended to an item's base URL to request a
/// resized rendition, and used verbatim as the byte-cache key. Equal
/// (width, height, crop) triples always render to the same string, so cache
/// lookups never miss on formatting differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeDescriptor {
    pub width: u32,
    pub height: u32,
    pub crop: bool,
}

impl SizeDescriptor {
    pub fn new(width: u32, height: u32, crop: bool) -> Self {
        Self {
            width,
            height,
            crop,
        }
    }

    /// Descriptor for a consumer request, falling back to the default
    /// 1024x512 canvas for unspecified dimensions.
    pub fn from_request(width: Option<u32>, height: Option<u32>, crop: bool) -> Self {
        Self {
            width: width.unwrap_or(DEFAULT_WIDTH),
            height: height.unwrap_or(DEFAULT_HEIGHT),
            crop,
        }
    }
}

impl fmt::Display for SizeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "=w{}-h{}", self.width, self.height)?;
        if self.crop {
            write!(f, "-c")?;
        }
        Ok(())
    }
}
