use crate::foundation::error::{GraphError, GraphResult};
use std::fmt;

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Stable identity of a node inside a graph.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub uuid::Uuid);

impl NodeId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point on the animation timeline.
///
/// `frame` is the absolute frame; `normalized_time` is the position inside the active clip
/// in `[0, 1]`, used by time-driven nodes.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyFrameTime {
    /// Absolute frame index.
    pub frame: i32,
    /// Normalized playback position.
    pub normalized_time: f64,
}

impl KeyFrameTime {
    /// Time at `frame` with a zero normalized position.
    pub fn new(frame: i32) -> Self {
        Self {
            frame,
            normalized_time: 0.0,
        }
    }

    /// Time at `frame` inside a timeline of `total_frames` frames.
    pub fn with_total(frame: i32, total_frames: i32) -> Self {
        let normalized_time = if total_frames <= 1 {
            0.0
        } else {
            (f64::from(frame) / f64::from(total_frames - 1)).clamp(0.0, 1.0)
        };
        Self {
            frame,
            normalized_time,
        }
    }
}

impl Default for KeyFrameTime {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Preview quality tier. Lower tiers render at a fraction of the document size.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ResolutionTier {
    /// 1:1.
    #[default]
    Full,
    /// 1:2.
    Half,
    /// 1:4.
    Quarter,
    /// 1:8.
    Eighth,
}

impl ResolutionTier {
    /// Linear scale factor applied to document dimensions.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Full => 1.0,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
            Self::Eighth => 0.125,
        }
    }

    /// Scale `size` to this tier. Dimensions round up and never drop below one pixel.
    pub fn scale_size(self, size: PixelSize) -> PixelSize {
        let m = self.multiplier();
        let scale = |v: u32| -> u32 {
            if v == 0 {
                return 0;
            }
            ((f64::from(v) * m).ceil() as u32).max(1)
        };
        PixelSize::new(scale(size.width), scale(size.height))
    }

    /// Scale a document-space region to this tier, covering every touched pixel.
    pub fn scale_region(self, region: PixelRegion) -> PixelRegion {
        let m = self.multiplier();
        let x0 = (f64::from(region.x) * m).floor() as i32;
        let y0 = (f64::from(region.y) * m).floor() as i32;
        let x1 = (f64::from(region.right()) * m).ceil() as i32;
        let y1 = (f64::from(region.bottom()) * m).ceil() as i32;
        PixelRegion::new(x0, y0, (x1 - x0).max(0) as u32, (y1 - y0).max(0) as u32)
    }
}

/// Integer surface dimensions in pixels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Largest edge a CPU surface can have.
    pub const MAX_EDGE: u32 = u16::MAX as u32;

    /// Build a size without validation.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub fn area(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Return `true` when either edge is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check that a surface of this size can be allocated.
    pub fn validate(self) -> GraphResult<()> {
        if self.is_empty() {
            return Err(GraphError::validation(format!(
                "surface size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > Self::MAX_EDGE || self.height > Self::MAX_EDGE {
            return Err(GraphError::validation(format!(
                "surface size {}x{} exceeds {} pixels per edge",
                self.width,
                self.height,
                Self::MAX_EDGE
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned pixel rectangle `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRegion {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRegion {
    /// Build a region from its origin and extent.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole surface of `size`.
    pub fn from_size(size: PixelSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Exclusive right edge.
    pub fn right(self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    /// Return `true` when the region covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Return `true` when pixel `(x, y)` lies inside the region.
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlap of two regions, or `None` when they do not touch.
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Region as a floating point rectangle.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }
}

/// Premultiplied RGBA8 pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba8Premul {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent pixel.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            crate::foundation::math::mul_div255_u8(u16::from(c), u16::from(a))
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Build from a `[r, g, b, a]` array.
    pub fn from_array(px: [u8; 4]) -> Self {
        Self {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        }
    }

    /// Channels as a `[r, g, b, a]` array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
