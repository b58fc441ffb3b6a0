use crate::foundation::error::{GraphError, GraphResult};
use anyhow::Context as _;
use std::path::Path;

/// A rendered frame as RGBA8 pixels, detached from any pooled surface.
///
/// Frames produced by the engine are premultiplied alpha. The `premultiplied` flag makes this
/// explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Straight-alpha copy suitable for image encoders.
    pub fn to_rgba_image(&self) -> GraphResult<image::RgbaImage> {
        let mut data = self.data.clone();
        if self.premultiplied {
            for px in data.chunks_exact_mut(4) {
                let a = u32::from(px[3]);
                if a == 0 {
                    px[..3].fill(0);
                    continue;
                }
                for c in &mut px[..3] {
                    *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, data).ok_or_else(|| {
            GraphError::validation(format!(
                "frame buffer does not match {}x{}",
                self.width, self.height
            ))
        })
    }

    /// Encode as PNG at `path`.
    pub fn save_png(&self, path: &Path) -> GraphResult<()> {
        let img = self.to_rgba_image()?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
