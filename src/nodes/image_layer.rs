//! Raster layers backed by key-frame payloads.

use crate::animation::keyframe::KeyFramePayload;
use crate::foundation::core::{PixelRegion, PixelSize, Rgba8Premul};
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8};
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{InputHandle, OutputHandle, PropertyBuilder};
use crate::render::color::{Color, ColorSpace};
use crate::render::surface::Texture;

/// Pixels of one key frame of an [`ImageLayer`]: premultiplied sRGB RGBA8 in document
/// space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    size: PixelSize,
    pixels: Vec<u8>,
    dirty: bool,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RasterFrameDoc {
    size: PixelSize,
    pixels: Vec<u8>,
}

impl RasterFrame {
    /// Transparent frame.
    pub fn new(size: PixelSize) -> GraphResult<Self> {
        size.validate()?;
        Ok(Self {
            size,
            pixels: vec![0; size.area() * 4],
            dirty: true,
        })
    }

    /// Frame filled with `color`.
    pub fn filled(size: PixelSize, color: Color) -> GraphResult<Self> {
        let mut frame = Self::new(size)?;
        let px = color.to_premul_in(ColorSpace::Srgb).to_array();
        for chunk in frame.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Ok(frame)
    }

    /// Frame over existing premultiplied bytes.
    pub fn from_premul_rgba8(size: PixelSize, pixels: Vec<u8>) -> GraphResult<Self> {
        size.validate()?;
        if pixels.len() != size.area() * 4 {
            return Err(GraphError::validation(format!(
                "raster frame {size} needs {} bytes, got {}",
                size.area() * 4,
                pixels.len()
            )));
        }
        Ok(Self {
            size,
            pixels,
            dirty: true,
        })
    }

    /// Restore from [`KeyFramePayload::to_json`] output.
    pub fn from_json(value: &serde_json::Value) -> GraphResult<Self> {
        let doc: RasterFrameDoc = serde_json::from_value(value.clone())
            .map_err(|e| GraphError::serde(format!("raster frame: {e}")))?;
        Self::from_premul_rgba8(doc.size, doc.pixels)
    }

    /// Dimensions in document pixels.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Premultiplied RGBA8 bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at `(x, y)`; transparent outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8Premul {
        if x >= self.size.width || y >= self.size.height {
            return Rgba8Premul::TRANSPARENT;
        }
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        Rgba8Premul::from_array([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Paint one pixel. The owning layer recomputes on its next evaluation.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8Premul) -> GraphResult<()> {
        if x >= self.size.width || y >= self.size.height {
            return Err(GraphError::validation(format!(
                "pixel ({x}, {y}) outside raster frame {}",
                self.size
            )));
        }
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&px.to_array());
        self.dirty = true;
        Ok(())
    }
}

impl KeyFramePayload for RasterFrame {
    fn clone_payload(&self) -> Option<Box<dyn KeyFramePayload>> {
        Some(Box::new(self.clone()))
    }

    fn requires_update(&self) -> bool {
        self.dirty
    }

    fn mark_updated(&mut self) {
        self.dirty = false;
    }

    fn to_json(&self) -> GraphResult<serde_json::Value> {
        serde_json::to_value(RasterFrameDoc {
            size: self.size,
            pixels: self.pixels.clone(),
        })
        .map_err(|e| GraphError::serde(format!("raster frame: {e}")))
    }
}

/// Shows the [`RasterFrame`] of the active key frame, scaled to the resolution tier and
/// limited to the requested region.
#[derive(Debug, Clone)]
pub struct ImageLayer {
    opacity: InputHandle<f64>,
    visible: InputHandle<bool>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for ImageLayer {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            opacity: props.create_input("Opacity", "Opacity", 1.0)?,
            visible: props.create_input("IsVisible", "Visible", true)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "ImageLayer"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers {
            resolution: true,
            region: true,
            ..CacheTriggers::NONE
        }
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let frame = cx
            .active_key_frame()
            .filter(|k| k.is_visible())
            .and_then(|k| k.payload_as::<RasterFrame>());
        let visible = cx.input(self.visible)?;
        let size = cx.output_size();
        let Some(frame) = frame.filter(|_| visible && !size.is_empty()) else {
            cx.set_output(self.output, None);
            return Ok(None);
        };

        let out = cx.request_texture(0, size, ColorSpace::Srgb)?;
        let bounds = PixelRegion::from_size(size);
        let clip = match cx.render().scaled_region() {
            Some(region) => region.intersect(bounds),
            None => Some(bounds),
        };
        if let Some(clip) = clip {
            let m = cx.render().resolution.multiplier();
            let opacity = u16::from(unit_to_u8(cx.input(self.opacity)?));
            let mut dst = out.borrow_mut()?;
            let data = dst.data_mut()?;
            for y in clip.y..clip.bottom() {
                let sy = ((f64::from(y) + 0.5) / m).floor() as u32;
                for x in clip.x..clip.right() {
                    let sx = ((f64::from(x) + 0.5) / m).floor() as u32;
                    let px = frame.pixel(sx, sy).to_array();
                    let i = (y as usize * size.width as usize + x as usize) * 4;
                    for c in 0..4 {
                        data[i + c] = mul_div255_u8(u16::from(px[c]), opacity);
                    }
                }
            }
        }
        cx.set_output(self.output, Some(out.clone()));
        Ok(Some(out))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }

    fn key_frame_payload_from_json(
        &self,
        data: &serde_json::Value,
    ) -> GraphResult<Box<dyn KeyFramePayload>> {
        Ok(Box::new(RasterFrame::from_json(data)?))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/image_layer.rs"]
mod tests;
