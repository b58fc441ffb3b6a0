use crate::foundation::core::{PixelRegion, PixelSize, Rgba8Premul, Vec2};
use crate::foundation::error::{GraphError, GraphResult};
use crate::render::color::{Color, ColorSpace, convert_premul};
use crate::render::composite::{BlendMode, blend, blend_in_place};
use crate::render::frame::FrameRGBA;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// How surfaces are sampled at fractional coordinates.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Sampling {
    /// Closest texel.
    Nearest,
    /// Weighted average of the four surrounding texels.
    #[default]
    Bilinear,
}

/// Opacity and blend mode used when drawing one surface onto another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    /// Global opacity in `[0, 1]`.
    pub opacity: f32,
    /// Blend mode.
    pub blend: BlendMode,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend: BlendMode::Normal,
        }
    }
}

impl Paint {
    /// Paint with `blend` at `opacity`.
    pub fn new(blend: BlendMode, opacity: f32) -> Self {
        Self { opacity, blend }
    }
}

/// CPU pixel surface: premultiplied RGBA8 in a `vello_cpu` pixmap, tagged with a color space.
///
/// Disposing releases the pixel storage; every pixel operation afterwards fails with
/// [`GraphError::Disposed`].
pub struct Surface {
    id: u64,
    size: PixelSize,
    color_space: ColorSpace,
    pixmap: Option<vello_cpu::Pixmap>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("color_space", &self.color_space)
            .field("disposed", &self.pixmap.is_none())
            .finish()
    }
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(size: PixelSize, color_space: ColorSpace) -> GraphResult<Self> {
        size.validate()?;
        let w = u16::try_from(size.width)
            .map_err(|_| GraphError::validation(format!("surface width {}", size.width)))?;
        let h = u16::try_from(size.height)
            .map_err(|_| GraphError::validation(format!("surface height {}", size.height)))?;
        Ok(Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            size,
            color_space,
            pixmap: Some(vello_cpu::Pixmap::new(w, h)),
        })
    }

    /// Allocate a surface initialized from tightly packed premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(
        size: PixelSize,
        color_space: ColorSpace,
        data: &[u8],
    ) -> GraphResult<Self> {
        let mut s = Self::new(size, color_space)?;
        let dst = s.data_mut()?;
        if dst.len() != data.len() {
            return Err(GraphError::validation(format!(
                "expected {} bytes for a {size} surface, got {}",
                dst.len(),
                data.len()
            )));
        }
        dst.copy_from_slice(data);
        Ok(s)
    }

    /// Process-unique instance id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Dimensions in pixels.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Color space the pixels are encoded in.
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Return `true` once [`Surface::dispose`] ran.
    pub fn is_disposed(&self) -> bool {
        self.pixmap.is_none()
    }

    fn live(&self) -> GraphResult<&vello_cpu::Pixmap> {
        self.pixmap
            .as_ref()
            .ok_or_else(|| GraphError::disposed(format!("surface #{}", self.id)))
    }

    /// Backing pixmap, for rasterizing with `vello_cpu` directly.
    pub fn pixmap_mut(&mut self) -> GraphResult<&mut vello_cpu::Pixmap> {
        let id = self.id;
        self.pixmap
            .as_mut()
            .ok_or_else(|| GraphError::disposed(format!("surface #{id}")))
    }

    /// Premultiplied RGBA8 bytes.
    pub fn data(&self) -> GraphResult<&[u8]> {
        Ok(self.live()?.data_as_u8_slice())
    }

    /// Mutable premultiplied RGBA8 bytes.
    pub fn data_mut(&mut self) -> GraphResult<&mut [u8]> {
        Ok(self.pixmap_mut()?.data_as_u8_slice_mut())
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) -> GraphResult<()> {
        self.data_mut()?.fill(0);
        Ok(())
    }

    /// Fill with an sRGB-authored color, encoded for this surface's color space.
    pub fn fill(&mut self, color: Color) -> GraphResult<()> {
        let px = color.to_premul_in(self.color_space).to_array();
        for chunk in self.data_mut()?.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Ok(())
    }

    fn offset_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(((y as usize) * (self.size.width as usize) + (x as usize)) * 4)
    }

    /// Pixel at `(x, y)`; transparent outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> GraphResult<Rgba8Premul> {
        let data = self.data()?;
        Ok(match self.offset_of(x, y) {
            Some(i) => Rgba8Premul::from_array([data[i], data[i + 1], data[i + 2], data[i + 3]]),
            None => Rgba8Premul::TRANSPARENT,
        })
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8Premul) -> GraphResult<()> {
        let i = self.offset_of(x, y).ok_or_else(|| {
            GraphError::validation(format!("pixel ({x}, {y}) outside {} surface", self.size))
        })?;
        self.data_mut()?[i..i + 4].copy_from_slice(&px.to_array());
        Ok(())
    }

    /// Sample at normalized coordinates `uv` (texel centers at `(i + 0.5) / size`).
    pub fn sample(&self, uv: Vec2, sampling: Sampling) -> GraphResult<Rgba8Premul> {
        let fx = uv.x * f64::from(self.size.width);
        let fy = uv.y * f64::from(self.size.height);
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(self.size.width - 1)) as u32;
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(self.size.height - 1)) as u32;
        match sampling {
            Sampling::Nearest => self.pixel(clamp_x(fx.floor()), clamp_y(fy.floor())),
            Sampling::Bilinear => {
                let x = fx - 0.5;
                let y = fy - 0.5;
                let x0 = x.floor();
                let y0 = y.floor();
                let tx = x - x0;
                let ty = y - y0;
                let p00 = self.pixel(clamp_x(x0), clamp_y(y0))?.to_array();
                let p10 = self.pixel(clamp_x(x0 + 1.0), clamp_y(y0))?.to_array();
                let p01 = self.pixel(clamp_x(x0), clamp_y(y0 + 1.0))?.to_array();
                let p11 = self.pixel(clamp_x(x0 + 1.0), clamp_y(y0 + 1.0))?.to_array();
                let mut out = [0u8; 4];
                for i in 0..4 {
                    let top = f64::from(p00[i]) * (1.0 - tx) + f64::from(p10[i]) * tx;
                    let bottom = f64::from(p01[i]) * (1.0 - tx) + f64::from(p11[i]) * tx;
                    out[i] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
                }
                Ok(Rgba8Premul::from_array(out))
            }
        }
    }

    /// Composite `src` with its top-left corner at `offset`.
    pub fn draw_surface(&mut self, src: &Surface, offset: (i32, i32), paint: &Paint) -> GraphResult<()> {
        self.draw_surface_clipped(src, offset, paint, None)
    }

    /// Composite `src` at `offset`, touching only destination pixels inside `clip`.
    ///
    /// Pixels are converted from the source color space into this surface's color space
    /// before blending.
    pub fn draw_surface_clipped(
        &mut self,
        src: &Surface,
        offset: (i32, i32),
        paint: &Paint,
        clip: Option<PixelRegion>,
    ) -> GraphResult<()> {
        let (ox, oy) = offset;
        let src_size = src.size();
        let src_cs = src.color_space();
        let dst_cs = self.color_space;
        let dst_w = self.size.width as usize;
        let src_w = src_size.width as usize;

        let mut area = PixelRegion::new(ox, oy, src_size.width, src_size.height);
        for bound in [Some(PixelRegion::from_size(self.size)), clip].into_iter().flatten() {
            match area.intersect(bound) {
                Some(a) => area = a,
                None => return Ok(()),
            }
        }

        let src_data = src.data()?;
        let dst_data = self.data_mut()?;
        for y in area.y..area.bottom() {
            let sy = (y - oy) as usize;
            for x in area.x..area.right() {
                let sx = (x - ox) as usize;
                let si = (sy * src_w + sx) * 4;
                let di = ((y as usize) * dst_w + (x as usize)) * 4;
                let s = convert_premul(
                    [src_data[si], src_data[si + 1], src_data[si + 2], src_data[si + 3]],
                    src_cs,
                    dst_cs,
                );
                let d = [dst_data[di], dst_data[di + 1], dst_data[di + 2], dst_data[di + 3]];
                dst_data[di..di + 4].copy_from_slice(&blend(d, s, paint.opacity, paint.blend));
            }
        }
        Ok(())
    }

    /// Composite `src` stretched over the whole surface.
    pub fn draw_surface_stretched(
        &mut self,
        src: &Surface,
        paint: &Paint,
        sampling: Sampling,
    ) -> GraphResult<()> {
        if src.size() == self.size {
            return self.draw_surface(src, (0, 0), paint);
        }
        if src.size().is_empty() || self.size.is_empty() {
            return Ok(());
        }
        let src_cs = src.color_space();
        let dst_cs = self.color_space;
        let size = self.size;
        let mut row = Vec::with_capacity(size.width as usize * 4);
        for y in 0..size.height {
            row.clear();
            for x in 0..size.width {
                let uv = Vec2::new(
                    (f64::from(x) + 0.5) / f64::from(size.width),
                    (f64::from(y) + 0.5) / f64::from(size.height),
                );
                let s = convert_premul(src.sample(uv, sampling)?.to_array(), src_cs, dst_cs);
                row.extend_from_slice(&s);
            }
            let start = (y as usize) * (size.width as usize) * 4;
            let dst = &mut self.data_mut()?[start..start + row.len()];
            blend_in_place(dst, &row, paint.opacity, paint.blend)?;
        }
        Ok(())
    }

    /// Owned copy of the pixels, converted to sRGB.
    pub fn snapshot(&self) -> GraphResult<FrameRGBA> {
        let mut data = self.data()?.to_vec();
        if self.color_space != ColorSpace::Srgb {
            for px in data.chunks_exact_mut(4) {
                let out = convert_premul([px[0], px[1], px[2], px[3]], self.color_space, ColorSpace::Srgb);
                px.copy_from_slice(&out);
            }
        }
        Ok(FrameRGBA {
            width: self.size.width,
            height: self.size.height,
            data,
            premultiplied: true,
        })
    }

    /// Independent copy with a new id.
    pub fn duplicate(&self) -> GraphResult<Self> {
        Self::from_premul_rgba8(self.size, self.color_space, self.data()?)
    }

    /// Release the pixel storage. Returns `false` when already disposed.
    pub fn dispose(&mut self) -> bool {
        self.pixmap.take().is_some()
    }
}

/// Shared handle to a [`Surface`].
///
/// Textures are what properties carry and what node pools hand out. They are single-threaded
/// (`Rc<RefCell<_>>`); a surface that is being written cannot be read at the same time, and
/// such an overlap surfaces as [`GraphError::Evaluation`] instead of a panic.
#[derive(Clone)]
pub struct Texture(Rc<RefCell<Surface>>);

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(s) => f.debug_tuple("Texture").field(&*s).finish(),
            Err(_) => f.write_str("Texture(<busy>)"),
        }
    }
}

impl Texture {
    /// Allocate a transparent texture.
    pub fn new(size: PixelSize, color_space: ColorSpace) -> GraphResult<Self> {
        Ok(Self::from_surface(Surface::new(size, color_space)?))
    }

    /// Wrap an existing surface.
    pub fn from_surface(surface: Surface) -> Self {
        Self(Rc::new(RefCell::new(surface)))
    }

    /// Shared access to the surface.
    pub fn borrow(&self) -> GraphResult<Ref<'_, Surface>> {
        self.0
            .try_borrow()
            .map_err(|_| GraphError::evaluation("texture is being written"))
    }

    /// Exclusive access to the surface.
    pub fn borrow_mut(&self) -> GraphResult<RefMut<'_, Surface>> {
        self.0
            .try_borrow_mut()
            .map_err(|_| GraphError::evaluation("texture is in use"))
    }

    /// Return `true` when both handles point at the same surface instance.
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Dimensions in pixels.
    pub fn size(&self) -> GraphResult<PixelSize> {
        Ok(self.borrow()?.size())
    }

    /// Color space of the pixels.
    pub fn color_space(&self) -> GraphResult<ColorSpace> {
        Ok(self.borrow()?.color_space())
    }

    /// Return `true` when the surface was disposed. A surface that is currently borrowed
    /// mutably is live by definition.
    pub fn is_disposed(&self) -> bool {
        self.0.try_borrow().is_ok_and(|s| s.is_disposed())
    }

    /// Distinct owned copy of the pixels.
    pub fn copy(&self) -> GraphResult<Texture> {
        Ok(Self::from_surface(self.borrow()?.duplicate()?))
    }

    /// Owned sRGB snapshot.
    pub fn snapshot(&self) -> GraphResult<FrameRGBA> {
        self.borrow()?.snapshot()
    }

    /// Release the pixels. Returns `false` when already disposed.
    pub fn dispose(&self) -> GraphResult<bool> {
        Ok(self.borrow_mut()?.dispose())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
