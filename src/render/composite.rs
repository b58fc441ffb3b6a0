use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::mul_div255_u8;

/// Premultiplied RGBA8 pixel as raw channels.
pub type PremulRgba8 = [u8; 4];

/// Porter-Duff and separable blend modes available to nodes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum BlendMode {
    /// Source over destination.
    #[default]
    Normal,
    /// Source replaces destination.
    Src,
    /// Channel product, composited over.
    Multiply,
    /// Inverse product of inverses, composited over.
    Screen,
    /// Destination kept where the source is opaque.
    DstIn,
}

/// Blend one premultiplied source pixel into a destination pixel.
pub fn blend(dst: PremulRgba8, src: PremulRgba8, opacity: f32, mode: BlendMode) -> PremulRgba8 {
    let op = opacity_u8(opacity);
    let s = scale(src, op);
    match mode {
        BlendMode::Normal => over(dst, s),
        BlendMode::Src => s,
        BlendMode::Multiply => multiply(dst, s),
        BlendMode::Screen => screen(dst, s),
        BlendMode::DstIn => scale(dst, s[3]),
    }
}

/// Blend equal-length premultiplied RGBA8 buffers in place.
pub fn blend_in_place(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
    mode: BlendMode,
) -> GraphResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(GraphError::evaluation(
            "blend_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = blend([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity, mode);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn opacity_u8(opacity: f32) -> u8 {
    ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u8
}

fn scale(px: PremulRgba8, k: u8) -> PremulRgba8 {
    if k == 255 {
        return px;
    }
    let k = u16::from(k);
    [
        mul_div255_u8(u16::from(px[0]), k),
        mul_div255_u8(u16::from(px[1]), k),
        mul_div255_u8(u16::from(px[2]), k),
        mul_div255_u8(u16::from(px[3]), k),
    ]
}

fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        // Premultiplied colors with zero alpha may still carry additive light; keep it.
        return add(dst, src);
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

fn add(a: PremulRgba8, b: PremulRgba8) -> PremulRgba8 {
    [
        a[0].saturating_add(b[0]),
        a[1].saturating_add(b[1]),
        a[2].saturating_add(b[2]),
        a[3].saturating_add(b[3]),
    ]
}

fn multiply(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    let da = u16::from(dst[3]);
    let mut out = [0u8; 4];
    for i in 0..3 {
        let s = u16::from(src[i]);
        let d = u16::from(dst[i]);
        let v = u16::from(mul_div255_u8(s, d))
            + u16::from(mul_div255_u8(s, 255 - da))
            + u16::from(mul_div255_u8(d, 255 - sa));
        out[i] = v.min(255) as u8;
    }
    out[3] = alpha_union(sa, da);
    out
}

fn screen(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let mut out = [0u8; 4];
    for i in 0..3 {
        let s = u16::from(src[i]);
        let d = u16::from(dst[i]);
        let v = (s + d).saturating_sub(u16::from(mul_div255_u8(s, d)));
        out[i] = v.min(255) as u8;
    }
    out[3] = alpha_union(u16::from(src[3]), u16::from(dst[3]));
    out
}

fn alpha_union(sa: u16, da: u16) -> u8 {
    (sa + da).saturating_sub(u16::from(mul_div255_u8(sa, da))).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
