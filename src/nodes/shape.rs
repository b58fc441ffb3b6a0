use crate::foundation::core::Vec2;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{InputHandle, OutputHandle, PropertyBuilder};
use crate::render::color::{Color, ColorSpace};
use crate::render::surface::Texture;

/// Axis-aligned filled rectangle, rasterized with `vello_cpu`.
///
/// `Center` and `Size` are in document pixels. The result is a document-sized sRGB
/// texture.
#[derive(Debug, Clone)]
pub struct Rectangle {
    center: InputHandle<Vec2>,
    size: InputHandle<Vec2>,
    fill: InputHandle<Color>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for Rectangle {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            center: props.create_input("Center", "Center", Vec2::new(16.0, 16.0))?,
            size: props.create_input("Size", "Size", Vec2::new(16.0, 16.0))?,
            fill: props.create_input("Fill", "Fill", Color::WHITE)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "Rectangle"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers {
            resolution: true,
            ..CacheTriggers::NONE
        }
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let size = cx.output_size();
        if size.is_empty() {
            cx.set_output(self.output, None);
            return Ok(None);
        }
        let center = cx.input(self.center)?;
        let extent = cx.input(self.size)?;
        let [r, g, b, a] = cx.input(self.fill)?.to_rgba8();
        let m = cx.render().resolution.multiplier();

        let to_u16 = |v: u32| {
            u16::try_from(v).map_err(|_| GraphError::validation(format!("{size} is too large")))
        };
        let out = cx.request_texture(0, size, ColorSpace::Srgb)?;
        let mut ctx = vello_cpu::RenderContext::new(to_u16(size.width)?, to_u16(size.height)?);
        ctx.set_transform(vello_cpu::kurbo::Affine::scale(m));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            center.x - extent.x.abs() / 2.0,
            center.y - extent.y.abs() / 2.0,
            center.x + extent.x.abs() / 2.0,
            center.y + extent.y.abs() / 2.0,
        ));
        ctx.flush();
        ctx.render_to_pixmap(out.borrow_mut()?.pixmap_mut()?);

        cx.set_output(self.output, Some(out.clone()));
        Ok(Some(out))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/shape.rs"]
mod tests;
