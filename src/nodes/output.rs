use crate::foundation::error::GraphResult;
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{InputHandle, OutputHandle, PropertyBuilder};
use crate::render::surface::Texture;

/// Graph output: forwards its `Background` texture unchanged.
#[derive(Debug, Clone)]
pub struct Output {
    background: InputHandle<Option<Texture>>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for Output {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            background: props.create_input("Background", "Background", None)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "Output"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let background = cx.input(self.background)?;
        cx.set_output(self.output, background.clone());
        Ok(background)
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/output.rs"]
mod tests;
