//! Built-in node kinds.
//!
//! Every texture-producing kind exposes its result through an `Output` texture output, so
//! kinds chain by connecting `Output` to an image input of the next node.

pub mod color;
pub mod func;
pub mod image_layer;
pub mod merge;
pub mod modify_image;
pub mod nested;
pub mod output;
pub mod shape;

pub use color::{CombineColor, FlatColor, Tint};
pub use func::{Coordinate, Easing, SeparateVec2};
pub use image_layer::{ImageLayer, RasterFrame};
pub use merge::Merge;
pub use modify_image::{ModifyImageLeft, ModifyImageRight};
pub use nested::NestedDocument;
pub use output::Output;
pub use shape::Rectangle;
