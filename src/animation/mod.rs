pub mod ease;
pub mod keyframe;
