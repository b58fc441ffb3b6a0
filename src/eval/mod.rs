pub mod context;
pub mod func;
