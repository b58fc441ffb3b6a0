pub mod color;
pub mod composite;
pub mod frame;
pub mod pool;
pub mod surface;
