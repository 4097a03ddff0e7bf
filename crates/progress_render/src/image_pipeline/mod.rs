pub mod canvas;
pub mod loader;
pub mod normalize;
