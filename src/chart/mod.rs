pub mod builder;
pub mod figure;
pub mod render;
