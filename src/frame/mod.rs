pub mod frame_model;
pub mod geometry;
pub mod resolver;
