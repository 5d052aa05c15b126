//! wgpu window surface for the bar painter.

pub mod engine;
pub mod shader;
pub mod vertex;

pub use engine::GraphicsEngine;
pub use shader::BarPipeline;
pub use vertex::{rect_vertices, Vertex, VertexBuffer};
