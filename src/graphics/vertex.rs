use bytemuck::{Pod, Zeroable};

use crate::render::Color;

/// Corner of a filled rectangle, in surface pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Two triangles covering `x..x+width`, `y..y+height`.
pub fn rect_vertices(x: f32, y: f32, width: f32, height: f32, color: Color) -> [Vertex; 6] {
    let color = color.to_rgba_f32();
    let (x1, y1) = (x + width, y + height);
    let corner = |px: f32, py: f32| Vertex {
        position: [px, py],
        color,
    };
    [
        corner(x, y),
        corner(x, y1),
        corner(x1, y1),
        corner(x, y),
        corner(x1, y1),
        corner(x1, y),
    ]
}

/// GPU vertex buffer that grows when a frame needs more room.
pub struct VertexBuffer {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
    capacity: usize,
}

impl VertexBuffer {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        Self {
            buffer: Self::allocate(device, capacity),
            vertex_count: 0,
            capacity,
        }
    }

    fn allocate(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Bar Vertex Buffer"),
            size: (capacity.max(1) * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertices: &[Vertex]) {
        if vertices.len() > self.capacity {
            self.capacity = vertices.len().next_power_of_two();
            self.buffer = Self::allocate(device, self.capacity);
        }
        if !vertices.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(vertices));
        }
        self.vertex_count = vertices.len() as u32;
    }
}
