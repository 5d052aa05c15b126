use super::{Color, Surface};

/// Software RGBA8 surface. `clear` makes every pixel transparent black and
/// `fill_rect` blends source-over, sampling at pixel centres.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    /// Pixel index range covered along one axis.
    fn span(start: f32, length: f32, limit: u32) -> (u32, u32) {
        let first = (start - 0.5).ceil().max(0.0);
        let end = (start + length - 0.5).ceil().clamp(0.0, limit as f32);
        (first as u32, end as u32)
    }

    fn blend(dst: [u8; 4], color: Color) -> [u8; 4] {
        let src_a = color.a.clamp(0.0, 1.0);
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            return [0; 4];
        }

        let channel = |s: u8, d: u8| {
            let value = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        [
            channel(color.r, dst[0]),
            channel(color.g, dst[1]),
            channel(color.b, dst[2]),
            (out_a * 255.0).round() as u8,
        ]
    }
}

impl Surface for PixelCanvas {
    fn width(&self) -> f32 {
        self.width as f32
    }

    fn height(&self) -> f32 {
        self.height as f32
    }

    fn clear(&mut self) {
        self.pixels.fill([0; 4]);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let (x0, x1) = Self::span(x, width, self.width);
        let (y0, y1) = Self::span(y, height, self.height);

        for row in y0..y1 {
            let base = (row * self.width) as usize;
            for col in x0..x1 {
                let pixel = &mut self.pixels[base + col as usize];
                *pixel = Self::blend(*pixel, color);
            }
        }
    }
}
