use super::{Color, Surface};

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Character-cell surface. Each cell stands for `cell_width` x `cell_height`
/// pixels and shows how much paint has accumulated on it.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    columns: usize,
    rows: usize,
    cell_width: f32,
    cell_height: f32,
    coverage: Vec<f32>,
}

impl TerminalSurface {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self::with_cell_size(columns, rows, 8.0, 4.0)
    }

    pub fn with_cell_size(columns: usize, rows: usize, cell_width: f32, cell_height: f32) -> Self {
        Self {
            columns,
            rows,
            cell_width,
            cell_height,
            coverage: vec![0.0; columns * rows],
        }
    }

    /// Rows of text, top first.
    pub fn lines(&self) -> Vec<String> {
        self.coverage
            .chunks(self.columns.max(1))
            .map(|row| row.iter().map(|&c| Self::shade(c)).collect())
            .collect()
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    fn shade(coverage: f32) -> char {
        let steps = (SHADES.len() - 1) as f32;
        let index = (coverage.clamp(0.0, 1.0) * steps).ceil() as usize;
        SHADES[index.min(SHADES.len() - 1)]
    }

    fn cell_span(start: f32, length: f32, cell: f32, limit: usize) -> (usize, usize) {
        let first = (start / cell).floor().max(0.0) as usize;
        let end = ((start + length) / cell).ceil().max(0.0) as usize;
        (first.min(limit), end.min(limit))
    }
}

impl Surface for TerminalSurface {
    fn width(&self) -> f32 {
        self.columns as f32 * self.cell_width
    }

    fn height(&self) -> f32 {
        self.rows as f32 * self.cell_height
    }

    fn clear(&mut self) {
        self.coverage.fill(0.0);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let alpha = color.a.clamp(0.0, 1.0);
        let (c0, c1) = Self::cell_span(x, width, self.cell_width, self.columns);
        let (r0, r1) = Self::cell_span(y, height, self.cell_height, self.rows);

        for row in r0..r1 {
            for col in c0..c1 {
                let cell = &mut self.coverage[row * self.columns + col];
                *cell += alpha * (1.0 - *cell);
            }
        }
    }
}
