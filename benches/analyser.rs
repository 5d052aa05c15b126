//! Per-frame costs of the visualizer: one analyser pass and one bar paint.
//!
//! Run with: cargo bench --bench analyser

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bassbars::audio::{Analyser, FrequencyFrame, BIN_COUNT, FFT_SIZE};
use bassbars::render::{paint_bars, BarStyle, PixelCanvas, TerminalSurface};

fn sine_block(freq: f32, sample_rate: f32) -> Vec<f32> {
    (0..FFT_SIZE)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.1)
        .collect()
}

fn bench_analyser(c: &mut Criterion) {
    let mut analyser = Analyser::new();
    if let Ok(mut tap) = analyser.tap().lock() {
        tap.extend(&sine_block(440.0, 44_100.0));
    }
    let mut bins = [0u8; BIN_COUNT];

    c.bench_function("byte_frequency_data", |b| {
        b.iter(|| {
            analyser.byte_frequency_data(&mut bins);
            black_box(&bins);
        })
    });
}

fn bench_paint(c: &mut Criterion) {
    let mut bins = [0u8; BIN_COUNT];
    for (i, bin) in bins.iter_mut().enumerate() {
        *bin = (255 - i * 2) as u8;
    }
    let frame = FrequencyFrame::from_bins(bins);
    let style = BarStyle::default();

    let mut group = c.benchmark_group("paint_bars");
    let mut canvas = PixelCanvas::new(1200, 800);
    group.bench_function("pixel_canvas", |b| {
        b.iter(|| paint_bars(&mut canvas, black_box(&frame), &style))
    });
    let mut terminal = TerminalSurface::new(96, 24);
    group.bench_function("terminal", |b| {
        b.iter(|| paint_bars(&mut terminal, black_box(&frame), &style))
    });
    group.finish();
}

criterion_group!(benches, bench_analyser, bench_paint);
criterion_main!(benches);
