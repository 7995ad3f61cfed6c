use eyre::{bail, eyre, Result};
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;

/// An RGB image, 3 bytes per pixel, rows top to bottom.
#[derive(Debug, Clone)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    /// Color at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        match self.pixels.get(i..i + 3)? {
            &[r, g, b] => Some((r, g, b)),
            _ => None,
        }
    }
}

// Samples of matplotlib's viridis map at 0, 1/8, ..., 1.
const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

/// Maps `t` in [0, 1] onto the viridis color map.
pub fn viridis(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f64;
    let i = (t.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = t - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Renders each matrix as a heat map, stacked top to bottom with no gap.
/// Every panel is `panel_size` pixels; cells are square and centered.
pub fn render_panels(matrices: &[&Array2<f64>], panel_size: (u32, u32)) -> Result<Raster> {
    if matrices.is_empty() {
        bail!("nothing to render");
    }
    let (width, panel_height) = panel_size;
    let height = panel_height * matrices.len() as u32;
    let mut pixels = vec![255u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| eyre!("failed to clear canvas: {e:?}"))?;
        let panels = root.split_evenly((matrices.len(), 1));
        for (panel, matrix) in panels.iter().zip(matrices) {
            draw_heatmap(panel, matrix)?;
        }
        root.present().map_err(|e| eyre!("failed to render heat map: {e:?}"))?;
    }
    Ok(Raster {
        width,
        height,
        pixels,
    })
}

fn draw_heatmap<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, m: &Array2<f64>) -> Result<()> {
    let (rows, cols) = m.dim();
    if rows == 0 || cols == 0 {
        return Ok(());
    }
    let (lo, hi) = value_range(m);
    let (pw, ph) = area.dim_in_pixel();
    let cell = (pw as f64 / cols as f64).min(ph as f64 / rows as f64);
    let x_off = (pw as f64 - cell * cols as f64) / 2.0;
    let y_off = (ph as f64 - cell * rows as f64) / 2.0;
    let edge = |offset: f64, i: usize| (offset + i as f64 * cell).round() as i32;

    for ((r, c), &value) in m.indexed_iter() {
        if !value.is_finite() {
            continue;
        }
        let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.0 };
        let (x0, y0) = (edge(x_off, c), edge(y_off, r));
        let x1 = edge(x_off, c + 1).max(x0 + 1);
        let y1 = edge(y_off, r + 1).max(y0 + 1);
        area.draw(&Rectangle::new([(x0, y0), (x1 - 1, y1 - 1)], viridis(t).filled()))
            .map_err(|e| eyre!("failed to draw cell ({r}, {c}): {e:?}"))?;
    }

    let frame = [
        (edge(x_off, 0), edge(y_off, 0)),
        (edge(x_off, cols) - 1, edge(y_off, rows) - 1),
    ];
    area.draw(&Rectangle::new(frame, BLACK.stroke_width(1)))
        .map_err(|e| eyre!("failed to draw frame: {e:?}"))?;
    Ok(())
}

fn value_range(m: &Array2<f64>) -> (f64, f64) {
    m.iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
