use crate::electrode::ElectrodePosition;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DEFAULT_FIELD_SIZE: u32 = 512;

/// Raster pixels per grid cell.
const CELL_SIZE: usize = 4;
/// Search radius, in cells, when diffusing into empty cells.
const FILL_RADIUS: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoltageSample {
    pub position: ElectrodePosition,
    pub voltage: f64,
}

/// RGBA8 raster, row-major, straight (non-premultiplied) alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, side: usize, rgba: [u8; 4]) {
        for y in y0..(y0 + side).min(self.height as usize) {
            for x in x0..(x0 + side).min(self.width as usize) {
                let idx = (y * self.width as usize + x) * 4;
                self.pixels[idx..idx + 4].copy_from_slice(&rgba);
            }
        }
    }
}

/// Project voltage samples onto a spherical UV map and diffuse them into
/// a smoothed color raster.
///
/// Positions are unit-normalized, converted to spherical angles
/// (`phi = acos(-y)`, `theta = atan2(z, x)`) and binned into a coarse
/// grid (one cell per 4×4 pixels). Populated cells hold the mean of
/// their samples; empty cells take an inverse-squared-distance average
/// of populated neighbors within a 5-cell window; a 3×3 Gaussian pass
/// smooths the interior. Values are then min-max normalized and mapped
/// to a blue(240°)→red(0°) hue ramp, alpha `min(0.9, n·1.5)`.
///
/// Colors are comparable only within one call: the normalization is
/// relative to the observed range, not absolute µV. No samples → a fully
/// transparent raster. Deterministic and infallible.
pub fn rasterize_voltage_field(samples: &[VoltageSample], width: u32, height: u32) -> Raster {
    let mut raster = Raster::transparent(width, height);
    if samples.is_empty() || width == 0 || height == 0 {
        return raster;
    }
    let grid_w = (width as usize).div_ceil(CELL_SIZE);
    let grid_h = (height as usize).div_ceil(CELL_SIZE);

    let mut sums = vec![0.0f64; grid_w * grid_h];
    let mut counts = vec![0u32; grid_w * grid_h];
    for sample in samples {
        let p = sample.position.normalized();
        let phi = (-p.y).clamp(-1.0, 1.0).acos();
        let theta = p.z.atan2(p.x);
        let u = (theta + PI) / (2.0 * PI);
        let v = phi / PI;
        let gx = (u * grid_w as f64).floor() as i64;
        let gy = (v * grid_h as f64).floor() as i64;
        // Samples landing on the seam (u or v exactly 1) fall outside the
        // grid and are dropped, as the dashboard did.
        if gx < 0 || gx >= grid_w as i64 || gy < 0 || gy >= grid_h as i64 {
            continue;
        }
        let idx = gy as usize * grid_w + gx as usize;
        sums[idx] += sample.voltage;
        counts[idx] += 1;
    }

    let mut grid = vec![0.0f64; grid_w * grid_h];
    for idx in 0..grid.len() {
        if counts[idx] > 0 {
            grid[idx] = sums[idx] / counts[idx] as f64;
        }
    }

    let filled = fill_empty_cells(&grid, &counts, grid_w, grid_h);
    let smoothed = gaussian_smooth(&filled, grid_w, grid_h);

    // Min/max over the whole grid, zeros of never-filled cells included.
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in &smoothed {
        min = min.min(value);
        max = max.max(value);
    }
    let range = if max > min { max - min } else { 1.0 };

    for gy in 0..grid_h {
        for gx in 0..grid_w {
            let value = smoothed[gy * grid_w + gx];
            if value <= 0.0 {
                continue;
            }
            let normalized = (value - min) / range;
            let hue = (1.0 - normalized) * 240.0;
            let [r, g, b] = hsl_to_rgb(hue, 0.8, 0.5);
            let alpha = (normalized * 1.5).min(0.9);
            raster.fill_rect(
                gx * CELL_SIZE,
                gy * CELL_SIZE,
                CELL_SIZE,
                [r, g, b, (alpha * 255.0) as u8],
            );
        }
    }
    raster
}

/// Inverse-squared-distance diffusion into empty cells. Cells with no
/// populated neighbor inside the window stay at zero.
fn fill_empty_cells(grid: &[f64], counts: &[u32], grid_w: usize, grid_h: usize) -> Vec<f64> {
    let mut filled = grid.to_vec();
    for y in 0..grid_h as i64 {
        for x in 0..grid_w as i64 {
            let idx = y as usize * grid_w + x as usize;
            if counts[idx] > 0 {
                continue;
            }
            let mut sum = 0.0;
            let mut weight = 0.0;
            for dy in -FILL_RADIUS..=FILL_RADIUS {
                for dx in -FILL_RADIUS..=FILL_RADIUS {
                    let ny = y + dy;
                    let nx = x + dx;
                    if ny < 0 || ny >= grid_h as i64 || nx < 0 || nx >= grid_w as i64 {
                        continue;
                    }
                    let nidx = ny as usize * grid_w + nx as usize;
                    if counts[nidx] == 0 {
                        continue;
                    }
                    // dx = dy = 0 cannot reach here: the center is empty.
                    let d2 = (dx * dx + dy * dy) as f64;
                    sum += grid[nidx] / d2;
                    weight += 1.0 / d2;
                }
            }
            if weight > 0.0 {
                filled[idx] = sum / weight;
            }
        }
    }
    filled
}

const KERNEL: [[f64; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];
const KERNEL_SUM: f64 = 16.0;

/// 3×3 Gaussian blur over interior cells; the border keeps its value.
fn gaussian_smooth(grid: &[f64], grid_w: usize, grid_h: usize) -> Vec<f64> {
    let mut smoothed = grid.to_vec();
    if grid_w < 3 || grid_h < 3 {
        return smoothed;
    }
    for y in 1..grid_h - 1 {
        for x in 1..grid_w - 1 {
            let mut acc = 0.0;
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, k) in row.iter().enumerate() {
                    acc += grid[(y + ky - 1) * grid_w + (x + kx - 1)] * k;
                }
            }
            smoothed[y * grid_w + x] = acc / KERNEL_SUM;
        }
    }
    smoothed
}

/// Canonical HSL→RGB conversion; hue in degrees.
pub fn hsl_to_rgb(hue_deg: f64, saturation: f64, lightness: f64) -> [u8; 3] {
    let h = (hue_deg / 360.0).rem_euclid(1.0);
    if saturation <= 0.0 {
        let gray = (lightness * 255.0).round() as u8;
        return [gray, gray, gray];
    }
    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    let channel = |t: f64| (hue_channel(p, q, t) * 255.0).round() as u8;
    [
        channel(h + 1.0 / 3.0),
        channel(h),
        channel(h - 1.0 / 3.0),
    ]
}

fn hue_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, z: f64, voltage: f64) -> VoltageSample {
        VoltageSample {
            position: ElectrodePosition::new(x, y, z),
            voltage,
        }
    }

    #[test]
    fn empty_input_yields_fully_transparent_raster() {
        let raster = rasterize_voltage_field(&[], DEFAULT_FIELD_SIZE, DEFAULT_FIELD_SIZE);
        assert!(raster.pixels.chunks_exact(4).all(|px| px[3] == 0));
    }

    #[test]
    fn rasterization_is_deterministic() {
        let samples = vec![
            sample(-0.35, 0.8, 0.15, 40.0),
            sample(0.35, 0.8, 0.15, 20.0),
            sample(0.0, 0.8, 0.4, 65.0),
            sample(-0.35, 0.5, -0.75, 10.0),
        ];
        let a = rasterize_voltage_field(&samples, DEFAULT_FIELD_SIZE, DEFAULT_FIELD_SIZE);
        let b = rasterize_voltage_field(&samples, DEFAULT_FIELD_SIZE, DEFAULT_FIELD_SIZE);
        assert_eq!(a, b);
    }

    #[test]
    fn single_sample_paints_its_projected_cell_red() {
        // (0, -1, 0) projects to phi = 0, theta = 0: top row, u = 0.5.
        let raster = rasterize_voltage_field(&[sample(0.0, -1.0, 0.0, 30.0)], 512, 512);
        let px = raster.pixel(64 * 4, 0);
        // The only populated cell is the observed maximum, so it lands on
        // the red end of the ramp at peak alpha.
        assert_eq!(px, [230, 26, 26, 229]);
    }

    #[test]
    fn diffusion_reaches_nearby_empty_cells_only() {
        let raster = rasterize_voltage_field(&[sample(0.0, -1.0, 0.0, 30.0)], 512, 512);
        // Within the fill window (plus one blur cell) of the peak.
        let near = raster.pixel(64 * 4, 4 * 4);
        assert!(near[3] > 0, "expected diffusion near the sample");
        // Far side of the raster stays untouched.
        let far = raster.pixel(64 * 4, 300);
        assert_eq!(far[3], 0);
    }

    #[test]
    fn negative_voltages_stay_transparent() {
        let raster = rasterize_voltage_field(&[sample(0.0, -1.0, 0.0, -30.0)], 512, 512);
        assert!(raster.pixels.chunks_exact(4).all(|px| px[3] == 0));
    }

    #[test]
    fn hsl_endpoints_match_the_ramp() {
        assert_eq!(hsl_to_rgb(0.0, 0.8, 0.5), [230, 26, 26]);
        assert_eq!(hsl_to_rgb(240.0, 0.8, 0.5), [26, 26, 230]);
        assert_eq!(hsl_to_rgb(120.0, 0.0, 0.5), [128, 128, 128]);
    }

    #[test]
    fn gaussian_kernel_preserves_a_uniform_field() {
        let grid = vec![5.0; 16];
        let smoothed = gaussian_smooth(&grid, 4, 4);
        for value in smoothed {
            assert!((value - 5.0).abs() < 1e-12);
        }
    }
}
