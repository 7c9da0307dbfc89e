const ZENITH: [f32; 3] = [0.35, 0.55, 0.9];
const HORIZON: [f32; 3] = [0.85, 0.9, 0.95];

/// Vertical sky gradient used as the camera image, row 0 at the top.
#[must_use]
pub fn sky_gradient(width: u32, height: u32) -> Vec<[f32; 4]> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let t = if height > 1 { y as f32 / (height - 1) as f32 } else { 0.0 };
        let row = [0, 1, 2].map(|c| ZENITH[c] + (HORIZON[c] - ZENITH[c]) * t);
        pixels.extend(std::iter::repeat([row[0], row[1], row[2], 1.0]).take(width as usize));
    }
    pixels
}
