// Hough gradient circle detector: grayscale, Gaussian blur, Canny-style edge
// map, center voting along the edge gradients, then radius estimation from the
// distance histogram of the edge pixels around each accepted center.

use crate::all::*;

pub const DEFAULT_ROI_PCT: f64 = 0.7;
pub const MIN_ROI_PCT: f64 = 0.4;
pub const MAX_ROI_PCT: f64 = 1.0;
pub const DEFAULT_MIN_RADIUS: usize = 8;
pub const DEFAULT_MAX_RADIUS: usize = 60;
pub const DEFAULT_SENSITIVITY: u32 = 30;
pub const DEFAULT_EDGE_THRESHOLD: f32 = 100.;
pub const DEFAULT_MIN_DISTANCE: f64 = 20.;

// Tunables read at the start of every detection tick. Radii and the center
// distance are in pixels of the sampled (downscaled) frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
  pub roi_pct: f64,
  pub min_radius: usize,
  pub max_radius: usize,
  // Accumulator threshold. Lower finds more circles, and more false positives.
  pub sensitivity: u32,
  // High Canny threshold on the Sobel magnitude; the low one is half of it.
  pub edge_threshold: f32,
  pub min_distance: f64,
}

impl Default for DetectorConfig {
  fn default() -> DetectorConfig {
    DetectorConfig {
      roi_pct: DEFAULT_ROI_PCT,
      min_radius: DEFAULT_MIN_RADIUS,
      max_radius: DEFAULT_MAX_RADIUS,
      sensitivity: DEFAULT_SENSITIVITY,
      edge_threshold: DEFAULT_EDGE_THRESHOLD,
      min_distance: DEFAULT_MIN_DISTANCE,
    }
  }
}

impl DetectorConfig {
  pub fn sanitized(self) -> DetectorConfig {
    let roi_pct = if self.roi_pct.is_finite() { self.roi_pct } else { DEFAULT_ROI_PCT };
    let min_radius = self.min_radius.max(1);
    DetectorConfig {
      roi_pct: roi_pct.clamp(MIN_ROI_PCT, MAX_ROI_PCT),
      min_radius,
      max_radius: self.max_radius.max(min_radius),
      sensitivity: self.sensitivity.max(1),
      edge_threshold: self.edge_threshold.max(1.),
      min_distance: self.min_distance.max(0.),
    }
  }
}

pub trait CircleDetector {
  // Circles in coordinates normalized to the given ROI buffer. The order of the
  // returned circles carries no meaning.
  fn detect(&self, roi: &ColorImage, config: &DetectorConfig) -> Vec<Circle>;
}

pub struct HoughCircleDetector {
  kernel: &'static [f32; BLUR_KERNEL_SIZE],
}

struct Edge {
  x: usize,
  y: usize,
}

struct Candidate {
  index: usize,
  votes: u32,
}

impl HoughCircleDetector {
  pub fn load() -> std::result::Result<HoughCircleDetector, MeasureError> {
    let kernel: &'static [f32; BLUR_KERNEL_SIZE] = &BLUR_KERNEL;
    let sum: f32 = kernel.iter().sum();
    if !sum.is_finite() || (sum - 1.).abs() > 1e-3 {
      return Err(MeasureError::DetectorUnavailable(format!("blur kernel sums to {}", sum)));
    }
    Ok(HoughCircleDetector { kernel })
  }

  // Circles in pixel coordinates of `gray`, (x, y, r).
  pub fn detect_pixels(&self, gray: &Image, config: &DetectorConfig) -> Vec<[f64; 3]> {
    let config = config.sanitized();
    let w = gray.width;
    let h = gray.height;
    if w < 3 || h < 3 { return vec![] }

    let blurred = blur(gray, &self.kernel[..]);
    let gradients = sobel(&blurred);
    let edges = edge_map(&gradients, config.edge_threshold);
    if edges.is_empty() { return vec![] }

    let accumulator = vote(&edges, &gradients, &config);
    let candidates = center_candidates(&accumulator, w, h, config.sensitivity);

    let mut circles: Vec<[f64; 3]> = vec![];
    for candidate in candidates {
      let (cx, cy) = refine_center(&accumulator, w, candidate.index);
      let too_close = circles.iter().any(|c| {
        (Vector2d::new(c[0], c[1]) - Vector2d::new(cx, cy)).norm() < config.min_distance
      });
      if too_close { continue }
      if let Some(r) = estimate_radius(&edges, cx, cy, &config) {
        circles.push([cx, cy, r]);
      }
    }
    debug!("{} edge pixels, {} circles", edges.len(), circles.len());
    circles
  }
}

impl CircleDetector for HoughCircleDetector {
  fn detect(&self, roi: &ColorImage, config: &DetectorConfig) -> Vec<Circle> {
    let w = roi.width as f64;
    let h = roi.height as f64;
    let max_dim = w.max(h);
    self.detect_pixels(&roi.to_gray(), config).into_iter()
      // Pixel `i` covers `[i, i + 1)`.
      .map(|c| Circle::new((c[0] + 0.5) / w, (c[1] + 0.5) / h, c[2] / max_dim))
      .collect()
  }
}

// Thin edges by non-maximum suppression along the gradient, then keep weak
// edges only when connected to strong ones.
fn edge_map(g: &Gradients, high: f32) -> Vec<Edge> {
  let w = g.magnitude.width;
  let h = g.magnitude.height;
  let low = high / 2.;
  // 0 = none, 1 = weak, 2 = strong.
  let mut class = vec![0u8; w * h];
  let mut stack = vec![];
  for y in 1..(h - 1) {
    for x in 1..(w - 1) {
      let m = g.magnitude.get(x, y);
      if m < low { continue }
      let angle = g.gy.get(x, y).atan2(g.gx.get(x, y)).to_degrees().rem_euclid(180.);
      let (d0, d1): ([i64; 2], [i64; 2]) = if angle < 22.5 || angle >= 157.5 {
        ([-1, 0], [1, 0])
      }
      else if angle < 67.5 {
        ([-1, -1], [1, 1])
      }
      else if angle < 112.5 {
        ([0, -1], [0, 1])
      }
      else {
        ([1, -1], [-1, 1])
      };
      let n0 = g.magnitude.get((x as i64 + d0[0]) as usize, (y as i64 + d0[1]) as usize);
      let n1 = g.magnitude.get((x as i64 + d1[0]) as usize, (y as i64 + d1[1]) as usize);
      if m < n0 || m <= n1 { continue }
      if m >= high {
        class[y * w + x] = 2;
        stack.push((x, y));
      }
      else {
        class[y * w + x] = 1;
      }
    }
  }

  while let Some((x, y)) = stack.pop() {
    for ny in (y - 1)..=(y + 1) {
      for nx in (x - 1)..=(x + 1) {
        let i = ny * w + nx;
        if class[i] == 1 {
          class[i] = 2;
          stack.push((nx, ny));
        }
      }
    }
  }

  let mut edges = vec![];
  for y in 0..h {
    for x in 0..w {
      if class[y * w + x] == 2 { edges.push(Edge { x, y }) }
    }
  }
  edges
}

fn vote(edges: &[Edge], g: &Gradients, config: &DetectorConfig) -> Vec<u32> {
  let w = g.magnitude.width;
  let h = g.magnitude.height;
  let mut accumulator = vec![0u32; w * h];
  for e in edges {
    let m = g.magnitude.get(e.x, e.y);
    let dx = (g.gx.get(e.x, e.y) / m) as f64;
    let dy = (g.gy.get(e.x, e.y) / m) as f64;
    // Boules can be brighter or darker than the ground: vote both ways.
    for sign in [-1., 1.] {
      for r in config.min_radius..=config.max_radius {
        let cx = (e.x as f64 + sign * dx * r as f64).round();
        let cy = (e.y as f64 + sign * dy * r as f64).round();
        if cx < 0. || cy < 0. || cx >= w as f64 || cy >= h as f64 { break }
        accumulator[cy as usize * w + cx as usize] += 1;
      }
    }
  }
  accumulator
}

fn center_candidates(accumulator: &[u32], w: usize, h: usize, threshold: u32) -> Vec<Candidate> {
  let mut candidates = vec![];
  for y in 1..(h - 1) {
    for x in 1..(w - 1) {
      let i = y * w + x;
      let v = accumulator[i];
      if v < threshold { continue }
      // Strict on one side and loose on the other so that a plateau yields a
      // single peak.
      if v > accumulator[i - 1] && v >= accumulator[i + 1]
        && v > accumulator[i - w] && v >= accumulator[i + w]
      {
        candidates.push(Candidate { index: i, votes: v });
      }
    }
  }
  candidates.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.index.cmp(&b.index)));
  candidates
}

fn refine_center(accumulator: &[u32], w: usize, index: usize) -> (f64, f64) {
  let x = index % w;
  let y = index / w;
  let mut sum = 0.;
  let mut sx = 0.;
  let mut sy = 0.;
  for ny in (y - 1)..=(y + 1) {
    for nx in (x - 1)..=(x + 1) {
      let v = accumulator[ny * w + nx] as f64;
      sum += v;
      sx += v * nx as f64;
      sy += v * ny as f64;
    }
  }
  (sx / sum, sy / sum)
}

fn estimate_radius(edges: &[Edge], cx: f64, cy: f64, config: &DetectorConfig) -> Option<f64> {
  let max_r = config.max_radius;
  let mut histogram = vec![0u32; max_r + 2];
  for e in edges {
    let d = (Vector2d::new(e.x as f64, e.y as f64) - Vector2d::new(cx, cy)).norm();
    let bin = d.round();
    if bin < config.min_radius as f64 || bin > max_r as f64 { continue }
    histogram[bin as usize] += 1;
  }

  let mut best: Option<(usize, u32)> = None;
  for r in config.min_radius..=max_r {
    let support = histogram[r - 1] + histogram[r] + histogram[r + 1];
    if best.map_or(true, |(_, s)| support > s) {
      best = Some((r, support));
    }
  }
  let (r, support) = best?;
  if support < config.sensitivity || support == 0 { return None }
  let weighted = ((r - 1)..=(r + 1))
    .map(|k| k as f64 * histogram[k] as f64)
    .sum::<f64>();
  Some(weighted / support as f64)
}

#[cfg(test)]
pub mod tests {
  use super::*;
  use rand::{Rng, SeedableRng};
  use rand_xoshiro::Xoshiro256PlusPlus;

  // Disks drawn on a flat background with optional uniform noise.
  pub fn disk_image(
    width: usize,
    height: usize,
    disks: &[[f64; 3]],
    noise: u8,
    seed: u64,
  ) -> ColorImage {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut image = ColorImage::new(width, height);
    for y in 0..height {
      for x in 0..width {
        let inside = disks.iter().any(|d| {
          (Vector2d::new(x as f64, y as f64) - Vector2d::new(d[0], d[1])).norm() <= d[2]
        });
        let base: i32 = if inside { 200 } else { 60 };
        let n = if noise > 0 { rng.gen_range(-(noise as i32)..=noise as i32) } else { 0 };
        let v = (base + n).clamp(0, 255) as u8;
        image.set_pixel(x, y, [v, v, v]);
      }
    }
    image
  }

  fn config() -> DetectorConfig {
    DetectorConfig {
      min_radius: 10,
      max_radius: 30,
      sensitivity: 20,
      ..DetectorConfig::default()
    }
  }

  #[test]
  fn test_single_disk() {
    let detector = HoughCircleDetector::load().unwrap();
    let image = disk_image(160, 120, &[[80., 60., 20.]], 6, 1);
    let circles = detector.detect_pixels(&image.to_gray(), &config());
    assert_eq!(circles.len(), 1, "{:?}", circles);
    let c = circles[0];
    assert!((c[0] - 80.).abs() < 2. && (c[1] - 60.).abs() < 2., "{:?}", c);
    assert!((c[2] - 20.).abs() < 2.5, "{:?}", c);
  }

  #[test]
  fn test_two_disks_normalized() {
    let detector = HoughCircleDetector::load().unwrap();
    let image = disk_image(200, 100, &[[50., 50., 15.], [150., 50., 18.]], 0, 2);
    let mut circles = detector.detect(&image, &config());
    assert_eq!(circles.len(), 2, "{:?}", circles);
    circles.sort_by(|a, b| a.x.total_cmp(&b.x));
    assert!((circles[0].x - 50.5 / 200.).abs() < 0.01);
    assert!((circles[1].x - 150.5 / 200.).abs() < 0.01);
    assert!((circles[0].y - 0.505).abs() < 0.02);
    assert!((circles[1].r - 18. / 200.).abs() < 0.0125);
  }

  #[test]
  fn test_flat_image_has_no_circles() {
    let detector = HoughCircleDetector::load().unwrap();
    let image = disk_image(120, 80, &[], 4, 3);
    assert!(detector.detect(&image, &config()).is_empty());
  }

  #[test]
  fn test_sensitivity_limits_detections() {
    let detector = HoughCircleDetector::load().unwrap();
    let image = disk_image(160, 120, &[[80., 60., 20.]], 0, 4);
    let strict = DetectorConfig { sensitivity: 10_000, ..config() };
    assert!(detector.detect(&image, &strict).is_empty());
  }

  #[test]
  fn test_sanitized() {
    let c = DetectorConfig {
      roi_pct: 0.1,
      min_radius: 0,
      max_radius: 0,
      sensitivity: 0,
      edge_threshold: -4.,
      min_distance: -1.,
    }.sanitized();
    assert_eq!(c.roi_pct, MIN_ROI_PCT);
    assert_eq!((c.min_radius, c.max_radius, c.sensitivity), (1, 1, 1));
    assert_eq!(DetectorConfig { roi_pct: 3., ..c }.sanitized().roi_pct, MAX_ROI_PCT);
  }
}
