use crate::all::*;

pub const DEFAULT_BORDER_MARGIN: f64 = 0.06;

// Centered crop of the sampled frame, in pixels of that frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
  pub x: usize,
  pub y: usize,
  pub width: usize,
  pub height: usize,
  pub frame: FrameSize,
}

impl Roi {
  pub fn centered(frame: FrameSize, roi_pct: f64) -> Roi {
    let pct = roi_pct.clamp(MIN_ROI_PCT, MAX_ROI_PCT);
    let width = ((frame.width as f64 * pct).round() as usize).clamp(1.min(frame.width), frame.width);
    let height = ((frame.height as f64 * pct).round() as usize).clamp(1.min(frame.height), frame.height);
    Roi {
      x: (frame.width - width) / 2,
      y: (frame.height - height) / 2,
      width,
      height,
      frame,
    }
  }

  pub fn extract(&self, image: &ColorImage) -> ColorImage {
    debug_assert_eq!(image.size(), self.frame);
    image.get_sub_image(self.x, self.y, self.width, self.height)
  }

  // Effective offset and scale of the crop per axis. These follow the
  // integer crop so the mappings below invert each other exactly.
  fn offset(&self) -> Vector2d {
    Vector2d::new(
      self.x as f64 / self.frame.width as f64,
      self.y as f64 / self.frame.height as f64,
    )
  }

  fn scale(&self) -> Vector2d {
    Vector2d::new(
      self.width as f64 / self.frame.width as f64,
      self.height as f64 / self.frame.height as f64,
    )
  }

  fn radius_scale(&self) -> f64 {
    self.width.max(self.height) as f64 / self.frame.max_dim() as f64
  }

  // ROI-local normalized circle to full-frame normalized circle.
  pub fn to_full(&self, c: &Circle) -> Circle {
    let p = self.offset() + Vector2d::new(c.x, c.y).component_mul(&self.scale());
    Circle::new(p[0], p[1], c.r * self.radius_scale())
  }

  // Inverse of `to_full()`.
  #[cfg(test)]
  pub fn to_local(&self, c: &Circle) -> Circle {
    let p = (Vector2d::new(c.x, c.y) - self.offset()).component_div(&self.scale());
    Circle::new(p[0], p[1], c.r / self.radius_scale())
  }
}

// Detections touching the frame border are mostly partial objects.
pub fn in_border(c: &Circle, margin: f64) -> bool {
  c.x < margin || c.y < margin || c.x > 1. - margin || c.y > 1. - margin
}

// Maps ROI-local detections to the full frame and drops the border ones.
pub fn to_candidates(roi: &Roi, circles: &[Circle], margin: f64) -> Vec<Circle> {
  circles.iter()
    .map(|c| roi.to_full(c))
    .filter(|c| !in_border(c, margin))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: &Circle, b: &Circle) -> bool {
    (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12 && (a.r - b.r).abs() < 1e-12
  }

  #[test]
  fn test_centered() {
    let roi = Roi::centered(FrameSize::new(520, 292), 0.7);
    assert_eq!((roi.width, roi.height), (364, 204));
    assert_eq!((roi.x, roi.y), (78, 44));
    let full = Roi::centered(FrameSize::new(520, 292), 1.);
    assert_eq!((full.x, full.y, full.width, full.height), (0, 0, 520, 292));
    // Out of range percentages are clamped.
    assert_eq!(Roi::centered(FrameSize::new(100, 100), 0.1).width, 40);
  }

  #[test]
  fn test_round_trip() {
    let roi = Roi::centered(FrameSize::new(520, 293), 0.55);
    let local = Circle::new(0.3, 0.8, 0.05);
    let full = roi.to_full(&local);
    assert!(close(&roi.to_local(&full), &local));
    // Same result as cropping the full-frame pixel position again.
    let px = full.x * 520.;
    assert!(((px - roi.x as f64) / roi.width as f64 - local.x).abs() < 1e-12);
  }

  #[test]
  fn test_center_maps_to_center() {
    let roi = Roi::centered(FrameSize::new(400, 200), 0.5);
    let full = roi.to_full(&Circle::new(0.5, 0.5, 0.1));
    assert!((full.x - 0.5).abs() < 1e-12 && (full.y - 0.5).abs() < 1e-12);
    assert!((full.r - 0.05).abs() < 1e-12);
  }

  #[test]
  fn test_border_rejection() {
    let roi = Roi::centered(FrameSize::new(100, 100), 1.);
    let circles = [
      Circle::new(0.03, 0.5, 0.02),
      Circle::new(0.5, 0.97, 0.02),
      Circle::new(0.5, 0.5, 0.02),
    ];
    let candidates = to_candidates(&roi, &circles, DEFAULT_BORDER_MARGIN);
    assert_eq!(candidates, vec![Circle::new(0.5, 0.5, 0.02)]);
  }
}
