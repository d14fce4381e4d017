use crate::all::*;

// Eigen-like aliases.
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Vector2i = nalgebra::Vector2::<i32>;

// Position normalized to `[0, 1]` relative to the active frame or image,
// origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub fn new(x: f64, y: f64) -> Point {
    Point {
      x: clamp_unit(x),
      y: clamp_unit(y),
    }
  }

  pub fn center() -> Point {
    Point::new(0.5, 0.5)
  }

  pub fn vector(&self) -> Vector2d {
    Vector2d::new(self.x, self.y)
  }

  // Position in pixels of a frame with the given natural size.
  pub fn to_pixels(&self, size: FrameSize) -> Vector2d {
    Vector2d::new(self.x * size.width as f64, self.y * size.height as f64)
  }
}

impl From<[f64; 2]> for Point {
  fn from(p: [f64; 2]) -> Point {
    Point::new(p[0], p[1])
  }
}

impl From<Point> for [f64; 2] {
  fn from(p: Point) -> [f64; 2] {
    [p.x, p.y]
  }
}

// Detected circle. The center is normalized like `Point`, the radius is
// normalized by the larger of the frame dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
  pub x: f64,
  pub y: f64,
  pub r: f64,
}

impl Circle {
  pub fn new(x: f64, y: f64, r: f64) -> Circle {
    Circle {
      x: clamp_unit(x),
      y: clamp_unit(y),
      r: r.max(0.),
    }
  }

  pub fn center(&self) -> Point {
    Point::new(self.x, self.y)
  }

  pub fn distance_to(&self, p: Point) -> f64 {
    (self.center().vector() - p.vector()).norm()
  }
}

// Natural pixel dimensions of a frame or still image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
  pub width: usize,
  pub height: usize,
}

impl FrameSize {
  pub fn new(width: usize, height: usize) -> FrameSize {
    FrameSize { width, height }
  }

  pub fn max_dim(&self) -> usize {
    self.width.max(self.height)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
  A,
  B,
}

impl Side {
  pub fn index(self) -> usize {
    match self {
      Side::A => 0,
      Side::B => 1,
    }
  }
}

// Returns the candidate closest to `target`, if any.
pub fn nearest(candidates: &[Circle], target: Point) -> Option<(Circle, f64)> {
  candidates.iter()
    .map(|c| (*c, c.distance_to(target)))
    .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn clamp_unit(v: f64) -> f64 {
  if v.is_nan() { return 0. }
  v.clamp(0., 1.)
}
