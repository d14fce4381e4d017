use crate::all::*;

pub const DEFAULT_TOLERANCE: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
  #[serde(rename = "cm")]
  Centimeters,
  // Natural pixels of the measured image, when no calibration is available.
  #[serde(rename = "px")]
  Pixels,
}

impl fmt::Display for Unit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Unit::Centimeters => write!(f, "cm"),
      Unit::Pixels => write!(f, "px"),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Distance {
  pub value: f64,
  pub unit: Unit,
}

impl fmt::Display for Distance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.1} {}", self.value, self.unit)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
  A,
  B,
  #[serde(rename = "TIE")]
  Tie,
}

impl fmt::Display for Winner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Winner::A => "A",
      Winner::B => "B",
      Winner::Tie => "TIE",
    })
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verdict {
  pub winner: Winner,
  pub delta: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
  pub d_a: f64,
  pub d_b: f64,
  pub unit: Unit,
  pub verdict: Verdict,
}

pub fn decide(d_a: f64, d_b: f64, tol: f64) -> Verdict {
  let delta = (d_a - d_b).abs();
  let winner = if delta <= tol {
    Winner::Tie
  }
  else if d_a < d_b {
    Winner::A
  }
  else {
    Winner::B
  };
  Verdict { winner, delta }
}

pub fn measure(from: Point, to: Point, size: FrameSize, px_per_unit: Option<f64>) -> Distance {
  let pixels = (from.to_pixels(size) - to.to_pixels(size)).norm();
  match px_per_unit {
    Some(ratio) => Distance { value: pixels / ratio, unit: Unit::Centimeters },
    None => Distance { value: pixels, unit: Unit::Pixels },
  }
}

pub fn closest(
  target: Point,
  balls: &[Point],
  size: FrameSize,
  px_per_unit: Option<f64>,
) -> Option<Distance> {
  balls.iter()
    .map(|b| measure(target, *b, size, px_per_unit))
    .min_by(|a, b| a.value.total_cmp(&b.value))
}

pub fn resolve(
  target: Point,
  balls_a: &[Point],
  balls_b: &[Point],
  size: FrameSize,
  px_per_unit: Option<f64>,
  tol: f64,
) -> std::result::Result<Resolution, MeasureError> {
  let d_a = closest(target, balls_a, size, px_per_unit)
    .ok_or(MeasureError::IncompleteMeasurement("no ball recorded for side A"))?;
  let d_b = closest(target, balls_b, size, px_per_unit)
    .ok_or(MeasureError::IncompleteMeasurement("no ball recorded for side B"))?;
  Ok(Resolution {
    d_a: d_a.value,
    d_b: d_b.value,
    unit: d_a.unit,
    verdict: decide(d_a.value, d_b.value, tol),
  })
}
