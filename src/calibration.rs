use crate::all::*;

// Reference segment of known physical length, tapped on the image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CalibrationRef {
  pub point_a: Option<Point>,
  pub point_b: Option<Point>,
  // Centimeters.
  pub real_length: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Calibration {
  reference: Option<CalibrationRef>,
}

impl CalibrationRef {
  pub fn validate(&self, size: FrameSize) -> std::result::Result<f64, MeasureError> {
    let (a, b) = match (self.point_a, self.point_b) {
      (Some(a), Some(b)) => (a, b),
      _ => return Err(MeasureError::CalibrationInvalid("reference point missing")),
    };
    if !(self.real_length > 0.) {
      return Err(MeasureError::CalibrationInvalid("reference length must be positive"));
    }
    let pixels = (a.to_pixels(size) - b.to_pixels(size)).norm();
    if !(pixels > 0.) {
      return Err(MeasureError::CalibrationInvalid("reference points coincide"));
    }
    Ok(pixels / self.real_length)
  }
}

impl Calibration {
  pub fn set_reference(&mut self, point_a: Point, point_b: Point, real_length_cm: f64) {
    self.reference = Some(CalibrationRef {
      point_a: Some(point_a),
      point_b: Some(point_b),
      real_length: real_length_cm,
    });
  }

  pub fn reference(&self) -> Option<&CalibrationRef> {
    self.reference.as_ref()
  }

  pub fn clear(&mut self) {
    self.reference = None;
  }

  // Pixels per centimeter in the natural pixels of the full image, or `None`
  // when uncalibrated or the reference is degenerate.
  pub fn px_per_unit(&self, size: FrameSize) -> Option<f64> {
    self.reference.as_ref()?.validate(size).ok()
  }
}
