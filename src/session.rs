// One measurement at a time, in any of the three modes, feeding the ledger.

use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  Manual,
  Photo,
  Live,
}

// Same names as the serialized form.
impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Mode::Manual => "manual",
      Mode::Photo => "photo",
      Mode::Live => "live",
    })
  }
}

const SINGLE_BALL_NOTE: &str = "single-ball distance readout";

pub struct MeasurementSession {
  mode: Mode,
  tolerance: f64,
  calibration: Calibration,
  // Natural size of the loaded photo. Live mode reads it from the radar.
  photo_size: Option<FrameSize>,
  target: Option<Point>,
  // Tapped ball centers, indexed by `Side::index()`.
  balls: [Vec<Point>; 2],
  // Centimeters.
  manual: Option<(f64, f64)>,
  radar: LiveRadar,
}

impl MeasurementSession {
  pub fn new(radar: LiveRadar, tolerance: f64) -> MeasurementSession {
    MeasurementSession {
      mode: Mode::Manual,
      tolerance: tolerance.max(0.),
      calibration: Calibration::default(),
      photo_size: None,
      target: None,
      balls: [vec![], vec![]],
      manual: None,
      radar,
    }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn tolerance(&self) -> f64 {
    self.tolerance
  }

  // Leaving live mode releases the camera. All measurement data is dropped.
  pub fn switch_mode(&mut self, mode: Mode) {
    if self.mode == mode { return }
    if self.mode == Mode::Live {
      self.radar.stop();
    }
    self.reset();
    debug!("Mode {} -> {}", self.mode, mode);
    self.mode = mode;
  }

  pub fn reset(&mut self) {
    self.calibration.clear();
    self.photo_size = None;
    self.target = None;
    self.balls = [vec![], vec![]];
    self.manual = None;
  }

  // Drops tapped balls and, outside live mode, the target. Calibration and
  // the stream stay.
  pub fn clear_taps(&mut self) {
    self.target = None;
    self.balls = [vec![], vec![]];
  }

  pub fn close(&mut self) {
    self.radar.stop();
    self.reset();
  }

  pub fn start_live(&mut self) -> std::result::Result<StreamHandle, MeasureError> {
    self.switch_mode(Mode::Live);
    self.radar.start()
  }

  pub fn radar(&self) -> &LiveRadar {
    &self.radar
  }

  pub fn radar_mut(&mut self) -> &mut LiveRadar {
    &mut self.radar
  }

  pub fn set_manual(&mut self, d_a: f64, d_b: f64) -> std::result::Result<(), MeasureError> {
    if !(d_a >= 0. && d_b >= 0. && d_a.is_finite() && d_b.is_finite()) {
      return Err(MeasureError::IncompleteMeasurement("manual distances must be non-negative numbers"));
    }
    self.switch_mode(Mode::Manual);
    self.manual = Some((d_a, d_b));
    Ok(())
  }

  pub fn load_photo(&mut self, size: FrameSize) {
    self.switch_mode(Mode::Photo);
    self.reset();
    self.photo_size = Some(size);
  }

  pub fn frame_size(&self) -> Option<FrameSize> {
    match self.mode {
      Mode::Manual => None,
      Mode::Photo => self.photo_size,
      Mode::Live => self.radar.frame_size(),
    }
  }

  // In live mode the target is always the crosshair.
  pub fn target(&self) -> Option<Point> {
    match self.mode {
      Mode::Live => Some(Point::center()),
      _ => self.target,
    }
  }

  pub fn set_target(&mut self, target: Point) {
    if self.mode == Mode::Live {
      debug!("Target is fixed to the crosshair in live mode.");
      return;
    }
    self.target = Some(target);
  }

  pub fn add_ball(&mut self, side: Side, center: Point) {
    self.balls[side.index()].push(center);
  }

  pub fn balls(&self, side: Side) -> &[Point] {
    &self.balls[side.index()]
  }

  pub fn calibration(&self) -> &Calibration {
    &self.calibration
  }

  // An unusable reference is kept but ignored, distances stay in pixels.
  pub fn set_calibration(&mut self, a: Point, b: Point, real_length_cm: f64) {
    self.calibration.set_reference(a, b, real_length_cm);
    if let (Some(reference), Some(size)) = (self.calibration.reference(), self.frame_size()) {
      if let Err(err) = reference.validate(size) {
        warn!("{}. Distances are reported in pixels.", err);
      }
    }
  }

  pub fn px_per_unit(&self) -> Option<f64> {
    self.calibration.px_per_unit(self.frame_size()?)
  }

  pub fn resolution(&self) -> std::result::Result<Resolution, MeasureError> {
    match self.mode {
      Mode::Manual => {
        let (d_a, d_b) = self.manual
          .ok_or(MeasureError::IncompleteMeasurement("manual distances not entered"))?;
        Ok(self.single(d_a, d_b, Unit::Centimeters))
      },
      Mode::Photo => {
        let size = self.photo_size
          .ok_or(MeasureError::IncompleteMeasurement("no photo loaded"))?;
        let target = self.target
          .ok_or(MeasureError::IncompleteMeasurement("no target marked"))?;
        resolve(target, &self.balls[0], &self.balls[1], size, self.px_per_unit(), self.tolerance)
      },
      Mode::Live => {
        if !self.radar.is_active() {
          return Err(MeasureError::IncompleteMeasurement("camera not started"));
        }
        let size = self.radar.frame_size()
          .ok_or(MeasureError::IncompleteMeasurement("camera not started"))?;
        if self.has_taps() {
          return resolve(
            Point::center(), &self.balls[0], &self.balls[1], size, self.px_per_unit(), self.tolerance,
          );
        }
        let reading = self.radar.reading(self.px_per_unit())
          .ok_or(MeasureError::IncompleteMeasurement("no circle tracked"))?;
        let d = reading.distance;
        Ok(self.single(d.value, d.value, d.unit))
      },
    }
  }

  fn single(&self, d_a: f64, d_b: f64, unit: Unit) -> Resolution {
    Resolution {
      d_a,
      d_b,
      unit,
      verdict: decide(d_a, d_b, self.tolerance),
    }
  }

  fn has_taps(&self) -> bool {
    self.balls.iter().any(|b| !b.is_empty())
  }

  pub fn can_commit(&self) -> bool {
    self.resolution().is_ok()
  }

  pub fn commit(
    &mut self,
    ledger: &mut Ledger,
    note: Option<String>,
  ) -> std::result::Result<MeasurementRecord, MeasureError> {
    let resolution = match self.resolution() {
      Ok(resolution) => resolution,
      Err(err) => {
        info!("Nothing to commit: {}", err);
        return Err(err);
      },
    };
    let note = if self.mode == Mode::Live && !self.has_taps() {
      Some(match note {
        Some(note) => format!("{}; {}", SINGLE_BALL_NOTE, note),
        None => SINGLE_BALL_NOTE.to_string(),
      })
    }
    else {
      note
    };
    let record = MeasurementRecord::new(
      ledger.next_id(),
      resolution.d_a,
      resolution.d_b,
      self.tolerance,
      resolution.unit,
      self.mode,
      note,
    );
    ledger.append(record.clone());
    Ok(record)
  }
}
