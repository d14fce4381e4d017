// Live auto-detect pipeline. One `tick()` runs sampling, cropping, detection,
// matching and smoothing end to end on the caller's thread.

use crate::all::*;

use std::time::Instant;

#[derive(Debug, PartialEq)]
pub enum TickOutcome {
  Inactive,
  Paused,
  NotDue,
  Busy,
  NoFrame,
  // Auto-detect off or unavailable: the frame was sampled for display only.
  Sampled,
  Detected { candidates: usize, highlighted: Option<Circle> },
}

// Output of the last processed tick, kept for the viewer.
pub struct SampledFrame {
  pub image: ColorImage,
  pub roi: Roi,
  pub candidates: Vec<Circle>,
}

// Distance from the highlighted circle to the crosshair, which the user aims
// at the cochonnet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveReading {
  pub circle: Circle,
  pub distance: Distance,
}

pub struct LiveRadar {
  capture: CaptureController,
  sampler: FrameSampler,
  detector: Option<Box<dyn CircleDetector>>,
  config: DetectorConfig,
  border_margin: f64,
  tracker: Tracker,
  auto_detect: bool,
  frame_size: Option<FrameSize>,
  last: Option<SampledFrame>,
}

impl LiveRadar {
  // `detector` is the outcome of loading the detector; on failure auto-detect
  // stays disabled and only manual taps are available.
  pub fn new(
    capture: CaptureController,
    detector: std::result::Result<Box<dyn CircleDetector>, MeasureError>,
    p: &ParameterSet,
  ) -> LiveRadar {
    let detector = match detector {
      Ok(detector) => Some(detector),
      Err(err) => {
        warn!("{}. Auto-detect disabled, use manual taps.", err);
        None
      },
    };
    LiveRadar {
      capture,
      sampler: FrameSampler::new(p.tick_period(), p.target_width),
      auto_detect: detector.is_some(),
      detector,
      config: p.detector_config(),
      border_margin: p.border_margin,
      tracker: Tracker::new(p.continuity_threshold, p.smoothing_alpha),
      frame_size: None,
      last: None,
    }
  }

  pub fn start(&mut self) -> std::result::Result<StreamHandle, MeasureError> {
    self.clear();
    self.frame_size = None;
    let handle = self.capture.start()?;
    self.frame_size = Some(handle.size);
    self.sampler.rearm();
    Ok(handle)
  }

  pub fn stop(&mut self) {
    self.capture.stop();
    self.clear();
    self.frame_size = None;
  }

  fn clear(&mut self) {
    self.tracker.reset();
    self.last = None;
  }

  pub fn is_active(&self) -> bool {
    self.capture.is_active()
  }

  // Natural size of the camera frames, known once the stream started.
  pub fn frame_size(&self) -> Option<FrameSize> {
    self.frame_size
  }

  pub fn detector_available(&self) -> bool {
    self.detector.is_some()
  }

  pub fn auto_detect(&self) -> bool {
    self.auto_detect
  }

  pub fn set_auto_detect(&mut self, on: bool) {
    if on && self.detector.is_none() {
      debug!("Auto-detect requested without a detector.");
      return;
    }
    if self.auto_detect != on {
      info!("Auto-detect {}.", if on { "on" } else { "off" });
    }
    self.auto_detect = on;
    if !on {
      self.tracker.reset();
    }
  }

  pub fn config(&self) -> DetectorConfig {
    self.config
  }

  // Takes effect from the next tick.
  pub fn set_config(&mut self, config: DetectorConfig) {
    self.config = config.sanitized();
    debug!("Detector config {:?}", self.config);
  }

  // Host surface visibility. Hidden pauses processing but keeps the stream.
  pub fn set_visible(&mut self, visible: bool) {
    if visible {
      if self.capture.is_paused() {
        self.capture.resume();
        self.sampler.rearm();
      }
    }
    else {
      self.capture.pause();
    }
  }

  pub fn next_due(&self) -> Option<Instant> {
    self.sampler.next_due()
  }

  pub fn tick(&mut self, now: Instant) -> TickOutcome {
    if !self.capture.is_active() { return TickOutcome::Inactive }
    if self.capture.is_paused() { return TickOutcome::Paused }
    let _guard = match self.sampler.poll(now) {
      Poll::Due(guard) => guard,
      Poll::NotDue(_) => return TickOutcome::NotDue,
      Poll::Busy => {
        debug!("Previous tick still running, skipping.");
        return TickOutcome::Busy;
      },
    };
    let config = self.config;

    let frame = match self.capture.frame() {
      Some(frame) => frame,
      None => return TickOutcome::NoFrame,
    };
    self.frame_size = Some(frame.size());
    let scaled = self.sampler.downscale(&frame);
    let roi = Roi::centered(scaled.size(), config.roi_pct);

    let detector = match (&self.detector, self.auto_detect) {
      (Some(detector), true) => detector,
      _ => {
        self.last = Some(SampledFrame { image: scaled, roi, candidates: vec![] });
        return TickOutcome::Sampled;
      },
    };
    let circles = detector.detect(&roi.extract(&scaled), &config);
    let candidates = to_candidates(&roi, &circles, self.border_margin);
    let highlighted = self.tracker.update(&candidates);
    let outcome = TickOutcome::Detected { candidates: candidates.len(), highlighted };
    self.last = Some(SampledFrame { image: scaled, roi, candidates });
    outcome
  }

  pub fn track_state(&self) -> &TrackState {
    self.tracker.state()
  }

  pub fn last_frame(&self) -> Option<&SampledFrame> {
    self.last.as_ref()
  }

  pub fn highlighted(&self) -> Option<Circle> {
    if !self.auto_detect { return None }
    self.tracker.highlighted()
  }

  pub fn reading(&self, px_per_unit: Option<f64>) -> Option<LiveReading> {
    let circle = self.highlighted()?;
    let size = self.frame_size?;
    Some(LiveReading {
      circle,
      distance: measure(Point::center(), circle.center(), size, px_per_unit),
    })
  }
}

#[cfg(test)]
pub mod tests {
  use super::*;
  use crate::camera::tests::{StubCamera, StubProbe};
  use crate::detector::tests::disk_image;

  use std::sync::atomic::Ordering;
  use std::time::Duration;

  pub fn parameters() -> ParameterSet {
    let mut p = ParameterSet::defaults();
    p.min_radius = 6;
    p.max_radius = 30;
    p.sensitivity = 15;
    p.roi_pct = 1.;
    p.target_width = 260;
    p
  }

  pub fn radar_with(frame: Option<ColorImage>) -> (LiveRadar, StubProbe) {
    let (camera, probe) = StubCamera::new(frame);
    let capture = CaptureController::new(Box::new(camera), StreamRequest::default());
    let detector: Box<dyn CircleDetector> = Box::new(HoughCircleDetector::load().unwrap());
    (LiveRadar::new(capture, Ok(detector), &parameters()), probe)
  }

  fn run_ticks(radar: &mut LiveRadar, n: usize) -> Vec<TickOutcome> {
    let t0 = Instant::now();
    (0..n).map(|i| radar.tick(t0 + Duration::from_millis(200 * i as u64))).collect()
  }

  #[test]
  fn test_empty_scene_end_to_end() {
    let (mut radar, probe) = radar_with(Some(disk_image(520, 292, &[], 0, 1)));
    radar.start().unwrap();
    for outcome in run_ticks(&mut radar, 5) {
      assert_eq!(outcome, TickOutcome::Detected { candidates: 0, highlighted: None });
      assert_eq!(radar.track_state().stable, None);
    }
    assert_eq!(*radar.track_state(), TrackState::default());
    assert!(radar.reading(None).is_none());
    radar.stop();
    assert!(probe.closed.load(Ordering::SeqCst));
    assert!(!probe.open.load(Ordering::SeqCst));
  }

  #[test]
  fn test_tracks_disk_near_crosshair() {
    // Frame pixels are halved by the sampler to 260 wide.
    let frame = disk_image(520, 292, &[[280., 160., 30.], [90., 80., 30.]], 4, 2);
    let (mut radar, _probe) = radar_with(Some(frame));
    radar.start().unwrap();
    run_ticks(&mut radar, 3);
    let reading = radar.reading(None).unwrap();
    assert!((reading.circle.x - 280.5 / 520.).abs() < 0.01, "{:?}", reading);
    assert!((reading.circle.y - 160.5 / 292.).abs() < 0.015, "{:?}", reading);
    assert_eq!(reading.distance.unit, Unit::Pixels);
    // Crosshair at (260, 146) in frame pixels.
    assert!((reading.distance.value - (20f64 * 20. + 14. * 14.).sqrt()).abs() < 4., "{:?}", reading);
    let last = radar.last_frame().unwrap();
    assert_eq!(last.image.width, 260);
    assert_eq!(last.candidates.len(), 2);
  }

  #[test]
  fn test_auto_detect_off_samples_only() {
    let frame = disk_image(520, 292, &[[260., 146., 30.]], 0, 3);
    let (mut radar, _probe) = radar_with(Some(frame));
    radar.start().unwrap();
    radar.set_auto_detect(false);
    let t0 = Instant::now();
    assert_eq!(radar.tick(t0), TickOutcome::Sampled);
    assert!(radar.reading(None).is_none());
    radar.set_auto_detect(true);
    let outcome = radar.tick(t0 + Duration::from_millis(200));
    assert!(matches!(outcome, TickOutcome::Detected { candidates: 1, .. }), "{:?}", outcome);
  }

  #[test]
  fn test_pause_and_resume() {
    let (mut radar, probe) = radar_with(Some(disk_image(200, 100, &[], 0, 4)));
    assert_eq!(radar.tick(Instant::now()), TickOutcome::Inactive);
    radar.start().unwrap();
    let t0 = Instant::now();
    assert!(matches!(radar.tick(t0), TickOutcome::Detected { .. }));
    assert_eq!(radar.tick(t0 + Duration::from_millis(10)), TickOutcome::NotDue);
    radar.set_visible(false);
    assert_eq!(radar.tick(t0 + Duration::from_secs(1)), TickOutcome::Paused);
    assert!(probe.open.load(Ordering::SeqCst));
    radar.set_visible(true);
    // Re-armed: due right away.
    assert!(matches!(radar.tick(t0 + Duration::from_millis(20)), TickOutcome::Detected { .. }));
  }

  #[test]
  fn test_missing_detector_falls_back() {
    let (camera, _probe) = StubCamera::new(Some(disk_image(200, 100, &[], 0, 5)));
    let capture = CaptureController::new(Box::new(camera), StreamRequest::default());
    let mut radar = LiveRadar::new(
      capture,
      Err(MeasureError::DetectorUnavailable("test".into())),
      &parameters(),
    );
    assert!(!radar.auto_detect());
    radar.set_auto_detect(true);
    assert!(!radar.auto_detect());
    radar.start().unwrap();
    assert_eq!(radar.tick(Instant::now()), TickOutcome::Sampled);
  }

  #[test]
  fn test_config_is_sanitized() {
    let (mut radar, _probe) = radar_with(None);
    radar.set_config(DetectorConfig { roi_pct: 0.2, ..radar.config() });
    assert_eq!(radar.config().roi_pct, MIN_ROI_PCT);
  }
}
