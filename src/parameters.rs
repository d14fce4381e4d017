use crate::all::*;

use clap::Parser;
use std::time::Duration;

// Flattened into the command line. Global so the flags also work after the
// subcommand.
#[derive(Clone, Debug)]
#[derive(clap::Parser)]
pub struct ParameterSet {
  // Capture.
  #[clap(long, global = true, default_value_t = DEFAULT_CAPTURE_WIDTH)]
  pub capture_width: usize,
  #[clap(long, global = true, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
  pub capture_height: usize,

  // Frame sampler.
  #[clap(long, global = true, default_value_t = DEFAULT_TICK_MS)]
  pub tick_ms: u64,
  #[clap(long, global = true, default_value_t = DEFAULT_TARGET_WIDTH)]
  pub target_width: usize,

  // Circle detector. Radii and distances in pixels of the sampled frame.
  #[clap(long, global = true, default_value_t = DEFAULT_ROI_PCT)]
  pub roi_pct: f64,
  #[clap(long, global = true, default_value_t = DEFAULT_MIN_RADIUS)]
  pub min_radius: usize,
  #[clap(long, global = true, default_value_t = DEFAULT_MAX_RADIUS)]
  pub max_radius: usize,
  #[clap(long, global = true, default_value_t = DEFAULT_SENSITIVITY)]
  pub sensitivity: u32,
  #[clap(long, global = true, default_value_t = DEFAULT_EDGE_THRESHOLD)]
  pub edge_threshold: f32,
  #[clap(long, global = true, default_value_t = DEFAULT_MIN_DISTANCE)]
  pub min_distance: f64,
  #[clap(long, global = true, default_value_t = DEFAULT_BORDER_MARGIN)]
  pub border_margin: f64,

  // Tracking.
  #[clap(long, global = true, default_value_t = DEFAULT_CONTINUITY_THRESHOLD)]
  pub continuity_threshold: f64,
  #[clap(long, global = true, default_value_t = DEFAULT_SMOOTHING_ALPHA)]
  pub smoothing_alpha: f64,

  // Decision.
  #[clap(long, global = true, default_value_t = DEFAULT_TOLERANCE)]
  pub tolerance: f64,
}

impl ParameterSet {
  #[cfg(test)]
  pub fn defaults() -> ParameterSet {
    ParameterSet::parse_from(["boule-radar"])
  }

  pub fn tick_period(&self) -> Duration {
    Duration::from_millis(self.tick_ms.max(1))
  }

  pub fn stream_request(&self) -> StreamRequest {
    StreamRequest {
      ideal: FrameSize::new(self.capture_width.max(1), self.capture_height.max(1)),
    }
  }

  pub fn detector_config(&self) -> DetectorConfig {
    DetectorConfig {
      roi_pct: self.roi_pct,
      min_radius: self.min_radius,
      max_radius: self.max_radius,
      sensitivity: self.sensitivity,
      edge_threshold: self.edge_threshold,
      min_distance: self.min_distance,
    }.sanitized()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let p = ParameterSet::defaults();
    assert_eq!(p.tick_period(), Duration::from_millis(160));
    assert_eq!(p.target_width, 520);
    assert_eq!(p.detector_config(), DetectorConfig::default());
    assert_eq!(p.stream_request(), StreamRequest::default());
    assert_eq!(p.continuity_threshold, 0.08);
    assert_eq!(p.smoothing_alpha, 0.35);
  }

  #[test]
  fn test_flags() {
    let p = ParameterSet::parse_from(["boule-radar", "--roi-pct", "0.2", "--sensitivity", "12"]);
    assert_eq!(p.detector_config().roi_pct, MIN_ROI_PCT);
    assert_eq!(p.detector_config().sensitivity, 12);
  }
}
