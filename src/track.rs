use crate::all::*;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackState {
  // Raw circle picked by the continuity matcher on the last tick.
  pub last_matched: Option<Circle>,
  // Smoothed position of the followed circle.
  pub stable: Option<Circle>,
}

// Single writer of `TrackState`: one `update()` per detection tick.
pub struct Tracker {
  matcher: ContinuityMatcher,
  ema: Ema,
  state: TrackState,
  highlighted: Option<Circle>,
}

impl Tracker {
  pub fn new(continuity_threshold: f64, alpha: f64) -> Tracker {
    Tracker {
      matcher: ContinuityMatcher::new(continuity_threshold),
      ema: Ema::new(alpha),
      state: TrackState::default(),
      highlighted: None,
    }
  }

  // Returns the highlighted circle: the detection of this tick closest to the
  // smoothed track. The smoothed circle itself is never returned.
  pub fn update(&mut self, candidates: &[Circle]) -> Option<Circle> {
    let picked = self.matcher.pick(self.state.last_matched, candidates);
    self.state = TrackState {
      last_matched: picked,
      stable: self.ema.update(self.state.stable, picked),
    };
    self.highlighted = self.state.stable
      .and_then(|s| nearest(candidates, s.center()))
      .map(|(c, _)| c);
    self.highlighted
  }

  pub fn state(&self) -> &TrackState {
    &self.state
  }

  pub fn highlighted(&self) -> Option<Circle> {
    self.highlighted
  }

  pub fn reset(&mut self) {
    self.state = TrackState::default();
    self.highlighted = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tracker() -> Tracker {
    Tracker::new(DEFAULT_CONTINUITY_THRESHOLD, DEFAULT_SMOOTHING_ALPHA)
  }

  #[test]
  fn test_highlight_is_a_real_detection() {
    let mut tracker = tracker();
    let a = Circle::new(0.50, 0.50, 0.05);
    assert_eq!(tracker.update(&[a]), Some(a));
    let moved = Circle::new(0.54, 0.52, 0.05);
    let other = Circle::new(0.2, 0.8, 0.05);
    let highlighted = tracker.update(&[other, moved]).unwrap();
    assert_eq!(highlighted, moved);
    let stable = tracker.state().stable.unwrap();
    assert!(stable != moved && stable != a);
    assert_eq!(tracker.state().last_matched, Some(moved));
  }

  #[test]
  fn test_empty_tick_clears() {
    let mut tracker = tracker();
    tracker.update(&[Circle::new(0.5, 0.5, 0.05)]);
    assert_eq!(tracker.update(&[]), None);
    assert_eq!(*tracker.state(), TrackState::default());
    assert_eq!(tracker.highlighted(), None);
  }

  #[test]
  fn test_converges_on_steady_input() {
    let mut tracker = tracker();
    let c = Circle::new(0.45, 0.55, 0.04);
    tracker.update(&[Circle::new(0.5, 0.5, 0.03)]);
    for _ in 0..25 {
      tracker.update(&[c]);
    }
    let s = tracker.state().stable.unwrap();
    assert!((s.x - c.x).abs() < 1e-3 && (s.y - c.y).abs() < 1e-3 && (s.r - c.r).abs() < 1e-3);
  }
}
