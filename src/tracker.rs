use crate::all::*;

pub const DEFAULT_CONTINUITY_THRESHOLD: f64 = 0.08;

// Keeps the identity of the followed circle stable across detection ticks.
pub struct ContinuityMatcher {
  // Normalized distance under which a new circle is the previous one moved.
  pub threshold: f64,
}

impl ContinuityMatcher {
  pub fn new(threshold: f64) -> ContinuityMatcher {
    ContinuityMatcher {
      threshold,
    }
  }

  pub fn pick(&self, previous: Option<Circle>, candidates: &[Circle]) -> Option<Circle> {
    if candidates.is_empty() { return None }
    if let Some(previous) = previous {
      if let Some((c, d)) = nearest(candidates, previous.center()) {
        if d < self.threshold { return Some(c) }
      }
    }
    // Nothing to continue from: take the one under the crosshair.
    nearest(candidates, Point::center()).map(|(c, _)| c)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_continuity_preference() {
    let matcher = ContinuityMatcher::new(DEFAULT_CONTINUITY_THRESHOLD);
    let previous = Circle::new(0.50, 0.50, 0.05);
    let candidates = [Circle::new(0.10, 0.90, 0.05), Circle::new(0.52, 0.51, 0.05)];
    assert_eq!(matcher.pick(Some(previous), &candidates), Some(candidates[1]));
  }

  #[test]
  fn test_continuity_beats_center() {
    let matcher = ContinuityMatcher::new(DEFAULT_CONTINUITY_THRESHOLD);
    let previous = Circle::new(0.30, 0.30, 0.05);
    let candidates = [Circle::new(0.50, 0.50, 0.05), Circle::new(0.33, 0.32, 0.05)];
    assert_eq!(matcher.pick(Some(previous), &candidates), Some(candidates[1]));
  }

  #[test]
  fn test_fallback_on_discontinuity() {
    let matcher = ContinuityMatcher::new(DEFAULT_CONTINUITY_THRESHOLD);
    let previous = Circle::new(0.50, 0.50, 0.05);
    let candidates = [Circle::new(0.10, 0.90, 0.05)];
    assert_eq!(matcher.pick(Some(previous), &candidates), Some(candidates[0]));

    let candidates = [Circle::new(0.9, 0.1, 0.05), Circle::new(0.4, 0.45, 0.05)];
    assert_eq!(matcher.pick(Some(previous), &candidates), Some(candidates[1]));
  }

  #[test]
  fn test_first_tick_and_empty() {
    let matcher = ContinuityMatcher::new(DEFAULT_CONTINUITY_THRESHOLD);
    let candidates = [Circle::new(0.2, 0.2, 0.05), Circle::new(0.6, 0.55, 0.05)];
    assert_eq!(matcher.pick(None, &candidates), Some(candidates[1]));
    assert_eq!(matcher.pick(Some(candidates[0]), &[]), None);
  }
}
