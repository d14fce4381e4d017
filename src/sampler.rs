use crate::all::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_TICK_MS: u64 = 160;
pub const DEFAULT_TARGET_WIDTH: usize = 520;

pub struct FrameSampler {
  period: Duration,
  target_width: usize,
  next_due: Option<Instant>,
  busy: Arc<AtomicBool>,
}

pub enum Poll {
  Due(TickGuard),
  NotDue(Instant),
  // The previous tick is still being processed; this one is dropped.
  Busy,
}

// Marks a tick in progress until dropped.
pub struct TickGuard {
  busy: Arc<AtomicBool>,
}

impl Drop for TickGuard {
  fn drop(&mut self) {
    self.busy.store(false, Ordering::Release);
  }
}

impl FrameSampler {
  pub fn new(period: Duration, target_width: usize) -> FrameSampler {
    FrameSampler {
      period,
      target_width: target_width.max(1),
      next_due: None,
      busy: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn next_due(&self) -> Option<Instant> {
    self.next_due
  }

  pub fn poll(&mut self, now: Instant) -> Poll {
    if let Some(due) = self.next_due {
      if now < due { return Poll::NotDue(due) }
    }
    if self.busy.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed).is_err() {
      return Poll::Busy;
    }
    // Scheduled from the actual tick time: a late tick is not caught up.
    self.next_due = Some(now + self.period);
    Poll::Due(TickGuard { busy: self.busy.clone() })
  }

  // Next `poll()` is due immediately, eg after resuming.
  pub fn rearm(&mut self) {
    self.next_due = None;
  }

  pub fn scaled_size(&self, source: FrameSize) -> FrameSize {
    if source.width == 0 { return FrameSize::new(0, 0) }
    let height = (source.height as f64 * self.target_width as f64 / source.width as f64).round();
    FrameSize::new(self.target_width, (height as usize).max(1))
  }

  pub fn downscale(&self, frame: &ColorImage) -> ColorImage {
    let size = self.scaled_size(frame.size());
    frame.resize(size.width, size.height)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_period() {
    let mut sampler = FrameSampler::new(Duration::from_millis(160), 520);
    let t0 = Instant::now();
    assert!(matches!(sampler.poll(t0), Poll::Due(_)));
    match sampler.poll(t0 + Duration::from_millis(100)) {
      Poll::NotDue(due) => assert_eq!(due, t0 + Duration::from_millis(160)),
      _ => panic!("tick fired early"),
    }
    // Late tick, next one is a full period later.
    let t1 = t0 + Duration::from_millis(500);
    assert!(matches!(sampler.poll(t1), Poll::Due(_)));
    assert_eq!(sampler.next_due(), Some(t1 + Duration::from_millis(160)));
  }

  #[test]
  fn test_skip_while_busy() {
    let mut sampler = FrameSampler::new(Duration::from_millis(160), 520);
    let t0 = Instant::now();
    let guard = match sampler.poll(t0) {
      Poll::Due(guard) => guard,
      _ => panic!("first tick should be due"),
    };
    let t1 = t0 + Duration::from_millis(200);
    assert!(matches!(sampler.poll(t1), Poll::Busy));
    drop(guard);
    assert!(matches!(sampler.poll(t1), Poll::Due(_)));
  }

  #[test]
  fn test_rearm() {
    let mut sampler = FrameSampler::new(Duration::from_secs(10), 520);
    let t0 = Instant::now();
    assert!(matches!(sampler.poll(t0), Poll::Due(_)));
    assert!(matches!(sampler.poll(t0), Poll::NotDue(_)));
    sampler.rearm();
    assert!(matches!(sampler.poll(t0), Poll::Due(_)));
  }

  #[test]
  fn test_downscale_keeps_aspect() {
    let sampler = FrameSampler::new(Duration::from_millis(160), 520);
    assert_eq!(sampler.scaled_size(FrameSize::new(1280, 720)), FrameSize::new(520, 293));
    let scaled = sampler.downscale(&ColorImage::new(640, 480));
    assert_eq!((scaled.width, scaled.height), (520, 390));
  }
}
