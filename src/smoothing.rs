use crate::all::*;

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.35;

// Exponential moving average over the followed circle.
pub struct Ema {
  // Weight of the newest sample, in `(0, 1]`.
  pub alpha: f64,
}

impl Ema {
  pub fn new(alpha: f64) -> Ema {
    let alpha = if alpha.is_finite() { alpha.clamp(f64::EPSILON, 1.) } else { DEFAULT_SMOOTHING_ALPHA };
    Ema {
      alpha,
    }
  }

  pub fn update(&self, stable: Option<Circle>, picked: Option<Circle>) -> Option<Circle> {
    let picked = picked?;
    let stable = match stable {
      Some(stable) => stable,
      None => return Some(picked),
    };
    let a = self.alpha;
    Some(Circle::new(
      stable.x * (1. - a) + picked.x * a,
      stable.y * (1. - a) + picked.y * a,
      stable.r * (1. - a) + picked.r * a,
    ))
  }
}
