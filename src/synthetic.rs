// Generated pétanque scene for running the live radar without a camera: a
// gravel-like noisy ground with a few boules that wobble a little between
// frames.

use crate::all::*;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

const GROUND: i32 = 150;
const NOISE: i32 = 12;
const WOBBLE: f64 = 0.004;

struct Ball {
  // Normalized center, radius normalized by the frame width.
  center: Vector2d,
  r: f64,
  shade: i32,
}

pub struct SyntheticCamera {
  seed: u64,
  rng: Xoshiro256PlusPlus,
  size: Option<FrameSize>,
  balls: Vec<Ball>,
}

impl SyntheticCamera {
  pub fn new(seed: u64) -> SyntheticCamera {
    SyntheticCamera {
      seed,
      rng: Xoshiro256PlusPlus::seed_from_u64(seed),
      size: None,
      balls: vec![
        Ball { center: Vector2d::new(0.47, 0.53), r: 0.035, shade: 70 },
        Ball { center: Vector2d::new(0.62, 0.42), r: 0.035, shade: 85 },
        // The cochonnet is smaller and lighter.
        Ball { center: Vector2d::new(0.55, 0.60), r: 0.014, shade: 235 },
      ],
    }
  }

  fn render(&mut self, size: FrameSize) -> ColorImage {
    let mut image = ColorImage::new(size.width, size.height);
    let w = size.width as f64;
    for ball in self.balls.iter_mut() {
      ball.center[0] += self.rng.gen_range(-WOBBLE..=WOBBLE);
      ball.center[1] += self.rng.gen_range(-WOBBLE..=WOBBLE);
    }
    for y in 0..size.height {
      for x in 0..size.width {
        let p = Vector2d::new(x as f64 / w, y as f64 / w);
        let mut v = GROUND;
        for ball in &self.balls {
          let c = Vector2d::new(ball.center[0], ball.center[1] * size.height as f64 / w);
          if (p - c).norm() <= ball.r { v = ball.shade }
        }
        let v = (v + self.rng.gen_range(-NOISE..=NOISE)).clamp(0, 255) as u8;
        image.set_pixel(x, y, [v, v, v.saturating_sub(10)]);
      }
    }
    image
  }
}

impl CameraDevice for SyntheticCamera {
  fn open(&mut self, request: &StreamRequest) -> std::result::Result<FrameSize, CameraError> {
    self.rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
    self.size = Some(request.ideal);
    Ok(request.ideal)
  }

  fn latest_frame(&mut self) -> Option<ColorImage> {
    let size = self.size?;
    Some(self.render(size))
  }

  fn close(&mut self) {
    self.size = None;
  }
}
