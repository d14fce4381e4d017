// Smoothing and gradient filters for the circle detector. Borders are handled
// by clamping coordinates to the image.

use crate::all::*;

pub const BLUR_KERNEL_SIZE: usize = 7;
pub const BLUR_SIGMA: f32 = 1.5;

lazy_static! {
  // Computed once per process and shared by every detector instance.
  pub static ref BLUR_KERNEL: [f32; BLUR_KERNEL_SIZE] = gaussian_kernel(BLUR_SIGMA);
}

#[derive(Clone)]
pub struct FloatImage {
  pub data: Vec<f32>,
  pub width: usize,
  pub height: usize,
}

impl FloatImage {
  pub fn new(width: usize, height: usize) -> FloatImage {
    FloatImage {
      data: vec![0.; width * height],
      width,
      height,
    }
  }

  #[inline(always)]
  pub fn get(&self, x: usize, y: usize) -> f32 {
    self.data[y * self.width + x]
  }

  #[inline(always)]
  pub fn set(&mut self, x: usize, y: usize, v: f32) {
    self.data[y * self.width + x] = v;
  }
}

pub struct Gradients {
  pub gx: FloatImage,
  pub gy: FloatImage,
  pub magnitude: FloatImage,
}

pub fn gaussian_kernel<const N: usize>(sigma: f32) -> [f32; N] {
  let mut kernel = [0.; N];
  let half = (N / 2) as f32;
  let mut sum = 0.;
  for (i, k) in kernel.iter_mut().enumerate() {
    let d = i as f32 - half;
    *k = (-d * d / (2. * sigma * sigma)).exp();
    sum += *k;
  }
  for k in kernel.iter_mut() {
    *k /= sum;
  }
  kernel
}

// Separable convolution with a symmetric kernel.
pub fn blur(image: &Image, kernel: &[f32]) -> FloatImage {
  let w = image.width;
  let h = image.height;
  let mut tmp = FloatImage::new(w, h);
  let mut out = FloatImage::new(w, h);
  if w == 0 || h == 0 { return out }
  let half = (kernel.len() / 2) as i64;
  for y in 0..h {
    for x in 0..w {
      let mut v = 0.;
      for (i, k) in kernel.iter().enumerate() {
        let sx = (x as i64 + i as i64 - half).clamp(0, w as i64 - 1) as usize;
        v += k * image.value(sx, y) as f32;
      }
      tmp.set(x, y, v);
    }
  }
  for y in 0..h {
    for x in 0..w {
      let mut v = 0.;
      for (i, k) in kernel.iter().enumerate() {
        let sy = (y as i64 + i as i64 - half).clamp(0, h as i64 - 1) as usize;
        v += k * tmp.get(x, sy);
      }
      out.set(x, y, v);
    }
  }
  out
}

pub fn sobel(image: &FloatImage) -> Gradients {
  let w = image.width;
  let h = image.height;
  let mut g = Gradients {
    gx: FloatImage::new(w, h),
    gy: FloatImage::new(w, h),
    magnitude: FloatImage::new(w, h),
  };
  if w == 0 || h == 0 { return g }
  for y in 0..h {
    let ys = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
    for x in 0..w {
      let xs = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
      let p = |i: usize, j: usize| image.get(xs[i], ys[j]);
      let gx = (p(2, 0) + 2. * p(2, 1) + p(2, 2)) - (p(0, 0) + 2. * p(0, 1) + p(0, 2));
      let gy = (p(0, 2) + 2. * p(1, 2) + p(2, 2)) - (p(0, 0) + 2. * p(1, 0) + p(2, 0));
      g.gx.set(x, y, gx);
      g.gy.set(x, y, gy);
      g.magnitude.set(x, y, (gx * gx + gy * gy).sqrt());
    }
  }
  g
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kernel_is_normalized_and_symmetric() {
    let k = *BLUR_KERNEL;
    assert!((k.iter().sum::<f32>() - 1.).abs() < 1e-6);
    for i in 0..BLUR_KERNEL_SIZE {
      assert!((k[i] - k[BLUR_KERNEL_SIZE - 1 - i]).abs() < 1e-7);
    }
    assert!(k[3] > k[2] && k[2] > k[1] && k[1] > k[0]);
  }

  #[test]
  fn test_blur_keeps_constant_image() {
    let mut image = Image::new(9, 5);
    image.data.iter_mut().for_each(|v| *v = 80);
    let out = blur(&image, &*BLUR_KERNEL);
    assert!(out.data.iter().all(|v| (v - 80.).abs() < 1e-3));
  }

  #[test]
  fn test_sobel_vertical_edge() {
    let mut image = FloatImage::new(6, 3);
    for y in 0..3 {
      for x in 3..6 {
        image.set(x, y, 10.);
      }
    }
    let g = sobel(&image);
    assert_eq!(g.gx.get(2, 1), 40.);
    assert_eq!(g.gy.get(2, 1), 0.);
    assert_eq!(g.magnitude.get(0, 1), 0.);
  }
}
