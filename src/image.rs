use crate::all::*;

use std::ops::Index;

// Row-major grayscale image storage.
#[derive(Clone)]
pub struct Image {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl Image {
  pub fn new(width: usize, height: usize) -> Image {
    Image {
      data: vec![0; width * height],
      width,
      height,
    }
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }
}

// Element access in the manner of `image[y][x]`.
impl Index<usize> for Image {
  type Output = [u8];
  fn index(&self, y: usize) -> &Self::Output {
    &self.data[y * self.width .. (y + 1) * self.width]
  }
}

// Row-major interleaved RGB storage, the format camera frames are decoded to.
#[derive(Clone)]
pub struct ColorImage {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl ColorImage {
  pub fn new(width: usize, height: usize) -> ColorImage {
    ColorImage {
      data: vec![0; width * height * 3],
      width,
      height,
    }
  }

  pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<ColorImage> {
    if data.len() != width * height * 3 {
      bail!("RGB buffer of {} bytes does not match {}x{}.", data.len(), width, height);
    }
    Ok(ColorImage { data, width, height })
  }

  // Decodes a still photo at its natural resolution.
  pub fn load(path: &Path) -> Result<ColorImage> {
    let rgb = ::image::open(path)
      .context(format!("Failed to decode image {}.", path.display()))?
      .to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    ColorImage::from_raw(width, height, rgb.into_raw())
  }

  pub fn size(&self) -> FrameSize {
    FrameSize::new(self.width, self.height)
  }

  #[inline(always)]
  pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
    let i = 3 * (y * self.width + x);
    [self.data[i], self.data[i + 1], self.data[i + 2]]
  }

  #[inline(always)]
  pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
    let i = 3 * (y * self.width + x);
    self.data[i .. i + 3].copy_from_slice(&rgb);
  }

  // ITU-R BT.601 luma.
  pub fn to_gray(&self) -> Image {
    let mut gray = Image::new(self.width, self.height);
    for (g, p) in gray.data.iter_mut().zip(self.data.chunks_exact(3)) {
      let v = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
      *g = v.round().min(255.) as u8;
    }
    gray
  }

  pub fn get_sub_image(
    &self,
    ax: usize,
    ay: usize,
    width: usize,
    height: usize,
  ) -> ColorImage {
    assert!(ax + width <= self.width && ay + height <= self.height);
    let mut image = ColorImage::new(width, height);
    for y in 0..height {
      let src = 3 * ((ay + y) * self.width + ax);
      let dst = 3 * y * width;
      image.data[dst .. dst + 3 * width].copy_from_slice(&self.data[src .. src + 3 * width]);
    }
    image
  }

  // Area-averaging resize. Each output pixel is the mean of the source pixels
  // its footprint covers; enlarging degrades to nearest neighbour.
  pub fn resize(&self, width: usize, height: usize) -> ColorImage {
    let mut out = ColorImage::new(width, height);
    if self.width == 0 || self.height == 0 { return out }
    for y in 0..height {
      let (y0, y1) = footprint(y, height, self.height);
      for x in 0..width {
        let (x0, x1) = footprint(x, width, self.width);
        let mut sum = [0u32; 3];
        for sy in y0..y1 {
          for sx in x0..x1 {
            let p = self.pixel(sx, sy);
            for c in 0..3 { sum[c] += p[c] as u32 }
          }
        }
        let n = ((y1 - y0) * (x1 - x0)) as u32;
        out.set_pixel(x, y, [
          ((sum[0] + n / 2) / n) as u8,
          ((sum[1] + n / 2) / n) as u8,
          ((sum[2] + n / 2) / n) as u8,
        ]);
      }
    }
    out
  }
}

fn footprint(i: usize, dst_len: usize, src_len: usize) -> (usize, usize) {
  let start = (i * src_len / dst_len).min(src_len - 1);
  let end = ((i + 1) * src_len / dst_len).clamp(start + 1, src_len);
  (start, end)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resize_averages_blocks() {
    let mut image = ColorImage::new(4, 2);
    image.set_pixel(0, 0, [100, 0, 0]);
    image.set_pixel(1, 0, [200, 0, 0]);
    image.set_pixel(0, 1, [100, 0, 0]);
    image.set_pixel(1, 1, [200, 0, 0]);
    image.set_pixel(3, 1, [0, 0, 40]);
    let small = image.resize(2, 1);
    assert_eq!(small.pixel(0, 0), [150, 0, 0]);
    assert_eq!(small.pixel(1, 0), [0, 0, 10]);
  }

  #[test]
  fn test_sub_image_and_gray() {
    let mut image = ColorImage::new(3, 3);
    image.set_pixel(1, 2, [255, 255, 255]);
    let sub = image.get_sub_image(1, 1, 2, 2);
    assert_eq!(sub.pixel(0, 1), [255, 255, 255]);
    let gray = sub.to_gray();
    assert_eq!(gray[1][0], 255);
    assert_eq!(gray.value(1, 1), 0);
  }

  #[test]
  fn test_load_png() {
    let path = std::env::temp_dir().join(format!("boule-radar-photo-{}.png", std::process::id()));
    let mut png = ::image::RgbImage::new(5, 3);
    png.put_pixel(4, 2, ::image::Rgb([10, 20, 30]));
    png.save(&path).unwrap();
    let photo = ColorImage::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(photo.size(), FrameSize::new(5, 3));
    assert_eq!(photo.pixel(4, 2), [10, 20, 30]);
    assert_eq!(photo.pixel(0, 0), [0, 0, 0]);
    assert!(ColorImage::load(&path).is_err());
  }

  #[test]
  fn test_from_raw_checks_length() {
    assert!(ColorImage::from_raw(2, 2, vec![0; 12]).is_ok());
    assert!(ColorImage::from_raw(2, 2, vec![0; 11]).is_err());
  }
}
