use crate::all::*;

const CANDIDATE_COLOR: u32 = 0xc8c8c8;
const HIGHLIGHT_COLOR: u32 = 0x00ff40;
const ROI_COLOR: u32 = 0xffd000;
const CROSSHAIR_COLOR: u32 = 0xffffff;
const STABLE_COLOR: u32 = 0x00a0ff;
const SIDE_COLORS: [u32; 2] = [0xff3030, 0x3080ff];

// The buffer shows the whole frame, so normalized frame coordinates are
// normalized buffer coordinates.
pub struct VisualizeArgs<'a> {
  pub buffer: &'a mut Vec<u32>,
  pub buffer_w: usize,
  pub buffer_h: usize,
}

fn to_buffer(args: &VisualizeArgs, x: f64, y: f64) -> Vector2i {
  Vector2i::new(
    (x * args.buffer_w as f64).floor() as i32,
    (y * args.buffer_h as f64).floor() as i32,
  )
}

#[inline(always)]
fn draw_pixel(args: &mut VisualizeArgs, p: &Vector2i, v: u32) {
  if p[0] < 0 || p[0] >= args.buffer_w as i32 { return }
  if p[1] < 0 || p[1] >= args.buffer_h as i32 { return }
  args.buffer[p[1] as usize * args.buffer_w + p[0] as usize] = v;
}

fn draw_square(args: &mut VisualizeArgs, p: &Vector2i, v: u32, r: i32) {
  for z in (-r)..(r+1) {
    draw_pixel(args, &(p + Vector2i::new(z, -r)), v);
    draw_pixel(args, &(p + Vector2i::new(z, r)), v);
    draw_pixel(args, &(p + Vector2i::new(-r, z)), v);
    draw_pixel(args, &(p + Vector2i::new(r, z)), v);
  }
}

fn draw_line(args: &mut VisualizeArgs, mut p0: Vector2i, mut p1: Vector2i, v: u32) {
  let dx = p1[0] - p0[0];
  let dy = p1[1] - p0[1];
  if dx == 0 && dy == 0 {
    draw_pixel(args, &p0, v);
  }
  else if dx.abs() < dy.abs() {
    if p0[1] > p1[1] { (p0, p1) = (p1, p0); }
    let k = dx as f32 / dy as f32;
    for y in p0[1] ..= p1[1] {
      let x = p0[0] + (k * (y - p0[1]) as f32).round() as i32;
      draw_pixel(args, &Vector2i::new(x, y), v);
    }
  }
  else {
    if p0[0] > p1[0] { (p0, p1) = (p1, p0); }
    let k = dy as f32 / dx as f32;
    for x in p0[0] ..= p1[0] {
      let y = p0[1] + (k * (x - p0[0]) as f32).round() as i32;
      draw_pixel(args, &Vector2i::new(x, y), v);
    }
  }
}

// Midpoint circle.
fn draw_circle(args: &mut VisualizeArgs, c: &Vector2i, r: i32, v: u32) {
  let mut x = r;
  let mut y = 0;
  let mut err = 1 - r;
  while x >= y {
    for (sx, sy) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
      draw_pixel(args, &(c + Vector2i::new(sx, sy)), v);
    }
    y += 1;
    if err < 0 {
      err += 2 * y + 1;
    }
    else {
      x -= 1;
      err += 2 * (y - x) + 1;
    }
  }
}

fn draw_rect(args: &mut VisualizeArgs, p0: Vector2i, p1: Vector2i, v: u32) {
  let (a, b) = (Vector2i::new(p1[0], p0[1]), Vector2i::new(p0[0], p1[1]));
  draw_line(args, p0, a, v);
  draw_line(args, a, p1, v);
  draw_line(args, p1, b, v);
  draw_line(args, b, p0, v);
}

// Nearest-neighbor stretch of the image over the whole buffer.
fn draw_image(args: &mut VisualizeArgs, image: &ColorImage) {
  if image.width == 0 || image.height == 0 { return }
  for y in 0..args.buffer_h {
    let iy = (y * image.height / args.buffer_h).min(image.height - 1);
    for x in 0..args.buffer_w {
      let ix = (x * image.width / args.buffer_w).min(image.width - 1);
      let [r, g, b] = image.pixel(ix, iy);
      args.buffer[y * args.buffer_w + x] = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
    }
  }
}

fn draw_ball(args: &mut VisualizeArgs, c: &Circle, v: u32, thickness: i32) {
  let center = to_buffer(args, c.x, c.y);
  let r = (c.r * args.buffer_w.max(args.buffer_h) as f64).round() as i32;
  for i in 0..thickness {
    draw_circle(args, &center, (r - i).max(1), v);
  }
}

pub fn visualize(args: &mut VisualizeArgs, session: &MeasurementSession) -> Result<()> {
  if args.buffer.len() != args.buffer_w * args.buffer_h {
    bail!("Buffer size {} does not match {}x{}.", args.buffer.len(), args.buffer_w, args.buffer_h);
  }
  for v in args.buffer.iter_mut() { *v = 0 }

  let radar = session.radar();
  if let Some(last) = radar.last_frame() {
    draw_image(args, &last.image);
    let roi = &last.roi;
    let p0 = to_buffer(args,
      roi.x as f64 / roi.frame.width as f64,
      roi.y as f64 / roi.frame.height as f64,
    );
    let p1 = to_buffer(args,
      (roi.x + roi.width) as f64 / roi.frame.width as f64,
      (roi.y + roi.height) as f64 / roi.frame.height as f64,
    );
    draw_rect(args, p0, p1 - Vector2i::new(1, 1), ROI_COLOR);
    for c in &last.candidates {
      draw_ball(args, c, CANDIDATE_COLOR, 1);
    }
  }

  let target = session.target().unwrap_or(Point::center());
  let t = to_buffer(args, target.x, target.y);
  draw_line(args, t - Vector2i::new(8, 0), t + Vector2i::new(8, 0), CROSSHAIR_COLOR);
  draw_line(args, t - Vector2i::new(0, 8), t + Vector2i::new(0, 8), CROSSHAIR_COLOR);

  if let Some(c) = radar.highlighted() {
    draw_ball(args, &c, HIGHLIGHT_COLOR, 3);
    let p = to_buffer(args, c.x, c.y);
    draw_line(args, t, p, HIGHLIGHT_COLOR);
    // Smoothed track center, lags the highlighted detection.
    if let Some(s) = radar.track_state().stable {
      let q = to_buffer(args, s.x, s.y);
      draw_square(args, &q, STABLE_COLOR, 2);
    }
  }

  for side in [Side::A, Side::B] {
    for p in session.balls(side) {
      let q = to_buffer(args, p.x, p.y);
      draw_square(args, &q, SIDE_COLORS[side.index()], 3);
      draw_square(args, &q, SIDE_COLORS[side.index()], 2);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::tests::disk_image;
  use crate::radar::tests::radar_with;

  use std::time::Instant;

  fn args(buffer: &mut Vec<u32>, w: usize, h: usize) -> VisualizeArgs {
    *buffer = vec![0; w * h];
    VisualizeArgs { buffer, buffer_w: w, buffer_h: h }
  }

  #[test]
  fn test_primitives_clip() {
    let mut buffer = vec![];
    let mut a = args(&mut buffer, 20, 10);
    draw_line(&mut a, Vector2i::new(-5, 2), Vector2i::new(30, 2), 7);
    assert!((0..20).all(|x| a.buffer[2 * 20 + x] == 7));
    draw_circle(&mut a, &Vector2i::new(10, 5), 3, 9);
    assert_eq!(a.buffer[5 * 20 + 13], 9);
    assert_eq!(a.buffer[2 * 20 + 10], 9);
    assert_eq!(a.buffer[5 * 20 + 10], 0);
  }

  #[test]
  fn test_live_overlay() {
    let frame = disk_image(520, 292, &[[260., 146., 30.]], 0, 1);
    let (radar, _probe) = radar_with(Some(frame));
    let mut session = MeasurementSession::new(radar, 1.);
    session.start_live().unwrap();
    session.radar_mut().tick(Instant::now());
    assert!(session.radar().highlighted().is_some());

    let mut buffer = vec![];
    let mut a = args(&mut buffer, 260, 146);
    visualize(&mut a, &session).unwrap();
    assert!(a.buffer.iter().any(|v| *v == HIGHLIGHT_COLOR));
    assert!(a.buffer.iter().any(|v| *v == STABLE_COLOR));
    assert_eq!(a.buffer[73 * 260 + 122], CROSSHAIR_COLOR);
    // Background pixels come from the frame.
    assert_eq!(a.buffer[10 * 260 + 10], (60 << 16) | (60 << 8) | 60);
  }

  #[test]
  fn test_rejects_mismatched_buffer() {
    let (radar, _probe) = radar_with(None);
    let session = MeasurementSession::new(radar, 1.);
    let mut buffer = vec![0; 5];
    let mut a = VisualizeArgs { buffer: &mut buffer, buffer_w: 4, buffer_h: 4 };
    assert!(visualize(&mut a, &session).is_err());
  }
}
