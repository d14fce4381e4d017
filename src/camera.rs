use crate::all::*;

pub const DEFAULT_CAPTURE_WIDTH: usize = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: usize = 720;

// Bounded resolution asked from the device, to cap per-frame cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamRequest {
  pub ideal: FrameSize,
}

impl Default for StreamRequest {
  fn default() -> StreamRequest {
    StreamRequest {
      ideal: FrameSize::new(DEFAULT_CAPTURE_WIDTH, DEFAULT_CAPTURE_HEIGHT),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamHandle {
  pub id: u64,
  pub size: FrameSize,
}

// A source of camera frames. Implementations own the hardware (or process)
// between `open()` and `close()`.
pub trait CameraDevice {
  fn open(&mut self, request: &StreamRequest) -> std::result::Result<FrameSize, CameraError>;

  // Most recently decoded frame, if any has arrived yet.
  fn latest_frame(&mut self) -> Option<ColorImage>;

  // Must be safe to call when not open.
  fn close(&mut self);
}

// Sole owner of the camera stream. At most one stream is active, and it is
// released on `stop()` or when the controller is dropped.
pub struct CaptureController {
  device: Box<dyn CameraDevice>,
  request: StreamRequest,
  active: Option<StreamHandle>,
  paused: bool,
  next_id: u64,
}

impl CaptureController {
  pub fn new(device: Box<dyn CameraDevice>, request: StreamRequest) -> CaptureController {
    CaptureController {
      device,
      request,
      active: None,
      paused: false,
      next_id: 1,
    }
  }

  pub fn start(&mut self) -> std::result::Result<StreamHandle, CameraError> {
    if self.active.is_some() {
      self.stop();
    }
    // No retry: the user has to ask again.
    let size = match self.device.open(&self.request) {
      Ok(size) => size,
      Err(err) => {
        warn!("Camera start failed: {}", err);
        self.device.close();
        return Err(err);
      },
    };
    let handle = StreamHandle { id: self.next_id, size };
    self.next_id += 1;
    self.active = Some(handle);
    self.paused = false;
    info!("Camera stream {} started at {}x{}.", handle.id, size.width, size.height);
    Ok(handle)
  }

  pub fn stop(&mut self) {
    if let Some(handle) = self.active.take() {
      info!("Camera stream {} stopped.", handle.id);
    }
    self.device.close();
    self.paused = false;
  }

  pub fn is_active(&self) -> bool {
    self.active.is_some()
  }

  // Suspends frame processing; the stream itself stays open.
  pub fn pause(&mut self) {
    if self.active.is_some() && !self.paused {
      debug!("Capture processing paused.");
      self.paused = true;
    }
  }

  pub fn resume(&mut self) {
    if self.paused {
      debug!("Capture processing resumed.");
      self.paused = false;
    }
  }

  pub fn is_paused(&self) -> bool {
    self.paused
  }

  pub fn frame(&mut self) -> Option<ColorImage> {
    if self.active.is_none() { return None }
    self.device.latest_frame()
  }
}

impl Drop for CaptureController {
  fn drop(&mut self) {
    self.stop();
  }
}
