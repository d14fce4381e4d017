// Frames are decoded by an `ffmpeg` child process into raw RGB on its stdout.

use crate::all::*;

use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Covers device warm-up. A process that dies or stays silent this long means
// the source is unusable.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);
const FIRST_FRAME_POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Debug)]
pub enum VideoSource {
  // V4L2 capture device, eg `/dev/video0`.
  Device(PathBuf),
  // Video file played back in real time.
  File(PathBuf),
}

pub struct FfmpegCamera {
  source: VideoSource,
  program: PathBuf,
  stream: Option<FfmpegStream>,
}

struct FfmpegStream {
  child: Child,
  reader: Option<JoinHandle<()>>,
  latest: Arc<Mutex<Option<ColorImage>>>,
}

#[derive(Deserialize)]
struct ProbeOutput {
  streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
  width: usize,
  height: usize,
}

impl FfmpegCamera {
  pub fn new(source: VideoSource) -> FfmpegCamera {
    FfmpegCamera::with_program(source, "ffmpeg")
  }

  pub fn with_program(source: VideoSource, program: impl Into<PathBuf>) -> FfmpegCamera {
    FfmpegCamera {
      source,
      program: program.into(),
      stream: None,
    }
  }

  fn input_args(&self, request: &StreamRequest) -> std::result::Result<(Vec<String>, FrameSize), CameraError> {
    match &self.source {
      VideoSource::Device(path) => {
        if !path.exists() {
          return Err(CameraError::Unavailable(format!("no camera at {}", path.display())));
        }
        if let Err(err) = File::open(path) {
          if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Err(CameraError::PermissionDenied(path.display().to_string()));
          }
          return Err(CameraError::Unavailable(format!("{}: {}", path.display(), err)));
        }
        let size = request.ideal;
        Ok((vec![
          "-f".into(), "v4l2".into(),
          "-video_size".into(), format!("{}x{}", size.width, size.height),
          "-i".into(), path.display().to_string(),
        ], size))
      },
      VideoSource::File(path) => {
        let size = probe_size(path)
          .map_err(|err| CameraError::Unavailable(format!("{:#}", err)))?;
        Ok((vec![
          "-re".into(),
          "-i".into(), path.display().to_string(),
        ], bounded_size(size, request.ideal)))
      },
    }
  }
}

impl CameraDevice for FfmpegCamera {
  fn open(&mut self, request: &StreamRequest) -> std::result::Result<FrameSize, CameraError> {
    self.close();
    let (mut args, size) = self.input_args(request)?;
    args.extend([
      "-vf".into(), format!("scale={}:{}", size.width, size.height),
      "-f".into(), "rawvideo".into(),
      "-pix_fmt".into(), "rgb24".into(),
      "-".into(),
    ]);
    let mut child = Command::new(&self.program)
      .args(["-v", "error", "-nostdin"])
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .spawn()
      .map_err(|err| CameraError::Unavailable(format!("failed to start {}: {}", self.program.display(), err)))?;
    let mut stdout = match child.stdout.take() {
      Some(stdout) => stdout,
      None => {
        let _ = child.kill();
        let _ = child.wait();
        return Err(CameraError::Unavailable("ffmpeg has no stdout".into()));
      },
    };

    let latest = Arc::new(Mutex::new(None));
    let slot = latest.clone();
    let reader = thread::spawn(move || {
      let mut buffer = vec![0; size.width * size.height * 3];
      // Ends when the process exits or is killed by `close()`.
      while stdout.read_exact(&mut buffer).is_ok() {
        if let Ok(frame) = ColorImage::from_raw(size.width, size.height, buffer.clone()) {
          if let Ok(mut slot) = slot.lock() {
            *slot = Some(frame);
          }
        }
      }
      debug!("ffmpeg frame reader finished.");
    });

    let mut stream = FfmpegStream {
      child,
      reader: Some(reader),
      latest,
    };
    if let Err(err) = stream.wait_first_frame(FIRST_FRAME_TIMEOUT) {
      stream.release();
      return Err(err);
    }
    self.stream = Some(stream);
    Ok(size)
  }

  fn latest_frame(&mut self) -> Option<ColorImage> {
    let stream = self.stream.as_ref()?;
    let slot = stream.latest.lock().ok()?;
    slot.clone()
  }

  fn close(&mut self) {
    if let Some(mut stream) = self.stream.take() {
      stream.release();
    }
  }
}

impl FfmpegStream {
  fn has_frame(&self) -> bool {
    self.latest.lock().map_or(false, |slot| slot.is_some())
  }

  fn wait_first_frame(&mut self, timeout: Duration) -> std::result::Result<(), CameraError> {
    let deadline = Instant::now() + timeout;
    loop {
      if self.has_frame() { return Ok(()) }
      match self.child.try_wait() {
        Ok(Some(status)) => {
          // The last frame may land between the two checks.
          if self.has_frame() { return Ok(()) }
          return Err(CameraError::Unavailable(format!("ffmpeg exited with {} before the first frame", status)));
        },
        Ok(None) => {},
        Err(err) => return Err(CameraError::Unavailable(format!("lost the ffmpeg process: {}", err))),
      }
      if Instant::now() >= deadline {
        return Err(CameraError::Unavailable(format!("no frame within {} s", timeout.as_secs())));
      }
      thread::sleep(FIRST_FRAME_POLL);
    }
  }

  fn release(&mut self) {
    let _ = self.child.kill();
    let _ = self.child.wait();
    if let Some(reader) = self.reader.take() {
      let _ = reader.join();
    }
    debug!("ffmpeg process released.");
  }
}

impl Drop for FfmpegCamera {
  fn drop(&mut self) {
    self.close();
  }
}

// Fits `size` inside `bound` keeping the aspect ratio. Never enlarges.
pub fn bounded_size(size: FrameSize, bound: FrameSize) -> FrameSize {
  let scale = (bound.width as f64 / size.width as f64)
    .min(bound.height as f64 / size.height as f64)
    .min(1.);
  FrameSize::new(
    ((size.width as f64 * scale).round() as usize).max(1),
    ((size.height as f64 * scale).round() as usize).max(1),
  )
}

pub fn probe_size(path: &Path) -> Result<FrameSize> {
  let output = Command::new("ffprobe")
    .args(["-v", "error", "-select_streams", "v:0", "-show_entries", "stream=width,height", "-of", "json"])
    .arg(path)
    .output()
    .context("Failed to run ffprobe.")?;
  if !output.status.success() {
    bail!("ffprobe failed on {}: {}", path.display(), String::from_utf8_lossy(&output.stderr).trim());
  }
  let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
    .context("Failed to parse ffprobe output.")?;
  let stream = probe.streams.first()
    .ok_or(anyhow!("No video stream in {}.", path.display()))?;
  Ok(FrameSize::new(stream.width, stream.height))
}
