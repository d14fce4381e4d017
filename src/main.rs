mod all;
mod calibration;
mod camera;
mod detector;
mod error;
mod event_loop;
mod filter;
mod image;
mod input;
mod ledger;
mod parameters;
mod radar;
mod resolver;
mod roi;
mod sampler;
mod session;
mod smoothing;
mod synthetic;
mod track;
mod tracker;
mod types;
mod util;
mod video;
mod visualize;

use all::*;

#[macro_use] extern crate lazy_static;
use clap::Parser;

use softbuffer::GraphicsContext;
use std::time::Instant;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit::platform::run_return::EventLoopExtRunReturn;

const DEFAULT_LEDGER_PATH: &str = "boule-radar-ledger.json";
const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_HEADLESS_TICKS: usize = 20;
const VIEWER_WIDTH: usize = 1040;

#[derive(Parser)]
#[clap(name = "boule-radar", about = "Measures which pétanque team is closer to the cochonnet.")]
struct Args {
  #[clap(subcommand)]
  command: Command,
  /// Measurement history, JSON.
  #[clap(long, global = true, default_value = DEFAULT_LEDGER_PATH)]
  ledger: PathBuf,
  #[clap(long, global = true, default_value = "info")]
  log_level: LevelFilter,
  #[clap(flatten)]
  parameters: ParameterSet,
}

#[derive(clap::Subcommand)]
enum Command {
  /// Distances measured by hand, in centimeters.
  Manual {
    #[clap(long)]
    da: f64,
    #[clap(long)]
    db: f64,
    #[clap(long)]
    note: Option<String>,
  },
  /// Still photo with tapped target and balls.
  Photo {
    #[clap(long)]
    image: PathBuf,
    #[clap(long)]
    annotations: Option<PathBuf>,
    /// Log boules found by the circle detector.
    #[clap(long)]
    suggest: bool,
    #[clap(long)]
    note: Option<String>,
  },
  /// Live radar on a camera, a video file or a generated scene.
  Live {
    #[clap(long, conflicts_with_all = &["file", "synthetic"])]
    device: Option<PathBuf>,
    #[clap(long, conflicts_with = "synthetic")]
    file: Option<PathBuf>,
    #[clap(long)]
    synthetic: bool,
    #[clap(long, default_value_t = 1)]
    seed: u64,
    /// Run without a window for `--ticks` sampling ticks.
    #[clap(long)]
    headless: bool,
    #[clap(long, default_value_t = DEFAULT_HEADLESS_TICKS)]
    ticks: usize,
    /// Reference segment `ax,ay,bx,by,cm` in normalized frame coordinates.
    /// Reports distances in centimeters.
    #[clap(long)]
    calibration: Option<CalibrationAnnotation>,
    /// Record the final headless reading.
    #[clap(long)]
    commit: bool,
    #[clap(long)]
    note: Option<String>,
  },
  Ledger {
    #[clap(subcommand)]
    action: LedgerAction,
  },
}

#[derive(clap::Subcommand)]
enum LedgerAction {
  /// Most recent first.
  List,
  Undo,
}

fn handle_error(err: &anyhow::Error) {
  for (i, e) in err.chain().enumerate() {
    println!("  {}: {}", i + 1, e);
  }
}

fn main() {
  if let Err(err) = run() {
    handle_error(&err);
    std::process::exit(1);
  }
}

fn build_session(p: &ParameterSet, device: Box<dyn CameraDevice>) -> MeasurementSession {
  let capture = CaptureController::new(device, p.stream_request());
  let detector = HoughCircleDetector::load()
    .map(|d| Box::new(d) as Box<dyn CircleDetector>);
  MeasurementSession::new(LiveRadar::new(capture, detector, p), p.tolerance)
}

fn idle_device() -> Box<dyn CameraDevice> {
  Box::new(FfmpegCamera::new(VideoSource::Device(DEFAULT_DEVICE.into())))
}

fn commit(
  session: &mut MeasurementSession,
  ledger: &mut Ledger,
  ledger_path: &Path,
  note: Option<String>,
) -> Result<()> {
  match session.commit(ledger, note) {
    Ok(record) => {
      println!("{}", record);
      ledger.save(ledger_path)
    },
    Err(err) => {
      warn!("{}", err);
      Ok(())
    },
  }
}

fn run() -> Result<()> {
  let args = Args::parse();
  util::init_logging(args.log_level);
  let p = &args.parameters;
  let mut ledger = Ledger::load(&args.ledger)?;

  match args.command {
    Command::Manual { da, db, note } => {
      let mut session = build_session(p, idle_device());
      session.set_manual(da, db)?;
      commit(&mut session, &mut ledger, &args.ledger, note)?;
    },
    Command::Photo { image, annotations, suggest, note } => {
      let photo = ColorImage::load(&image)?;
      info!("Loaded {} at {}x{}.", image.display(), photo.width, photo.height);
      let mut session = build_session(p, idle_device());
      session.load_photo(photo.size());
      if suggest {
        suggest_balls(&photo, p);
      }
      if let Some(path) = annotations {
        Annotations::load(&path)?.apply(&mut session);
        commit(&mut session, &mut ledger, &args.ledger, note)?;
      }
    },
    Command::Live { device, file, synthetic, seed, headless, ticks, calibration, commit: commit_last, note } => {
      let camera: Box<dyn CameraDevice> = if synthetic {
        Box::new(SyntheticCamera::new(seed))
      }
      else if let Some(file) = file {
        Box::new(FfmpegCamera::new(VideoSource::File(file)))
      }
      else {
        let device = device.unwrap_or(DEFAULT_DEVICE.into());
        Box::new(FfmpegCamera::new(VideoSource::Device(device)))
      };
      let mut session = build_session(p, camera);
      session.start_live()
        .context("Live mode is unavailable, manual and photo modes still work.")?;
      if headless && !session.radar().detector_available() {
        warn!("Headless runs have no taps, nothing will be tracked.");
      }
      if let Some(c) = &calibration {
        c.apply(&mut session);
      }
      if headless {
        run_headless(&mut session, ticks)?;
        if commit_last {
          commit(&mut session, &mut ledger, &args.ledger, note)?;
        }
      }
      else {
        run_viewer(&mut session, &mut ledger, &args.ledger)?;
      }
      session.close();
    },
    Command::Ledger { action: LedgerAction::List } => {
      if ledger.is_empty() {
        println!("No measurements recorded.");
      }
      else {
        println!("{} measurements, most recent first.", ledger.len());
      }
      for record in ledger.list() {
        println!("{}", record);
      }
    },
    Command::Ledger { action: LedgerAction::Undo } => {
      match ledger.undo_last() {
        Some(record) => {
          println!("Removed {}", record);
          ledger.save(&args.ledger)?;
        },
        None => println!("Nothing to undo."),
      }
    },
  }
  Ok(())
}

// Runs the detector once over the photo, like a single live tick.
fn suggest_balls(photo: &ColorImage, p: &ParameterSet) {
  let detector = match HoughCircleDetector::load() {
    Ok(detector) => detector,
    Err(err) => {
      warn!("{}", err);
      return;
    },
  };
  let config = p.detector_config();
  let scaled = FrameSampler::new(p.tick_period(), p.target_width).downscale(photo);
  let roi = Roi::centered(scaled.size(), config.roi_pct);
  let circles = detector.detect(&roi.extract(&scaled), &config);
  let candidates = to_candidates(&roi, &circles, p.border_margin);
  if candidates.is_empty() {
    info!("No boules found in the photo.");
  }
  for c in candidates {
    info!("Boule candidate at [{:.3}, {:.3}], radius {:.3}.", c.x, c.y, c.r);
  }
}

fn run_headless(session: &mut MeasurementSession, ticks: usize) -> Result<()> {
  let mut done = 0;
  while done < ticks {
    let now = Instant::now();
    match session.radar_mut().tick(now) {
      TickOutcome::NotDue | TickOutcome::Busy => {
        if let Some(due) = session.radar().next_due() {
          std::thread::sleep(due.saturating_duration_since(now));
        }
        continue;
      },
      TickOutcome::Inactive | TickOutcome::Paused => bail!("Camera stream stopped."),
      TickOutcome::NoFrame => debug!("Tick {}: no frame yet.", done + 1),
      TickOutcome::Sampled => debug!("Tick {}: auto-detect off.", done + 1),
      TickOutcome::Detected { candidates, .. } => {
        match session.radar().reading(session.px_per_unit()) {
          Some(reading) => info!("Tick {}: {} candidates, nearest boule {} from the crosshair.",
            done + 1, candidates, reading.distance),
          None => info!("Tick {}: {} candidates, no boule tracked.", done + 1, candidates),
        }
      },
    }
    done += 1;
  }
  Ok(())
}

fn run_viewer(session: &mut MeasurementSession, ledger: &mut Ledger, ledger_path: &Path) -> Result<()> {
  let frame = session.frame_size()
    .ok_or(anyhow!("Camera stream has no frame size."))?;
  let width = VIEWER_WIDTH;
  let height = ((width * frame.height) as f64 / frame.width.max(1) as f64).round().max(1.) as usize;
  let size = winit::dpi::PhysicalSize::new(width as u32, height as u32);
  let mut event_loop = EventLoop::new();
  let window = WindowBuilder::new()
    .with_title("boule-radar")
    .with_resizable(false)
    .with_inner_size(size)
    .build(&event_loop)
    .context("Failed to create the viewer window.")?;
  let mut graphics_context = unsafe { GraphicsContext::new(window) }
    .map_err(|err| anyhow!("Failed to create a graphics context: {}", err))?;
  info!("Viewer keys: space auto-detect, +/- sensitivity, [/] ROI, C commit, U undo, X clear, Q quit. \
    Left/right click taps side A/B.");

  let mut buffer = vec![];
  let mut args = EventLoopArgs {
    session,
    ledger,
    ledger_path,
    buffer: &mut buffer,
    graphics_context: &mut graphics_context,
    cursor: None,
    last_reading: None,
  };

  event_loop.run_return(move |event, _, control_flow| {
    if let Err(err) = handle_event(event, control_flow, &mut args) {
      handle_error(&err);
      *control_flow = ControlFlow::Exit;
    }
  });
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parameters_after_subcommand() {
    let args = Args::try_parse_from([
      "boule-radar", "live", "--synthetic", "--headless", "--sensitivity", "12", "--roi-pct", "0.5",
      "--calibration", "0.1,0.5,0.2,0.5,5.2",
    ]).unwrap();
    assert_eq!(args.parameters.sensitivity, 12);
    assert_eq!(args.parameters.roi_pct, 0.5);
    match args.command {
      Command::Live { synthetic, calibration, .. } => {
        assert!(synthetic);
        assert_eq!(calibration.unwrap().length_cm, 5.2);
      },
      _ => panic!("expected live"),
    }

    let args = Args::try_parse_from(["boule-radar", "--tolerance", "2", "manual", "--da", "1", "--db", "2"]).unwrap();
    assert_eq!(args.parameters.tolerance, 2.);
    let args = Args::try_parse_from(["boule-radar", "photo", "--image", "a.png", "--tick-ms", "90"]).unwrap();
    assert_eq!(args.parameters.tick_ms, 90);
    assert!(Args::try_parse_from(["boule-radar", "live", "--calibration", "1,2"]).is_err());
  }
}
