use crate::all::*;

use softbuffer::GraphicsContext;
use std::time::Instant;
use winit::event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::ControlFlow;
use winit::window::Window;

const SENSITIVITY_STEP: u32 = 5;
const ROI_STEP: f64 = 0.05;

pub struct EventLoopArgs<'a> {
  pub session: &'a mut MeasurementSession,
  pub ledger: &'a mut Ledger,
  pub ledger_path: &'a Path,
  pub buffer: &'a mut Vec<u32>,
  pub graphics_context: &'a mut GraphicsContext<Window>,
  // Last cursor position, normalized to the window.
  pub cursor: Option<Point>,
  pub last_reading: Option<String>,
}

pub fn handle_event(
  event: Event<()>,
  control_flow: &mut ControlFlow,
  args: &mut EventLoopArgs,
) -> Result<()> {
  let (window_width, window_height) = {
    let size = args.graphics_context.window().inner_size();
    (size.width as usize, size.height as usize)
  };
  if args.buffer.len() != window_width * window_height {
    *args.buffer = vec![0; window_width * window_height];
  }

  match event {
    Event::RedrawRequested(window_id) if window_id == args.graphics_context.window().id() => {
      let mut visualize_args = VisualizeArgs {
        buffer: &mut *args.buffer,
        buffer_w: window_width,
        buffer_h: window_height,
      };
      visualize(&mut visualize_args, args.session)?;
      args.graphics_context.set_buffer(&args.buffer, window_width as u16, window_height as u16);
    },
    Event::MainEventsCleared => {
      let outcome = args.session.radar_mut().tick(Instant::now());
      match &outcome {
        TickOutcome::Sampled => args.graphics_context.window().request_redraw(),
        TickOutcome::Detected { .. } => {
          log_reading(args);
          args.graphics_context.window().request_redraw();
        },
        _ => {},
      }
      if *control_flow != ControlFlow::Exit {
        // Paused or stopped radars wait for the next window event.
        *control_flow = match (outcome, args.session.radar().next_due()) {
          (TickOutcome::Inactive | TickOutcome::Paused, _) | (_, None) => ControlFlow::Wait,
          (_, Some(due)) => ControlFlow::WaitUntil(due),
        };
      }
    },
    Event::WindowEvent {
      event,
      window_id,
    } if window_id == args.graphics_context.window().id() => {
      match event {
        WindowEvent::CloseRequested => {
          *control_flow = ControlFlow::Exit;
        },
        WindowEvent::Focused(focused) => {
          args.session.radar_mut().set_visible(focused);
        },
        WindowEvent::CursorMoved { position, .. } => {
          args.cursor = Some(Point::new(
            position.x / window_width.max(1) as f64,
            position.y / window_height.max(1) as f64,
          ));
        },
        WindowEvent::MouseInput { state: ElementState::Pressed, button, .. } => {
          let side = match button {
            MouseButton::Left => Side::A,
            MouseButton::Right => Side::B,
            _ => return Ok(()),
          };
          if let Some(p) = args.cursor {
            args.session.add_ball(side, p);
            info!("Tapped side {:?} ball at ({:.3}, {:.3}).", side, p.x, p.y);
            args.graphics_context.window().request_redraw();
          }
        },
        WindowEvent::KeyboardInput {
          input: KeyboardInput {
            state: ElementState::Pressed,
            virtual_keycode: Some(keycode),
            ..
          },
          ..
        } => {
          handle_key(keycode, control_flow, args)?;
          args.graphics_context.window().request_redraw();
        },
        _ => {}, // Other window events.
      }
    },
    _ => {}, // Other events.
  }
  Ok(())
}

fn handle_key(
  keycode: VirtualKeyCode,
  control_flow: &mut ControlFlow,
  args: &mut EventLoopArgs,
) -> Result<()> {
  let radar = args.session.radar_mut();
  let mut config = radar.config();
  match keycode {
    VirtualKeyCode::Escape | VirtualKeyCode::Q => {
      *control_flow = ControlFlow::Exit;
    },
    VirtualKeyCode::Space => {
      let on = !radar.auto_detect();
      radar.set_auto_detect(on);
    },
    VirtualKeyCode::Equals | VirtualKeyCode::Plus => {
      config.sensitivity += SENSITIVITY_STEP;
      radar.set_config(config);
    },
    VirtualKeyCode::Minus => {
      config.sensitivity = config.sensitivity.saturating_sub(SENSITIVITY_STEP);
      radar.set_config(config);
    },
    VirtualKeyCode::LBracket => {
      config.roi_pct -= ROI_STEP;
      radar.set_config(config);
    },
    VirtualKeyCode::RBracket => {
      config.roi_pct += ROI_STEP;
      radar.set_config(config);
    },
    VirtualKeyCode::C => {
      // Incomplete measurements are logged by the session and ignored here.
      if args.session.commit(args.ledger, None).is_ok() {
        args.ledger.save(args.ledger_path)?;
      }
    },
    VirtualKeyCode::U => {
      if args.ledger.undo_last().is_some() {
        args.ledger.save(args.ledger_path)?;
      }
    },
    VirtualKeyCode::X => {
      args.session.clear_taps();
    },
    _ => {}, // Other keys.
  }
  Ok(())
}

fn log_reading(args: &mut EventLoopArgs) {
  let px_per_unit = args.session.px_per_unit();
  let reading = args.session.radar().reading(px_per_unit)
    .map(|r| format!("Nearest boule {} from the crosshair.", r.distance));
  if reading != args.last_reading {
    match &reading {
      Some(s) => info!("{}", s),
      None => debug!("No boule tracked."),
    }
    args.last_reading = reading;
  }
}
