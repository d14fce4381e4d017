use crate::all::*;

pub fn format_log(
  buf: &mut env_logger::fmt::Formatter,
  record: &log::Record,
) -> std::io::Result<()> {
  use std::io::Write;
  let mut style = buf.style();
  use env_logger::fmt::Color::*;
  use log::Level::*;
  style.set_color(match record.level() {
    Error => Red,
    Warn => Yellow,
    Info => Green,
    Debug => Magenta,
    Trace => Blue,
  });

  // Tick timing matters when reading live logs, hence the milliseconds.
  let s = format!("{} {:24}{}",
    chrono::Local::now().format("%H:%M:%S%.3f"),
    format!("{}:{}",
      record.file().unwrap_or("?").trim_start_matches("src/"),
      record.line().unwrap_or(0),
    ),
    record.args()
  );
  writeln!(buf, "{}", style.value(s))
}

pub fn init_logging(level: LevelFilter) {
  // Fails only if a logger is already installed.
  if env_logger::Builder::new()
    .filter_level(level)
    .format(format_log)
    .try_init()
    .is_err()
  {
    debug!("Logger already initialized.");
  }
}
