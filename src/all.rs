// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  calibration::*,
  camera::*,
  detector::*,
  error::*,
  event_loop::*,
  filter::*,
  image::*,
  input::*,
  ledger::*,
  parameters::*,
  radar::*,
  resolver::*,
  roi::*,
  sampler::*,
  session::*,
  smoothing::*,
  synthetic::*,
  track::*,
  tracker::*,
  types::*,
  video::*,
  visualize::*,
};

pub use {
  std::{
    fmt,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
  },
  log::{debug, info, warn, LevelFilter},
  serde::{Deserialize, Serialize},
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
};
