use crate::all::*;

use chrono::{DateTime, Local};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
  pub id: u64,
  pub at: DateTime<Local>,
  #[serde(rename = "dA")]
  pub d_a: f64,
  #[serde(rename = "dB")]
  pub d_b: f64,
  pub tol: f64,
  pub winner: Winner,
  pub delta: f64,
  pub unit: Unit,
  pub mode: Mode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

impl MeasurementRecord {
  pub fn new(
    id: u64,
    d_a: f64,
    d_b: f64,
    tol: f64,
    unit: Unit,
    mode: Mode,
    note: Option<String>,
  ) -> MeasurementRecord {
    let verdict = decide(d_a, d_b, tol);
    MeasurementRecord {
      id,
      at: Local::now(),
      d_a,
      d_b,
      tol,
      winner: verdict.winner,
      delta: verdict.delta,
      unit,
      mode,
      note,
    }
  }
}

impl fmt::Display for MeasurementRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{} {} [{}] A {:.1} {} / B {:.1} {} -> {} (delta {:.1}, tol {:.1})",
      self.id,
      self.at.format("%Y-%m-%d %H:%M:%S"),
      self.mode,
      self.d_a,
      self.unit,
      self.d_b,
      self.unit,
      self.winner,
      self.delta,
      self.tol,
    )?;
    if let Some(note) = &self.note {
      write!(f, " \"{}\"", note)?;
    }
    Ok(())
  }
}

// Append-only measurement history of a match, with single-step undo.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
  // Oldest first.
  records: Vec<MeasurementRecord>,
}

impl Ledger {
  pub fn new() -> Ledger {
    Ledger::default()
  }

  // A missing file is an empty ledger.
  pub fn load(path: &Path) -> Result<Ledger> {
    if !path.exists() {
      return Ok(Ledger::new());
    }
    let s = std::fs::read_to_string(path)
      .context(format!("Failed to read ledger {}.", path.display()))?;
    let records: Vec<MeasurementRecord> = serde_json::from_str(&s)
      .context(format!("Failed to parse ledger {}.", path.display()))?;
    Ok(Ledger { records })
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    let s = serde_json::to_string_pretty(&self.records)?;
    std::fs::write(path, s)
      .context(format!("Failed to write ledger {}.", path.display()))?;
    Ok(())
  }

  pub fn next_id(&self) -> u64 {
    self.records.iter().map(|r| r.id).max().map_or(1, |id| id + 1)
  }

  pub fn append(&mut self, record: MeasurementRecord) {
    info!("Recorded {}", record);
    self.records.push(record);
  }

  // Removes the most recent record. No-op on an empty ledger.
  pub fn undo_last(&mut self) -> Option<MeasurementRecord> {
    let record = self.records.pop();
    if let Some(ref r) = record {
      info!("Removed #{}", r.id);
    }
    record
  }

  // Most recent first.
  pub fn list(&self) -> impl Iterator<Item = &MeasurementRecord> {
    self.records.iter().rev()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
