use crate::all::*;

// Taps on a still photo, normalized to the image size.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Annotations {
  pub target: Point,
  #[serde(default)]
  pub a: Vec<Point>,
  #[serde(default)]
  pub b: Vec<Point>,
  #[serde(default)]
  pub calibration: Option<CalibrationAnnotation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct CalibrationAnnotation {
  pub a: Point,
  pub b: Point,
  pub length_cm: f64,
}

// `ax,ay,bx,by,cm` from the command line, points normalized like the taps.
impl std::str::FromStr for CalibrationAnnotation {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<CalibrationAnnotation> {
    let values = s.split(',')
      .map(|v| v.trim().parse::<f64>().context(format!("Invalid number {:?}.", v)))
      .collect::<Result<Vec<f64>>>()?;
    if values.len() != 5 {
      bail!("Expected ax,ay,bx,by,cm but got {} values.", values.len());
    }
    Ok(CalibrationAnnotation {
      a: Point::new(values[0], values[1]),
      b: Point::new(values[2], values[3]),
      length_cm: values[4],
    })
  }
}

impl CalibrationAnnotation {
  pub fn apply(&self, session: &mut MeasurementSession) {
    session.set_calibration(self.a, self.b, self.length_cm);
  }
}

impl Annotations {
  pub fn load(path: &Path) -> Result<Annotations> {
    let s = std::fs::read_to_string(path)
      .context(format!("Failed to read file {}.", path.display()))?;
    Annotations::parse(&s)
      .context(format!("Failed to parse {}.", path.display()))
  }

  // Coordinates outside `[0, 1]` are clamped by `Point`.
  pub fn parse(s: &str) -> Result<Annotations> {
    Ok(serde_json::from_str(s)?)
  }

  pub fn apply(&self, session: &mut MeasurementSession) {
    session.set_target(self.target);
    for p in &self.a {
      session.add_ball(Side::A, *p);
    }
    for p in &self.b {
      session.add_ball(Side::B, *p);
    }
    if let Some(c) = &self.calibration {
      c.apply(session);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse() {
    let a = Annotations::parse(r#"{
      "target": [0.5, 0.5],
      "a": [[0.41, 0.52], [0.70, 0.20]],
      "b": [[0.55, 0.61]],
      "calibration": { "a": [0.1, 0.9], "b": [0.3, 0.9], "length_cm": 10.0 }
    }"#).unwrap();
    assert_eq!(a.target, Point::center());
    assert_eq!(a.a.len(), 2);
    assert_eq!(a.b, vec![Point::new(0.55, 0.61)]);
    assert_eq!(a.calibration.unwrap().length_cm, 10.);
  }

  #[test]
  fn test_optional_fields() {
    let a = Annotations::parse(r#"{ "target": [0.2, 1.4] }"#).unwrap();
    assert_eq!(a.target, Point::new(0.2, 1.));
    assert!(a.a.is_empty() && a.b.is_empty());
    assert!(a.calibration.is_none());
  }

  #[test]
  fn test_calibration_argument() {
    let c: CalibrationAnnotation = "0.1, 0.5,0.2,0.5,5.2".parse().unwrap();
    assert_eq!(c, CalibrationAnnotation {
      a: Point::new(0.1, 0.5),
      b: Point::new(0.2, 0.5),
      length_cm: 5.2,
    });
    assert!("0.1,0.5,0.2,0.5".parse::<CalibrationAnnotation>().is_err());
    assert!("0.1,0.5,0.2,x,5".parse::<CalibrationAnnotation>().is_err());
  }

  #[test]
  fn test_rejects_malformed() {
    assert!(Annotations::parse(r#"{ "a": [[0.1, 0.1]] }"#).is_err());
    assert!(Annotations::parse(r#"{ "target": [0.1] }"#).is_err());
  }
}
