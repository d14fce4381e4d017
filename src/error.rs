use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
  #[error("camera permission denied: {0}")]
  PermissionDenied(String),
  #[error("camera unavailable: {0}")]
  Unavailable(String),
}

#[derive(Debug, Error)]
pub enum MeasureError {
  #[error(transparent)]
  Camera(#[from] CameraError),
  #[error("circle detector unavailable: {0}")]
  DetectorUnavailable(String),
  #[error("invalid calibration reference: {0}")]
  CalibrationInvalid(&'static str),
  #[error("incomplete measurement: {0}")]
  IncompleteMeasurement(&'static str),
}
