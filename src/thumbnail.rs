use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ThumbnailError {
  #[error("could not load the video url {0}")]
  NonFileUrl(String),
  #[error("could not turn the video frame into an image: {0}")]
  Conversion(String),
}

/// Produces a still image for a video at the given offset and returns a file
/// URL to it.
pub trait ThumbnailGenerator {
  fn generate(&self, video: &Url, offset: Duration) -> Result<Url, ThumbnailError>;

  /// Called once an image returned by `generate` is no longer referenced.
  /// Images the generator did not produce are left alone.
  fn discard(&self, _image: &Url) {}
}

/// Extracts frames by running `ffmpeg`. Images are written as `<uuid>.png`
/// into `output_dir`.
#[derive(Debug, Clone)]
pub struct FfmpegThumbnailer {
  program: PathBuf,
  output_dir: PathBuf,
}

impl FfmpegThumbnailer {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    FfmpegThumbnailer {
      program: PathBuf::from("ffmpeg"),
      output_dir: output_dir.into(),
    }
  }

  pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
    self.program = program.into();
    self
  }
}

impl ThumbnailGenerator for FfmpegThumbnailer {
  fn generate(&self, video: &Url, offset: Duration) -> Result<Url, ThumbnailError> {
    let video_path = video
      .to_file_path()
      .map_err(|_| ThumbnailError::NonFileUrl(video.to_string()))?;

    fs::create_dir_all(&self.output_dir).map_err(|e| {
      ThumbnailError::Conversion(format!(
        "failed to create thumbnail directory {}: {}",
        self.output_dir.display(),
        e
      ))
    })?;
    let output = self
      .output_dir
      .join(format!("{}.png", Uuid::new_v4().as_hyphenated().to_string().to_uppercase()));

    let result = Command::new(&self.program)
      .arg("-hide_banner")
      .arg("-loglevel")
      .arg("error")
      .arg("-y")
      .arg("-ss")
      .arg(format!("{:.3}", offset.as_secs_f64()))
      .arg("-i")
      .arg(&video_path)
      .arg("-frames:v")
      .arg("1")
      .arg(&output)
      .output()
      .map_err(|e| ThumbnailError::Conversion(format!("failed to run {}: {}", self.program.display(), e)))?;

    if !result.status.success() || !output.is_file() {
      return Err(ThumbnailError::Conversion(format!(
        "{} exited with {}: {}",
        self.program.display(),
        result.status,
        String::from_utf8_lossy(&result.stderr).trim()
      )));
    }

    log::debug!("generated thumbnail {} for {}", output.display(), video_path.display());
    Url::from_file_path(&output)
      .map_err(|_| ThumbnailError::Conversion(format!("not an absolute path: {}", output.display())))
  }

  fn discard(&self, image: &Url) {
    let Ok(path) = image.to_file_path() else {
      return;
    };
    if path.parent() != Some(self.output_dir.as_path()) {
      return;
    }
    match fs::remove_file(&path) {
      Ok(()) => log::debug!("discarded thumbnail {}", path.display()),
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => log::warn!("could not discard thumbnail {}: {}", path.display(), e),
    }
  }
}
