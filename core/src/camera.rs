//! Camera devices and the scoped stream guard used by acquisition.

use std::fmt::Debug;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::CameraConfig;
use crate::encoded::EncodedImage;
use crate::errors::{CameraError, ImageError};

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

impl FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(Self::User),
            "environment" | "rear" | "back" => Ok(Self::Environment),
            other => Err(format!("unknown facing mode: {}", other)),
        }
    }
}

/// What to ask the device for. Sizes are preferences; the device may deliver less.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

impl From<&CameraConfig> for VideoConstraints {
    fn from(config: &CameraConfig) -> Self {
        let facing_mode = match config.facing_mode.as_deref().map(FacingMode::from_str) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                warn!("{}, using environment", e);
                FacingMode::Environment
            }
            None => FacingMode::Environment,
        };
        Self {
            facing_mode,
            ideal_width: config.ideal_width(),
            ideal_height: config.ideal_height(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// A video capture device that can be opened exclusively.
#[async_trait]
pub trait CameraDevice: Send + Sync + Debug {
    async fn open(&self, constraints: &VideoConstraints)
        -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live stream from an opened device.
#[async_trait]
pub trait MediaStream: Send + Debug {
    /// Take one still from the current video buffer.
    async fn grab_frame(&mut self) -> Result<DynamicImage, CameraError>;

    fn track_states(&self) -> Vec<TrackState>;

    /// Stop every track. Calling it again is a no-op.
    fn stop(&mut self);
}

/// Owns an open stream and stops all of its tracks when dropped.
#[derive(Debug)]
pub struct ActiveStream {
    inner: Box<dyn MediaStream>,
}

impl ActiveStream {
    pub fn new(inner: Box<dyn MediaStream>) -> Self {
        Self { inner }
    }

    pub async fn grab_frame(&mut self) -> Result<DynamicImage, CameraError> {
        self.inner.grab_frame().await
    }

    pub fn track_states(&self) -> Vec<TrackState> {
        self.inner.track_states()
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.inner.stop();
        debug!("Camera stream released");
    }
}

/// Encode a captured frame as a JPEG data URI.
pub fn encode_jpeg(frame: &DynamicImage) -> Result<EncodedImage, ImageError> {
    let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)?;
    EncodedImage::from_bytes("image/jpeg", buffer.get_ref())
}

/// Camera backed by a device node and an external capture command.
///
/// The command is run once per frame and must write a single encoded image
/// to stdout (the default invokes `ffmpeg` against V4L2).
#[derive(Debug, Clone)]
pub struct CommandCamera {
    device: PathBuf,
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            device: PathBuf::from(config.device()),
            program: config.command().to_string(),
            args: config.args(),
        }
    }
}

#[async_trait]
impl CameraDevice for CommandCamera {
    async fn open(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        if let Err(e) = tokio::fs::File::open(&self.device).await {
            let reason = format!("{}: {}", self.device.display(), e);
            return Err(match e.kind() {
                std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(reason),
                _ => CameraError::Unavailable(reason),
            });
        }
        debug!(
            device = %self.device.display(),
            facing = ?constraints.facing_mode,
            "Facing mode is not selectable on this backend"
        );

        let device = self.device.display().to_string();
        let width = constraints.ideal_width.to_string();
        let height = constraints.ideal_height.to_string();
        let args = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{device}", &device)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
            })
            .collect();

        Ok(Box::new(CommandStream {
            program: self.program.clone(),
            args,
            state: TrackState::Live,
        }))
    }
}

#[derive(Debug)]
struct CommandStream {
    program: String,
    args: Vec<String>,
    state: TrackState,
}

#[async_trait]
impl MediaStream for CommandStream {
    async fn grab_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if self.state == TrackState::Ended {
            return Err(CameraError::StreamStopped);
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CameraError::CaptureFailed(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(CameraError::CaptureFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        image::load_from_memory(&output.stdout)
            .map_err(|e| CameraError::CaptureFailed(format!("Unreadable frame: {}", e)))
    }

    fn track_states(&self) -> Vec<TrackState> {
        vec![self.state]
    }

    fn stop(&mut self) {
        self.state = TrackState::Ended;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory camera that remembers every track it handed out.
    #[derive(Debug, Default)]
    pub struct FakeCamera {
        pub deny: bool,
        pub fail_grab: bool,
        pub tracks: Mutex<Vec<Arc<AtomicBool>>>,
        pub opens: AtomicUsize,
    }

    impl FakeCamera {
        pub fn live_tracks(&self) -> usize {
            self.tracks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.load(Ordering::SeqCst))
                .count()
        }
    }

    #[async_trait]
    impl CameraDevice for Arc<FakeCamera> {
        async fn open(
            &self,
            constraints: &VideoConstraints,
        ) -> Result<Box<dyn MediaStream>, CameraError> {
            if self.deny {
                return Err(CameraError::PermissionDenied("denied by test".to_string()));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            let live = Arc::new(AtomicBool::new(true));
            self.tracks.lock().unwrap().push(live.clone());
            Ok(Box::new(FakeStream {
                live,
                fail_grab: self.fail_grab,
                width: constraints.ideal_width.min(64),
                height: constraints.ideal_height.min(36),
            }))
        }
    }

    #[derive(Debug)]
    struct FakeStream {
        live: Arc<AtomicBool>,
        fail_grab: bool,
        width: u32,
        height: u32,
    }

    #[async_trait]
    impl MediaStream for FakeStream {
        async fn grab_frame(&mut self) -> Result<DynamicImage, CameraError> {
            if !self.live.load(Ordering::SeqCst) {
                return Err(CameraError::StreamStopped);
            }
            if self.fail_grab {
                return Err(CameraError::CaptureFailed("sensor glitch".to_string()));
            }
            Ok(DynamicImage::new_rgb8(self.width, self.height))
        }

        fn track_states(&self) -> Vec<TrackState> {
            if self.live.load(Ordering::SeqCst) {
                vec![TrackState::Live]
            } else {
                vec![TrackState::Ended]
            }
        }

        fn stop(&mut self) {
            self.live.store(false, Ordering::SeqCst);
        }
    }
}
