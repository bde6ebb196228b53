//! File and camera image acquisition.
//!
//! Every successful acquisition sends exactly one [`AcquisitionEvent`] to the
//! listener. The camera stream is held in an [`ActiveStream`], so it is
//! released on capture, cancel, clear, and drop.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::camera::{encode_jpeg, ActiveStream, CameraDevice, TrackState, VideoConstraints};
use crate::encoded::{sniff_media_type, EncodedImage};
use crate::errors::{AcquisitionError, ImageError};

/// A file the user picked, before it has been encoded for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionEvent {
    FileSelected(SelectedFile),
    PhotoCaptured(EncodedImage),
    Cleared,
}

/// Which panel the input card is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionView {
    /// Take photo / upload photo buttons
    Picker,
    /// Live camera preview with capture / cancel
    LivePreview,
    /// The chosen image, with a clear button
    Preview,
}

pub struct ImageAcquisition {
    camera: Box<dyn CameraDevice>,
    constraints: VideoConstraints,
    stream: Option<ActiveStream>,
    preview: Option<EncodedImage>,
    events: UnboundedSender<AcquisitionEvent>,
}

impl ImageAcquisition {
    pub fn new(
        camera: Box<dyn CameraDevice>,
        constraints: VideoConstraints,
        events: UnboundedSender<AcquisitionEvent>,
    ) -> Self {
        Self {
            camera,
            constraints,
            stream: None,
            preview: None,
            events,
        }
    }

    pub fn view(&self) -> AcquisitionView {
        if self.stream.is_some() {
            AcquisitionView::LivePreview
        } else if self.preview.is_some() {
            AcquisitionView::Preview
        } else {
            AcquisitionView::Picker
        }
    }

    /// The image currently shown, if any
    pub fn preview(&self) -> Option<&EncodedImage> {
        self.preview.as_ref()
    }

    /// Track states of the open stream; empty when the camera is closed.
    pub fn track_states(&self) -> Vec<TrackState> {
        self.stream
            .as_ref()
            .map(ActiveStream::track_states)
            .unwrap_or_default()
    }

    /// Read a user-chosen file, show it, and report the file (not its encoding).
    pub async fn select_file(&mut self, path: &Path) -> Result<(), AcquisitionError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let media_type = sniff_media_type(path, &bytes)?;
        let preview = EncodedImage::from_bytes(media_type, &bytes)?;

        self.stop_camera();
        self.preview = Some(preview);
        info!(path = %path.display(), media_type, "Image selected");
        self.emit(AcquisitionEvent::FileSelected(SelectedFile {
            path: path.to_path_buf(),
            media_type: media_type.to_string(),
        }))
    }

    /// Open the camera. Failures are logged and leave the picker showing.
    pub async fn start_camera(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match self.camera.open(&self.constraints).await {
            Ok(stream) => {
                debug!(constraints = ?self.constraints, "Camera stream opened");
                self.stream = Some(ActiveStream::new(stream));
                true
            }
            Err(e) => {
                warn!(error = %e, "Error accessing camera");
                false
            }
        }
    }

    /// Take one still, report it, and release the camera.
    ///
    /// Returns `Ok(None)` when no stream is open.
    pub async fn capture(&mut self) -> Result<Option<EncodedImage>, AcquisitionError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(None);
        };
        let frame = stream.grab_frame().await;
        drop(stream);

        let image = encode_jpeg(&frame?)?;
        self.preview = Some(image.clone());
        info!("Photo captured");
        self.emit(AcquisitionEvent::PhotoCaptured(image.clone()))?;
        Ok(Some(image))
    }

    /// Close the camera without producing an image.
    pub fn cancel_camera(&mut self) {
        self.stop_camera();
    }

    /// Release the camera, drop the preview, and report the clear.
    pub fn clear(&mut self) -> Result<(), AcquisitionError> {
        self.stop_camera();
        self.preview = None;
        self.emit(AcquisitionEvent::Cleared)
    }

    fn stop_camera(&mut self) {
        self.stream = None;
    }

    fn emit(&self, event: AcquisitionEvent) -> Result<(), AcquisitionError> {
        self.events
            .send(event)
            .map_err(|_| AcquisitionError::ListenerClosed)
    }
}
