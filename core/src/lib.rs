// Core plant identification functionality:
// - Gemini API client and wire types
// - Configuration loading
// - Encoded images, camera devices and image acquisition
// - Analysis client (prompt, reply extraction, typed decode)
// - Session phase state machine
// - Shared error types

pub mod acquisition;
pub mod analysis;
pub mod camera;
pub mod client;
pub mod config;
pub mod encoded;
pub mod errors;
pub mod plant;
pub mod session;
pub mod types;

pub use acquisition::{AcquisitionEvent, AcquisitionView, ImageAcquisition, SelectedFile};
pub use analysis::{AnalysisClient, AnalysisRequest, GenerativeModel};
pub use camera::{CameraDevice, CommandCamera, MediaStream, TrackState, VideoConstraints};
pub use client::GeminiClient;
pub use config::PlantIdConfig;
pub use encoded::EncodedImage;
pub use errors::*;
pub use plant::{CareRequirements, Characteristics, PlantInfo};
pub use session::{Resolution, Session, SessionController, SessionPhase};
