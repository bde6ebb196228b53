use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use plantid_core::{
    AcquisitionEvent, AcquisitionView, AnalysisClient, CommandCamera, GeminiClient,
    ImageAcquisition, PlantIdConfig, Resolution, Session, SessionPhase, VideoConstraints,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::output::{print_empty_state, print_phase};

/// Everything one run needs: the session and the input card feeding it.
struct Pipeline {
    session: Session,
    input: ImageAcquisition,
    events: UnboundedReceiver<AcquisitionEvent>,
}

impl Pipeline {
    fn new(config: &PlantIdConfig) -> Result<Self> {
        let client =
            GeminiClient::new(config.clone()).context("Failed to initialize Gemini client")?;
        info!(model = client.model_name(), "Initialized Gemini client");
        let session = Session::new(AnalysisClient::new(Arc::new(client)));

        let (tx, events) = mpsc::unbounded_channel();
        let camera = CommandCamera::new(&config.camera);
        let input =
            ImageAcquisition::new(Box::new(camera), VideoConstraints::from(&config.camera), tx);

        Ok(Self {
            session,
            input,
            events,
        })
    }

    /// Forward queued acquisition events to the session and wait for any analysis.
    async fn drain_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            if let Some(handle) = self.session.dispatch(event) {
                wait_for_analysis(handle).await?;
            }
        }
        Ok(())
    }
}

async fn wait_for_analysis(handle: JoinHandle<Resolution>) -> Result<Resolution> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("Analyzing your plant...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let resolution = handle.await;
    spinner.finish_and_clear();
    resolution.context("Analysis task failed")
}

/// Print the outcome of a one-shot run; a failed analysis becomes an error exit.
fn finish_one_shot(phase: &SessionPhase, json: bool) -> Result<()> {
    match phase {
        SessionPhase::Result(_) => print_phase(phase, json),
        _ => {
            print_empty_state();
            Err(anyhow!("Plant analysis failed (run with -v for details)"))
        }
    }
}

/// Identify the plant in one image file
pub async fn run_identify(config: &PlantIdConfig, image: &Path, json: bool) -> Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    pipeline
        .input
        .select_file(image)
        .await
        .with_context(|| format!("Could not use {}", image.display()))?;
    pipeline.drain_events().await?;

    finish_one_shot(&pipeline.session.snapshot(), json)
}

/// Take one photo with the camera and identify it
pub async fn run_capture(config: &PlantIdConfig, json: bool) -> Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    if !pipeline.input.start_camera().await {
        bail!("Camera {} is not available", config.camera.device());
    }
    pipeline
        .input
        .capture()
        .await
        .context("Failed to capture photo")?;
    pipeline.drain_events().await?;

    finish_one_shot(&pipeline.session.snapshot(), json)
}

/// Menu-driven session mirroring the picker / live preview / preview card.
pub async fn run_interactive(config: &PlantIdConfig) -> Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    let theme = ColorfulTheme::default();

    loop {
        print_phase(&pipeline.session.snapshot(), false)?;

        match pipeline.input.view() {
            AcquisitionView::Picker => {
                let choice = Select::with_theme(&theme)
                    .with_prompt("Take a photo or upload an image of a plant to get started")
                    .items(&["Take photo", "Upload photo", "Quit"])
                    .default(0)
                    .interact()?;
                match choice {
                    0 => {
                        if !pipeline.input.start_camera().await {
                            println!("{}", "Could not access the camera.".red());
                        }
                    }
                    1 => {
                        let path: String = Input::with_theme(&theme)
                            .with_prompt("Image path")
                            .interact_text()?;
                        let path = PathBuf::from(path.trim());
                        if let Err(e) = pipeline.input.select_file(&path).await {
                            error!(error = %e, "Error selecting image");
                            println!("{}", format!("Could not use {}: {}", path.display(), e).red());
                        }
                    }
                    _ => break,
                }
            }
            AcquisitionView::LivePreview => {
                println!("{}", "Camera ready.".green());
                let choice = Select::with_theme(&theme)
                    .items(&["Capture", "Cancel"])
                    .default(0)
                    .interact()?;
                if choice == 0 {
                    if let Err(e) = pipeline.input.capture().await {
                        error!(error = %e, "Error capturing photo");
                        println!("{}", format!("Capture failed: {}", e).red());
                    }
                } else {
                    pipeline.input.cancel_camera();
                }
            }
            AcquisitionView::Preview => {
                let choice = Select::with_theme(&theme)
                    .items(&["Clear image", "Quit"])
                    .default(0)
                    .interact()?;
                if choice == 0 {
                    pipeline.input.clear()?;
                } else {
                    break;
                }
            }
        }

        pipeline.drain_events().await?;
    }

    println!("Goodbye.");
    Ok(())
}
