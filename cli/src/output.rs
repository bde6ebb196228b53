use colored::*;
use plantid_core::{PlantInfo, SessionPhase};

pub const EMPTY_STATE: &str = "No plant analysis yet. Take or upload a photo to get started.";

const FEATURES: [(&str, &str); 3] = [
    (
        "Instant Recognition",
        "Take a photo or upload an image for immediate plant identification",
    ),
    (
        "Detailed Information",
        "Get comprehensive details about care requirements and characteristics",
    ),
    (
        "Expert Care Guide",
        "Learn how to help your plants thrive with tailored care instructions",
    ),
];

/// Introduction shown while the session is idle
pub fn print_hero() {
    println!();
    println!("{}", "Plant Recognition".green().bold());
    println!(
        "{}",
        "Discover detailed information about any plant by taking a photo or uploading an image"
            .dimmed()
    );
    println!();
    for (title, description) in FEATURES {
        println!("  {} {}", title.bold(), format!("- {}", description).dimmed());
    }
    println!();
}

pub fn print_empty_state() {
    println!("{}", EMPTY_STATE.dimmed());
}

/// Render the plant record as an aligned table
pub fn render_plant_info(info: &PlantInfo) -> String {
    let width = info
        .identity_rows()
        .iter()
        .chain(info.care_requirements.rows().iter())
        .chain(info.characteristics.rows().iter())
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    output.push_str(&format!("{}\n", info.name.green().bold()));
    output.push_str(&format!("{}\n\n", info.species.italic()));

    for (label, value) in info.identity_rows().iter().skip(2) {
        push_row(&mut output, label, value, width);
    }

    output.push_str(&format!("\n{}\n", "Care Requirements".cyan().bold()));
    for (label, value) in info.care_requirements.rows() {
        push_row(&mut output, label, value, width);
    }

    output.push_str(&format!("\n{}\n", "Characteristics".cyan().bold()));
    for (label, value) in info.characteristics.rows() {
        push_row(&mut output, label, value, width);
    }

    output
}

fn push_row(output: &mut String, label: &str, value: &str, width: usize) {
    let padding = width.saturating_sub(label.len());
    output.push_str(&format!(
        "  {}{}  {}\n",
        label.bold(),
        " ".repeat(padding),
        value
    ));
}

pub fn print_plant_info(info: &PlantInfo, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
    } else {
        println!("{}", render_plant_info(info));
    }
    Ok(())
}

/// Show whatever the current phase calls for. `Analyzing` is drawn by the spinner.
pub fn print_phase(phase: &SessionPhase, json: bool) -> anyhow::Result<()> {
    match phase {
        SessionPhase::Idle => print_hero(),
        SessionPhase::Analyzing => {}
        SessionPhase::Result(info) => print_plant_info(info, json)?,
        SessionPhase::Empty => print_empty_state(),
    }
    Ok(())
}
