use serde::{Deserialize, Serialize};

/// Structured plant-care record decoded from a model reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantInfo {
    /// Common name
    pub name: String,
    /// Scientific name
    pub species: String,
    pub description: String,
    /// Botanical family
    pub family: String,
    pub native_region: String,
    /// Whether it is toxic to humans or pets
    pub toxicity: String,
    pub growth_habit: String,
    pub care_requirements: CareRequirements,
    pub characteristics: Characteristics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareRequirements {
    pub water: String,
    pub light: String,
    pub soil: String,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Characteristics {
    pub height: String,
    pub spread: String,
    pub flower_color: String,
    pub seasonality: String,
}

impl PlantInfo {
    /// Identity rows as (label, value) pairs, in display order
    pub fn identity_rows(&self) -> [(&'static str, &str); 7] {
        [
            ("Name", self.name.as_str()),
            ("Species", self.species.as_str()),
            ("Family", self.family.as_str()),
            ("Description", self.description.as_str()),
            ("Native Region", self.native_region.as_str()),
            ("Toxicity", self.toxicity.as_str()),
            ("Growth Habit", self.growth_habit.as_str()),
        ]
    }
}

impl CareRequirements {
    pub fn rows(&self) -> [(&'static str, &str); 4] {
        [
            ("Water", self.water.as_str()),
            ("Light", self.light.as_str()),
            ("Soil", self.soil.as_str()),
            ("Temperature", self.temperature.as_str()),
        ]
    }
}

impl Characteristics {
    pub fn rows(&self) -> [(&'static str, &str); 4] {
        [
            ("Height", self.height.as_str()),
            ("Spread", self.spread.as_str()),
            ("Flower Color", self.flower_color.as_str()),
            ("Seasonality", self.seasonality.as_str()),
        ]
    }
}
