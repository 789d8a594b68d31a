use serde::{Deserialize, Serialize};

/// Biological sex category used by the BMR formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[serde(other)]
    Other,
}

impl Default for Sex {
    fn default() -> Self {
        Self::Other
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
    /// Anything we don't know how to score; treated as moderately active.
    #[serde(other)]
    Unrecognized,
}

impl Default for ActivityLevel {
    fn default() -> Self {
        Self::ModeratelyActive
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    FatLoss,
    MuscleGain,
    Maintenance,
    Endurance,
    GeneralFitness,
    /// Treated as general fitness.
    #[serde(other)]
    Unrecognized,
}

impl Default for PrimaryGoal {
    fn default() -> Self {
        Self::GeneralFitness
    }
}

// Enum columns are stored as TEXT; unknown strings map to the fallback variant
// instead of failing the row decode.

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }

    pub fn from_db(value: Option<&str>) -> Self {
        match value {
            Some("male") => Sex::Male,
            Some("female") => Sex::Female,
            _ => Sex::Other,
        }
    }
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::LightlyActive => "lightly_active",
            ActivityLevel::ModeratelyActive => "moderately_active",
            ActivityLevel::VeryActive => "very_active",
            ActivityLevel::ExtraActive => "extra_active",
            ActivityLevel::Unrecognized => "unrecognized",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "sedentary" => ActivityLevel::Sedentary,
            "lightly_active" => ActivityLevel::LightlyActive,
            "moderately_active" => ActivityLevel::ModeratelyActive,
            "very_active" => ActivityLevel::VeryActive,
            "extra_active" => ActivityLevel::ExtraActive,
            _ => ActivityLevel::Unrecognized,
        }
    }
}

impl PrimaryGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryGoal::FatLoss => "fat_loss",
            PrimaryGoal::MuscleGain => "muscle_gain",
            PrimaryGoal::Maintenance => "maintenance",
            PrimaryGoal::Endurance => "endurance",
            PrimaryGoal::GeneralFitness => "general_fitness",
            PrimaryGoal::Unrecognized => "unrecognized",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "fat_loss" => PrimaryGoal::FatLoss,
            "muscle_gain" => PrimaryGoal::MuscleGain,
            "maintenance" => PrimaryGoal::Maintenance,
            "endurance" => PrimaryGoal::Endurance,
            "general_fitness" => PrimaryGoal::GeneralFitness,
            _ => PrimaryGoal::Unrecognized,
        }
    }
}

/// Physical attributes. Range checks happen in the request DTOs; here every
/// numeric field is simply present or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProfile {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<i32>,
    pub sex: Sex,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessGoal {
    pub primary_goal: PrimaryGoal,
    pub activity_level: ActivityLevel,
    pub target_weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein: i32,
    pub carbs: i32,
    pub fat: i32,
}

/// Snapshot derived from a complete profile + goal. Never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedMetrics {
    pub bmr: i32,
    pub tdee: i32,
    pub daily_calorie_target: i32,
    pub macro_targets: MacroTargets,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DietaryPreferences {
    pub diet_type: String,
    pub allergies: Vec<String>,
    pub disliked_foods: Vec<String>,
    pub preferred_cuisines: Vec<String>,
}
