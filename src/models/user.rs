use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use crate::models::profile::{
    ActivityLevel, CalculatedMetrics, DietaryPreferences, FitnessGoal, MacroTargets,
    PhysicalProfile, PrimaryGoal, Sex,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: Option<String>,

    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<i32>,
    pub sex: Option<String>,

    pub primary_goal: String,
    pub activity_level: String,
    pub target_weight_kg: Option<f64>,

    pub diet_type: String,
    pub allergies: Vec<String>,
    pub disliked_foods: Vec<String>,
    pub preferred_cuisines: Vec<String>,

    pub bmr: Option<i32>,
    pub tdee: Option<i32>,
    pub daily_calorie_target: Option<i32>,
    pub protein_target_g: Option<i32>,
    pub carbs_target_g: Option<i32>,
    pub fat_target_g: Option<i32>,
    pub metrics_updated_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn fetch(db: &PgPool, id: Uuid) -> AppResult<Self> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound("User not found".into()))
    }

    pub fn physical_profile(&self) -> PhysicalProfile {
        PhysicalProfile {
            weight_kg: self.weight_kg,
            height_cm: self.height_cm,
            age: self.age,
            sex: Sex::from_db(self.sex.as_deref()),
        }
    }

    pub fn fitness_goal(&self) -> FitnessGoal {
        FitnessGoal {
            primary_goal: PrimaryGoal::from_db(&self.primary_goal),
            activity_level: ActivityLevel::from_db(&self.activity_level),
            target_weight_kg: self.target_weight_kg,
        }
    }

    pub fn dietary_preferences(&self) -> DietaryPreferences {
        DietaryPreferences {
            diet_type: self.diet_type.clone(),
            allergies: self.allergies.clone(),
            disliked_foods: self.disliked_foods.clone(),
            preferred_cuisines: self.preferred_cuisines.clone(),
        }
    }

    /// Stored metrics. All columns are written together, so either all are
    /// present or the profile was incomplete at the last save.
    pub fn calculated_metrics(&self) -> Option<CalculatedMetrics> {
        Some(CalculatedMetrics {
            bmr: self.bmr?,
            tdee: self.tdee?,
            daily_calorie_target: self.daily_calorie_target?,
            macro_targets: MacroTargets {
                protein: self.protein_target_g?,
                carbs: self.carbs_target_g?,
                fat: self.fat_target_g?,
            },
        })
    }
}

/// GET /api/me
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub physical: PhysicalProfile,
    pub goals: FitnessGoal,
    pub dietary: DietaryPreferences,
    /// null until weight, height and age have all been provided
    pub metrics: Option<CalculatedMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            physical: u.physical_profile(),
            goals: u.fitness_goal(),
            dietary: u.dietary_preferences(),
            metrics: u.calculated_metrics(),
            metrics_updated_at: u.metrics_updated_at,
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
pub fn sample_user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: "ada@example.com".into(),
        password_hash: "hash".into(),
        first_name: "Ada".into(),
        last_name: None,
        weight_kg: Some(70.0),
        height_cm: Some(175.0),
        age: Some(30),
        sex: Some("male".into()),
        primary_goal: "fat_loss".into(),
        activity_level: "sedentary".into(),
        target_weight_kg: Some(65.0),
        diet_type: "omnivore".into(),
        allergies: vec!["peanuts".into()],
        disliked_foods: vec![],
        preferred_cuisines: vec!["italian".into()],
        bmr: Some(1649),
        tdee: Some(1979),
        daily_calorie_target: Some(1479),
        protein_target_g: Some(148),
        carbs_target_g: Some(111),
        fat_target_g: Some(49),
        metrics_updated_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}
