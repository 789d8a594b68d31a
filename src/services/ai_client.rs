//! HTTP client for the AI inference service (food detection, chat, plans).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::profile::MacroTargets;
use crate::models::user::User;

#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedFood {
    pub name: String,
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub detected_foods: Vec<DetectedFood>,
    /// grams, keyed by detected food name
    #[serde(default)]
    pub portion_estimates: HashMap<String, f64>,
    #[serde(default)]
    pub image_dimensions: ImageDimensions,
}

impl ImageAnalysis {
    pub fn portion_for(&self, name: &str) -> Option<f64> {
        self.portion_estimates.get(name).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub model: String,
    #[serde(default)]
    pub tokens_used: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuickReply {
    pub response: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct QuickMealSuggestionRequest<'a> {
    pub meal_type: &'a str,
    pub max_calories: i32,
    pub diet_type: &'a str,
    pub exclude_ingredients: &'a [String],
    pub allergies: &'a [String],
}

// ============================================================================
// User context sent with every personalised request
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub profile: ContextProfile,
    pub physical_attributes: ContextPhysical,
    pub fitness_goals: ContextGoals,
    pub dietary_preferences: ContextDietary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_metrics: Option<ContextMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextProfile {
    pub first_name: String,
    pub gender: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ContextPhysical {
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextGoals {
    pub primary_goal: &'static str,
    pub activity_level: &'static str,
    pub target_weight: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDietary {
    pub diet_type: String,
    pub allergies: Vec<String>,
    pub disliked_foods: Vec<String>,
    pub preferred_cuisines: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetrics {
    pub bmr: i32,
    pub tdee: i32,
    pub daily_calorie_target: i32,
    pub macro_targets: MacroTargets,
}

impl From<&User> for UserContext {
    fn from(user: &User) -> Self {
        let physical = user.physical_profile();
        let goals = user.fitness_goal();
        let dietary = user.dietary_preferences();

        Self {
            profile: ContextProfile {
                first_name: user.first_name.clone(),
                gender: physical.sex.as_str(),
            },
            physical_attributes: ContextPhysical {
                age: physical.age,
                weight: physical.weight_kg,
                height: physical.height_cm,
            },
            fitness_goals: ContextGoals {
                primary_goal: goals.primary_goal.as_str(),
                activity_level: goals.activity_level.as_str(),
                target_weight: goals.target_weight_kg,
            },
            dietary_preferences: ContextDietary {
                diet_type: dietary.diet_type,
                allergies: dietary.allergies,
                disliked_foods: dietary.disliked_foods,
                preferred_cuisines: dietary.preferred_cuisines,
            },
            calculated_metrics: user.calculated_metrics().map(|m| ContextMetrics {
                bmr: m.bmr,
                tdee: m.tdee,
                daily_calorie_target: m.daily_calorie_target,
                macro_targets: m.macro_targets,
            }),
        }
    }
}

impl AiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> anyhow::Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("AI service {} returned {}: {}", path, status, body);
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("invalid JSON from AI service {}", path))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::read_response(response, path).await
    }

    pub async fn analyze_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<ImageAnalysis> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("upload")
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(self.url("analyze-image"))
            .multipart(form)
            .send()
            .await?;
        Self::read_response(response, "analyze-image").await
    }

    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: &UserContext,
    ) -> anyhow::Result<ChatReply> {
        self.post_json(
            "chat",
            &serde_json::json!({
                "message": message,
                "conversation_history": history,
                "user_context": context,
            }),
        )
        .await
    }

    pub async fn quick_query(
        &self,
        query: &str,
        context: Option<&UserContext>,
    ) -> anyhow::Result<QuickReply> {
        self.post_json(
            "quick-query",
            &serde_json::json!({ "query": query, "user_context": context }),
        )
        .await
    }

    pub async fn generate_meal_plan(
        &self,
        context: &UserContext,
        days: i32,
        include_snacks: bool,
    ) -> anyhow::Result<serde_json::Value> {
        self.post_json(
            "generate-meal-plan",
            &serde_json::json!({
                "user_context": context,
                "days": days,
                "include_snacks": include_snacks,
            }),
        )
        .await
    }

    pub async fn generate_workout_plan(
        &self,
        context: &UserContext,
        days: i32,
        preferences: Option<&serde_json::Value>,
    ) -> anyhow::Result<serde_json::Value> {
        self.post_json(
            "generate-workout-plan",
            &serde_json::json!({
                "user_context": context,
                "days": days,
                "preferences": preferences,
            }),
        )
        .await
    }

    pub async fn quick_meal_suggestion(
        &self,
        request: &QuickMealSuggestionRequest<'_>,
    ) -> anyhow::Result<serde_json::Value> {
        self.post_json("quick-meal-suggestion", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::sample_user;
    use axum::{routing::post, Json, Router};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[test]
    fn test_user_context_is_camel_case() {
        let ctx = UserContext::from(&sample_user());
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["profile"]["firstName"], "Ada");
        assert_eq!(json["profile"]["gender"], "male");
        assert_eq!(json["physicalAttributes"]["weight"], 70.0);
        assert_eq!(json["fitnessGoals"]["primaryGoal"], "fat_loss");
        assert_eq!(json["dietaryPreferences"]["preferredCuisines"][0], "italian");
        assert_eq!(json["calculatedMetrics"]["dailyCalorieTarget"], 1479);
        assert_eq!(json["calculatedMetrics"]["macroTargets"]["protein"], 148);
    }

    #[test]
    fn test_user_context_without_metrics() {
        let mut user = sample_user();
        user.bmr = None;
        let json = serde_json::to_value(UserContext::from(&user)).unwrap();
        assert!(json.get("calculatedMetrics").is_none());
    }

    #[test]
    fn test_image_analysis_tolerates_missing_fields() {
        let analysis: ImageAnalysis = serde_json::from_value(serde_json::json!({
            "detected_foods": [{"name": "apple", "confidence": 0.87}],
            "portion_estimates": {"apple": 150.0}
        }))
        .unwrap();
        assert_eq!(analysis.detected_foods.len(), 1);
        assert!(analysis.detected_foods[0].bounding_box.is_none());
        assert_eq!(analysis.portion_for("apple"), Some(150.0));
        assert_eq!(analysis.portion_for("pear"), None);
    }

    #[tokio::test]
    async fn test_chat_round_trip_against_stub() {
        let router = Router::new().route(
            "/api/v1/chat",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "response": format!("echo: {}", body["message"].as_str().unwrap_or("")),
                    "model": "stub",
                    "tokens_used": 7,
                    "seen_first_name": body["user_context"]["profile"]["firstName"],
                }))
            }),
        );
        let base = spawn_stub(router).await;
        let client = AiClient::new(&base, Duration::from_secs(5)).unwrap();

        let ctx = UserContext::from(&sample_user());
        let reply = client.chat("hi", &[], &ctx).await.unwrap();
        assert_eq!(reply.response, "echo: hi");
        assert_eq!(reply.tokens_used, 7);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router = Router::new().route(
            "/api/v1/quick-query",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "model not loaded") }),
        );
        let base = spawn_stub(router).await;
        let client = AiClient::new(&base, Duration::from_secs(5)).unwrap();

        let err = client.quick_query("protein in eggs?", None).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("503"), "{}", msg);
        assert!(msg.contains("model not loaded"), "{}", msg);
    }
}
