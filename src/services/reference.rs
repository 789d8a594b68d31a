//! In-memory snapshot of the nutrition and glycemic reference tables.
//!
//! Lookups never touch the database. The snapshot is loaded at startup and
//! swapped whole by a background refresh task, so a reader always sees one
//! consistent version of both tables.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::models::meal::{FoodItem, FoodSource, Portion};
use crate::models::reference::{FoodNutritionEntry, GiReferenceEntry};
use crate::services::glycemic::build_food_item;

/// Anything that can be matched by name or alias.
pub trait ReferenceEntry {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[String];
}

impl ReferenceEntry for FoodNutritionEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

impl ReferenceEntry for GiReferenceEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

pub fn normalize_food_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Resolve `query` against `entries` in three passes: exact name, then an
/// entry name containing the query, then an exact alias. The first hit in
/// table order wins.
pub fn resolve<'a, T: ReferenceEntry>(entries: &'a [T], query: &str) -> Option<&'a T> {
    let query = normalize_food_name(query);
    if query.is_empty() {
        return None;
    }

    entries
        .iter()
        .find(|e| normalize_food_name(e.name()) == query)
        .or_else(|| entries.iter().find(|e| normalize_food_name(e.name()).contains(&query)))
        .or_else(|| {
            entries
                .iter()
                .find(|e| e.aliases().iter().any(|a| normalize_food_name(a) == query))
        })
}

#[derive(Debug, Default)]
pub struct ReferenceData {
    pub foods: Vec<FoodNutritionEntry>,
    pub glycemic: Vec<GiReferenceEntry>,
}

impl ReferenceData {
    pub async fn load(db: &PgPool) -> Result<Self, sqlx::Error> {
        let foods = sqlx::query_as::<_, FoodNutritionEntry>(
            r#"
            SELECT id, name, aliases, default_serving_g,
                   calories, protein, carbs, fat, fiber, sugar, sodium, saturated_fat, cholesterol
            FROM food_nutrition
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;

        let glycemic = sqlx::query_as::<_, GiReferenceEntry>(
            r#"
            SELECT id, name, aliases, gi_value, serving_size_g, carbs_per_serving_g, gl_per_serving
            FROM glycemic_index
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(Self { foods, glycemic })
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    pub fn food(&self, name: &str) -> Option<&FoodNutritionEntry> {
        resolve(&self.foods, name)
    }

    pub fn glycemic_index(&self, name: &str) -> Option<&GiReferenceEntry> {
        resolve(&self.glycemic, name)
    }

    pub fn gi_value(&self, name: &str) -> Option<f64> {
        self.glycemic_index(name).map(|e| e.gi_value)
    }

    /// Build a meal item for `grams` of a reference food.
    ///
    /// `None` when the name has no nutrition entry. A missing GI entry still
    /// produces an item, with unknown GI and GL.
    pub fn food_item(
        &self,
        name: &str,
        grams: Option<f64>,
        source: FoodSource,
        confidence: Option<f64>,
    ) -> Option<FoodItem> {
        let entry = self.food(name)?;
        let grams = grams.filter(|g| *g > 0.0).unwrap_or(entry.default_serving_g);

        Some(build_food_item(
            entry.name.clone(),
            Portion { amount: grams, unit: "g".into() },
            entry.per_100g.scale(grams / 100.0),
            self.gi_value(&entry.name).or_else(|| self.gi_value(name)),
            source,
            confidence,
        ))
    }
}

/// Shared handle to the current snapshot.
#[derive(Clone, Default)]
pub struct ReferenceCache {
    inner: Arc<RwLock<Arc<ReferenceData>>>,
}

impl ReferenceCache {
    pub fn new(data: ReferenceData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(data))),
        }
    }

    pub async fn snapshot(&self) -> Arc<ReferenceData> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, data: ReferenceData) {
        *self.inner.write().await = Arc::new(data);
    }

    /// Reload both tables. The old snapshot stays in place if loading fails.
    pub async fn refresh(&self, db: &PgPool) -> Result<(usize, usize), sqlx::Error> {
        let data = ReferenceData::load(db).await?;
        let counts = (data.foods.len(), data.glycemic.len());
        self.replace(data).await;
        Ok(counts)
    }
}

pub fn spawn_reference_refresh_worker(cache: ReferenceCache, db: PgPool, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // first tick fires immediately; startup already loaded the tables
        interval.tick().await;
        loop {
            interval.tick().await;
            match cache.refresh(&db).await {
                Ok((foods, glycemic)) => {
                    tracing::debug!(foods, glycemic, "Reference data refreshed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reference refresh failed, keeping previous snapshot");
                }
            }
        }
    });
}

#[cfg(test)]
pub fn sample_reference_data() -> ReferenceData {
    use crate::models::meal::Nutrition;

    let food = |id: i32, name: &str, aliases: &[&str], serving: f64, n: Nutrition| FoodNutritionEntry {
        id,
        name: name.into(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        default_serving_g: serving,
        per_100g: n,
    };
    let gi = |id: i32, name: &str, aliases: &[&str], value: f64| GiReferenceEntry {
        id,
        name: name.into(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        gi_value: value,
        serving_size_g: 100.0,
        carbs_per_serving_g: 0.0,
        gl_per_serving: 0.0,
    };

    ReferenceData {
        foods: vec![
            food(1, "apple", &[], 182.0, Nutrition { calories: 52.0, carbs: 14.0, fiber: 2.4, protein: 0.3, fat: 0.2, ..Default::default() }),
            food(2, "white rice", &["rice"], 158.0, Nutrition { calories: 130.0, carbs: 28.0, fiber: 0.4, protein: 2.7, fat: 0.3, ..Default::default() }),
            food(3, "brown rice", &[], 195.0, Nutrition { calories: 112.0, carbs: 23.5, fiber: 1.8, protein: 2.3, fat: 0.8, ..Default::default() }),
            food(4, "chicken breast", &["chicken"], 120.0, Nutrition { calories: 165.0, protein: 31.0, fat: 3.6, ..Default::default() }),
        ],
        glycemic: vec![
            gi(1, "apple", &[], 36.0),
            gi(2, "white rice", &["rice"], 73.0),
            gi(3, "brown rice", &[], 68.0),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::meal::GlycemicCategory;

    #[test]
    fn test_normalize_food_name() {
        assert_eq!(normalize_food_name("  White RICE \n"), "white rice");
    }

    #[test]
    fn test_resolve_exact_beats_substring() {
        let data = sample_reference_data();
        assert_eq!(data.food("White Rice").map(|e| e.id), Some(2));
        assert_eq!(data.food("apple").map(|e| e.id), Some(1));
    }

    #[test]
    fn test_resolve_substring_takes_first_in_table_order() {
        let data = sample_reference_data();
        // "rice" is a substring of both rice entries; white rice comes first
        // and the substring pass runs before the alias pass.
        assert_eq!(data.food("rice").map(|e| e.id), Some(2));
        assert_eq!(data.food("breast").map(|e| e.id), Some(4));
    }

    #[test]
    fn test_resolve_by_alias() {
        let data = sample_reference_data();
        let gi = ReferenceData {
            foods: vec![],
            glycemic: vec![GiReferenceEntry {
                id: 9,
                name: "potato, boiled".into(),
                aliases: vec!["Spud".into()],
                gi_value: 78.0,
                serving_size_g: 150.0,
                carbs_per_serving_g: 30.0,
                gl_per_serving: 23.4,
            }],
        };
        assert_eq!(gi.gi_value(" spud"), Some(78.0));
        assert_eq!(data.food("chicken").map(|e| e.id), Some(4));
    }

    #[test]
    fn test_resolve_pass_order() {
        let gi = |id: i32, name: &str, aliases: &[&str]| GiReferenceEntry {
            id,
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            gi_value: 50.0,
            serving_size_g: 100.0,
            carbs_per_serving_g: 0.0,
            gl_per_serving: 0.0,
        };
        let table = vec![
            gi(1, "brown rice", &[]),
            gi(2, "rice", &[]),
            gi(3, "jasmine", &["steamed"]),
            gi(4, "steamed broccoli", &[]),
        ];

        // an exact name wins over an earlier entry that only contains the query
        assert_eq!(resolve(&table, "rice").map(|e| e.id), Some(2));
        // a containing name wins over an earlier alias hit
        assert_eq!(resolve(&table, "steamed").map(|e| e.id), Some(4));
        // alias only when no name matches at all
        let aliases_only = vec![gi(1, "brown rice", &[]), gi(3, "jasmine", &["steamed"])];
        assert_eq!(resolve(&aliases_only, "steamed").map(|e| e.id), Some(3));
    }

    #[test]
    fn test_resolve_misses() {
        let data = sample_reference_data();
        assert!(data.food("pizza").is_none());
        assert!(data.food("   ").is_none());
        assert!(data.gi_value("chicken breast").is_none());
    }

    #[test]
    fn test_food_item_scales_portion_and_snapshots_gl() {
        let data = sample_reference_data();
        let item = data
            .food_item("rice", Some(200.0), FoodSource::AiDetection, Some(0.91))
            .unwrap();
        assert_eq!(item.name, "white rice");
        assert_eq!(item.portion.amount, 200.0);
        assert_eq!(item.nutrition.calories, 260.0);
        assert_eq!(item.glycemic_index.value, Some(73.0));
        // 73 * (56 - 0.8) / 100 = 40.296
        assert_eq!(item.glycemic_load.value, Some(40.3));
        assert_eq!(item.confidence, Some(0.91));
    }

    #[test]
    fn test_food_item_defaults_serving_and_unknown_gi() {
        let data = sample_reference_data();
        let item = data
            .food_item("chicken breast", None, FoodSource::Manual, None)
            .unwrap();
        assert_eq!(item.portion.amount, 120.0);
        assert_eq!(item.glycemic_load.category, GlycemicCategory::Unknown);
        assert!(data.food_item("unicorn", Some(100.0), FoodSource::Manual, None).is_none());
    }

    #[tokio::test]
    async fn test_cache_replace_swaps_snapshot() {
        let cache = ReferenceCache::default();
        let before = cache.snapshot().await;
        assert!(before.is_empty());

        cache.replace(sample_reference_data()).await;
        let after = cache.snapshot().await;
        assert_eq!(after.foods.len(), 4);
        // readers holding the old Arc keep their version
        assert!(before.is_empty());
    }
}
