//! Energy and macro targets derived from a user's profile and goals.
//!
//! Every stage works on concrete values; "profile incomplete" is carried by
//! `Option` through [`recompute_metrics`], so a partially filled profile can
//! never produce a partial snapshot.

use crate::models::profile::{
    ActivityLevel, CalculatedMetrics, FitnessGoal, MacroTargets, PhysicalProfile, PrimaryGoal,
    Sex,
};

/// Hard floor for the daily calorie target.
pub const MIN_DAILY_CALORIES: i32 = 1200;

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Mifflin-St Jeor sex offset. `Other` sits halfway between male and female.
fn sex_offset(sex: Sex) -> f64 {
    match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
        Sex::Other => -78.0,
    }
}

pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::LightlyActive => 1.375,
        ActivityLevel::ModeratelyActive | ActivityLevel::Unrecognized => 1.55,
        ActivityLevel::VeryActive => 1.725,
        ActivityLevel::ExtraActive => 1.9,
    }
}

pub fn goal_calorie_adjustment(goal: PrimaryGoal) -> i32 {
    match goal {
        PrimaryGoal::FatLoss => -500,
        PrimaryGoal::MuscleGain => 300,
        PrimaryGoal::Endurance => 200,
        PrimaryGoal::Maintenance | PrimaryGoal::GeneralFitness | PrimaryGoal::Unrecognized => 0,
    }
}

/// Share of calories as (protein, carbs, fat) percentages.
pub fn macro_split(goal: PrimaryGoal) -> (u8, u8, u8) {
    match goal {
        PrimaryGoal::FatLoss => (40, 30, 30),
        PrimaryGoal::MuscleGain => (35, 45, 20),
        PrimaryGoal::Maintenance => (30, 40, 30),
        PrimaryGoal::Endurance => (20, 55, 25),
        PrimaryGoal::GeneralFitness | PrimaryGoal::Unrecognized => (30, 40, 30),
    }
}

fn round_kcal(value: f64) -> i32 {
    value.round() as i32
}

/// Basal Metabolic Rate (Mifflin-St Jeor), rounded to whole kcal.
///
/// `None` when weight, height or age is missing.
pub fn calculate_bmr(profile: &PhysicalProfile) -> Option<i32> {
    let weight = profile.weight_kg?;
    let height = profile.height_cm?;
    let age = f64::from(profile.age?);

    let base = 10.0 * weight + 6.25 * height - 5.0 * age;
    Some(round_kcal(base + sex_offset(profile.sex)))
}

/// Total Daily Energy Expenditure: BMR times the activity multiplier,
/// rounded once on the final product.
pub fn calculate_tdee(bmr: i32, level: ActivityLevel) -> i32 {
    round_kcal(f64::from(bmr) * activity_multiplier(level))
}

/// TDEE adjusted for the goal, never below [`MIN_DAILY_CALORIES`].
pub fn calculate_daily_calorie_target(tdee: i32, goal: PrimaryGoal) -> i32 {
    (tdee + goal_calorie_adjustment(goal)).max(MIN_DAILY_CALORIES)
}

/// Split `calories` by the goal's macro percentages and convert to grams.
pub fn calculate_macro_targets(calories: i32, goal: PrimaryGoal) -> MacroTargets {
    let (protein_pct, carbs_pct, fat_pct) = macro_split(goal);
    let grams = |pct: u8, kcal_per_g: f64| -> i32 {
        (f64::from(calories) * f64::from(pct) / 100.0 / kcal_per_g).round() as i32
    };

    MacroTargets {
        protein: grams(protein_pct, KCAL_PER_G_PROTEIN),
        carbs: grams(carbs_pct, KCAL_PER_G_CARBS),
        fat: grams(fat_pct, KCAL_PER_G_FAT),
    }
}

/// Run BMR → TDEE → target → macros as one snapshot.
///
/// Called explicitly by the profile and goal update handlers; the result is
/// written in the same statement as the inputs it was derived from.
pub fn recompute_metrics(profile: &PhysicalProfile, goal: &FitnessGoal) -> Option<CalculatedMetrics> {
    let bmr = calculate_bmr(profile)?;
    let tdee = calculate_tdee(bmr, goal.activity_level);
    let daily_calorie_target = calculate_daily_calorie_target(tdee, goal.primary_goal);
    let macro_targets = calculate_macro_targets(daily_calorie_target, goal.primary_goal);

    Some(CalculatedMetrics {
        bmr,
        tdee,
        daily_calorie_target,
        macro_targets,
    })
}

/// Names of the profile fields that keep [`calculate_bmr`] from running.
pub fn missing_profile_fields(profile: &PhysicalProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.weight_kg.is_none() {
        missing.push("weight_kg");
    }
    if profile.height_cm.is_none() {
        missing.push("height_cm");
    }
    if profile.age.is_none() {
        missing.push("age");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(weight: f64, height: f64, age: i32, sex: Sex) -> PhysicalProfile {
        PhysicalProfile {
            weight_kg: Some(weight),
            height_cm: Some(height),
            age: Some(age),
            sex,
        }
    }

    #[test]
    fn test_bmr_reference_male() {
        // 700 + 1093.75 - 150 + 5 = 1648.75
        assert_eq!(calculate_bmr(&profile(70.0, 175.0, 30, Sex::Male)), Some(1649));
    }

    #[test]
    fn test_bmr_rounds_half_up() {
        // 700 + 1093.75 - 25 + 5 = 1773.75
        assert_eq!(calculate_bmr(&profile(70.0, 175.0, 5, Sex::Male)), Some(1774));
    }

    #[test]
    fn test_bmr_sex_offsets() {
        let male = calculate_bmr(&profile(60.0, 165.0, 40, Sex::Male)).unwrap();
        let female = calculate_bmr(&profile(60.0, 165.0, 40, Sex::Female)).unwrap();
        let other = calculate_bmr(&profile(60.0, 165.0, 40, Sex::Other)).unwrap();
        assert_eq!(male - female, 166);
        assert_eq!(male - other, 83);
        assert_eq!(other - female, 83);
    }

    #[test]
    fn test_bmr_requires_weight_height_and_age() {
        let mut p = profile(70.0, 175.0, 30, Sex::Male);
        p.age = None;
        assert_eq!(calculate_bmr(&p), None);
        assert_eq!(missing_profile_fields(&p), vec!["age"]);

        let empty = PhysicalProfile::default();
        assert_eq!(calculate_bmr(&empty), None);
        assert_eq!(missing_profile_fields(&empty), vec!["weight_kg", "height_cm", "age"]);
    }

    #[test]
    fn test_bmr_monotonic() {
        for sex in [Sex::Male, Sex::Female, Sex::Other] {
            let base = calculate_bmr(&profile(70.0, 170.0, 40, sex)).unwrap();
            assert!(calculate_bmr(&profile(71.0, 170.0, 40, sex)).unwrap() > base);
            assert!(calculate_bmr(&profile(70.0, 172.0, 40, sex)).unwrap() > base);
            assert!(calculate_bmr(&profile(70.0, 170.0, 41, sex)).unwrap() < base);
        }
    }

    #[test]
    fn test_tdee_sedentary() {
        assert_eq!(calculate_tdee(1774, ActivityLevel::Sedentary), 2129);
    }

    #[test]
    fn test_tdee_multipliers() {
        assert_eq!(calculate_tdee(2000, ActivityLevel::LightlyActive), 2750);
        assert_eq!(calculate_tdee(2000, ActivityLevel::ModeratelyActive), 3100);
        assert_eq!(calculate_tdee(2000, ActivityLevel::VeryActive), 3450);
        assert_eq!(calculate_tdee(2000, ActivityLevel::ExtraActive), 3800);
    }

    #[test]
    fn test_tdee_unknown_level_uses_moderate() {
        assert_eq!(
            calculate_tdee(1774, ActivityLevel::Unrecognized),
            calculate_tdee(1774, ActivityLevel::ModeratelyActive)
        );
    }

    #[test]
    fn test_daily_target_fat_loss() {
        assert_eq!(calculate_daily_calorie_target(2129, PrimaryGoal::FatLoss), 1629);
    }

    #[test]
    fn test_daily_target_adjustments() {
        assert_eq!(calculate_daily_calorie_target(2500, PrimaryGoal::MuscleGain), 2800);
        assert_eq!(calculate_daily_calorie_target(2500, PrimaryGoal::Endurance), 2700);
        assert_eq!(calculate_daily_calorie_target(2500, PrimaryGoal::Maintenance), 2500);
        assert_eq!(calculate_daily_calorie_target(2500, PrimaryGoal::GeneralFitness), 2500);
        assert_eq!(calculate_daily_calorie_target(2500, PrimaryGoal::Unrecognized), 2500);
    }

    #[test]
    fn test_daily_target_never_below_floor() {
        let goals = [
            PrimaryGoal::FatLoss,
            PrimaryGoal::MuscleGain,
            PrimaryGoal::Maintenance,
            PrimaryGoal::Endurance,
            PrimaryGoal::GeneralFitness,
            PrimaryGoal::Unrecognized,
        ];
        for tdee in (0..4000).step_by(50) {
            for goal in goals {
                assert!(calculate_daily_calorie_target(tdee, goal) >= MIN_DAILY_CALORIES);
            }
        }
        assert_eq!(calculate_daily_calorie_target(1300, PrimaryGoal::FatLoss), 1200);
    }

    #[test]
    fn test_macro_targets_fat_loss() {
        // 1629 kcal: 40% / 4 = 162.9, 30% / 4 = 122.175, 30% / 9 = 54.3
        let m = calculate_macro_targets(1629, PrimaryGoal::FatLoss);
        assert_eq!(m, MacroTargets { protein: 163, carbs: 122, fat: 54 });
    }

    #[test]
    fn test_macro_targets_per_goal() {
        assert_eq!(
            calculate_macro_targets(2000, PrimaryGoal::MuscleGain),
            MacroTargets { protein: 175, carbs: 225, fat: 44 }
        );
        assert_eq!(
            calculate_macro_targets(2000, PrimaryGoal::Endurance),
            MacroTargets { protein: 100, carbs: 275, fat: 56 }
        );
        assert_eq!(
            calculate_macro_targets(2000, PrimaryGoal::Maintenance),
            calculate_macro_targets(2000, PrimaryGoal::Unrecognized)
        );
    }

    #[test]
    fn test_recompute_full_chain() {
        let goal = FitnessGoal {
            primary_goal: PrimaryGoal::FatLoss,
            activity_level: ActivityLevel::Sedentary,
            target_weight_kg: None,
        };
        let metrics = recompute_metrics(&profile(70.0, 175.0, 30, Sex::Male), &goal).unwrap();
        assert_eq!(metrics.bmr, 1649);
        assert_eq!(metrics.tdee, 1979);
        assert_eq!(metrics.daily_calorie_target, 1479);
        assert_eq!(metrics.macro_targets, MacroTargets { protein: 148, carbs: 111, fat: 49 });
    }

    #[test]
    fn test_recompute_incomplete_profile() {
        let p = PhysicalProfile {
            weight_kg: Some(70.0),
            height_cm: None,
            age: Some(30),
            sex: Sex::Female,
        };
        assert_eq!(recompute_metrics(&p, &FitnessGoal::default()), None);
    }

    #[test]
    fn test_recompute_idempotent() {
        let p = profile(82.5, 181.0, 44, Sex::Other);
        let goal = FitnessGoal {
            primary_goal: PrimaryGoal::Endurance,
            activity_level: ActivityLevel::VeryActive,
            target_weight_kg: Some(78.0),
        };
        let first = recompute_metrics(&p, &goal);
        let second = recompute_metrics(&p, &goal);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
