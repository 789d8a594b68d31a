pub mod ai;
pub mod analysis;
pub mod auth;
pub mod health;
pub mod meals;
pub mod plans;
pub mod profile;
pub mod reference;
pub mod summary;
