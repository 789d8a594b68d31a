pub mod meal;
pub mod plan;
pub mod profile;
pub mod reference;
pub mod user;
