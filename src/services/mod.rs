pub mod ai_client;
pub mod glycemic;
pub mod metrics;
pub mod reference;
