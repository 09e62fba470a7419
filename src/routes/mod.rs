pub mod control;
pub mod events;
pub mod health;
pub mod metrics;
pub mod scan;
