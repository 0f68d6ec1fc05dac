//! Route handlers

pub mod health;
pub mod metadata;
pub mod predict;
pub mod retrain;
