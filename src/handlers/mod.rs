// src/handlers/mod.rs

pub mod assessment;
pub mod generation;
pub mod quiz_session;
pub mod result;
