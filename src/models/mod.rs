// src/models/mod.rs

pub mod assessment;
pub mod quiz_session;
pub mod result_record;
