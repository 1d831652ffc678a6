// src/models/mod.rs

pub mod attempt;
pub mod category;
pub mod question;
pub mod review;
pub mod stats;
pub mod subject;
pub mod user;
