// src/handlers/mod.rs

pub mod auth;
pub mod category;
pub mod question;
pub mod quiz;
pub mod subject;
