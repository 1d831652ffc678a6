// src/quiz/mod.rs

pub mod lifecycle;
pub mod progress;
pub mod scheduler;
pub mod scoring;

pub use lifecycle::QuizService;
