pub mod engine;
pub mod lighting;
