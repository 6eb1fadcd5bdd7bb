pub mod categories;
pub mod engine;
pub mod projector;
