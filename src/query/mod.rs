pub mod evaluator;
pub mod plan;
pub mod rank;
pub mod result_cache;
