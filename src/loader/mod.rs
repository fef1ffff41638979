pub mod cache;
pub mod engine_loader;
pub mod fetch;
pub mod inflight;
