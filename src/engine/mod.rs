pub mod messages;
pub mod search_engine;
