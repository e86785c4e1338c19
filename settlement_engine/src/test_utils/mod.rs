//! Helpers for tests: throwaway SQLite databases, marketplace fixtures and a fake card gateway.
pub mod prepare_env;
pub mod seed;
pub mod test_gateway;
pub mod test_engine;
