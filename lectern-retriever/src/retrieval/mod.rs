pub mod chunking_strategy;
pub mod retrieval_store;
