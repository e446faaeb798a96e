// Price history store implementations
pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlHistoryStore;
pub use memory::MemoryHistoryStore;
