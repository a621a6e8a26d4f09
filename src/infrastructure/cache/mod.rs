pub mod view_store;

pub use view_store::MemoryViewStore;
