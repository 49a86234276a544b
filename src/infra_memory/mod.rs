mod credential_store_memory;

pub use credential_store_memory::*;
