pub mod file;
pub mod memory;

pub use file::JsonFilePreferenceStore;
pub use memory::InMemoryPreferenceStore;
