pub mod filesystem;

pub use filesystem::ResultStore;
