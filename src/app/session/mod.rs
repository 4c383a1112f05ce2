pub mod classifier;
pub mod store;

pub use store::SessionStore;
