//! Movie catalog storage.

mod store;

pub use store::MovieStore;
