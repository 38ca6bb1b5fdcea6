pub mod connection;
pub mod error;
pub mod schema;

pub use connection::*;
pub use error::{StoreError, StoreResult};
pub(crate) use error::with_timeout;
pub use schema::*;
