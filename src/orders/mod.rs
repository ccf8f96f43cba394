pub mod model;
pub mod store;

pub use model::{OrderRecord, StatusChange};
pub use store::{InMemoryOrderStore, OrderStore};
