//! In-memory collaborators.
//!
//! Reference implementations of the [`Store`](crate::store::Store) and
//! [`Board`](crate::board::Board) ports, used by tests and local runs.

pub mod board;
pub mod store;

pub use board::{BoardOperation, InMemoryBoard};
pub use store::InMemoryStore;
