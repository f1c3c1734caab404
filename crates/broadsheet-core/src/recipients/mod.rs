//! Recipient store.

mod model;
mod repository;

pub use model::{Recipient, RecipientForm, RecipientId, validate_recipient};
pub use repository::RecipientRepository;
pub(crate) use repository::row_to_recipient;
