//! Message store.

mod model;
mod repository;

pub use model::{Message, MessageForm, MessageId, validate_message};
pub use repository::MessageRepository;
