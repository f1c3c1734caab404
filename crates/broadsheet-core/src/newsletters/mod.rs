//! Newsletter aggregate: one message bound to a set of recipients.

mod model;
mod repository;

pub use model::{Newsletter, NewsletterForm, NewsletterId, Status};
pub use repository::NewsletterRepository;
