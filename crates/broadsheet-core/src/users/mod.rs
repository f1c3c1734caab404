//! Users, permissions and registration.

mod model;
mod repository;
mod validation;

pub use model::{AvatarUpload, NewUser, Permission, User, UserId};
pub use repository::UserRepository;
pub use validation::validate_registration;
