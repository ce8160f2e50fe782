pub mod tour;
pub mod user;

pub use tour::{Difficulty, TOURS_COLLECTION, Tour};
pub use user::{Role, USERS_COLLECTION, User};
