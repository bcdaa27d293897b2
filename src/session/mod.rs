//! Client session identity.
//!
//! A session is identified by a generated [`UserId`] and acts for one
//! [`UserRole`].

mod id;
mod role;

pub use id::{InvalidUserId, UserId};
pub use role::UserRole;
