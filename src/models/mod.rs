//! Resource types, their DTOs, validation tables and storage descriptors.

pub mod post;
pub mod user;

pub use post::{CreatePost, Post, UpdatePost};
pub use user::{CreateUser, User, UserView};
