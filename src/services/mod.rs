//! Request-scoped business logic between the handlers and storage.

pub mod post;
pub mod user;
pub mod vote;

pub use post::PostService;
pub use user::UserService;
pub use vote::VoteService;
