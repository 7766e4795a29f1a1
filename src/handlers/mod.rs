// Demo resource routers mounted by the gateway

pub mod comments;
pub mod extractors;
pub mod posts;
pub mod response;
pub mod store;
pub mod users;

pub use comments::comments_router;
pub use posts::posts_router;
pub use store::BlogStore;
pub use users::users_router;
