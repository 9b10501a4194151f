pub mod discovery;
pub mod handlers;
pub mod links;
pub mod middleware;
pub mod releases;
pub mod routes;

pub use routes::create_router;
