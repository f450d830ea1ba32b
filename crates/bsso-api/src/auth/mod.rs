pub mod cookies;
pub mod routes;
pub mod session;

pub use routes::routes;
