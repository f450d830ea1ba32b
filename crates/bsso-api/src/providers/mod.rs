pub mod admin;
pub mod models;
pub mod routes;
pub mod store;

pub use admin::{Admin, AdminConfig};
pub use routes::routes;
pub use store::PgProviderStore;
