mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use store::SqliteCatalogDb;
pub use trait_def::CatalogDb;
