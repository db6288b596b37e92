// handlers/mod.rs - one module per resource
//
// Each module exposes list/create/show/update/delete handler functions that
// the route tables in `app.rs` bind to paths.

pub mod articles;
pub mod categories;
pub mod system;
pub mod users;
