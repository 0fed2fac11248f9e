//! HTTP surface: routes, handlers, bearer-token middleware and error mapping.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::{CurrentAccount, RequestContext, bearer_token, require_account};
pub use routes::router;
pub use state::AppState;
