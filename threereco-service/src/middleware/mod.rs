//! Request pipeline: session authentication, route guards and the
//! per-request context handed to handlers.

pub mod auth;
pub mod authorize;
pub mod context;

pub use auth::auth_middleware;
pub use authorize::{authorize, guarded, RouteGuard};
pub use context::{Policies, RequestContext};
