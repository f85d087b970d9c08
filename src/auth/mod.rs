pub mod handlers;
pub mod middleware;

pub use middleware::{authorize, require_auth, require_role, SessionUser, SESSION_USER_KEY};
