pub mod auth;
pub mod response;

pub use auth::{identify_middleware, require_auth_middleware};
pub use response::{ApiResponse, ApiResult};
