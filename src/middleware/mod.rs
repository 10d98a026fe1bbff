pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, SchoolContext};
pub use response::{ApiResponse, ApiResult};
