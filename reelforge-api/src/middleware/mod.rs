/// Middleware for the API server
///
/// Listed outermost first, as installed by `app::apply_middleware`:
///
/// - `request_id`: Correlation id in, correlation id out
/// - `security`: Security response headers
/// - `error_boundary`: Panics become responses
/// - request logging (`tower_http::trace`, outside production)
/// - CORS (`tower_http::cors`, when origins are configured)
/// - `body_limit`: Body cap for POST/PUT/PATCH
/// - `auth_context`: Session cookie / bearer token → `AuthContext`

pub mod auth_context;
pub mod body_limit;
pub mod error_boundary;
pub mod request_id;
pub mod security;
