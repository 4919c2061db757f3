/// Authentication for Reelforge
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`token`]: Session tokens and HMAC-signed cookie values
/// - [`adapter`]: The storage adapter trait and its Postgres implementation
/// - [`memory`]: In-process adapter
/// - [`service`]: Sign-in, sign-up, sessions, email verification
/// - [`middleware`]: Request credential extraction and the `AuthUser` extractor
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use reelforge_shared::auth::memory::MemoryAdapter;
/// use reelforge_shared::auth::service::{AuthService, SessionSettings, SignUp};
///
/// # async fn example() {
/// let auth = AuthService::new(Arc::new(MemoryAdapter::new()), SessionSettings::default());
///
/// let form = SignUp {
///     email: "ada@example.com".to_string(),
///     password: "hunter22".to_string(),
///     ..Default::default()
/// };
/// let user = auth.sign_up(form).await.expect("fresh email");
/// let session = auth.start_session(user.id).await.expect("session stored");
/// # }
/// ```

pub mod adapter;
pub mod memory;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token;
