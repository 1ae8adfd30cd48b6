//! Authentication state trait and macro.

use crate::db::Database;
use crate::jwt::JwtKeys;

/// Trait for router state types that provide what the auth gate needs.
pub trait HasAuthState {
    fn jwt(&self) -> &JwtKeys;
    fn db(&self) -> &Database;
    fn secure_cookies(&self) -> bool;
}

/// Implement [`HasAuthState`] for a state struct with the standard fields:
/// `db: Database`, `jwt: Arc<JwtKeys>`, `secure_cookies: bool`.
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtKeys {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
