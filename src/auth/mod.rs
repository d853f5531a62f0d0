/// Authentication module
///
/// Credential lookup, password verification, token signing and the
/// login flow that ties them together.

mod claims;
mod credentials;
mod jwt;
mod login;
mod password;

pub use claims::Claims;
pub use credentials::{CredentialStore, InMemoryCredentialStore, PgCredentialStore, Role, UserRecord};
pub use jwt::{JwtSigner, SignRequest, SigningError, TokenSigner};
pub use login::{LoginHandler, LoginPolicy, LoginResponse, TokenPolicy, UserProjection};
pub use password::{hash_password, verify_password};
