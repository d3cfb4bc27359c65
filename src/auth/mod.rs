//! Bearer token authentication for users and admins.
//!
//! Every request presents an opaque secret in the `Authorization` header.
//! The gate looks it up, checks expiry and the owner's standing, then
//! extends the token's freshness. Route requirements are expressed as
//! type parameters on the `Auth` extractor.

mod bearer;
mod errors;
mod extractors;
mod gate;
mod ip;
mod state;
mod types;

pub use bearer::get_bearer_token;
pub use errors::AuthError;
pub use extractors::{AdminOnly, AnySubject, Auth, SubjectConstraint, SuperAdminOnly, UserOnly};
pub use gate::authenticate;
pub use ip::{FORWARDED_FOR_HEADER, HasHeadersAndExtensions, extract_client_ip};
pub use state::HasAuthBackend;
pub use types::{AuthOptions, Authenticated, Subject};
