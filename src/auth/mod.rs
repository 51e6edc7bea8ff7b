pub mod claims;
pub mod jwt;
pub mod utils;

pub use claims::{Claims, Identity, Role};
pub use jwt::CredentialDecoder;
pub use utils::{require_author, require_owner_or_admin};
