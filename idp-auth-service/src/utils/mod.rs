pub mod id_token;
pub mod secret_hash;
pub mod validation;

pub use id_token::decode_claims;
pub use secret_hash::SecretHasher;
pub use validation::ValidatedJson;
