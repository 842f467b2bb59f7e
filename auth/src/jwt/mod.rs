pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::TokenEnvelope;
pub use errors::JwtError;
pub use handler::IssuedToken;
pub use handler::JwtHandler;
