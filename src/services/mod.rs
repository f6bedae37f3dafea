pub mod auth_service;
pub mod jwt_service;
pub mod session_service;
pub mod token_issuer;
pub mod token_verifier;
