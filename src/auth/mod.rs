//! Sign-In-With-Ethereum challenge issuance, secp256k1 signature
//! verification and stateless session credentials.

pub mod address;
pub mod challenge;
pub mod message;
pub mod middleware;
pub mod nonce;
pub mod service;
pub mod token;
pub mod verify;

pub use challenge::MessageBuilder;
pub use message::ChallengeMessage;
pub use middleware::{AppState, AuthSession, SessionToken};
pub use nonce::generate_challenge_nonce;
pub use service::{AuthService, LoginOutcome};
pub use verify::verify_signature;
