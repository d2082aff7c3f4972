//! Administrator authentication: password hashing, sessions, throttling and
//! the request extractor that guards privileged routes.

pub mod extract;
pub mod gate;
pub mod password;
pub mod throttle;

pub use extract::AdminSession;
pub use gate::{AdminIdentity, AuthError, Session, SessionGate};
pub use password::{PasswordError, PasswordHasher};
pub use throttle::LoginThrottle;
