pub mod authenticator;
pub mod error;
pub mod notifier;
pub mod otp;
pub mod token;

pub use authenticator::{Authenticator, IdentitySummary, LoginChallenge, LoginSession};
pub use error::AuthError;
pub use notifier::{LogNotifier, TwilioNotifier};
pub use otp::{IssuedChallenge, OtpPolicy, OtpSessionStore, Verified};
pub use token::{Claims, TokenIssuer};
