use std::sync::Arc;

use letgo_auth::{Authenticator, OtpPolicy, OtpSessionStore, TokenIssuer};
use letgo_booking::{BookingManager, TripDesk};
use letgo_core::{Clock, OtpNotifier, Repositories};

use crate::middleware::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub bookings: Arc<BookingManager>,
    pub trips: Arc<TripDesk>,
    pub tokens: TokenIssuer,
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        notifier: Arc<dyn OtpNotifier>,
        clock: Arc<dyn Clock>,
        policy: OtpPolicy,
        tokens: TokenIssuer,
    ) -> Self {
        let otp = OtpSessionStore::new(
            repos.challenges.clone(),
            repos.identities.clone(),
            clock.clone(),
            policy,
        );
        let authenticator = Authenticator::new(
            repos.identities.clone(),
            otp,
            notifier,
            tokens.clone(),
            clock.clone(),
        );
        let bookings = BookingManager::new(
            repos.trips.clone(),
            repos.assignments.clone(),
            repos.bookings.clone(),
            clock.clone(),
        );
        let trips = TripDesk::new(repos.trips, repos.assignments, clock);

        Self {
            authenticator: Arc::new(authenticator),
            bookings: Arc::new(bookings),
            trips: Arc::new(trips),
            tokens,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }
}
