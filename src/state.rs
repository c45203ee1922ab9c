use crate::coordinator::Coordinator;
use crate::middleware::RateLimiter;
use crate::services::activity::ActivityLogger;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub coordinator: Coordinator,
    pub activity: ActivityLogger,
    pub session_key: Vec<u8>,
    pub login_limiter: RateLimiter,
    pub submit_limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: Arc<Store>, session_key: Vec<u8>) -> Self {
        let activity = ActivityLogger::new(store.clone());
        let coordinator = Coordinator::new(store.clone(), activity.clone());
        Self {
            store,
            coordinator,
            activity,
            session_key,
            // 5 attempts per 60 seconds per IP
            login_limiter: RateLimiter::new(5, 60),
            // 10 public submissions per 60 seconds per IP
            submit_limiter: RateLimiter::new(10, 60),
        }
    }
}

pub type SharedState = Arc<AppState>;
