use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use crate::traits::{CheckoutRequest, CheckoutSession, PaymentGateway, PaymentGatewayError};

/// An in-memory card gateway. Like the real thing, it returns the same session for a repeated idempotency key.
#[derive(Debug, Clone, Default)]
pub struct TestGateway {
    calls: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
    sessions: Arc<Mutex<HashMap<String, CheckoutSession>>>,
    requests: Arc<Mutex<Vec<CheckoutRequest>>>,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_checkout_session` calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of distinct sessions opened.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl PaymentGateway for TestGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentGatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(PaymentGatewayError::Unavailable("test gateway is offline".into()));
        }
        let mut sessions = self.sessions.lock().map_err(|e| PaymentGatewayError::Unavailable(e.to_string()))?;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = sessions.len() + 1;
        let session = sessions
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| CheckoutSession {
                session_ref: format!("cs_test_{next}"),
                checkout_url: Some(format!("https://pay.example.test/cs_test_{next}")),
            })
            .clone();
        Ok(session)
    }
}
