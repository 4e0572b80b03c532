//! Payment gateway trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Authority, Rial};
use thiserror::Error;

/// Verification code for a freshly confirmed payment.
pub const CODE_VERIFIED: i32 = 100;

/// Verification code when the gateway had already confirmed this
/// payment. Treated as success so retried callbacks stay idempotent.
pub const CODE_ALREADY_VERIFIED: i32 = 101;

/// Errors talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached.
    #[error("gateway transport failure: {0}")]
    Transport(String),

    /// The gateway answered with something unparseable.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),
}

/// A request to authorize a payment for a frozen checkout total.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub amount: Rial,
    pub description: String,
    /// Contact handle the gateway shows to the payer (a phone number).
    pub contact: String,
}

/// A successful authorization: the authority token plus the URL the
/// customer must be redirected to.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub authority: Authority,
    pub redirect_url: String,
}

/// The gateway's answer to a verification request.
#[derive(Debug, Clone)]
pub struct Verification {
    pub code: i32,
    pub ref_id: Option<String>,
}

impl Verification {
    /// Returns true if the code means the money was captured.
    pub fn is_accepted(&self) -> bool {
        matches!(self.code, CODE_VERIFIED | CODE_ALREADY_VERIFIED)
    }
}

/// Trait for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Reserves a payment for the given amount and returns the
    /// authority plus the redirect URL.
    async fn authorize(&self, request: AuthorizeRequest) -> Result<Authorization, GatewayError>;

    /// Asks the gateway whether the payment behind `authority` was
    /// completed for exactly `amount`.
    async fn verify(&self, amount: Rial, authority: &Authority)
    -> Result<Verification, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    authorized: HashMap<String, Rial>,
    verified: HashSet<String>,
    next_id: u32,
    fail_on_authorize: bool,
    scripted_verify_code: Option<i32>,
}

/// In-memory payment gateway for testing and local runs.
///
/// Hands out sequential authorities (`A-0001`, `A-0002`, ...) and
/// verifies any amount it previously authorized. Behavior can be
/// scripted per test through the setters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail the next authorize call.
    pub fn set_fail_on_authorize(&self, fail: bool) {
        self.state.write().unwrap().fail_on_authorize = fail;
    }

    /// Forces verify to answer with a fixed code regardless of state.
    pub fn set_verify_code(&self, code: i32) {
        self.state.write().unwrap().scripted_verify_code = Some(code);
    }

    /// Returns the number of outstanding authorizations.
    pub fn authorization_count(&self) -> usize {
        self.state.read().unwrap().authorized.len()
    }

    /// Returns true if the given authority was handed out.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.state.read().unwrap().authorized.contains_key(authority)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn authorize(&self, request: AuthorizeRequest) -> Result<Authorization, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_authorize {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }

        state.next_id += 1;
        let token = format!("A-{:04}", state.next_id);
        state.authorized.insert(token.clone(), request.amount);

        Ok(Authorization {
            redirect_url: format!("https://gateway.example/pay/{token}"),
            authority: Authority::new(token),
        })
    }

    async fn verify(
        &self,
        amount: Rial,
        authority: &Authority,
    ) -> Result<Verification, GatewayError> {
        let mut state = self.state.write().unwrap();

        if let Some(code) = state.scripted_verify_code {
            return Ok(Verification { code, ref_id: None });
        }

        let Some(&authorized_amount) = state.authorized.get(authority.as_str()) else {
            // Unknown authority.
            return Ok(Verification {
                code: -51,
                ref_id: None,
            });
        };
        if authorized_amount != amount {
            // Amount mismatch.
            return Ok(Verification {
                code: -50,
                ref_id: None,
            });
        }

        let code = if state.verified.insert(authority.as_str().to_string()) {
            CODE_VERIFIED
        } else {
            CODE_ALREADY_VERIFIED
        };
        Ok(Verification {
            code,
            ref_id: Some(format!("REF-{}", authority.as_str())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authorize_and_verify() {
        let gateway = InMemoryPaymentGateway::new();

        let auth = gateway
            .authorize(AuthorizeRequest {
                amount: Rial::new(3000),
                description: "Order payment".to_string(),
                contact: "+989121234567".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(auth.authority.as_str(), "A-0001");
        assert_eq!(auth.redirect_url, "https://gateway.example/pay/A-0001");
        assert!(gateway.has_authority("A-0001"));

        let verification = gateway
            .verify(Rial::new(3000), &auth.authority)
            .await
            .unwrap();
        assert_eq!(verification.code, CODE_VERIFIED);
        assert!(verification.is_accepted());
    }

    #[tokio::test]
    async fn test_second_verify_reports_already_verified() {
        let gateway = InMemoryPaymentGateway::new();
        let auth = gateway
            .authorize(AuthorizeRequest {
                amount: Rial::new(1000),
                description: String::new(),
                contact: String::new(),
            })
            .await
            .unwrap();

        let first = gateway.verify(Rial::new(1000), &auth.authority).await.unwrap();
        let second = gateway.verify(Rial::new(1000), &auth.authority).await.unwrap();

        assert_eq!(first.code, CODE_VERIFIED);
        assert_eq!(second.code, CODE_ALREADY_VERIFIED);
        assert!(second.is_accepted());
    }

    #[tokio::test]
    async fn test_amount_mismatch_rejected() {
        let gateway = InMemoryPaymentGateway::new();
        let auth = gateway
            .authorize(AuthorizeRequest {
                amount: Rial::new(1000),
                description: String::new(),
                contact: String::new(),
            })
            .await
            .unwrap();

        let verification = gateway.verify(Rial::new(999), &auth.authority).await.unwrap();
        assert!(!verification.is_accepted());
    }

    #[tokio::test]
    async fn test_unknown_authority_rejected() {
        let gateway = InMemoryPaymentGateway::new();
        let verification = gateway
            .verify(Rial::new(1000), &Authority::new("A-9999"))
            .await
            .unwrap();
        assert!(!verification.is_accepted());
    }

    #[tokio::test]
    async fn test_fail_on_authorize() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_authorize(true);

        let result = gateway
            .authorize(AuthorizeRequest {
                amount: Rial::new(1000),
                description: String::new(),
                contact: String::new(),
            })
            .await;
        assert!(result.is_err());
        assert_eq!(gateway.authorization_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_verify_code() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_verify_code(201);

        let verification = gateway
            .verify(Rial::new(1000), &Authority::new("A-0001"))
            .await
            .unwrap();
        assert_eq!(verification.code, 201);
        assert!(!verification.is_accepted());
    }
}
