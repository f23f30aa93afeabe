//! Identity provider boundary (who is signed in, and sign-in/sign-out events).

use std::sync::RwLock;

use brewstock_events::{EventBus, InMemoryBusError, InMemoryEventBus, Subscription};

/// Sign-in state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityChange {
    SignedIn { email: String },
    SignedOut,
}

/// Source of the current authenticated identity.
pub trait IdentityProvider: Send + Sync {
    /// Email of the signed-in identity, if any.
    fn current_email(&self) -> Option<String>;

    /// Stream of sign-in/sign-out events published after subscribing.
    fn subscribe(&self) -> Subscription<IdentityChange>;
}

/// In-process identity provider for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    current: RwLock<Option<String>>,
    bus: InMemoryEventBus<IdentityChange>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, email: impl Into<String>) -> Result<(), InMemoryBusError> {
        let email = email.into();
        if let Ok(mut current) = self.current.write() {
            *current = Some(email.clone());
        }
        tracing::info!(%email, "signed in");
        self.bus.publish(IdentityChange::SignedIn { email })
    }

    pub fn sign_out(&self) -> Result<(), InMemoryBusError> {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
        tracing::info!("signed out");
        self.bus.publish(IdentityChange::SignedOut)
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn current_email(&self) -> Option<String> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    fn subscribe(&self) -> Subscription<IdentityChange> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Caller, Role};

    #[test]
    fn sign_in_and_out_are_published_and_visible() {
        let provider = InMemoryIdentityProvider::new();
        let sub = provider.subscribe();

        provider.sign_in("owner@gmail.com").unwrap();
        assert_eq!(Caller::from_identity(&provider).role(), Role::Owner);

        provider.sign_out().unwrap();
        assert!(!Caller::from_identity(&provider).is_signed_in());

        assert_eq!(
            sub.drain(),
            vec![
                IdentityChange::SignedIn {
                    email: "owner@gmail.com".to_string()
                },
                IdentityChange::SignedOut,
            ]
        );
    }
}
