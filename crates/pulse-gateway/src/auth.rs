use pulse_types::UserId;
use tokio::sync::watch;

/// Identity boundary. Credential mechanics live with the external
/// provider; this core only needs to know who is signed in and when
/// that changes.
pub trait AuthProvider: Send + Sync {
    fn current_identity(&self) -> Option<UserId>;

    /// Watch for sign-in/sign-out transitions. The receiver yields the
    /// current identity immediately and on every change.
    fn identity_changes(&self) -> watch::Receiver<Option<UserId>>;

    fn sign_out(&self);
}

/// Provider with a directly settable identity — the test double and
/// the demo wiring.
pub struct StaticAuth {
    identity: watch::Sender<Option<UserId>>,
}

impl StaticAuth {
    pub fn new(identity: Option<UserId>) -> Self {
        Self { identity: watch::Sender::new(identity) }
    }

    pub fn sign_in(&self, user_id: UserId) {
        let _ = self.identity.send(Some(user_id));
    }
}

impl AuthProvider for StaticAuth {
    fn current_identity(&self) -> Option<UserId> {
        self.identity.borrow().clone()
    }

    fn identity_changes(&self) -> watch::Receiver<Option<UserId>> {
        self.identity.subscribe()
    }

    fn sign_out(&self) {
        let _ = self.identity.send(None);
    }
}
