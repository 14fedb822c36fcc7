use std::sync::Arc;

use shared::domain::{Credentials, LoginStatus};
use tracing::{info, warn};

use crate::{error::LoginError, AuthSource, Observable};

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const LOGIN_SUCCESSFUL: &str = "Login Successful";
pub const LOGIN_FAILED: &str = "Login Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    Idle,
    Validating,
    AwaitingRemote,
    Succeeded,
    Failed,
}

impl LoginState {
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Validating | Self::AwaitingRemote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Succeeded,
    /// The auth service rejected the credentials or could not be reached.
    Rejected,
    /// A field was empty; nothing was sent.
    Invalid,
}

/// The login surface as the coordinator sees it.
pub trait LoginView: Send + Sync {
    fn display_alert(&self, message: &str);
    /// Close the login surface after a successful sign-in.
    fn dismiss(&self);
}

pub struct LoginCoordinator {
    view: Arc<dyn LoginView>,
    auth: Arc<dyn AuthSource>,
    state: Observable<LoginState>,
    status: Observable<Option<LoginStatus>>,
}

impl LoginCoordinator {
    pub fn new(view: Arc<dyn LoginView>, auth: Arc<dyn AuthSource>) -> Self {
        Self {
            view,
            auth,
            state: Observable::new(LoginState::Idle),
            status: Observable::new(None),
        }
    }

    pub fn state(&self) -> Observable<LoginState> {
        self.state.clone()
    }

    /// Login status reported by the auth service after the last success.
    pub fn login_status(&self) -> Observable<Option<LoginStatus>> {
        self.status.clone()
    }

    /// Run one login attempt. The state returns to `Idle` once the view has
    /// been told the result.
    pub async fn submit(&self, credentials: Credentials) -> Result<LoginOutcome, LoginError> {
        let started = self.state.try_update(|state| {
            (!state.is_busy()).then_some(LoginState::Validating)
        });
        if !started {
            return Err(LoginError::AttemptInFlight);
        }
        let _attempt = Attempt { state: &self.state };

        if credentials.has_empty_field() {
            self.state.set(LoginState::Failed);
            self.view.display_alert(FILL_ALL_FIELDS);
            return Ok(LoginOutcome::Invalid);
        }

        self.state.set(LoginState::AwaitingRemote);
        let accepted = match self.auth.check_credentials(&credentials).await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(user = %credentials.user, "login: credential check failed: {err:#}");
                false
            }
        };

        if !accepted {
            info!(user = %credentials.user, "login: rejected");
            self.state.set(LoginState::Failed);
            self.view.display_alert(LOGIN_FAILED);
            return Ok(LoginOutcome::Rejected);
        }

        if let Err(err) = self.auth.complete_login().await {
            warn!(user = %credentials.user, "login: completing session failed: {err:#}");
        }
        match self.auth.current_login_status().await {
            Ok(status) => self.status.set(Some(status)),
            Err(err) => warn!("login: status refresh failed: {err:#}"),
        }

        info!(user = %credentials.user, "login: succeeded");
        self.state.set(LoginState::Succeeded);
        self.view.display_alert(LOGIN_SUCCESSFUL);
        self.view.dismiss();
        Ok(LoginOutcome::Succeeded)
    }
}

/// Returns the coordinator to `Idle` when an attempt ends, including when
/// the submitting future is dropped mid-flight.
struct Attempt<'a> {
    state: &'a Observable<LoginState>,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.state.set(LoginState::Idle);
    }
}

#[cfg(test)]
#[path = "tests/login_tests.rs"]
mod tests;
