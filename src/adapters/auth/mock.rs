//! Mock authentication adapters for testing.
//!
//! These adapters implement the `SessionValidator` and `AuthProvider` ports
//! for use in tests, avoiding the need for a running auth platform.
//!
//! # Example
//!
//! ```ignore
//! use saas_account::adapters::auth::{MockSessionValidator, MockAuthProvider};
//!
//! let validator = MockSessionValidator::new().with_test_user("valid-token", user_id);
//! let provider = MockAuthProvider::new().with_account("ada@example.com", "hunter22");
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{
    code_challenge, AuthProvider, AuthSession, AuthUser, Credentials, SessionValidator,
    SignUpOutcome, UserAttributes,
};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ════════════════════════════════════════════════════════════════════════════════
// Session validator
// ════════════════════════════════════════════════════════════════════════════════

/// Mock session validator for testing.
///
/// Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a valid token for `user_id` with a generated email and name.
    pub fn with_test_user(self, token: impl Into<String>, user_id: UserId) -> Self {
        let user = AuthenticatedUser::new(
            user_id,
            format!("{}@test.example.com", user_id),
            Some("Test User".to_string()),
        );
        self.with_user(token, user)
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *write(&self.force_error) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *write(&self.force_error) = None;
    }

    /// Registers a new valid token at runtime.
    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        write(&self.tokens).insert(token.into(), user);
    }

    pub fn remove_token(&self, token: &str) {
        write(&self.tokens).remove(token);
    }

    pub fn token_count(&self) -> usize {
        read(&self.tokens).len()
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = read(&self.force_error).clone() {
            return Err(error);
        }

        read(&self.tokens)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Auth provider
// ════════════════════════════════════════════════════════════════════════════════

/// Mock auth platform for testing.
///
/// Keeps registered accounts, issued sessions and OAuth codes in memory.
/// Issued tokens are deterministic (`access-{n}` / `refresh-{n}`) so tests
/// can assert on cookies and response bodies. Emailed links are modelled as
/// codes (`confirm-{n}` / `recovery-{n}`) bound to the challenge they were
/// requested with.
#[derive(Debug, Default)]
pub struct MockAuthProvider {
    state: RwLock<ProviderState>,
    force_error: RwLock<Option<AuthError>>,
}

#[derive(Debug, Default)]
struct ProviderState {
    /// email -> (user, password)
    accounts: HashMap<String, (AuthUser, String)>,
    /// access token -> user id
    access_tokens: HashMap<String, String>,
    /// refresh token -> user id
    refresh_tokens: HashMap<String, String>,
    /// OAuth code -> (user email, expected S256 challenge)
    codes: HashMap<String, (String, Option<String>)>,
    require_confirmation: bool,
    password_resets: Vec<String>,
    issued: u64,
    links_sent: u64,
}

impl ProviderState {
    fn user_by_id(&self, id: &str) -> Option<AuthUser> {
        self.accounts
            .values()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
    }

    /// Registers an emailed link's code and returns it.
    fn send_link(&mut self, kind: &str, email: &str, challenge: &str) -> String {
        self.links_sent += 1;
        let code = format!("{}-{}", kind, self.links_sent);
        self.codes
            .insert(code.clone(), (email.to_string(), Some(challenge.to_string())));
        code
    }

    fn issue_session(&mut self, user: AuthUser) -> AuthSession {
        self.issued += 1;
        let access_token = format!("access-{}", self.issued);
        let refresh_token = format!("refresh-{}", self.issued);
        self.access_tokens
            .insert(access_token.clone(), user.id.clone());
        self.refresh_tokens
            .insert(refresh_token.clone(), user.id.clone());

        AuthSession {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: 3600,
            user,
        }
    }
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account that can sign in with `password`.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password);
        self
    }

    /// Sign-ups return `ConfirmationRequired` instead of a session.
    pub fn requiring_confirmation(self) -> Self {
        write(&self.state).require_confirmation = true;
        self
    }

    /// Makes `code` exchangeable for a session of `email`'s account, by
    /// whoever presents `verifier`.
    pub fn with_oauth_code(self, code: &str, email: &str, verifier: Option<&str>) -> Self {
        write(&self.state).codes.insert(
            code.to_string(),
            (email.to_string(), verifier.map(code_challenge)),
        );
        self
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *write(&self.force_error) = Some(error);
        self
    }

    /// Registers an account and returns the platform user.
    pub fn add_account(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: UserId::new().to_string(),
            email: Some(email.to_string()),
        };
        write(&self.state)
            .accounts
            .insert(email.to_string(), (user.clone(), password.to_string()));
        user
    }

    pub fn account(&self, email: &str) -> Option<AuthUser> {
        read(&self.state).accounts.get(email).map(|(u, _)| u.clone())
    }

    /// Emails a recovery link was requested for.
    pub fn password_resets(&self) -> Vec<String> {
        read(&self.state).password_resets.clone()
    }

    /// Code of the most recently emailed link, if any is still unused.
    pub fn last_link_code(&self) -> Option<String> {
        let state = read(&self.state);
        let n = state.links_sent;
        ["confirm", "recovery"]
            .iter()
            .map(|kind| format!("{}-{}", kind, n))
            .find(|code| state.codes.contains_key(code))
    }

    pub fn is_session_active(&self, access_token: &str) -> bool {
        read(&self.state).access_tokens.contains_key(access_token)
    }

    fn check_error(&self) -> Result<(), AuthError> {
        match read(&self.force_error).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(
        &self,
        credentials: &Credentials,
        code_challenge: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        self.check_error()?;

        if self.account(&credentials.email).is_some() {
            return Err(AuthError::rejected("User already registered"));
        }
        let user = self.add_account(&credentials.email, &credentials.password);

        let mut state = write(&self.state);
        if state.require_confirmation {
            state.send_link("confirm", &credentials.email, code_challenge);
            Ok(SignUpOutcome::ConfirmationRequired { user })
        } else {
            Ok(SignUpOutcome::SignedIn {
                session: state.issue_session(user),
            })
        }
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthError> {
        self.check_error()?;

        let mut state = write(&self.state);
        let user = match state.accounts.get(&credentials.email) {
            Some((user, password)) if *password == credentials.password => user.clone(),
            _ => return Err(AuthError::rejected("Invalid login credentials")),
        };
        Ok(state.issue_session(user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.check_error()?;

        let mut state = write(&self.state);
        let user = state
            .refresh_tokens
            .remove(refresh_token)
            .and_then(|id| state.user_by_id(&id))
            .ok_or_else(|| AuthError::rejected("Invalid Refresh Token"))?;
        Ok(state.issue_session(user))
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        self.check_error()?;

        let mut state = write(&self.state);
        let (email, expected) = state
            .codes
            .remove(auth_code)
            .ok_or_else(|| AuthError::rejected("invalid flow state, no valid flow state found"))?;
        if let Some(expected) = expected {
            if code_verifier.map(code_challenge) != Some(expected) {
                return Err(AuthError::rejected(
                    "code challenge does not match previously saved code verifier",
                ));
            }
        }

        let user = match state.accounts.get(&email) {
            Some((user, _)) => user.clone(),
            None => {
                let user = AuthUser {
                    id: UserId::new().to_string(),
                    email: Some(email.clone()),
                };
                state
                    .accounts
                    .insert(email, (user.clone(), String::new()));
                user
            }
        };
        Ok(state.issue_session(user))
    }

    async fn send_password_reset(
        &self,
        email: &str,
        _redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), AuthError> {
        self.check_error()?;
        let mut state = write(&self.state);
        state.password_resets.push(email.to_string());
        state.send_link("recovery", email, code_challenge);
        Ok(())
    }

    async fn update_user(
        &self,
        access_token: &str,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, AuthError> {
        self.check_error()?;

        let mut state = write(&self.state);
        let user_id = state
            .access_tokens
            .get(access_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;
        let (email, (mut user, mut password)) = state
            .accounts
            .iter()
            .find(|(_, (u, _))| u.id == user_id)
            .map(|(e, entry)| (e.clone(), entry.clone()))
            .ok_or(AuthError::InvalidToken)?;

        state.accounts.remove(&email);
        if let Some(new_email) = &attributes.email {
            user.email = Some(new_email.clone());
        }
        if let Some(new_password) = &attributes.password {
            password = new_password.clone();
        }
        let key = user.email.clone().unwrap_or(email);
        state.accounts.insert(key, (user.clone(), password));

        Ok(user)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.check_error()?;
        write(&self.state)
            .access_tokens
            .remove(access_token)
            .map(|_| ())
            .ok_or(AuthError::InvalidToken)
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "https://auth.test/auth/v1/authorize?provider={}&redirect_to={}&code_challenge={}&code_challenge_method={}",
            provider,
            redirect_to,
            code_challenge,
            crate::ports::CODE_CHALLENGE_METHOD
        )
    }
}
