//! Credential issuance: registration, login, and account changes.

use std::sync::Arc;

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::password::CredentialHasher;
use crate::crypto::token::TokenKeys;
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, Role, User, UserChanges};
use crate::repositories::user::UserStore;
use crate::validation::auth::{
    check_password, normalize_email, validate_name, validate_registration, PasswordProblem,
    MAX_PASSWORD_LEN,
};

/// A freshly minted session token and the user it was issued for.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: User,
}

/// Why a password change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRejection {
    IncorrectCurrentPassword,
    PasswordTooShort,
    PasswordTooLong,
}

impl PasswordRejection {
    pub fn message(&self) -> &'static str {
        match self {
            PasswordRejection::IncorrectCurrentPassword => "Current password is incorrect",
            PasswordRejection::PasswordTooShort => "New password must be at least 8 characters long",
            PasswordRejection::PasswordTooLong => "New password must be at most 128 characters",
        }
    }
}

/// The result of `change_password`. Rejections are business outcomes, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePasswordOutcome {
    Changed,
    Rejected(PasswordRejection),
}

/// Authenticates users and mints session tokens.
#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    keys: Arc<TokenKeys>,
    /// Verified against when the email is unknown, so both login failure
    /// paths cost one hash verification.
    dummy_digest: Arc<String>,
}

impl CredentialIssuer {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        keys: Arc<TokenKeys>,
    ) -> Result<Self> {
        let dummy_digest = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            hasher,
            keys,
            dummy_digest: Arc::new(dummy_digest),
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest)).await?
    }

    /// Registers a new user and issues a token for it.
    ///
    /// `role` defaults to `Role::Employee`.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<IssuedSession> {
        let name = name.trim();
        let email = normalize_email(email);
        validate_registration(name, &email, password)?;

        tracing::debug!("🔐 Registering user: {}", email);

        if self.store.find_by_email(&email).await?.is_some() {
            tracing::info!("Registration refused, email already in use: {}", email);
            return Err(AppError::DuplicateCredential);
        }

        let password_hash = self.hash_password(password).await?;

        // The store's uniqueness check decides races between concurrent
        // registrations that both passed the lookup above.
        let user = self
            .store
            .insert(NewUser {
                name: name.to_string(),
                email,
                password_hash,
                role: role.unwrap_or_default(),
            })
            .await?;

        tracing::info!("✅ User registered with ID: {}", user.id);

        let token = self.keys.issue(&user)?;
        Ok(IssuedSession { token, user })
    }

    /// Authenticates by email and password and issues a token.
    ///
    /// Unknown email and wrong password fail identically with
    /// `AppError::InvalidCredential`.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let email = normalize_email(email);
        tracing::debug!("🔐 Authenticating user: {}", email);

        // No stored password can be this long. Pay for one verification anyway
        // so the refusal costs the same as any other failed login.
        if password.chars().count() > MAX_PASSWORD_LEN {
            self.verify_password("", &self.dummy_digest).await?;
            tracing::info!("Login failed for: {}", email);
            return Err(AppError::InvalidCredential);
        }

        let user = self.store.find_by_email(&email).await?;

        let digest = match &user {
            Some(user) => user.password_hash.as_str(),
            None => self.dummy_digest.as_str(),
        };
        let password_ok = self.verify_password(password, digest).await?;

        let user = match user {
            Some(user) if password_ok => user,
            _ => {
                tracing::info!("Login failed for: {}", email);
                return Err(AppError::InvalidCredential);
            }
        };

        tracing::info!("✅ User authenticated: {}", user.id);

        let token = self.keys.issue(&user)?;
        Ok(IssuedSession { token, user })
    }

    /// Makes sure an administrator account exists for `email`.
    ///
    /// An existing account is promoted and keeps its password; otherwise a new
    /// admin is registered with the given credentials.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);

        if let Some(existing) = self.store.find_by_email(&email).await? {
            if existing.is_admin() {
                return Ok(existing);
            }
            tracing::info!("👤 Promoting existing account to admin: {}", existing.id);
            return self.set_role(existing.id, Role::Admin).await;
        }

        let issued = self.register(name, &email, password, Some(Role::Admin)).await?;
        tracing::info!("👤 Admin account created: {}", issued.user.id);
        Ok(issued.user)
    }

    /// Changes a user's password.
    ///
    /// Outstanding tokens stay valid; use `revoke_sessions` to end them.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<ChangePasswordOutcome> {
        tracing::info!("🔑 Changing password for user: {}", user_id);

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !self.verify_password(current_password, &user.password_hash).await? {
            tracing::info!("Password change refused for {}: wrong current password", user_id);
            return Ok(ChangePasswordOutcome::Rejected(
                PasswordRejection::IncorrectCurrentPassword,
            ));
        }

        if let Err(problem) = check_password(new_password) {
            tracing::info!("Password change refused for {}: {:?}", user_id, problem);
            let rejection = match problem {
                PasswordProblem::TooShort => PasswordRejection::PasswordTooShort,
                PasswordProblem::TooLong => PasswordRejection::PasswordTooLong,
            };
            return Ok(ChangePasswordOutcome::Rejected(rejection));
        }

        let password_hash = self.hash_password(new_password).await?;
        self.store
            .update_fields(
                user_id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("✅ Password changed for user: {}", user_id);
        Ok(ChangePasswordOutcome::Changed)
    }

    /// Updates a user's display name.
    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> Result<User> {
        let name = name.trim();
        validate_name(name)?;

        let user = self
            .store
            .update_fields(
                user_id,
                UserChanges {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("✅ Profile updated for user: {}", user_id);
        Ok(user)
    }

    /// Changes a user's role. Takes effect on the next verified request.
    pub async fn set_role(&self, user_id: Uuid, role: Role) -> Result<User> {
        let user = self
            .store
            .update_fields(
                user_id,
                UserChanges {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("✅ Role of user {} set to {:?}", user_id, role);
        Ok(user)
    }

    /// Invalidates every token issued to the user so far.
    pub async fn revoke_sessions(&self, user_id: Uuid) -> Result<User> {
        let user = self
            .store
            .update_fields(
                user_id,
                UserChanges {
                    bump_token_epoch: true,
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("✅ Sessions revoked for user: {} (epoch {})", user_id, user.token_epoch);
        Ok(user)
    }
}
