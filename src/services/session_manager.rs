use std::{sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        Claims, Role, TokenKind, TokenPair,
        jwt::{TokenCodec, remaining_lifetime},
        password::{CredentialHasher, check_password_policy, random_password},
        providers::CanonicalIdentity,
    },
    cache::RevocationCache,
    db::dao::{NewHistoryEntry, NewSession, NewUser, PaginatedResponse},
    db::entities::user,
    error::AppError,
    services::{
        ServiceContext,
        session_store::{HistoryEntry, SessionEvent},
    },
};

const MIN_LOGIN_LEN: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub login: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<FixedOffset>,
}

impl UserProfile {
    fn from_model(model: &user::Model, role: Role) -> Self {
        Self {
            id: model.id,
            login: model.login.clone(),
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            role,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Login, refresh, logout and the checks that guard every authenticated request.
#[derive(Clone)]
pub struct SessionManager {
    services: ServiceContext,
    codec: Arc<TokenCodec>,
    cache: Arc<dyn RevocationCache>,
    hasher: Arc<dyn CredentialHasher>,
    cache_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        services: ServiceContext,
        codec: TokenCodec,
        cache: Arc<dyn RevocationCache>,
        hasher: Arc<dyn CredentialHasher>,
        cache_timeout: Duration,
    ) -> Self {
        Self {
            services,
            codec: Arc::new(codec),
            cache,
            hasher,
            cache_timeout,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn services(&self) -> &ServiceContext {
        &self.services
    }

    pub async fn signup(
        &self,
        login: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<UserProfile, AppError> {
        let login = login.trim();
        if login.chars().count() < MIN_LOGIN_LEN {
            return Err(AppError::validation(
                "Login length must be 3 or more characters",
            ));
        }
        check_password_policy(password)?;

        let password_hash = self.hasher.hash(password)?;
        let user = self
            .services
            .user()
            .signup(NewUser {
                id: Uuid::new_v4(),
                login: login.to_string(),
                password_hash,
                first_name,
                last_name,
            })
            .await?;
        info!(user_id = %user.id, "user signed up");
        Ok(UserProfile::from_model(&user, Role::BASELINE))
    }

    pub async fn login(
        &self,
        login: &str,
        password: &str,
        device: &str,
    ) -> Result<AuthOutcome, AppError> {
        let invalid = || AppError::unauthorized("Invalid login or password");

        let user = self
            .services
            .user()
            .find_by_login(login.trim())
            .await?
            .ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = %user.id, "password mismatch");
            return Err(invalid());
        }

        self.open_session(&user, device, SessionEvent::LoginWithPassword)
            .await
    }

    /// Signs in a normalized provider identity, creating the account on first use.
    pub async fn login_federated(
        &self,
        identity: CanonicalIdentity,
        device: &str,
    ) -> Result<AuthOutcome, AppError> {
        let placeholder_hash = self.hasher.hash(&random_password())?;
        let resolved = self
            .services
            .user()
            .resolve_or_provision(identity, placeholder_hash)
            .await?;
        if resolved.provisioned {
            info!(user_id = %resolved.user.id, "provisioned federated user");
        }

        self.open_session(&resolved.user, device, SessionEvent::LoginWithOauth)
            .await
    }

    /// Swaps the device's session for a new pair. The refresh token must be the one the
    /// device currently holds; of two racing refreshes only one succeeds.
    pub async fn refresh(
        &self,
        user_id: Uuid,
        device: &str,
        old_access: Option<&str>,
        refresh: &str,
    ) -> Result<TokenPair, AppError> {
        let rejected = || AppError::unauthorized("Refresh token is invalid");
        let now = Utc::now();

        let claims = self.codec.decode_as(refresh, TokenKind::Refresh, now)?;
        if claims.user_id != user_id {
            warn!(user_id = %user_id, "refresh token belongs to another user");
            return Err(rejected());
        }

        let sessions = self.services.sessions();
        if !sessions
            .has_active_session(user_id, device, claims.jti)
            .await?
        {
            return Err(rejected());
        }

        let role = self.services.role().primary_role(user_id).await?;
        let issued = self.codec.issue(user_id, role.as_str(), now)?;
        let rotated = sessions
            .rotate_session(
                claims.jti,
                new_session(user_id, device, &issued.refresh_claims)?,
            )
            .await?;
        if !rotated {
            debug!(user_id = %user_id, device = %device, "lost refresh race");
            return Err(rejected());
        }

        if let Some(access) = old_access {
            self.revoke_access(access, now).await;
        }
        self.record(history_entry(
            Some(user_id),
            device,
            Some(&issued.refresh_claims),
            SessionEvent::RefreshTokenUpdate,
        )?)
        .await;

        Ok(issued.pair())
    }

    pub async fn logout(
        &self,
        user_id: Uuid,
        device: &str,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let removed = self
            .services
            .sessions()
            .delete_session(user_id, device)
            .await?;
        self.revoke_access(access, now).await;

        let refresh_jti = refresh
            .and_then(|token| self.codec.decode_as(token, TokenKind::Refresh, now).ok())
            .map(|claims| claims.jti);
        debug!(user_id = %user_id, removed, refresh_jti = ?refresh_jti, "session closed");

        self.record(history_entry(
            Some(user_id),
            device,
            None,
            SessionEvent::UserLogout,
        )?)
        .await;
        Ok(())
    }

    /// Existing sessions stay valid after a password change.
    pub async fn change_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AppError> {
        check_password_policy(new_password)?;
        let hash = self.hasher.hash(new_password)?;
        self.services
            .user()
            .set_password_hash(user_id, &hash)
            .await
            .map_err(|err| match err {
                AppError::NotFound(_) => AppError::not_found("User not found"),
                other => other,
            })?;
        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Decodes an access token and rejects it if it has been revoked. Refresh tokens
    /// never authenticate requests.
    pub async fn authenticate(&self, access: &str) -> Result<Claims, AppError> {
        let claims = self
            .codec
            .decode_as(access, TokenKind::Access, Utc::now())?;
        if self.is_revoked(&claims).await {
            return Err(AppError::unauthorized("Token is in blacklist"));
        }
        Ok(claims)
    }

    pub async fn verify_role(&self, access: &str, required: Role) -> Result<bool, AppError> {
        let claims = self.authenticate(access).await?;
        Ok(Role::at_least(&claims.role, required.as_str()))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        let user = self
            .services
            .user()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let role = self.services.role().primary_role(user_id).await?;
        Ok(UserProfile::from_model(&user, role))
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        page_size: u64,
        page_number: u64,
    ) -> Result<PaginatedResponse<HistoryEntry>, AppError> {
        self.services
            .sessions()
            .list_history(user_id, page_size, page_number)
            .await
    }

    async fn open_session(
        &self,
        user: &user::Model,
        device: &str,
        event: SessionEvent,
    ) -> Result<AuthOutcome, AppError> {
        let role = self.services.role().primary_role(user.id).await?;
        let issued = self.codec.issue(user.id, role.as_str(), Utc::now())?;

        self.services
            .sessions()
            .upsert_session(new_session(user.id, device, &issued.refresh_claims)?)
            .await?;
        self.record(history_entry(
            Some(user.id),
            device,
            Some(&issued.refresh_claims),
            event,
        )?)
        .await;

        info!(user_id = %user.id, device = %device, event = event.as_str(), "session opened");
        Ok(AuthOutcome {
            user: UserProfile::from_model(user, role),
            tokens: issued.pair(),
        })
    }

    async fn record(&self, entry: NewHistoryEntry) {
        let kind = entry.event_kind.clone();
        if let Err(err) = self.services.sessions().append_history(entry).await {
            error!(error = %err, event = %kind, "failed to append session history");
        }
    }

    async fn revoke_access(&self, access: &str, now: DateTime<Utc>) {
        let claims = match self.codec.decode_as(access, TokenKind::Access, now) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "access token not blacklisted");
                return;
            }
        };
        let Some(ttl) = remaining_lifetime(&claims, now) else {
            return;
        };

        let jti = claims.jti.to_string();
        let subject = claims.user_id.to_string();
        let write = self.cache.blacklist(&jti, &subject, ttl);
        match tokio::time::timeout(self.cache_timeout, write).await {
            Ok(Ok(())) => debug!(jti = %jti, ttl_secs = ttl.as_secs(), "access token blacklisted"),
            Ok(Err(err)) => warn!(error = %err, jti = %jti, "failed to blacklist access token"),
            Err(_) => warn!(jti = %jti, "revocation cache write timed out"),
        }
    }

    /// Cache trouble never locks users out.
    async fn is_revoked(&self, claims: &Claims) -> bool {
        let jti = claims.jti.to_string();
        match tokio::time::timeout(self.cache_timeout, self.cache.is_blacklisted(&jti)).await {
            Ok(Ok(revoked)) => revoked,
            Ok(Err(err)) => {
                warn!(error = %err, jti = %jti, "revocation cache read failed");
                false
            }
            Err(_) => {
                warn!(jti = %jti, "revocation cache read timed out");
                false
            }
        }
    }
}

fn claim_time(secs: i64) -> Result<DateTime<FixedOffset>, AppError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|at| at.fixed_offset())
        .ok_or_else(|| AppError::internal("Token timestamp out of range"))
}

fn new_session(user_id: Uuid, device: &str, refresh: &Claims) -> Result<NewSession, AppError> {
    Ok(NewSession {
        user_id,
        device_info: device.to_string(),
        refresh_token_id: refresh.jti,
        issued_at: claim_time(refresh.iat)?,
        expires_at: claim_time(refresh.exp)?,
    })
}

fn history_entry(
    user_id: Option<Uuid>,
    device: &str,
    refresh: Option<&Claims>,
    event: SessionEvent,
) -> Result<NewHistoryEntry, AppError> {
    Ok(NewHistoryEntry {
        user_id,
        device_info: device.to_string(),
        refresh_token_id: refresh.map(|claims| claims.jti),
        issued_at: refresh.map(|claims| claim_time(claims.iat)).transpose()?,
        expires_at: refresh.map(|claims| claim_time(claims.exp)).transpose()?,
        event_kind: event.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use jsonwebtoken::Algorithm;
    use sea_orm::{
        DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult, Transaction,
    };
    use uuid::Uuid;

    use super::{SessionManager, history_entry};
    use crate::{
        auth::{
            Role,
            jwt::TokenCodec,
            password::{CredentialHasher, MIN_PASSWORD_LEN},
        },
        cache::{CacheError, InMemoryRevocationCache, RevocationCache},
        db::entities::{role, user},
        error::AppError,
        services::{ServiceContext, SessionEvent},
    };

    struct PlainHasher;

    impl CredentialHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, AppError> {
            Ok(format!("plain:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
            Ok(hash == format!("plain:{password}"))
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl RevocationCache for BrokenCache {
        async fn blacklist(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn is_blacklisted(&self, _: &str) -> Result<bool, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(
            b"manager-secret",
            Algorithm::HS256,
            chrono::Duration::minutes(15),
            100,
        )
    }

    fn manager(db: MockDatabase, cache: Arc<dyn RevocationCache>) -> SessionManager {
        manager_on(&db.into_connection(), cache)
    }

    fn manager_on(conn: &DatabaseConnection, cache: Arc<dyn RevocationCache>) -> SessionManager {
        SessionManager::new(
            ServiceContext::new(conn, Duration::from_secs(5)),
            codec(),
            cache,
            Arc::new(PlainHasher),
            Duration::from_millis(200),
        )
    }

    fn idle_manager(cache: Arc<dyn RevocationCache>) -> SessionManager {
        manager(MockDatabase::new(DatabaseBackend::Postgres), cache)
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn history_write_failure() -> DbErr {
        DbErr::Custom("session_history is locked".to_string())
    }

    fn statements(log: &[Transaction]) -> Vec<String> {
        log.iter().map(|txn| format!("{txn:?}")).collect()
    }

    fn stored_user(id: Uuid, login: &str, password: &str) -> user::Model {
        let at = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
            .fixed_offset();
        user::Model {
            id,
            login: login.to_string(),
            password_hash: format!("plain:{password}"),
            first_name: None,
            last_name: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn signup_rejects_short_credentials_before_touching_storage() {
        let manager = idle_manager(Arc::new(InMemoryRevocationCache::new()));

        let short_login = manager
            .signup(" ab ", "password123", None, None)
            .await
            .expect_err("short login should fail");
        let short_password = manager
            .signup("alice", &"x".repeat(MIN_PASSWORD_LEN - 1), None, None)
            .await
            .expect_err("short password should fail");

        assert!(matches!(short_login, AppError::ValidationFailed(_)));
        assert_eq!(
            short_password,
            AppError::validation("Password length must be 8 or more characters")
        );
    }

    #[tokio::test]
    async fn login_with_unknown_user_is_generic_unauthorized() {
        let manager = manager(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
            Arc::new(InMemoryRevocationCache::new()),
        );

        let err = manager
            .login("ghost", "password123", "firefox")
            .await
            .expect_err("login should fail");

        assert_eq!(err, AppError::unauthorized("Invalid login or password"));
    }

    #[tokio::test]
    async fn blacklisted_access_token_is_rejected() {
        let cache = Arc::new(InMemoryRevocationCache::new());
        let manager = idle_manager(cache.clone());
        let issued = manager
            .codec()
            .issue(Uuid::new_v4(), "admin", Utc::now())
            .expect("issue should succeed");

        assert!(
            manager
                .verify_role(&issued.access, Role::Admin)
                .await
                .expect("fresh token should verify")
        );

        cache
            .blacklist(
                &issued.access_claims.jti.to_string(),
                &issued.access_claims.user_id.to_string(),
                Duration::from_secs(60),
            )
            .await
            .expect("blacklist should succeed");

        let err = manager
            .authenticate(&issued.access)
            .await
            .expect_err("revoked token should fail");
        assert_eq!(err, AppError::unauthorized("Token is in blacklist"));
        assert!(manager.verify_role(&issued.access, Role::User).await.is_err());
    }

    #[tokio::test]
    async fn verify_role_compares_priorities() {
        let manager = idle_manager(Arc::new(InMemoryRevocationCache::new()));
        let issued = manager
            .codec()
            .issue(Uuid::new_v4(), "subscriber", Utc::now())
            .expect("issue should succeed");

        assert!(manager.verify_role(&issued.access, Role::User).await.expect("verify"));
        assert!(
            !manager
                .verify_role(&issued.access, Role::Admin)
                .await
                .expect("verify")
        );
    }

    #[tokio::test]
    async fn cache_outage_does_not_reject_tokens() {
        let manager = idle_manager(Arc::new(BrokenCache));
        let issued = manager
            .codec()
            .issue(Uuid::new_v4(), "user", Utc::now())
            .expect("issue should succeed");

        let claims = manager
            .authenticate(&issued.access)
            .await
            .expect("authenticate should succeed");

        assert_eq!(claims.jti, issued.access_claims.jti);
    }

    #[tokio::test]
    async fn logout_survives_a_cache_outage() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let manager = manager_on(&conn, Arc::new(BrokenCache));
        let user_id = Uuid::new_v4();
        let issued = manager
            .codec()
            .issue(user_id, "user", Utc::now())
            .expect("issue should succeed");

        manager
            .logout(user_id, "firefox", &issued.access, Some(&issued.refresh))
            .await
            .expect("logout should succeed without the cache");

        let log = statements(&conn.into_transaction_log());
        assert_eq!(log.len(), 2);
        assert!(log[0].contains("DELETE FROM"), "{}", log[0]);
        assert!(log[1].contains("USER_LOGOUT"), "{}", log[1]);
    }

    #[tokio::test]
    async fn logout_completes_when_history_cannot_be_written() {
        let cache = Arc::new(InMemoryRevocationCache::new());
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .append_exec_errors([history_write_failure()])
            .into_connection();
        let manager = manager_on(&conn, cache.clone());
        let user_id = Uuid::new_v4();
        let issued = manager
            .codec()
            .issue(user_id, "user", Utc::now())
            .expect("issue should succeed");

        manager
            .logout(user_id, "firefox", &issued.access, None)
            .await
            .expect("logout should succeed");

        assert!(
            cache
                .is_blacklisted(&issued.access_claims.jti.to_string())
                .await
                .expect("in-memory cache never fails")
        );
        let log = statements(&conn.into_transaction_log());
        assert!(log[0].contains("DELETE FROM"), "{}", log[0]);
    }

    #[tokio::test]
    async fn login_completes_when_history_cannot_be_written() {
        let user_id = Uuid::new_v4();
        let manager = manager(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![stored_user(user_id, "alice", "password123")]])
                .append_query_results([Vec::<role::Model>::new()])
                .append_exec_results([exec(0), exec(1)])
                .append_exec_errors([history_write_failure()]),
            Arc::new(InMemoryRevocationCache::new()),
        );

        let outcome = manager
            .login("alice", "password123", "firefox")
            .await
            .expect("login should succeed");

        assert_eq!(outcome.user.id, user_id);
        assert_eq!(outcome.user.role, Role::User);
        let claims = manager
            .authenticate(&outcome.tokens.access_token)
            .await
            .expect("issued access token should authenticate");
        assert_eq!(claims.user_id, user_id);
    }

    #[tokio::test]
    async fn refresh_token_of_another_user_is_rejected() {
        let manager = idle_manager(Arc::new(InMemoryRevocationCache::new()));
        let issued = manager
            .codec()
            .issue(Uuid::new_v4(), "user", Utc::now())
            .expect("issue should succeed");

        let err = manager
            .refresh(Uuid::new_v4(), "firefox", None, &issued.refresh)
            .await
            .expect_err("refresh should fail");

        assert_eq!(err, AppError::unauthorized("Refresh token is invalid"));
    }

    #[tokio::test]
    async fn empty_new_password_is_rejected() {
        let manager = idle_manager(Arc::new(InMemoryRevocationCache::new()));

        let err = manager
            .change_password(Uuid::new_v4(), "")
            .await
            .expect_err("empty password should fail");

        assert_eq!(err, AppError::validation("New password is empty"));
    }

    #[test]
    fn logout_history_has_no_token_fields() {
        let entry = history_entry(Some(Uuid::new_v4()), "firefox", None, SessionEvent::UserLogout)
            .expect("entry should build");

        assert_eq!(entry.event_kind, "USER_LOGOUT");
        assert!(entry.refresh_token_id.is_none());
        assert!(entry.issued_at.is_none());
        assert!(entry.expires_at.is_none());
    }
}
