//! Scenario tests for the identity crate
//!
//! Flows run against the in-memory store, a recording notifier and a static
//! federation verifier. HTTP-level tests drive the real router.

mod support {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::application::config::IdentityConfig;
    use crate::domain::entity::user::User;
    use crate::domain::federation::{FederatedIdentity, IdentityVerifier};
    use crate::domain::repository::UserRepository;
    use crate::domain::value_object::{
        email::Email,
        user_name::UserName,
        user_password::{RawPassword, UserPassword},
        user_role::UserRole,
        user_status::UserStatus,
    };
    use crate::error::{IdentityError, IdentityResult};
    use crate::infra::mailer::RecordingNotifier;
    use crate::infra::memory::InMemoryIdentityStore;
    use crate::presentation::{IdentityAppState, identity_router};

    pub const PASSWORD: &str = "Sup3r-secret-pass";
    pub const GOOGLE_TOKEN: &str = "valid-google-token";
    pub const GOOGLE_EMAIL: &str = "gina@gmail.com";

    /// Accepts exactly one assertion
    pub struct StaticVerifier;

    impl IdentityVerifier for StaticVerifier {
        async fn verify(&self, assertion: &str) -> IdentityResult<FederatedIdentity> {
            match assertion {
                GOOGLE_TOKEN => Ok(FederatedIdentity {
                    subject: "google-sub-1".into(),
                    email: GOOGLE_EMAIL.into(),
                    email_verified: true,
                    given_name: Some("Gina".into()),
                    family_name: Some("Grey".into()),
                    picture: Some("https://lh3.googleusercontent.com/gina.png".into()),
                }),
                "unverified-google-token" => Ok(FederatedIdentity {
                    subject: "google-sub-2".into(),
                    email: "nobody@gmail.com".into(),
                    email_verified: false,
                    given_name: None,
                    family_name: None,
                    picture: None,
                }),
                _ => Err(IdentityError::FederationRejected("bad signature".into())),
            }
        }
    }

    pub struct Harness {
        pub store: InMemoryIdentityStore,
        pub notifier: Arc<RecordingNotifier>,
        pub state: IdentityAppState<InMemoryIdentityStore, StaticVerifier>,
        pub app: Router,
    }

    impl Harness {
        pub fn new() -> Self {
            let store = InMemoryIdentityStore::new();
            let notifier = Arc::new(RecordingNotifier::default());
            let config = IdentityConfig {
                client_url: "http://client.test".into(),
                ..IdentityConfig::development()
            };
            let state = IdentityAppState::new(store.clone(), StaticVerifier, notifier.clone(), config);
            let app = identity_router(state.clone());
            Self {
                store,
                notifier,
                state,
                app,
            }
        }

        pub async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let headers = res.headers().clone();
            let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, headers, body)
        }

        pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, HeaderMap, Value) {
            self.send(json_request("POST", uri, &body, None)).await
        }

        pub async fn register(&self, email: &str) -> StatusCode {
            let (status, _, _) = self
                .post(
                    "/api/auth/register",
                    serde_json::json!({
                        "firstName": "Test",
                        "lastName": "User",
                        "email": email,
                        "password": PASSWORD,
                    }),
                )
                .await;
            status
        }

        pub async fn register_and_verify(&self, email: &str) {
            assert_eq!(self.register(email).await, StatusCode::CREATED);
            let secret = self.notifier.last_secret(email, "verify-email").unwrap();
            let (status, _, _) = self
                .send(empty_request("GET", &format!("/api/auth/verify-email/{secret}")))
                .await;
            assert_eq!(status, StatusCode::OK);
        }

        /// Returns (access token, refresh cookie pair "refreshToken=...")
        pub async fn login(&self, email: &str, password: &str) -> (String, String) {
            let (status, headers, body) = self
                .post(
                    "/api/auth/login",
                    serde_json::json!({ "email": email, "password": password }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "login failed: {body}");
            let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
            let pair = set_cookie.split(';').next().unwrap().to_string();
            (body["accessToken"].as_str().unwrap().to_string(), pair)
        }

        /// Insert a verified account directly, bypassing registration.
        pub async fn seed_user(&self, email: &str, user_name: &str, role: UserRole) -> User {
            let raw = RawPassword::new(PASSWORD.to_string()).unwrap();
            let mut user = User::register(
                "Seed".into(),
                "User".into(),
                UserName::new(user_name).unwrap(),
                Email::new(email).unwrap(),
                UserPassword::from_raw(&raw, None).unwrap(),
            );
            user.user_role = role;
            user.user_status = UserStatus::Verified;
            self.store.create(&user).await.unwrap();
            user
        }
    }

    pub fn json_request(method: &str, uri: &str, body: &Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }
}

mod flow_tests {
    use std::sync::Arc;

    use super::support::*;
    use crate::application::{
        EphemeralTokenService, LoginInput, LoginUseCase, RegisterInput, RegisterUseCase,
        VerificationOutcome, VerifyEmailUseCase,
    };
    use crate::domain::repository::UserRepository;
    use crate::domain::value_object::{
        email::Email, token_purpose::TokenPurpose, user_status::UserStatus,
    };
    use crate::error::IdentityError;

    fn register_input(email: &str, user_name: Option<&str>) -> RegisterInput {
        RegisterInput {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: PASSWORD.into(),
            user_name: user_name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_keeps_single_record() {
        let h = Harness::new();
        let use_case = RegisterUseCase::new(h.state.repo.clone(), h.notifier.clone(), h.state.config.clone());

        let first = use_case
            .execute(register_input("ada@example.com", Some("ada")))
            .await
            .unwrap();
        let second = use_case
            .execute(register_input("  ADA@example.com ", Some("ada_two")))
            .await;
        assert!(matches!(second, Err(IdentityError::DuplicateEmail)));

        let stored = h
            .store
            .find_by_email(&Email::new("ada@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, first.user_id);
        assert_eq!(stored.user_name.as_str(), "ada");
        // Only the successful registration mailed a link
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_reported() {
        let h = Harness::new();
        let use_case = RegisterUseCase::new(h.state.repo.clone(), h.notifier.clone(), h.state.config.clone());

        use_case
            .execute(register_input("a@example.com", Some("taken")))
            .await
            .unwrap();
        let result = use_case
            .execute(register_input("b@example.com", Some("TAKEN")))
            .await;
        assert!(matches!(result, Err(IdentityError::DuplicateUsername)));
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_token() {
        let h = Harness::new();
        let user = h.seed_user("t@example.com", "tokens", Default::default()).await;
        let tokens = EphemeralTokenService::new(h.state.repo.clone(), h.state.config.clone());

        let first = tokens
            .issue_for(&user.user_id, TokenPurpose::PasswordReset)
            .await
            .unwrap();
        let second = tokens
            .issue_for(&user.user_id, TokenPurpose::PasswordReset)
            .await
            .unwrap();
        assert_eq!(second.secret.len(), 64);
        assert_ne!(first.secret, second.secret);

        assert!(matches!(
            tokens.consume(&first.secret, TokenPurpose::PasswordReset).await,
            Err(IdentityError::TokenInvalidOrExpired)
        ));
        // Wrong purpose does not burn it
        assert!(tokens
            .consume(&second.secret, TokenPurpose::EmailVerification)
            .await
            .is_err());
        let consumed = tokens
            .consume(&second.secret, TokenPurpose::PasswordReset)
            .await
            .unwrap();
        assert_eq!(consumed.user_id, user.user_id);
        assert_eq!(h.store.token_count().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_secrets_are_rejected() {
        let h = Harness::new();
        let tokens = EphemeralTokenService::new(h.state.repo.clone(), h.state.config.clone());
        for secret in ["", "abc", &"z".repeat(64), &"a".repeat(65)] {
            assert!(matches!(
                tokens.consume(secret, TokenPurpose::EmailVerification).await,
                Err(IdentityError::TokenInvalidOrExpired)
            ));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verification_succeeds_once() {
        let h = Harness::new();
        assert_eq!(h.register("race@example.com").await, axum::http::StatusCode::CREATED);
        let secret = h.notifier.last_secret("race@example.com", "verify-email").unwrap();

        let use_case = Arc::new(VerifyEmailUseCase::new(h.state.repo.clone(), h.state.config.clone()));
        let (a, b) = {
            let (u1, s1) = (use_case.clone(), secret.clone());
            let (u2, s2) = (use_case.clone(), secret.clone());
            tokio::join!(
                tokio::spawn(async move { u1.execute(&s1).await }),
                tokio::spawn(async move { u2.execute(&s2).await }),
            )
        };
        let results = [a.unwrap(), b.unwrap()];

        let wins = results
            .iter()
            .filter(|r| matches!(r, Ok(VerificationOutcome::Verified)))
            .count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Err(IdentityError::TokenInvalidOrExpired)))
            .count();
        assert_eq!((wins, losses), (1, 1));

        let user = h
            .store
            .find_by_email(&Email::new("race@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_status, UserStatus::Verified);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let h = Harness::new();
        h.seed_user("known@example.com", "known", Default::default()).await;
        let login = LoginUseCase::new(h.state.repo.clone(), h.state.issuer.clone(), h.state.config.clone());

        let unknown = login
            .execute(LoginInput {
                email: "ghost@example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap_err();
        let wrong = login
            .execute(LoginInput {
                email: "known@example.com".into(),
                password: "not-the-password".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(unknown, IdentityError::InvalidCredential));
        assert!(matches!(wrong, IdentityError::InvalidCredential));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.code(), wrong.code());
    }
}

mod http_tests {
    use axum::http::{StatusCode, header};
    use serde_json::json;

    use super::support::*;
    use crate::application::token_issuer::TokenClass;
    use crate::domain::repository::UserRepository;
    use crate::domain::value_object::{
        email::Email, user_role::UserRole, user_status::UserStatus,
    };

    #[tokio::test]
    async fn test_register_verify_then_reuse_fails() {
        let h = Harness::new();
        assert_eq!(h.register("e2e@example.com").await, StatusCode::CREATED);
        assert_eq!(h.store.token_count().await, 1);

        let secret = h.notifier.last_secret("e2e@example.com", "verify-email").unwrap();
        let uri = format!("/api/auth/verify-email/{secret}");

        let (status, _, body) = h.send(empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(h.store.token_count().await, 0);

        let user = h
            .store
            .find_by_email(&Email::new("e2e@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_status, UserStatus::Verified);

        let (status, _, body) = h.send(empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TOKEN_INVALID_OR_EXPIRED");
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let h = Harness::new();

        let (status, _, body) = h
            .post("/api/auth/register", json!({ "email": "x@example.com" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        // Body that is not JSON at all goes through the same error shape
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, headers, body) = h.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(headers[header::CONTENT_TYPE], "application/problem+json");
    }

    #[tokio::test]
    async fn test_unverified_login_is_refused_after_password_check() {
        let h = Harness::new();
        assert_eq!(h.register("pending@example.com").await, StatusCode::CREATED);

        let (status, headers, body) = h
            .post(
                "/api/auth/login",
                json!({ "email": "pending@example.com", "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_NOT_VERIFIED");
        assert!(body["action"].is_string());
        assert!(headers.get(header::SET_COOKIE).is_none());

        // Wrong password on the same account never reveals the status
        let (status, _, body) = h
            .post(
                "/api/auth/login",
                json!({ "email": "pending@example.com", "password": "wrong-password" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_CREDENTIAL");
    }

    #[tokio::test]
    async fn test_invalid_credential_responses_are_identical() {
        let h = Harness::new();
        h.register_and_verify("real@example.com").await;

        let unknown = h
            .post(
                "/api/auth/login",
                json!({ "email": "ghost@example.com", "password": PASSWORD }),
            )
            .await;
        let wrong = h
            .post(
                "/api/auth/login",
                json!({ "email": "real@example.com", "password": "wrong-password" }),
            )
            .await;

        assert_eq!(unknown.0, StatusCode::BAD_REQUEST);
        assert_eq!(unknown.0, wrong.0);
        assert_eq!(unknown.2, wrong.2);
    }

    #[tokio::test]
    async fn test_login_sets_refresh_cookie_and_hides_secrets() {
        let h = Harness::new();
        h.register_and_verify("cookie@example.com").await;

        let (status, headers, body) = h
            .post(
                "/api/auth/login",
                json!({ "email": "cookie@example.com", "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["accessToken"].is_string());
        assert_eq!(body["user"]["email"], "cookie@example.com");
        assert!(body.get("refreshToken").is_none());
        assert!(body["user"].get("passwordHash").is_none());

        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("refreshToken="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains(&format!("Max-Age={}", 7 * 24 * 3600)));
    }

    #[tokio::test]
    async fn test_refresh_token_flow() {
        let h = Harness::new();
        h.register_and_verify("refresh@example.com").await;
        let (access, cookie) = h.login("refresh@example.com", PASSWORD).await;

        let mut req = empty_request("POST", "/api/auth/refresh-token");
        req.headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let (status, _, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK);
        let refreshed = body["accessToken"].as_str().unwrap();
        let claims = h.state.issuer.verify(refreshed, TokenClass::Access).unwrap();
        let original = h.state.issuer.verify(&access, TokenClass::Access).unwrap();
        assert_eq!(claims.sub, original.sub);

        // No cookie
        let (status, _, _) = h.send(empty_request("POST", "/api/auth/refresh-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // An access token is not a refresh token
        let mut req = empty_request("POST", "/api/auth/refresh-token");
        req.headers_mut().insert(
            header::COOKIE,
            format!("refreshToken={access}").parse().unwrap(),
        );
        let (status, _, _) = h.send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let h = Harness::new();
        let (status, headers, _) = h.send(empty_request("POST", "/api/auth/logout")).await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("refreshToken=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let h = Harness::new();
        let admin = h.seed_user("admin@example.com", "boss", UserRole::Admin).await;
        let student = h.seed_user("student@example.com", "pupil", UserRole::Student).await;
        let uri = format!("/api/admin/users/{}/status", student.user_id);
        let body = json!({ "status": "banned" });

        // No token
        let (status, _, _) = h.send(json_request("PUT", &uri, &body, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Garbage token
        let (status, _, _) = h.send(json_request("PUT", &uri, &body, Some("x.y.z"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let student_token = h
            .state
            .issuer
            .mint(&student.user_id, student.user_role, TokenClass::Access)
            .unwrap();
        let (status, _, body_json) = h
            .send(json_request("PUT", &uri, &body, Some(&student_token.token)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body_json["code"], "FORBIDDEN");

        let admin_token = h
            .state
            .issuer
            .mint(&admin.user_id, admin.user_role, TokenClass::Access)
            .unwrap();
        let (status, _, body_json) = h
            .send(json_request("PUT", &uri, &body, Some(&admin_token.token)))
            .await;
        assert_eq!(status, StatusCode::OK, "{body_json}");
        assert_eq!(body_json["user"]["status"], "banned");

        // The ban takes effect at login
        let (status, _, body_json) = h
            .post(
                "/api/auth/login",
                json!({ "email": "student@example.com", "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body_json["code"], "ACCOUNT_BANNED");
    }

    #[tokio::test]
    async fn test_gate_rejects_deleted_principal_and_refresh_class() {
        let h = Harness::new();
        let ghost = crate::domain::value_object::user_id::UserId::new();
        let access = h
            .state
            .issuer
            .mint(&ghost, UserRole::Admin, TokenClass::Access)
            .unwrap();
        let (status, _, _) = h
            .send(json_request("GET", "/api/profile", &json!({}), Some(&access.token)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = h.seed_user("p@example.com", "profiled", UserRole::Student).await;
        let refresh = h
            .state
            .issuer
            .mint(&user.user_id, user.user_role, TokenClass::Refresh)
            .unwrap();
        let (status, _, _) = h
            .send(json_request("GET", "/api/profile", &json!({}), Some(&refresh.token)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_forgot_password_is_enumeration_safe_and_reset_works() {
        let h = Harness::new();
        h.register_and_verify("forgetful@example.com").await;
        let mails_before = h.notifier.sent().len();

        let unknown = h
            .post("/api/auth/forgot-password", json!({ "email": "ghost@example.com" }))
            .await;
        let known = h
            .post("/api/auth/forgot-password", json!({ "email": "forgetful@example.com" }))
            .await;
        assert_eq!(unknown.0, StatusCode::OK);
        assert_eq!((unknown.0, &unknown.2), (known.0, &known.2));
        assert_eq!(h.notifier.sent().len(), mails_before + 1);

        let secret = h
            .notifier
            .last_secret("forgetful@example.com", "reset-password")
            .unwrap();
        let uri = format!("/api/auth/reset-password/{secret}");

        // A rejected password leaves the link usable
        let (status, _, body) = h.post(&uri, json!({ "newPassword": "short" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _, _) = h.post(&uri, json!({ "newPassword": "Brand-new-pass-9" })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, body) = h.post(&uri, json!({ "newPassword": "Another-pass-10" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TOKEN_INVALID_OR_EXPIRED");

        h.login("forgetful@example.com", "Brand-new-pass-9").await;
    }

    #[tokio::test]
    async fn test_resend_verification_only_for_unverified() {
        let h = Harness::new();
        assert_eq!(h.register("slow@example.com").await, StatusCode::CREATED);
        let first = h.notifier.last_secret("slow@example.com", "verify-email").unwrap();

        let (status, _, resent) = h
            .post("/api/auth/resend-verification", json!({ "email": "slow@example.com" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        let second = h.notifier.last_secret("slow@example.com", "verify-email").unwrap();
        assert_ne!(first, second);

        // The first link died with the resend
        let (status, _, _) = h
            .send(empty_request("GET", &format!("/api/auth/verify-email/{first}")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _, _) = h
            .send(empty_request("GET", &format!("/api/auth/verify-email/{second}")))
            .await;
        assert_eq!(status, StatusCode::OK);

        // Verified and unknown addresses get the same answer and no mail
        let mails = h.notifier.sent().len();
        let (_, _, verified) = h
            .post("/api/auth/resend-verification", json!({ "email": "slow@example.com" }))
            .await;
        let (_, _, unknown) = h
            .post("/api/auth/resend-verification", json!({ "email": "who@example.com" }))
            .await;
        assert_eq!(verified, resent);
        assert_eq!(unknown, resent);
        assert_eq!(h.notifier.sent().len(), mails);
    }

    #[tokio::test]
    async fn test_google_login_provisions_then_reuses_account() {
        let h = Harness::new();

        let (status, headers, body) = h
            .post("/api/auth/google", json!({ "tokenId": GOOGLE_TOKEN }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(headers.get(header::SET_COOKIE).is_some());
        let user = &body["user"];
        assert_eq!(user["email"], GOOGLE_EMAIL);
        assert_eq!(user["status"], "verified");
        assert_eq!(user["role"], "student");
        assert_eq!(user["hasPassword"], false);
        assert!(user["userName"].as_str().unwrap().starts_with("gina_"));
        let first_id = user["id"].clone();

        let (_, _, again) = h
            .post("/api/auth/google", json!({ "tokenId": GOOGLE_TOKEN }))
            .await;
        assert_eq!(again["user"]["id"], first_id);

        // Password login is not available until a password is set
        let (status, _, body) = h
            .post(
                "/api/auth/login",
                json!({ "email": GOOGLE_EMAIL, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "USE_FEDERATED_LOGIN");

        let access = again["accessToken"].as_str().unwrap();
        let (status, _, _) = h
            .send(json_request(
                "POST",
                "/api/user/set-password",
                &json!({ "newPassword": PASSWORD }),
                Some(access),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = h
            .send(json_request(
                "POST",
                "/api/user/set-password",
                &json!({ "newPassword": PASSWORD }),
                Some(access),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        h.login(GOOGLE_EMAIL, PASSWORD).await;
    }

    #[tokio::test]
    async fn test_google_login_never_overwrites_existing_account() {
        let h = Harness::new();
        let existing = h.seed_user(GOOGLE_EMAIL, "gina", UserRole::Admin).await;

        let (status, _, body) = h
            .post("/api/auth/google", json!({ "tokenId": GOOGLE_TOKEN }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], existing.user_id.to_string());
        assert_eq!(body["user"]["role"], "admin");
        assert_eq!(body["user"]["hasPassword"], true);
        assert_eq!(body["user"]["userName"], "gina");
    }

    #[tokio::test]
    async fn test_google_login_rejections() {
        let h = Harness::new();

        let (status, _, body) = h
            .post("/api/auth/google", json!({ "tokenId": "forged" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "FEDERATION_REJECTED");

        let (status, _, body) = h
            .post("/api/auth/google", json!({ "tokenId": "unverified-google-token" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "FEDERATION_REJECTED");

        let (status, _, body) = h.post("/api/auth/google", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_profile_read_and_update() {
        let h = Harness::new();
        h.seed_user("other@example.com", "taken_name", UserRole::Student).await;
        let me = h.seed_user("me@example.com", "me_myself", UserRole::Student).await;
        let token = h
            .state
            .issuer
            .mint(&me.user_id, me.user_role, TokenClass::Access)
            .unwrap();

        let (status, _, body) = h
            .send(json_request("GET", "/api/profile", &json!({}), Some(&token.token)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userName"], "me_myself");

        let (status, _, body) = h
            .send(json_request(
                "PUT",
                "/api/profile",
                &json!({ "biography": "  Writes Rust  ", "firstName": "Mia" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["biography"], "Writes Rust");
        assert_eq!(body["user"]["firstName"], "Mia");
        assert_eq!(body["user"]["lastName"], "User");

        let (status, _, body) = h
            .send(json_request(
                "PUT",
                "/api/profile",
                &json!({ "userName": "Taken_Name" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DUPLICATE_USERNAME");

        let (status, _, _) = h
            .send(json_request("PUT", "/api/profile", &json!({}), Some(&token.token)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = Harness::new();
        h.register_and_verify("changer@example.com").await;
        let (access, _) = h.login("changer@example.com", PASSWORD).await;

        let (status, _, body) = h
            .send(json_request(
                "PUT",
                "/api/user/change-password",
                &json!({ "currentPassword": "wrong-password", "newPassword": "Next-pass-123x" }),
                Some(&access),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_CREDENTIAL");

        let (status, _, _) = h
            .send(json_request(
                "PUT",
                "/api/user/change-password",
                &json!({ "currentPassword": PASSWORD, "newPassword": "Next-pass-123x" }),
                Some(&access),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        h.login("changer@example.com", "Next-pass-123x").await;
    }

    #[tokio::test]
    async fn test_admin_cannot_change_own_status() {
        let h = Harness::new();
        let admin = h.seed_user("root@example.com", "chief", UserRole::Admin).await;
        let token = h
            .state
            .issuer
            .mint(&admin.user_id, admin.user_role, TokenClass::Access)
            .unwrap();

        let (status, _, _) = h
            .send(json_request(
                "PUT",
                &format!("/api/admin/users/{}/status", admin.user_id),
                &json!({ "status": "banned" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = h
            .send(json_request(
                "PUT",
                "/api/admin/users/not-a-uuid/status",
                &json!({ "status": "verified" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = h
            .send(json_request(
                "PUT",
                &format!(
                    "/api/admin/users/{}/status",
                    crate::domain::value_object::user_id::UserId::new()
                ),
                &json!({ "status": "verified" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_admin_cannot_send_account_back_to_unverified() {
        let h = Harness::new();
        let admin = h.seed_user("head@example.com", "headmaster", UserRole::Admin).await;
        let student = h.seed_user("kept@example.com", "kept_verified", UserRole::Student).await;
        let token = h
            .state
            .issuer
            .mint(&admin.user_id, admin.user_role, TokenClass::Access)
            .unwrap();
        let uri = format!("/api/admin/users/{}/status", student.user_id);

        let (status, _, body) = h
            .send(json_request("PUT", &uri, &json!({ "status": "unverified" }), Some(&token.token)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        // A ban cannot be lifted into unverified either
        let (status, _, _) = h
            .send(json_request("PUT", &uri, &json!({ "status": "banned" }), Some(&token.token)))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = h
            .send(json_request("PUT", &uri, &json!({ "status": "unverified" }), Some(&token.token)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored = h.store.find_by_id(&student.user_id).await.unwrap().unwrap();
        assert_eq!(stored.user_status, UserStatus::Banned);
    }

    #[tokio::test]
    async fn test_email_change_requires_reverification() {
        let h = Harness::new();
        let owner = h.seed_user("owner@example.com", "mover", UserRole::Student).await;
        let token = h
            .state
            .issuer
            .mint(&owner.user_id, owner.user_role, TokenClass::Access)
            .unwrap();

        // Same address in another case is not a change
        let (status, _, body) = h
            .send(json_request(
                "PUT",
                "/api/profile",
                &json!({ "email": "Owner@Example.com" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["status"], "verified");
        assert!(h.notifier.sent().is_empty());

        let (status, _, body) = h
            .send(json_request(
                "PUT",
                "/api/profile",
                &json!({ "email": GOOGLE_EMAIL }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["email"], GOOGLE_EMAIL);
        assert_eq!(body["user"]["status"], "unverified");
        assert!(h.notifier.last_secret(GOOGLE_EMAIL, "verify-email").is_some());
        assert_eq!(h.store.token_count().await, 1);

        // The address owner's Google sign-in does not land in this account
        let (status, _, body) = h
            .post("/api/auth/google", json!({ "tokenId": GOOGLE_TOKEN }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_NOT_VERIFIED");

        let (status, _, body) = h
            .post(
                "/api/auth/login",
                json!({ "email": GOOGLE_EMAIL, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_NOT_VERIFIED");

        let stored = h
            .store
            .find_by_email(&Email::new(GOOGLE_EMAIL).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, owner.user_id);
        assert_eq!(stored.user_status, UserStatus::Unverified);
    }

    #[tokio::test]
    async fn test_verify_link_on_already_verified_account() {
        let h = Harness::new();
        let admin = h.seed_user("dean@example.com", "dean", UserRole::Admin).await;
        assert_eq!(h.register("late@example.com").await, StatusCode::CREATED);
        let secret = h.notifier.last_secret("late@example.com", "verify-email").unwrap();
        let user = h
            .store
            .find_by_email(&Email::new("late@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();

        let token = h
            .state
            .issuer
            .mint(&admin.user_id, admin.user_role, TokenClass::Access)
            .unwrap();
        let (status, _, _) = h
            .send(json_request(
                "PUT",
                &format!("/api/admin/users/{}/status", user.user_id),
                &json!({ "status": "verified" }),
                Some(&token.token),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.store.token_count().await, 1);

        let (status, _, body) = h
            .send(empty_request("GET", &format!("/api/auth/verify-email/{secret}")))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "This account has already been verified.");
        assert_eq!(h.store.token_count().await, 0);
    }
}
