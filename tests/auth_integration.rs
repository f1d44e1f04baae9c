use mockito::{Matcher, Server, ServerGuard};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tui_achievement_tracker::api::SteamClient;
use tui_achievement_tracker::auth::{
    AuthError, CallbackParams, CallbackServer, SessionStore, SteamAuth, current_steam_id,
};
use tui_achievement_tracker::config::AuthConfig;

const STEAM_ID: &str = "76561197960287930";

const SESSION_BODY: &str = r#"{
    "access_token": "jwt-token",
    "token_type": "bearer",
    "expires_in": 3600,
    "expires_at": 1700003600,
    "refresh_token": "refresh",
    "user": {
        "id": "11111111-2222-3333-4444-555555555555",
        "email": "steam_76561197960287930@steam.local",
        "user_metadata": {"steam_id": "76561197960287930", "username": "Rabscuttle", "provider": "steam"}
    }
}"#;

const INVALID_CREDENTIALS: &str =
    r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#;

fn store_path(test: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("auth-it-{}-{}", test, std::process::id()))
        .join("session.json")
}

fn auth_for(server: &ServerGuard, store: SessionStore) -> SteamAuth {
    let config = AuthConfig {
        supabase_url: server.url(),
        supabase_anon_key: "anon".to_string(),
        openid_endpoint: format!("{}/openid/login", server.url()),
        ..Default::default()
    };
    SteamAuth::from_config(&config, reqwest::Client::new(), store).unwrap()
}

fn callback_params() -> CallbackParams {
    [
        ("openid.ns", "http://specs.openid.net/auth/2.0"),
        ("openid.mode", "id_res"),
        (
            "openid.claimed_id",
            "https://steamcommunity.com/openid/id/76561197960287930",
        ),
        (
            "openid.identity",
            "https://steamcommunity.com/openid/id/76561197960287930",
        ),
        ("openid.sig", "c2lnbmF0dXJl"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

async fn mock_openid(server: &mut ServerGuard, valid: bool) -> mockito::Mock {
    server
        .mock("POST", "/openid/login")
        .match_body(Matcher::UrlEncoded(
            "openid.mode".into(),
            "check_authentication".into(),
        ))
        .with_status(200)
        .with_body(format!(
            "ns:http://specs.openid.net/auth/2.0\nis_valid:{}\n",
            valid
        ))
        .create_async()
        .await
}

async fn mock_profile(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/ISteamUser/GetPlayerSummaries/v0002/")
        .match_query(Matcher::UrlEncoded("steamids".into(), STEAM_ID.into()))
        .with_status(200)
        .with_body(format!(
            r#"{{"response": {{"players": [{{"steamid": "{}", "personaname": "Rabscuttle",
                "profileurl": "https://steamcommunity.com/id/gabelogannewell/",
                "avatarfull": "https://avatars.steamstatic.com/abc_full.jpg", "personastate": 0}}]}}}}"#,
            STEAM_ID
        ))
        .create_async()
        .await
}

#[tokio::test]
async fn test_callback_signs_in_existing_user() {
    let mut server = Server::new_async().await;
    let openid = mock_openid(&mut server, true).await;
    let _profile = mock_profile(&mut server).await;
    let token = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .match_body(Matcher::PartialJson(serde_json::json!({
            "email": "steam_76561197960287930@steam.local"
        })))
        .with_status(200)
        .with_body(SESSION_BODY)
        .expect(1)
        .create_async()
        .await;
    let signup = server
        .mock("POST", "/auth/v1/signup")
        .expect(0)
        .create_async()
        .await;

    let path = store_path("existing");
    let auth = auth_for(&server, SessionStore::new(path.clone()));
    let steam = SteamClient::with_base_url(server.url(), "TESTKEY");

    let (profile, session) = auth
        .handle_steam_callback(&callback_params(), &steam)
        .await
        .unwrap();

    openid.assert_async().await;
    token.assert_async().await;
    signup.assert_async().await;
    assert_eq!(profile.username, "Rabscuttle");
    assert_eq!(session.access_token, "jwt-token");
    assert_eq!(current_steam_id(&session).map(|id| id.to_string()).as_deref(), Some(STEAM_ID));

    // The session was persisted
    let stored = SessionStore::new(path.clone()).load().unwrap();
    assert_eq!(stored, Some(session));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_first_sign_in_creates_user_with_metadata() {
    let mut server = Server::new_async().await;
    let _openid = mock_openid(&mut server, true).await;
    let _profile = mock_profile(&mut server).await;
    let _token = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(INVALID_CREDENTIALS)
        .create_async()
        .await;
    let signup = server
        .mock("POST", "/auth/v1/signup")
        .match_header("apikey", "anon")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "email": "steam_76561197960287930@steam.local",
            "data": {
                "steam_id": STEAM_ID,
                "username": "Rabscuttle",
                "provider": "steam"
            }
        })))
        .with_status(200)
        .with_body(SESSION_BODY)
        .expect(1)
        .create_async()
        .await;

    let path = store_path("new-user");
    let auth = auth_for(&server, SessionStore::new(path.clone()));
    let steam = SteamClient::with_base_url(server.url(), "TESTKEY");

    let (_, session) = auth
        .handle_steam_callback(&callback_params(), &steam)
        .await
        .unwrap();

    signup.assert_async().await;
    assert_eq!(session.refresh_token, "refresh");
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_rejected_assertion_does_not_touch_supabase() {
    let mut server = Server::new_async().await;
    let _openid = mock_openid(&mut server, false).await;
    let token = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let path = store_path("rejected");
    let auth = auth_for(&server, SessionStore::new(path.clone()));
    let steam = SteamClient::with_base_url(server.url(), "TESTKEY");

    let err = auth
        .handle_steam_callback(&callback_params(), &steam)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::VerificationFailed));
    token.assert_async().await;
    assert!(SessionStore::new(path).load().unwrap().is_none());
}

#[tokio::test]
async fn test_expired_session_is_cleared_on_restore() {
    let mut server = Server::new_async().await;
    let _user = server
        .mock("GET", "/auth/v1/user")
        .match_header("authorization", "Bearer jwt-token")
        .with_status(401)
        .with_body(r#"{"msg": "JWT expired"}"#)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
        .with_status(400)
        .with_body(r#"{"error": "invalid_grant", "error_description": "Invalid Refresh Token: Already Used"}"#)
        .expect(1)
        .create_async()
        .await;

    let path = store_path("expired");
    let store = SessionStore::new(path.clone());
    store
        .save(&serde_json::from_str(SESSION_BODY).unwrap())
        .unwrap();

    let auth = auth_for(&server, SessionStore::new(path.clone()));
    assert!(auth.restore_session().await.unwrap().is_none());
    refresh.assert_async().await;
    assert!(store.load().unwrap().is_none());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_on_restore() {
    let mut server = Server::new_async().await;
    let _user = server
        .mock("GET", "/auth/v1/user")
        .match_header("authorization", "Bearer jwt-token")
        .with_status(401)
        .with_body(r#"{"msg": "JWT expired"}"#)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
        .match_body(Matcher::Json(serde_json::json!({ "refresh_token": "refresh" })))
        .with_status(200)
        .with_body(
            SESSION_BODY
                .replace("jwt-token", "new-jwt-token")
                .replace("\"refresh\"", "\"new-refresh\""),
        )
        .expect(1)
        .create_async()
        .await;

    let path = store_path("refreshed");
    let store = SessionStore::new(path.clone());
    store
        .save(&serde_json::from_str(SESSION_BODY).unwrap())
        .unwrap();

    let auth = auth_for(&server, SessionStore::new(path.clone()));
    let session = auth.restore_session().await.unwrap().unwrap();

    refresh.assert_async().await;
    assert_eq!(session.access_token, "new-jwt-token");
    assert_eq!(session.refresh_token, "new-refresh");
    // The rotated tokens replace the stored ones
    assert_eq!(store.load().unwrap(), Some(session));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_pending_confirmation_signs_in_after_sign_up() {
    let mut server = Server::new_async().await;
    let _openid = mock_openid(&mut server, true).await;
    let _profile = mock_profile(&mut server).await;
    let rejected = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .with_status(400)
        .with_body(INVALID_CREDENTIALS)
        .expect(1)
        .create_async()
        .await;
    let signup = server
        .mock("POST", "/auth/v1/signup")
        .with_status(200)
        .with_body(
            r#"{"id": "11111111-2222-3333-4444-555555555555",
                "email": "steam_76561197960287930@steam.local",
                "user_metadata": {"steam_id": "76561197960287930"}}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .with_status(200)
        .with_body(SESSION_BODY)
        .expect(1)
        .create_async()
        .await;

    let path = store_path("pending");
    let auth = auth_for(&server, SessionStore::new(path.clone()));
    let steam = SteamClient::with_base_url(server.url(), "TESTKEY");

    let (_, session) = auth
        .handle_steam_callback(&callback_params(), &steam)
        .await
        .unwrap();

    rejected.assert_async().await;
    signup.assert_async().await;
    accepted.assert_async().await;
    assert_eq!(session.access_token, "jwt-token");
    assert_eq!(SessionStore::new(path.clone()).load().unwrap(), Some(session));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_callback_wait_times_out() {
    let server = CallbackServer::bind(0).await.unwrap();
    let err = server
        .wait_for_callback(CancellationToken::new(), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Timeout));
}

#[tokio::test]
async fn test_valid_session_is_restored_with_fresh_user() {
    let mut server = Server::new_async().await;
    let _user = server
        .mock("GET", "/auth/v1/user")
        .with_status(200)
        .with_body(
            r#"{"id": "11111111-2222-3333-4444-555555555555",
                "email": "steam_76561197960287930@steam.local",
                "user_metadata": {"steam_id": "76561197960287930", "username": "NewName"}}"#,
        )
        .create_async()
        .await;

    let path = store_path("restore");
    SessionStore::new(path.clone())
        .save(&serde_json::from_str(SESSION_BODY).unwrap())
        .unwrap();

    let auth = auth_for(&server, SessionStore::new(path.clone()));
    let session = auth.restore_session().await.unwrap().unwrap();
    assert_eq!(session.user.user_metadata.username.as_deref(), Some("NewName"));
    assert_eq!(session.access_token, "jwt-token");
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_sign_out_clears_local_session_even_if_backend_fails() {
    let mut server = Server::new_async().await;
    let logout = server
        .mock("POST", "/auth/v1/logout")
        .with_status(500)
        .with_body(r#"{"message": "internal"}"#)
        .create_async()
        .await;

    let path = store_path("sign-out");
    let store = SessionStore::new(path.clone());
    let session = serde_json::from_str(SESSION_BODY).unwrap();
    store.save(&session).unwrap();

    let auth = auth_for(&server, SessionStore::new(path.clone()));
    auth.sign_out(&session).await.unwrap();

    logout.assert_async().await;
    assert!(store.load().unwrap().is_none());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
