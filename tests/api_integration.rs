use mockito::Matcher;
use tui_achievement_tracker::api::{SteamApiError, SteamClient, SteamId};
use tui_achievement_tracker::internal::stats::LibraryStats;

const STEAM_ID: &str = "76561197960287930";

fn steam_id() -> SteamId {
    SteamId::parse(STEAM_ID).unwrap()
}

fn achievements_body(unlocked: &[u8]) -> String {
    let list: Vec<String> = unlocked
        .iter()
        .enumerate()
        .map(|(i, achieved)| {
            format!(
                r#"{{"apiname": "ACH_{}", "achieved": {}, "unlocktime": {}}}"#,
                i,
                achieved,
                if *achieved == 1 { 1_600_000_000 + i } else { 0 }
            )
        })
        .collect();
    format!(
        r#"{{"playerstats": {{"steamID": "{}", "gameName": "x", "success": true, "achievements": [{}]}}}}"#,
        STEAM_ID,
        list.join(",")
    )
}

#[tokio::test]
async fn test_integration_dashboard_with_counts() {
    let mut server = mockito::Server::new_async().await;

    let _games = server
        .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("steamid".into(), STEAM_ID.into()),
            Matcher::UrlEncoded("include_appinfo".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"response": {"game_count": 3, "games": [
                {"appid": 620, "name": "Portal 2", "playtime_forever": 900, "rtime_last_played": 1700000000},
                {"appid": 400, "name": "Portal", "playtime_forever": 300},
                {"appid": 570, "name": "Dota 2", "playtime_forever": 6000}
            ]}}"#,
        )
        .create_async()
        .await;

    let _portal2 = server
        .mock("GET", "/ISteamUserStats/GetPlayerAchievements/v0001/")
        .match_query(Matcher::UrlEncoded("appid".into(), "620".into()))
        .with_status(200)
        .with_body(achievements_body(&[1, 1, 0, 0]))
        .create_async()
        .await;
    let _portal = server
        .mock("GET", "/ISteamUserStats/GetPlayerAchievements/v0001/")
        .match_query(Matcher::UrlEncoded("appid".into(), "400".into()))
        .with_status(200)
        .with_body(achievements_body(&[1, 1]))
        .create_async()
        .await;
    let _dota = server
        .mock("GET", "/ISteamUserStats/GetPlayerAchievements/v0001/")
        .match_query(Matcher::UrlEncoded("appid".into(), "570".into()))
        .with_status(400)
        .with_body(r#"{"playerstats": {"error": "Requested app has no stats", "success": false}}"#)
        .create_async()
        .await;

    let client = SteamClient::with_base_url(server.url(), "TESTKEY");
    let games = client.fetch_owned_games(&steam_id()).await.unwrap();
    assert_eq!(games.len(), 3);
    assert!(games[0].last_played.is_some());

    let mut progress = Vec::new();
    let games = client
        .fetch_achievement_counts(&steam_id(), games, |done| progress.push(done))
        .await;

    assert_eq!(progress, vec![1, 2, 3]);
    let counts: Vec<_> = games
        .iter()
        .map(|g| (g.id, g.achievements, g.completed))
        .collect();
    assert_eq!(counts, vec![(620, 4, 2), (400, 2, 2), (570, 0, 0)]);

    let stats = LibraryStats::from_games(&games);
    assert_eq!(stats.games_with_achievements, 2);
    assert_eq!(stats.perfect_games, 1);
    assert_eq!(stats.average_completion, 75);
    assert_eq!(stats.total_playtime_minutes, 7200);
}

#[tokio::test]
async fn test_integration_failed_count_lookup_leaves_game_empty() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/ISteamUserStats/GetPlayerAchievements/v0001/")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = SteamClient::with_base_url(server.url(), "TESTKEY");
    let games = vec![tui_achievement_tracker::internal::models::Game {
        id: 10,
        name: "Counter-Strike".into(),
        ..Default::default()
    }];
    let games = client
        .fetch_achievement_counts(&steam_id(), games, |_| {})
        .await;
    assert_eq!((games[0].achievements, games[0].completed), (0, 0));

    let err = client.fetch_achievements(&steam_id(), 10).await.unwrap_err();
    assert!(matches!(err, SteamApiError::Status { status: 500, .. }));
    assert!(!err.is_user_error());
}

#[tokio::test]
async fn test_integration_achievement_details() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/ISteamUserStats/GetPlayerAchievements/v0001/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("appid".into(), "440".into()),
            Matcher::UrlEncoded("l".into(), "english".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"playerstats": {"success": true, "achievements": [
                {"apiname": "TF_PLAY_GAME_EVERYCLASS", "achieved": 1, "unlocktime": 1600000000,
                 "name": "Head of the Class", "description": "Play a complete round with every class."},
                {"apiname": "TF_GET_HEALPOINTS", "achieved": 0, "unlocktime": 0}
            ]}}"#,
        )
        .create_async()
        .await;

    let client = SteamClient::with_base_url(server.url(), "TESTKEY");
    let achievements = client.fetch_achievements(&steam_id(), 440).await.unwrap();

    assert_eq!(achievements.len(), 2);
    assert_eq!(achievements[0].name, "Head of the Class");
    assert!(achievements[0].completed);
    assert_eq!(achievements[1].name, "Tf Get Healpoints");
    assert!(!achievements[1].completed);
    assert!(achievements[1].unlock_time.is_none());
}

#[tokio::test]
async fn test_integration_resolve_vanity_name() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/ISteamUser/ResolveVanityURL/v0001/")
        .match_query(Matcher::UrlEncoded("vanityurl".into(), "gabelogannewell".into()))
        .with_status(200)
        .with_body(format!(r#"{{"response": {{"steamid": "{}", "success": 1}}}}"#, STEAM_ID))
        .create_async()
        .await;

    let client = SteamClient::with_base_url(server.url(), "TESTKEY");
    let id = client
        .resolve_steam_id("https://steamcommunity.com/id/gabelogannewell/")
        .await
        .unwrap();
    assert_eq!(id, steam_id());
}

#[tokio::test]
async fn test_integration_unknown_vanity_name() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/ISteamUser/ResolveVanityURL/v0001/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"response": {"success": 42, "message": "No match"}}"#)
        .create_async()
        .await;

    let client = SteamClient::with_base_url(server.url(), "TESTKEY");
    let err = client.resolve_steam_id("nobody-here").await.unwrap_err();
    assert!(matches!(err, SteamApiError::VanityNotFound(ref name) if name == "nobody-here"));
    assert!(err.is_user_error());
}
