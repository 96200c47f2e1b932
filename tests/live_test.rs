//! Integration tests for the live broadcast lifecycle, viewer presence, and
//! WebRTC signaling relay over WebSocket.

mod common;

use std::time::Duration;

use common::*;
use serde_json::json;

#[tokio::test]
async fn test_full_live_lifecycle() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer_tok = signup(&base_url, "Bea", "bea@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer_tok).await;

    // Broadcaster starts; every connection gets the announcement
    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte du dimanche", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    let started = wait_for_event(&mut a_read, "live_started").await;
    assert_eq!(started["title"], "Culte du dimanche");
    assert_eq!(started["viewerCount"], 0);
    let started_b = wait_for_event(&mut b_read, "live_started").await;
    assert_eq!(started_b["liveType"], "video");

    // Viewer joins: gets the room count and session info, broadcaster is told
    send_event(
        &mut b_write,
        "join_live",
        json!({ "userName": "Bea", "userRole": "member" }),
    )
    .await;
    let count = wait_for_event(&mut b_read, "viewer_count").await;
    assert_eq!(count["count"], 1);
    let info = wait_for_event(&mut b_read, "live_info").await;
    assert_eq!(info["title"], "Culte du dimanche");
    assert_eq!(info["viewerCount"], 1);
    let joined = wait_for_event(&mut a_read, "viewer_joined").await;
    assert_eq!(joined["name"], "Bea");

    // HTTP status endpoint agrees with the WS view
    let status: serde_json::Value = reqwest::get(format!("{}/api/live", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active"], true);
    assert_eq!(status["viewerCount"], 1);
    assert_eq!(status["title"], "Culte du dimanche");

    // Broadcaster stops; the whole room is told
    send_event(&mut a_write, "stop_live", json!({})).await;
    wait_for_event(&mut b_read, "live_ended").await;
    wait_for_event(&mut a_read, "live_ended").await;

    // A later check finds nothing
    send_event(&mut b_write, "check_live", json!({})).await;
    wait_for_event(&mut b_read, "no_live").await;
}

#[tokio::test]
async fn test_stop_from_non_broadcaster_is_ignored() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer_tok = signup(&base_url, "Carl", "carl@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer_tok).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Etude", "liveType": "audio", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;

    send_event(
        &mut b_write,
        "join_live",
        json!({ "userName": "Carl", "userRole": "member" }),
    )
    .await;
    wait_for_event(&mut a_read, "viewer_joined").await;

    // A viewer trying to stop changes nothing
    send_event(&mut b_write, "stop_live", json!({})).await;
    assert_no_event(&mut a_read, "live_ended", Duration::from_millis(400)).await;

    let status: serde_json::Value = reqwest::get(format!("{}/api/live", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active"], true);
}

#[tokio::test]
async fn test_check_live_is_implicit_join() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer_tok = signup(&base_url, "Dana", "dana@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut a_read, "live_started").await;

    // A late arrival checks and is enrolled in one step
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer_tok).await;
    send_event(&mut b_write, "check_live", json!({})).await;
    let info = wait_for_event(&mut b_read, "live_info").await;
    assert_eq!(info["title"], "Culte");
    let count = wait_for_event(&mut a_read, "viewer_count").await;
    assert_eq!(count["count"], 1);
    let joined = wait_for_event(&mut a_read, "viewer_joined").await;
    assert_eq!(joined["name"], "Spectateur");
}

#[tokio::test]
async fn test_broadcaster_disconnect_ends_session() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer_tok = signup(&base_url, "Eli", "eli@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer_tok).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;
    send_event(
        &mut b_write,
        "join_live",
        json!({ "userName": "Eli", "userRole": "member" }),
    )
    .await;
    wait_for_event(&mut a_read, "viewer_joined").await;

    // Drop the broadcaster's socket entirely
    drop(a_write);
    drop(a_read);

    wait_for_event(&mut b_read, "live_ended").await;

    send_event(&mut b_write, "check_live", json!({})).await;
    wait_for_event(&mut b_read, "no_live").await;

    let status: serde_json::Value = reqwest::get(format!("{}/api/live", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active"], false);
    assert_eq!(status["viewerCount"], 0);
}

#[tokio::test]
async fn test_viewer_disconnect_and_double_leave() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let v1 = signup(&base_url, "Fay", "fay@example.com").await;
    let v2 = signup(&base_url, "Gil", "gil@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, b_conn) = connect_ws(addr, &v1).await;
    let (mut c_write, mut c_read, _) = connect_ws(addr, &v2).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;
    wait_for_event(&mut c_read, "live_started").await;

    send_event(&mut b_write, "join_live", json!({ "userName": "Fay", "userRole": "member" })).await;
    wait_for_event(&mut a_read, "viewer_joined").await;
    send_event(&mut c_write, "join_live", json!({ "userName": "Gil", "userRole": "member" })).await;
    wait_for_event(&mut a_read, "viewer_joined").await;
    // Drain C's own join frames so later counts are unambiguous
    wait_for_event(&mut c_read, "live_info").await;

    // Explicit leave, then a duplicate: the second is a no-op
    send_event(&mut b_write, "leave_live", json!({})).await;
    let left = wait_for_event(&mut a_read, "viewer_left").await;
    assert_eq!(left["viewerId"], b_conn.as_str());
    let count = wait_for_event(&mut c_read, "viewer_count").await;
    assert_eq!(count["count"], 1);

    send_event(&mut b_write, "leave_live", json!({})).await;
    assert_no_event(&mut a_read, "viewer_left", Duration::from_millis(400)).await;

    // Remaining viewer disconnects abruptly
    drop(c_write);
    drop(c_read);
    let left = wait_for_event(&mut a_read, "viewer_left").await;
    assert!(left["viewerId"].is_string());

    let status: serde_json::Value = reqwest::get(format!("{}/api/live", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active"], true);
    assert_eq!(status["viewerCount"], 0);
}

#[tokio::test]
async fn test_new_broadcast_preempts_active_session() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let other = signup(&base_url, "Hugo", "hugo@example.com").await;
    let viewer = signup(&base_url, "Ida", "ida@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer).await;
    let (mut c_write, mut c_read, _) = connect_ws(addr, &other).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Premier", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;
    let first = wait_for_event(&mut c_read, "live_started").await;
    assert_eq!(first["title"], "Premier");
    send_event(&mut b_write, "join_live", json!({ "userName": "Ida", "userRole": "member" })).await;
    wait_for_event(&mut a_read, "viewer_joined").await;

    // Another connection starts: the old room is closed first
    send_event(
        &mut c_write,
        "start_live",
        json!({ "title": "Second", "liveType": "audio", "userName": "Hugo" }),
    )
    .await;
    wait_for_event(&mut a_read, "live_ended").await;
    wait_for_event(&mut b_read, "live_ended").await;
    let started = wait_for_event(&mut c_read, "live_started").await;
    assert_eq!(started["title"], "Second");
    assert_eq!(started["viewerCount"], 0);

    let status: serde_json::Value = reqwest::get(format!("{}/api/live", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["title"], "Second");
    assert_eq!(status["viewerCount"], 0);
}

#[tokio::test]
async fn test_webrtc_signaling_relay() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer = signup(&base_url, "Jo", "jo@example.com").await;

    let (mut a_write, mut a_read, a_conn) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, b_conn) = connect_ws(addr, &viewer).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;
    send_event(&mut b_write, "join_live", json!({ "userName": "Jo", "userRole": "member" })).await;
    let joined = wait_for_event(&mut a_read, "viewer_joined").await;
    assert_eq!(joined["viewerId"], b_conn.as_str());

    // Offer travels broadcaster -> viewer, tagged with the sender
    send_event(
        &mut a_write,
        "webrtc_offer",
        json!({ "offer": { "type": "offer", "sdp": "v=0" }, "targetId": b_conn }),
    )
    .await;
    let offer = wait_for_event(&mut b_read, "webrtc_offer").await;
    assert_eq!(offer["streamerId"], a_conn.as_str());
    assert_eq!(offer["offer"]["sdp"], "v=0");

    // Answer travels back, tagged with the viewer
    send_event(
        &mut b_write,
        "webrtc_answer",
        json!({ "answer": { "type": "answer", "sdp": "v=0" }, "streamerId": a_conn }),
    )
    .await;
    let answer = wait_for_event(&mut a_read, "webrtc_answer").await;
    assert_eq!(answer["viewerId"], b_conn.as_str());

    // ICE candidates flow in either direction
    send_event(
        &mut b_write,
        "ice_candidate",
        json!({ "candidate": { "candidate": "candidate:1" }, "targetId": a_conn }),
    )
    .await;
    let ice = wait_for_event(&mut a_read, "ice_candidate").await;
    assert_eq!(ice["fromId"], b_conn.as_str());

    // Relay to a vanished connection is silently dropped
    send_event(
        &mut a_write,
        "webrtc_offer",
        json!({ "offer": { "type": "offer" }, "targetId": "00000000-0000-0000-0000-000000000000" }),
    )
    .await;
    assert_no_event(&mut b_read, "webrtc_offer", Duration::from_millis(400)).await;
}

#[tokio::test]
async fn test_reactions_and_comments_fan_out_to_room() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer = signup(&base_url, "Kim", "kim@example.com").await;
    let outsider = signup(&base_url, "Leo", "leo@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer).await;
    let (_o_write, mut o_read, _) = connect_ws(addr, &outsider).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;
    wait_for_event(&mut o_read, "live_started").await;
    send_event(&mut b_write, "join_live", json!({ "userName": "Kim", "userRole": "member" })).await;
    wait_for_event(&mut a_read, "viewer_joined").await;

    send_event(
        &mut b_write,
        "live_reaction",
        json!({ "emoji": "🙏", "userName": "Kim" }),
    )
    .await;
    let reaction = wait_for_event(&mut a_read, "live_reaction").await;
    assert_eq!(reaction["emoji"], "🙏");

    send_event(
        &mut b_write,
        "live_comment",
        json!({ "text": "Amen", "userName": "Kim", "userRole": "member" }),
    )
    .await;
    let comment = wait_for_event(&mut a_read, "live_comment").await;
    assert_eq!(comment["text"], "Amen");
    assert_eq!(comment["time"].as_str().unwrap().len(), 5);

    // A connection outside the live room receives neither
    assert_no_event(&mut o_read, "live_comment", Duration::from_millis(400)).await;
}

#[tokio::test]
async fn test_admin_force_stop_over_http() {
    let (base_url, addr) = start_test_server().await;
    let admin = admin_token(&base_url).await;
    let viewer = signup(&base_url, "Mia", "mia@example.com").await;

    let (mut a_write, mut a_read, _) = connect_ws(addr, &admin).await;
    let (mut b_write, mut b_read, _) = connect_ws(addr, &viewer).await;

    send_event(
        &mut a_write,
        "start_live",
        json!({ "title": "Culte", "liveType": "video", "userName": "Admin Glory" }),
    )
    .await;
    wait_for_event(&mut b_read, "live_started").await;
    send_event(&mut b_write, "join_live", json!({ "userName": "Mia", "userRole": "member" })).await;
    wait_for_event(&mut a_read, "viewer_joined").await;

    // Members cannot force-stop
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/admin/live/stop", base_url))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .post(format!("{}/api/admin/live/stop", base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["stopped"], true);

    wait_for_event(&mut a_read, "live_ended").await;
    wait_for_event(&mut b_read, "live_ended").await;
}
