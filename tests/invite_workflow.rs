//! Invite state machine tests: the two pending states, owner review,
//! invitee response, and every rejection path.

mod common;

use common::TestApp;
use serde_json::json;

async fn private_channel(app: &TestApp) -> i64 {
    app.create_channel("sleep-vip", true, Some("alice")).await
}

#[tokio::test]
async fn non_member_cannot_invite() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;

    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "bob", "invitee_username": "carol" }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "not_authorized");
}

#[tokio::test]
async fn self_invite_rejected_case_insensitively() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;

    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "Alice", "invitee_username": "ALICE" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "self_invite");
}

#[tokio::test]
async fn owner_invite_skips_review() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;

    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "alice", "invitee_username": "carol" }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "pending_recipient");
    assert_eq!(body["requires_owner_approval"], false);

    // It shows up for carol, and nothing waits on alice's review.
    let (_, invites) = app.get("/api/forum/invites?username=carol").await;
    assert_eq!(invites.as_array().unwrap().len(), 1);
    assert_eq!(invites[0]["channel_name"], "sleep-vip");

    let (_, approvals) = app.get("/api/forum/invites/approvals?username=alice").await;
    assert!(approvals.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn second_active_invite_conflicts_with_distinct_messages() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;

    // Owner-issued invite: awaiting the invitee.
    app.invite(id, "alice", "carol").await;
    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "alice", "invitee_username": "carol" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invite_pending");
    assert!(body["error"].as_str().unwrap().contains("their response"));

    // Member-issued invite: awaiting the owner.
    let invite = app.invite(id, "alice", "carol2").await;
    app.accept_invite(invite, "carol2").await;
    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "carol2", "invitee_username": "dave" }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "pending_owner");

    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "alice", "invitee_username": "dave" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invite_pending");
    assert!(body["error"].as_str().unwrap().contains("owner approval"));
}

#[tokio::test]
async fn inviting_an_existing_member_is_a_noop() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;
    let invite = app.invite(id, "alice", "carol").await;
    app.accept_invite(invite, "carol").await;

    // Case-insensitive on the membership probe.
    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "alice", "invitee_username": "CAROL" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["already_member"], true);

    // No new row appeared for carol.
    let (_, invites) = app.get("/api/forum/invites?username=carol").await;
    assert!(invites.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn member_invite_into_private_channel_requires_owner_approval() {
    // Scenario: carol (member) invites dave; alice approves; dave accepts.
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;
    let invite = app.invite(id, "alice", "carol").await;
    app.accept_invite(invite, "carol").await;

    let invite_id = app.invite(id, "carol", "dave").await;

    // Dave cannot answer yet.
    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/respond"),
            json!({ "username": "dave", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invalid_state");

    // Only the recorded owner may review.
    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/approve"),
            json!({ "username": "carol", "action": "approve" }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "forbidden");

    let (_, approvals) = app.get("/api/forum/invites/approvals?username=alice").await;
    assert_eq!(approvals.as_array().unwrap().len(), 1);
    assert_eq!(approvals[0]["invitee_username"], "dave");

    let (status, _) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/approve"),
            json!({ "username": "alice", "action": "approve" }),
        )
        .await;
    assert_eq!(status, 200);

    // Now in dave's queue; a second review is out of state.
    let (_, invites) = app.get("/api/forum/invites?username=dave").await;
    assert_eq!(invites.as_array().unwrap().len(), 1);

    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/approve"),
            json!({ "username": "alice", "action": "approve" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invalid_state");

    app.accept_invite(invite_id, "dave").await;
    let (_, members) = app.get(&format!("/api/forum/channels/{id}/members")).await;
    let names: Vec<&str> = members
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "carol", "dave"]);
}

#[tokio::test]
async fn owner_decline_is_terminal() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;
    let invite = app.invite(id, "alice", "carol").await;
    app.accept_invite(invite, "carol").await;

    let invite_id = app.invite(id, "carol", "dave").await;
    let (status, _) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/approve"),
            json!({ "username": "alice", "action": "decline" }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/respond"),
            json!({ "username": "dave", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invalid_state");

    // The pair is free again for a fresh invite.
    let (status, _) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "carol", "invitee_username": "dave" }),
        )
        .await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn respond_checks_recipient_case_insensitively() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;
    let invite_id = app.invite(id, "alice", "carol").await;

    // Wrong person entirely.
    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/respond"),
            json!({ "username": "mallory", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "forbidden");

    // Differently cased invitee is fine.
    app.accept_invite(invite_id, "CaRoL").await;
    assert!(app
        .visible_channels("carol")
        .await
        .contains(&"sleep-vip".to_string()));
}

#[tokio::test]
async fn accepting_twice_yields_one_membership_and_a_state_error() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;
    let invite_id = app.invite(id, "alice", "carol").await;
    app.accept_invite(invite_id, "carol").await;

    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/respond"),
            json!({ "username": "carol", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invalid_state");

    let (_, members) = app.get(&format!("/api/forum/channels/{id}/members")).await;
    let carols = members
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["username"] == "carol")
        .count();
    assert_eq!(carols, 1);
}

#[tokio::test]
async fn invite_error_paths() {
    let app = TestApp::spawn().await.unwrap();
    let id = private_channel(&app).await;

    // Unknown channel.
    let (status, body) = app
        .post(
            "/api/forum/channels/9999/invite",
            json!({ "invited_by": "alice", "invitee_username": "carol" }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "channel_not_found");

    // Unknown invite.
    let (status, body) = app
        .post(
            "/api/forum/invites/9999/respond",
            json!({ "username": "carol", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "invite_not_found");

    // Malformed action.
    let invite_id = app.invite(id, "alice", "carol").await;
    let (status, body) = app
        .post(
            &format!("/api/forum/invites/{invite_id}/respond"),
            json!({ "username": "carol", "action": "maybe" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "invalid_input");

    // Missing identities.
    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invitee_username": "carol" }),
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "auth_required");

    let (status, body) = app
        .post(
            &format!("/api/forum/channels/{id}/invite"),
            json!({ "invited_by": "alice", "invitee_username": "  " }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "invalid_input");
}
