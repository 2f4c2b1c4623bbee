//! 工作区目录集成测试

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tokio_test::assert_ok;
use uuid::Uuid;

use ripple_roster::domain::model::{InvitationStatus, RosterUpdate};
use ripple_roster::domain::service::MemberDirectoryService;
use ripple_roster::service::{RosterContext, initialize};
use ripple_sync_core::gateway::{DataGateway, MemoryGateway, RealtimeGateway, SelectQuery, row};
use ripple_sync_core::notify::Notifier;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn build(gateway: &MemoryGateway, email: &str, name: &str) -> (RosterContext, Uuid) {
    let viewer = Uuid::new_v4();
    let context = initialize(
        viewer,
        email,
        name,
        Arc::new(gateway.clone()) as Arc<dyn DataGateway>,
        Arc::new(gateway.clone()) as Arc<dyn RealtimeGateway>,
        Notifier::default(),
    )
    .expect("wire-up should succeed");
    (context, viewer)
}

async fn seed_channel(
    gateway: &MemoryGateway,
    workspace: Uuid,
    name: &str,
    is_default: bool,
    created_at: &str,
) -> Uuid {
    let stored = gateway
        .insert(
            "channels",
            json!({
                "workspace_id": workspace.to_string(),
                "name": name,
                "is_default": is_default,
                "created_by": Uuid::new_v4().to_string(),
                "created_at": created_at,
            }),
        )
        .await
        .expect("channel insert");
    row::row_id(&stored).expect("channel id assigned")
}

async fn seed_member(gateway: &MemoryGateway, workspace: Uuid, user: Uuid, role: &str) {
    gateway
        .insert(
            "workspace_members",
            json!({
                "workspace_id": workspace.to_string(),
                "user_id": user.to_string(),
                "role": role,
            }),
        )
        .await
        .expect("member insert");
}

async fn seed_profile(gateway: &MemoryGateway, user: Uuid, username: &str) {
    gateway
        .insert(
            "profiles",
            json!({
                "user_id": user.to_string(),
                "username": username,
            }),
        )
        .await
        .expect("profile insert");
}

#[tokio::test]
async fn channels_load_ascending_with_default_resolution() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (context, _) = build(&gateway, "me@example.com", "me");

    seed_channel(&gateway, workspace, "later", false, "2026-03-01T11:00:00Z").await;
    let general =
        seed_channel(&gateway, workspace, "general", true, "2026-03-01T10:00:00Z").await;

    context
        .channel_service
        .load_channels(workspace)
        .await
        .expect("load");

    let channels = context.channel_service.channels().await;
    let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["general", "later"]);

    let default = context
        .channel_service
        .default_channel()
        .await
        .expect("default channel");
    assert_eq!(default.id, general);
}

#[tokio::test]
async fn default_falls_back_to_first_channel() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (context, _) = build(&gateway, "me@example.com", "me");

    let first = seed_channel(&gateway, workspace, "alpha", false, "2026-03-01T10:00:00Z").await;
    seed_channel(&gateway, workspace, "beta", false, "2026-03-01T11:00:00Z").await;

    context
        .channel_service
        .load_channels(workspace)
        .await
        .expect("load");
    let default = context
        .channel_service
        .default_channel()
        .await
        .expect("fallback default");
    assert_eq!(default.id, first);
}

#[tokio::test]
async fn create_channel_slugifies_and_appends_once() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (context, viewer) = build(&gateway, "me@example.com", "me");

    context
        .channel_service
        .load_channels(workspace)
        .await
        .expect("load");

    let channel = context
        .channel_service
        .create_channel("  Design Team  ", viewer)
        .await
        .expect("create");
    assert_eq!(channel.name, "design-team");

    // 等订阅事件投递完毕，本地追加与事件由去重合并为一条
    tokio::task::yield_now().await;
    let channels = context.channel_service.channels().await;
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].name, "design-team");
}

#[tokio::test]
async fn remote_channel_insert_appends_via_subscription() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (context, _) = build(&gateway, "me@example.com", "me");

    context
        .channel_service
        .load_channels(workspace)
        .await
        .expect("load");
    let mut updates = context.channel_service.updates();

    let channel_id =
        seed_channel(&gateway, workspace, "from-elsewhere", false, "2026-03-01T10:00:00Z").await;

    let update = timeout(RECV_TIMEOUT, updates.recv())
        .await
        .expect("update should arrive")
        .expect("update channel open");
    assert_eq!(update, RosterUpdate::ChannelAppended { channel_id });
    assert_eq!(context.channel_service.channels().await.len(), 1);
}

#[tokio::test]
async fn members_sort_online_first_then_by_name() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (context, _) = build(&gateway, "me@example.com", "me");

    let ada = Uuid::new_v4();
    let grace = Uuid::new_v4();
    let linus = Uuid::new_v4();
    seed_member(&gateway, workspace, ada, "owner").await;
    seed_member(&gateway, workspace, grace, "member").await;
    seed_member(&gateway, workspace, linus, "member").await;
    seed_profile(&gateway, ada, "ada").await;
    seed_profile(&gateway, grace, "grace").await;
    seed_profile(&gateway, linus, "linus").await;

    let online: HashSet<Uuid> = [linus].into_iter().collect();
    let members = context
        .member_service
        .members(workspace, &online)
        .await
        .expect("members");

    let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["linus", "ada", "grace"]);
    assert!(members[0].online);
    assert!(!members[1].online);

    // 大小写不敏感的搜索
    let hits = MemberDirectoryService::search(&members, "GRA");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].username, "grace");
}

#[tokio::test]
async fn invite_rejects_invalid_and_self_addresses() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (context, _) = build(&gateway, "me@example.com", "me");

    assert!(context
        .invitation_service
        .invite(workspace, "not-an-email")
        .await
        .is_err());
    assert!(context
        .invitation_service
        .invite(workspace, "ME@example.com")
        .await
        .is_err());
    assert_eq!(gateway.table_len("workspace_invitations"), 0);

    let invitation = context
        .invitation_service
        .invite(workspace, "Ada@Example.com")
        .await
        .expect("valid invite");
    assert_eq!(invitation.invited_email, "ada@example.com");
    assert_eq!(invitation.status, InvitationStatus::Pending);
}

#[tokio::test]
async fn accept_invitation_adds_member_and_posts_join_signal() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();

    // 邀请方与默认频道
    let (inviter, _) = build(&gateway, "owner@example.com", "owner");
    let general = seed_channel(&gateway, workspace, "general", true, "2026-03-01T09:00:00Z").await;
    let invitation = inviter
        .invitation_service
        .invite(workspace, "ada@example.com")
        .await
        .expect("invite");

    // 受邀方接受
    let (invitee, invitee_id) = build(&gateway, "ada@example.com", "ada");
    let pending = invitee
        .invitation_service
        .pending()
        .await
        .expect("pending list");
    assert_eq!(pending.len(), 1);

    tokio_test::assert_ok!(invitee.invitation_service.accept(&pending[0]).await);

    // 成员已加入
    let members = gateway
        .select(SelectQuery::table("workspace_members").eq("workspace_id", workspace))
        .await
        .expect("member query");
    assert!(members
        .iter()
        .any(|m| row::uuid_field(m, "user_id") == Some(invitee_id)));

    // 邀请状态已更新，不再出现在待处理列表
    assert!(invitee
        .invitation_service
        .pending()
        .await
        .expect("pending list")
        .is_empty());
    let _ = invitation;

    // 加入 signal 落在默认频道
    let signals = gateway
        .select(
            SelectQuery::table("messages")
                .eq("channel_id", general)
                .eq("is_signal", "true"),
        )
        .await
        .expect("signal query");
    assert_eq!(signals.len(), 1);
    assert_eq!(
        signals[0].get("content").and_then(|v| v.as_str()),
        Some("👋 Signal: ada joined the workspace!")
    );
}

#[tokio::test]
async fn decline_invitation_updates_status_only() {
    let gateway = MemoryGateway::new();
    let workspace = Uuid::new_v4();
    let (inviter, _) = build(&gateway, "owner@example.com", "owner");
    inviter
        .invitation_service
        .invite(workspace, "ada@example.com")
        .await
        .expect("invite");

    let (invitee, _) = build(&gateway, "ada@example.com", "ada");
    let pending = invitee.invitation_service.pending().await.expect("pending");
    invitee
        .invitation_service
        .decline(&pending[0])
        .await
        .expect("decline");

    assert!(invitee
        .invitation_service
        .pending()
        .await
        .expect("pending")
        .is_empty());
    assert_eq!(gateway.table_len("workspace_members"), 0);
}

#[tokio::test]
async fn display_name_falls_back_to_email_then_unknown() {
    let gateway = MemoryGateway::new();
    let (context, _) = build(&gateway, "me@example.com", "me");

    let known = Uuid::new_v4();
    seed_profile(&gateway, known, "ada").await;
    let unknown = Uuid::new_v4();

    assert_eq!(
        context
            .profile_directory
            .display_name(known, Some("ada@example.com"))
            .await,
        "ada"
    );
    assert_eq!(
        context
            .profile_directory
            .display_name(unknown, Some("grace@example.com"))
            .await,
        "grace"
    );
    assert_eq!(
        context.profile_directory.display_name(unknown, None).await,
        "Unknown"
    );
}
