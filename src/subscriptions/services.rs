use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::repo::Subscription;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    users::dto::OwnerView,
};

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
}

/// Subscribes `subscriber_id` to `channel_id`, or unsubscribes when the edge
/// already exists.
pub async fn toggle_subscription(
    st: &AppState,
    subscriber_id: Uuid,
    channel_id: Uuid,
) -> ApiResult<SubscriptionStatus> {
    if st.users.find_by_id(channel_id).await?.is_none() {
        return Err(ApiError::NotFound("Channel does not exist".into()));
    }
    if subscriber_id == channel_id {
        return Err(ApiError::BadRequest(
            "You cannot subscribe to your own channel".into(),
        ));
    }

    let subscribed = match st.subscriptions.find_pair(subscriber_id, channel_id).await? {
        Some(existing) => {
            st.subscriptions.delete(existing.id).await?;
            false
        }
        None => {
            st.subscriptions.create(subscriber_id, channel_id).await?;
            true
        }
    };
    info!(%subscriber_id, %channel_id, subscribed, "subscription toggled");
    Ok(SubscriptionStatus { subscribed })
}

async fn views_of(
    st: &AppState,
    edges: Vec<Subscription>,
    side: impl Fn(&Subscription) -> Uuid,
) -> ApiResult<Vec<OwnerView>> {
    let ids: Vec<Uuid> = edges.iter().map(&side).collect();
    let users = st.users.find_many(&ids).await?;
    Ok(ids
        .iter()
        .filter_map(|id| users.iter().find(|u| u.id == *id))
        .map(OwnerView::from)
        .collect())
}

pub async fn channel_subscribers(st: &AppState, channel_id: Uuid) -> ApiResult<Vec<OwnerView>> {
    if st.users.find_by_id(channel_id).await?.is_none() {
        return Err(ApiError::NotFound("Channel does not exist".into()));
    }
    let edges = st.subscriptions.list_by_channel(channel_id).await?;
    views_of(st, edges, |s| s.subscriber_id).await
}

pub async fn subscribed_channels(
    st: &AppState,
    subscriber_id: Uuid,
) -> ApiResult<Vec<OwnerView>> {
    if st.users.find_by_id(subscriber_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }
    let edges = st.subscriptions.list_by_subscriber(subscriber_id).await?;
    views_of(st, edges, |s| s.channel_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::signed_up;

    #[tokio::test]
    async fn toggling_twice_unsubscribes() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;

        let on = toggle_subscription(&st, bob.id, alice.id).await.unwrap();
        assert!(on.subscribed);
        assert_eq!(st.subscriptions.count_subscribers(alice.id).await.unwrap(), 1);

        let off = toggle_subscription(&st, bob.id, alice.id).await.unwrap();
        assert!(!off.subscribed);
        assert_eq!(st.subscriptions.count_subscribers(alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_self_and_unknown_channel() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;

        assert!(matches!(
            toggle_subscription(&st, alice.id, alice.id).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            toggle_subscription(&st, alice.id, Uuid::new_v4()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn lists_both_directions_newest_first() {
        let st = AppState::fake();
        let (alice, _) = signed_up(&st, "alice").await;
        let (bob, _) = signed_up(&st, "bob").await;
        let (carol, _) = signed_up(&st, "carol").await;
        toggle_subscription(&st, bob.id, alice.id).await.unwrap();
        toggle_subscription(&st, carol.id, alice.id).await.unwrap();
        toggle_subscription(&st, bob.id, carol.id).await.unwrap();

        let subscribers: Vec<String> = channel_subscribers(&st, alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(subscribers, vec!["carol", "bob"]);

        let channels: Vec<String> = subscribed_channels(&st, bob.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(channels, vec!["carol", "alice"]);

        assert!(subscribed_channels(&st, alice.id).await.unwrap().is_empty());
    }
}
