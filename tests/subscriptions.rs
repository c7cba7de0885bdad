mod common;

use common::*;
use foodgram_sdk::{actions, Error, RecipeStore, Viewer, RECIPE_PREVIEW_LIMIT};

#[tokio::test]
async fn self_subscription_is_always_rejected() {
    let fx = Fixture::new().await;
    let author = viewer(&fx.author);

    assert!(matches!(
        actions::subscribe(&author, fx.author.id, &fx.store).await,
        Err(Error::SelfSubscription(_))
    ));
    assert!(matches!(
        actions::unsubscribe(&author, fx.author.id, &fx.store).await,
        Err(Error::SelfSubscription(_))
    ));

    // Still rejected once the viewer follows someone else.
    actions::subscribe(&author, fx.other.id, &fx.store)
        .await
        .unwrap();
    assert!(matches!(
        actions::subscribe(&author, fx.author.id, &fx.store).await,
        Err(Error::SelfSubscription(_))
    ));
}

#[tokio::test]
async fn subscribe_returns_the_author_profile() {
    let fx = Fixture::new().await;
    let author = viewer(&fx.author);

    let mut created = vec![];
    for name in ["One", "Two", "Three", "Four"] {
        let view = actions::create_recipe(&author, recipe_form(name, &[(SUGAR, 5)], &[]), &fx.store)
            .await
            .unwrap();
        created.push(view.id);
    }

    let profile = actions::subscribe(&viewer(&fx.other), fx.author.id, &fx.store)
        .await
        .unwrap();

    assert_eq!(profile.id, fx.author.id);
    assert_eq!(profile.username, "author");
    assert!(profile.is_subscribed);
    assert_eq!(profile.recipes_count, 4);
    assert_eq!(profile.recipes.len() as i64, RECIPE_PREVIEW_LIMIT);

    let preview: Vec<i32> = profile.recipes.iter().map(|r| r.id).collect();
    let newest: Vec<i32> = created.iter().rev().take(3).copied().collect();
    assert_eq!(preview, newest);
}

#[tokio::test]
async fn edge_state_errors() {
    let fx = Fixture::new().await;
    let other = viewer(&fx.other);

    actions::subscribe(&other, fx.author.id, &fx.store)
        .await
        .unwrap();
    assert!(matches!(
        actions::subscribe(&other, fx.author.id, &fx.store).await,
        Err(Error::AlreadyExists(_))
    ));

    actions::unsubscribe(&other, fx.author.id, &fx.store)
        .await
        .unwrap();
    assert!(matches!(
        actions::unsubscribe(&other, fx.author.id, &fx.store).await,
        Err(Error::NotFound(_))
    ));

    assert!(matches!(
        actions::subscribe(&other, 999, &fx.store).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        actions::subscribe(&Viewer::Anonymous, fx.author.id, &fx.store).await,
        Err(Error::Unauthorized)
    ));
}

#[tokio::test]
async fn subscriptions_are_paged_by_author_id() {
    let fx = Fixture::new().await;
    let follower = viewer(&fx.other);

    let mut authors = vec![fx.author.id];
    for n in 0..10 {
        authors.push(fx.add_user(&format!("cook{n}")).await.id);
    }

    for id in authors.iter().rev() {
        actions::subscribe(&follower, *id, &fx.store).await.unwrap();
    }

    let first = actions::fetch_subscriptions(&follower, 0, None, &fx.store)
        .await
        .unwrap();
    assert_eq!(first.total_rows, 11);
    let ids: Vec<i32> = first.rows.iter().map(|p| p.id).collect();
    assert_eq!(ids, authors[..9].to_vec());
    assert!(first.rows.iter().all(|p| p.is_subscribed));

    let second = actions::fetch_subscriptions(&follower, 9, None, &fx.store)
        .await
        .unwrap();
    let ids: Vec<i32> = second.rows.iter().map(|p| p.id).collect();
    assert_eq!(ids, authors[9..].to_vec());
    assert_eq!(second.next_offset, None);

    let narrow = actions::fetch_subscriptions(&follower, 0, Some(4), &fx.store)
        .await
        .unwrap();
    let ids: Vec<i32> = narrow.rows.iter().map(|p| p.id).collect();
    assert_eq!(ids, authors[..4].to_vec());
    assert_eq!(narrow.next_offset, Some(4));
    assert_eq!(narrow.total_rows, 11);
}

#[tokio::test]
async fn profile_reflects_the_viewer() {
    let fx = Fixture::new().await;

    actions::subscribe(&viewer(&fx.other), fx.author.id, &fx.store)
        .await
        .unwrap();

    let seen = actions::get_user_profile(&viewer(&fx.other), fx.author.id, &fx.store)
        .await
        .unwrap();
    assert!(seen.is_subscribed);

    let seen = actions::get_user_profile(&Viewer::Anonymous, fx.author.id, &fx.store)
        .await
        .unwrap();
    assert!(!seen.is_subscribed);
    assert_eq!(seen.recipes_count, 0);
}

#[tokio::test]
async fn deleting_a_user_drops_their_edges() {
    let fx = Fixture::new().await;

    actions::subscribe(&viewer(&fx.other), fx.author.id, &fx.store)
        .await
        .unwrap();

    assert!(matches!(
        actions::delete_user(&viewer(&fx.other), fx.author.id, &fx.store, None).await,
        Err(Error::Forbidden)
    ));

    let mut cache = RecordingCache::default();
    actions::delete_user(&viewer(&fx.admin), fx.author.id, &fx.store, Some(&mut cache))
        .await
        .unwrap();
    assert_eq!(cache.flushes, 1);

    assert!(!fx
        .store
        .is_subscribed(fx.other.id, fx.author.id)
        .await
        .unwrap());
    let page = actions::fetch_subscriptions(&viewer(&fx.other), 0, None, &fx.store)
        .await
        .unwrap();
    assert_eq!(page.total_rows, 0);
}
