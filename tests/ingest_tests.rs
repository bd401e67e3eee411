//! Visitor tracking against SQLite with a stubbed GeoIP lookup

mod common;

use biolinker::errors::BiolinkerError;
use biolinker::services::ingest::{
    EVENT_LINK_CLICK, EVENT_PAGE_VIEW, LOCAL_COUNTRY, LOCAL_COUNTRY_CODE, UNKNOWN_COUNTRY,
    UNKNOWN_COUNTRY_CODE, UNKNOWN_CITY,
};
use biolinker::services::{TrackRequest, VisitorContext, daily_visitor_fingerprint};
use migration::entities::{analytics_event, link};
use sea_orm::{EntityTrait, PaginatorTrait};

use common::{HangingGeo, StubGeo, setup, setup_with};

fn visitor(ip: &str) -> VisitorContext {
    VisitorContext {
        ip: Some(ip.to_string()),
        user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".into()),
        referrer: Some("https://news.example.org/".into()),
    }
}

fn click(link_id: i64) -> TrackRequest {
    TrackRequest {
        link_id: Some(link_id),
        page_id: None,
    }
}

fn view(page_id: i64) -> TrackRequest {
    TrackRequest {
        link_id: None,
        page_id: Some(page_id),
    }
}

async fn event_count(env: &common::TestEnv) -> u64 {
    analytics_event::Entity::find()
        .count(env.storage.get_db())
        .await
        .unwrap()
}

#[tokio::test]
async fn link_click_counts_once_and_records_owner() {
    let env = setup().await;
    let owner = env.user("owner@example.com").await;
    let page = env.page(owner, "owner").await;
    let link_id = env.link(page, "https://example.com").await;

    let ack = env
        .state
        .ingest
        .track(click(link_id), visitor("198.51.100.7"))
        .await
        .unwrap();
    assert_eq!(ack.event_type, EVENT_LINK_CLICK);

    let stored = link::Entity::find_by_id(link_id)
        .one(env.storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.click_count, 1);

    let events = analytics_event::Entity::find()
        .all(env.storage.get_db())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.id, ack.event_id);
    assert_eq!(event.user_id, owner);
    assert_eq!(event.page_id, page);
    assert_eq!(event.link_id, Some(link_id));
    assert_eq!(event.country.as_deref(), Some("Germany"));
    assert_eq!(event.country_code.as_deref(), Some("DE"));
    assert_eq!(event.city.as_deref(), Some("Berlin"));
    assert_eq!(
        event.visitor_id,
        daily_visitor_fingerprint(
            "198.51.100.7",
            "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0",
            event.created_at.date_naive()
        )
    );
}

#[tokio::test]
async fn missing_link_writes_nothing() {
    let env = setup().await;
    let owner = env.user("owner@example.com").await;
    env.page(owner, "owner").await;

    let err = env
        .state
        .ingest
        .track(click(4242), visitor("198.51.100.7"))
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::NotFound(_)));

    let err = env
        .state
        .ingest
        .track(
            TrackRequest {
                link_id: None,
                page_id: None,
            },
            visitor("198.51.100.7"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::NotFound(_)));

    assert_eq!(event_count(&env).await, 0);
}

#[tokio::test]
async fn loopback_visit_is_local_without_lookup() {
    let geo = StubGeo::berlin();
    let env = setup_with(geo.clone(), |_| {}).await;
    let owner = env.user("owner@example.com").await;
    let page = env.page(owner, "owner").await;

    let ack = env
        .state
        .ingest
        .track(view(page), visitor("127.0.0.1"))
        .await
        .unwrap();
    assert_eq!(ack.event_type, EVENT_PAGE_VIEW);
    assert_eq!(geo.call_count(), 0);

    let event = analytics_event::Entity::find_by_id(ack.event_id)
        .one(env.storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.link_id, None);
    assert_eq!(event.country.as_deref(), Some(LOCAL_COUNTRY));
    assert_eq!(event.country_code.as_deref(), Some(LOCAL_COUNTRY_CODE));
}

#[tokio::test]
async fn failed_lookup_falls_back_to_unknown() {
    let env = setup_with(StubGeo::answering(None), |_| {}).await;
    let owner = env.user("owner@example.com").await;
    let page = env.page(owner, "owner").await;

    let ack = env
        .state
        .ingest
        .track(view(page), visitor("203.0.113.50"))
        .await
        .unwrap();

    let event = analytics_event::Entity::find_by_id(ack.event_id)
        .one(env.storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.country.as_deref(), Some(UNKNOWN_COUNTRY));
    assert_eq!(event.country_code.as_deref(), Some(UNKNOWN_COUNTRY_CODE));
    assert_eq!(event.city.as_deref(), Some(UNKNOWN_CITY));
}

#[tokio::test]
async fn slow_lookup_times_out_to_unknown() {
    let env = setup_with(std::sync::Arc::new(HangingGeo), |c| {
        c.analytics.geo_timeout_ms = 500;
    })
    .await;
    let owner = env.user("owner@example.com").await;
    let page = env.page(owner, "owner").await;

    let started = std::time::Instant::now();
    let ack = env
        .state
        .ingest
        .track(view(page), visitor("203.0.113.51"))
        .await
        .unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(2));

    let event = analytics_event::Entity::find_by_id(ack.event_id)
        .one(env.storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.country.as_deref(), Some(UNKNOWN_COUNTRY));
    assert_eq!(event.country_code.as_deref(), Some(UNKNOWN_COUNTRY_CODE));
    assert_eq!(event.city.as_deref(), Some(UNKNOWN_CITY));
}

#[tokio::test]
async fn blocked_ip_is_rejected_before_writing() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let owner = env.user("owner@example.com").await;
    let page = env.page(owner, "owner").await;
    let link_id = env.link(page, "https://example.com").await;

    env.state
        .blocklist
        .block(&admin_guard, "203.0.113.66", Some("scraper".into()))
        .await
        .unwrap();

    let err = env
        .state
        .ingest
        .track(click(link_id), visitor("203.0.113.66"))
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::Blocked(_)));
    assert_eq!(event_count(&env).await, 0);

    let stored = link::Entity::find_by_id(link_id)
        .one(env.storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.click_count, 0);

    env.state
        .blocklist
        .unblock(&admin_guard, "203.0.113.66")
        .await
        .unwrap();
    env.state
        .ingest
        .track(click(link_id), visitor("203.0.113.66"))
        .await
        .unwrap();
    assert_eq!(event_count(&env).await, 1);
}

#[tokio::test]
async fn blocked_ipv4_stays_blocked_behind_mapped_ipv6() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let owner = env.user("owner@example.com").await;
    let page = env.page(owner, "owner").await;

    env.state
        .blocklist
        .block(&admin_guard, "203.0.113.7", None)
        .await
        .unwrap();

    let err = env
        .state
        .ingest
        .track(view(page), visitor("::ffff:203.0.113.7"))
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::Blocked(_)));
    assert_eq!(event_count(&env).await, 0);

    env.state
        .blocklist
        .unblock(&admin_guard, "::ffff:203.0.113.7")
        .await
        .unwrap();
    assert!(env.state.blocklist.list(&admin_guard).await.unwrap().is_empty());
}

#[tokio::test]
async fn blocklist_normalizes_and_audits() {
    let env = setup().await;
    let admin = env.admin().await;
    let admin_guard = env.guard(admin);

    let err = env
        .state
        .blocklist
        .block(&admin_guard, "not-an-ip", None)
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::Validation(_)));

    env.state
        .blocklist
        .block(&admin_guard, "2001:DB8::1", None)
        .await
        .unwrap();
    env.state
        .blocklist
        .block(&admin_guard, "2001:db8::1", Some("again".into()))
        .await
        .unwrap();
    let listed = env.state.blocklist.list(&admin_guard).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].ip_address, "2001:db8::1");
    assert_eq!(listed[0].reason.as_deref(), Some("again"));

    assert!(matches!(
        env.state.blocklist.unblock(&admin_guard, "192.0.2.1").await,
        Err(BiolinkerError::NotFound(_))
    ));

    let log = env.state.audit.list(&admin_guard, 10).await.unwrap();
    assert!(log.iter().any(|e| e.message.contains("2001:db8::1")));
}
