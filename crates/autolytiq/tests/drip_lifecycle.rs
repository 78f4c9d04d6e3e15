use std::sync::Arc;

use autolytiq::drip::{DripScheduler, DripSettings, OutboxMailer, STANDARD_DELAY_DAYS};
use autolytiq::leads::{LeadCapture, LeadStore, SqliteStore};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn signup() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 14, 30, 0)
        .single()
        .expect("valid signup time")
}

fn scheduler(
    store: &Arc<SqliteStore>,
    outbox: &Arc<OutboxMailer>,
) -> DripScheduler<SqliteStore, OutboxMailer> {
    DripScheduler::new(
        Arc::clone(store),
        Arc::clone(outbox),
        DripSettings {
            public_url: "https://autolytiqs.com".to_string(),
            ..DripSettings::default()
        },
    )
}

fn subscribe(store: &SqliteStore, email: &str, name: &str, at: DateTime<Utc>) {
    store
        .upsert_lead(
            &LeadCapture {
                email: email.to_string(),
                name: name.to_string(),
                ..LeadCapture::default()
            },
            at,
        )
        .expect("lead captured");
}

#[test]
fn full_sequence_is_delivered_once_per_step_in_order() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let outbox = Arc::new(OutboxMailer::new());
    let drip = scheduler(&store, &outbox);
    subscribe(&store, "jane@example.com", "Jane", signup());

    // Hourly ticks across the whole eight weeks plus a margin.
    let mut now = signup();
    let end = signup() + Duration::days(60);
    while now <= end {
        drip.run_once(now).expect("tick succeeds");
        now += Duration::hours(1);
    }

    let delivered = outbox.sent_to("jane@example.com");
    assert_eq!(delivered.len(), STANDARD_DELAY_DAYS.len());
    let sequence = drip.sequence();
    for (email, step) in delivered.iter().zip(1u8..) {
        let expected = sequence.email(step).expect("step content");
        assert_eq!(email.subject, expected.subject);
    }

    let stats = drip.stats().expect("stats");
    assert_eq!(stats.total_sent, 8);
    assert_eq!(stats.step1_sent, 1);
    assert_eq!(stats.step8_sent, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn steps_wait_for_their_cumulative_delay() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let outbox = Arc::new(OutboxMailer::new());
    let drip = scheduler(&store, &outbox);
    subscribe(&store, "jane@example.com", "", signup());

    assert_eq!(drip.run_once(signup()).expect("tick").sent, 1);
    let just_before = signup() + Duration::days(3) - Duration::minutes(1);
    assert_eq!(drip.run_once(just_before).expect("tick").due, 0);
    assert_eq!(drip.run_once(signup() + Duration::days(3)).expect("tick").sent, 1);
}

#[test]
fn late_scheduler_catches_up_one_step_per_tick() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let outbox = Arc::new(OutboxMailer::new());
    let drip = scheduler(&store, &outbox);
    subscribe(&store, "jane@example.com", "", signup());

    let much_later = signup() + Duration::days(30);
    for expected_total in 1..=6 {
        let summary = drip.run_once(much_later).expect("tick");
        assert_eq!(summary.sent, 1);
        assert_eq!(outbox.sent().len(), expected_total);
    }
    // Step 7 is not due until day 42.
    assert_eq!(drip.run_once(much_later).expect("tick").due, 0);
}

#[test]
fn unsubscribing_stops_the_sequence() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let outbox = Arc::new(OutboxMailer::new());
    let drip = scheduler(&store, &outbox);
    subscribe(&store, "jane@example.com", "", signup());

    drip.run_once(signup()).expect("tick");
    let welcome = outbox.sent_to("jane@example.com");
    let token = welcome[0]
        .unsubscribe_url
        .rsplit('/')
        .next()
        .expect("token in url")
        .to_string();
    assert_eq!(
        store
            .unsubscribe(&token, signup() + Duration::days(1))
            .expect("unsubscribed"),
        "jane@example.com"
    );

    let summary = drip
        .run_once(signup() + Duration::days(90))
        .expect("tick");
    assert_eq!(summary.due, 0);
    assert_eq!(outbox.sent().len(), 1);
}

#[test]
fn failed_sends_are_retried_without_skipping_steps() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let outbox = Arc::new(OutboxMailer::new());
    let drip = scheduler(&store, &outbox);
    subscribe(&store, "ok@example.com", "", signup());
    subscribe(&store, "bounce@example.com", "", signup());
    outbox.reject("bounce@example.com");

    let summary = drip.run_once(signup()).expect("tick");
    assert_eq!(summary.due, 2);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.send_failures, 1);

    outbox.accept("bounce@example.com");
    let summary = drip.run_once(signup() + Duration::hours(1)).expect("tick");
    assert_eq!(summary.due, 1);
    assert_eq!(summary.sent, 1);

    let bounced = outbox.sent_to("bounce@example.com");
    assert_eq!(bounced.len(), 1);
    assert_eq!(
        bounced[0].subject,
        "Welcome to Autolytiq - Your Financial Clarity Starts Here"
    );
}

#[test]
fn batch_limit_bounds_each_tick_oldest_first() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
    let outbox = Arc::new(OutboxMailer::new());
    let drip = DripScheduler::new(
        Arc::clone(&store),
        Arc::clone(&outbox),
        DripSettings {
            batch_limit: 2,
            ..DripSettings::default()
        },
    );
    for (idx, email) in ["first@example.com", "second@example.com", "third@example.com"]
        .into_iter()
        .enumerate()
    {
        subscribe(&store, email, "", signup() + Duration::minutes(idx as i64));
    }

    let now = signup() + Duration::hours(1);
    assert_eq!(drip.run_once(now).expect("tick").sent, 2);
    assert!(outbox.sent_to("third@example.com").is_empty());
    assert_eq!(drip.run_once(now).expect("tick").sent, 1);
    assert_eq!(outbox.sent_to("third@example.com").len(), 1);
}
