//! Tests for the rule engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use seawatch_core::{GeoPoint, VesselEvent};

use super::*;
use crate::schema::{CombineLogic, Rule};

fn engine() -> RuleEngine {
    RuleEngine::new(
        Arc::new(EvalContext::new()),
        EngineSettings {
            settle_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_millis(200),
        },
    )
}

fn rule(yaml: &str) -> Rule {
    serde_yaml::from_str(yaml).unwrap()
}

/// Matches every event with speed above 10.
fn speeding(id: &str, priority: i32, exclusive: bool) -> Rule {
    rule(&format!(
        r#"
id: {id}
priority: {priority}
exclusive: {exclusive}
conditions:
  - type: ValueCondition
    field: speed
    operator: ">"
    value: 10
action:
  alertType: {id}_alert
  severity: medium
  notify: [ops]
"#
    ))
}

fn counting(id: &str, threshold: u32) -> Rule {
    rule(&format!(
        r#"
id: {id}
conditions:
  - type: AggregationCondition
    op: count_in_window
    windowSeconds: 3600
    threshold: {threshold}
action: {{alertType: busy, severity: low}}
"#
    ))
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

fn fast_event(vessel: &str) -> VesselEvent {
    let mut ev = VesselEvent::new(vessel, GeoPoint::new(22.3, 114.2)).with_timestamp(t0());
    ev.speed = 15.0;
    ev
}

fn event_at(lat: f64, lon: f64, secs: i64) -> VesselEvent {
    VesselEvent::new("v1", GeoPoint::new(lat, lon))
        .with_timestamp(t0() + chrono::Duration::seconds(secs))
}

fn ids(alerts: &[Alert]) -> Vec<&str> {
    alerts.iter().map(|a| a.rule_id.as_str()).collect()
}

// ── Evaluation and exclusivity ──────────────────────────────────────

#[tokio::test]
async fn non_exclusive_matches_all_returned() {
    let engine = engine();
    engine
        .hot_update_rules(vec![speeding("a", 10, false), speeding("b", 20, false)])
        .await;

    let alerts = engine.evaluate(fast_event("413000111")).await;
    assert_eq!(ids(&alerts), vec!["b", "a"]);

    let alert = &alerts[0];
    assert_eq!(alert.entity_id, "413000111");
    assert_eq!(alert.alert_type, "b_alert");
    assert_eq!(alert.severity, "medium");
    assert_eq!(alert.notify, vec!["ops".to_string()]);
}

#[tokio::test]
async fn exclusive_rule_suppresses_others() {
    let engine = engine();
    engine
        .hot_update_rules(vec![speeding("r1", 200, true), speeding("r2", 50, false)])
        .await;

    let alerts = engine.evaluate(fast_event("v1")).await;
    assert_eq!(ids(&alerts), vec!["r1"]);
}

#[tokio::test]
async fn higher_priority_exclusive_wins() {
    let engine = engine();
    engine
        .hot_update_rules(vec![speeding("low", 100, true), speeding("high", 300, true)])
        .await;

    let alerts = engine.evaluate(fast_event("v1")).await;
    assert_eq!(ids(&alerts), vec!["high"]);
}

#[tokio::test]
async fn equal_priority_exclusive_follows_incoming_order() {
    let engine = engine();
    engine
        .hot_update_rules(vec![speeding("x", 100, true), speeding("y", 100, true)])
        .await;
    assert_eq!(ids(&engine.evaluate(fast_event("v1")).await), vec!["x"]);

    // Same contents, new order: nothing restarts but the ranking follows the list.
    let diff = engine
        .hot_update_rules(vec![speeding("y", 100, true), speeding("x", 100, true)])
        .await;
    assert!(diff.is_noop());
    assert_eq!(ids(&engine.evaluate(fast_event("v1")).await), vec!["y"]);

    // A newly added rule ranks where it appears, not after the existing ones.
    engine
        .hot_update_rules(vec![
            speeding("z", 100, true),
            speeding("y", 100, true),
            speeding("x", 100, true),
        ])
        .await;
    let order: Vec<String> = engine.rules().await.iter().map(|r| r.id.clone()).collect();
    assert_eq!(order, vec!["z", "y", "x"]);
}

#[tokio::test]
async fn no_match_no_alerts() {
    let engine = engine();
    engine.hot_update_rules(vec![speeding("a", 1, false)]).await;

    let slow = VesselEvent::new("v1", GeoPoint::new(22.3, 114.2));
    assert!(engine.evaluate(slow).await.is_empty());
}

#[tokio::test]
async fn empty_engine_returns_nothing() {
    let engine = engine();
    assert!(engine.evaluate(fast_event("v1")).await.is_empty());
}

#[tokio::test]
async fn rule_without_conditions_never_matches() {
    let engine = engine();
    engine
        .hot_update_rule(rule("id: empty\naction: {alertType: x, severity: low}\n"))
        .await;
    assert!(engine.evaluate(fast_event("v1")).await.is_empty());
    assert_eq!(engine.active_workers().await, 1);
}

#[tokio::test]
async fn or_logic_matches_any() {
    let engine = engine();
    engine
        .hot_update_rule(rule(
            r#"
id: either
combineLogic: or
conditions:
  - type: ValueCondition
    field: speed
    operator: ">"
    value: 100
  - type: ValueCondition
    field: flag
    operator: "=="
    value: PA
action: {alertType: either, severity: low}
"#,
        ))
        .await;

    let flagged = VesselEvent::new("v1", GeoPoint::new(0.0, 0.0)).with_attribute("flag", "pa");
    assert_eq!(ids(&engine.evaluate(flagged).await), vec!["either"]);

    let plain = VesselEvent::new("v1", GeoPoint::new(0.0, 0.0));
    assert!(engine.evaluate(plain).await.is_empty());
}

#[tokio::test]
async fn pair_exists_through_engine() {
    let engine = engine();
    engine
        .hot_update_rule(rule(
            r#"
id: rendezvous
conditions:
  - type: AggregationCondition
    op: pair_exists
    windowSeconds: 600
    threshold: 100
action: {alertType: rendezvous, severity: high}
"#,
        ))
        .await;

    assert!(engine.evaluate(event_at(22.3, 114.2, 0)).await.is_empty());
    assert_eq!(engine.evaluate(event_at(22.3, 114.2, 30)).await.len(), 1);
}

// ── Worker failure modes ────────────────────────────────────────────

#[tokio::test]
async fn unsupported_combine_logic_stops_only_that_rule() {
    let engine = engine();
    let mut broken = speeding("broken", 100, false);
    broken.combine_logic = CombineLogic::Unsupported("XOR".to_string());
    engine
        .hot_update_rules(vec![broken.clone(), speeding("ok", 10, false)])
        .await;

    assert_eq!(ids(&engine.evaluate(fast_event("v1")).await), vec!["ok"]);
    assert_eq!(ids(&engine.evaluate(fast_event("v1")).await), vec!["ok"]);

    // A content update restarts the rule.
    broken.combine_logic = CombineLogic::And;
    let diff = engine.hot_update_rule(broken).await;
    assert_eq!(diff.updated, vec!["broken".to_string()]);
    assert_eq!(ids(&engine.evaluate(fast_event("v1")).await), vec!["broken", "ok"]);
}

#[tokio::test]
async fn condition_error_skips_event_but_worker_continues() {
    let engine = engine();
    engine
        .hot_update_rule(rule(
            r#"
id: bad-zone
conditions:
  - type: AggregationCondition
    op: count_in_window
    windowSeconds: 3600
    threshold: 1
  - type: SpatialCondition
    op: in_polygon
    polygon: [{lat: 0, lon: 0}, {lat: 1, lon: 1}]
action: {alertType: zone, severity: low}
"#,
        ))
        .await;

    assert!(engine.evaluate(event_at(22.3, 114.2, 0)).await.is_empty());
    assert!(engine.evaluate(event_at(22.3, 114.2, 1)).await.is_empty());

    let state = engine.state_of("bad-zone").await.unwrap();
    assert_eq!(state.recent_events.len(), 2);
    assert_eq!(engine.active_workers().await, 1);
}

// ── Hot update ──────────────────────────────────────────────────────

#[tokio::test]
async fn hot_update_diffs_by_id() {
    let engine = engine();
    let diff = engine
        .hot_update_rules(vec![speeding("a", 1, false), speeding("b", 2, false)])
        .await;
    assert_eq!(diff.added.len(), 2);

    let diff = engine
        .hot_update_rules(vec![speeding("b", 5, false), speeding("c", 3, false)])
        .await;
    assert_eq!(diff.removed, vec!["a".to_string()]);
    assert_eq!(diff.added, vec!["c".to_string()]);
    assert_eq!(diff.updated, vec!["b".to_string()]);
    assert_eq!(diff.unchanged, 0);

    let rules = engine.rules().await;
    let order: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, vec!["b", "c"]);
    assert!(!engine.has_state("a").await);

    let diff = engine
        .hot_update_rules(vec![speeding("b", 5, false), speeding("c", 3, false)])
        .await;
    assert!(diff.is_noop());
    assert_eq!(diff.unchanged, 2);
}

#[tokio::test]
async fn hot_update_rule_upserts() {
    let engine = engine();
    let first = engine.hot_update_rule(speeding("a", 1, false)).await;
    assert_eq!(first.added, vec!["a".to_string()]);

    let same = engine.hot_update_rule(speeding("a", 1, false)).await;
    assert!(same.is_noop());

    let changed = engine.hot_update_rule(speeding("a", 9, true)).await;
    assert_eq!(changed.updated, vec!["a".to_string()]);
    assert!(engine.rules().await[0].exclusive);
}

#[tokio::test]
async fn removed_then_readded_rule_starts_fresh() {
    let engine = engine();
    engine.hot_update_rules(vec![counting("busy", 2)]).await;

    assert!(engine.evaluate(event_at(22.3, 114.2, 0)).await.is_empty());
    assert_eq!(engine.state_of("busy").await.unwrap().recent_events.len(), 1);

    engine.hot_update_rules(Vec::new()).await;
    assert!(!engine.has_state("busy").await);
    assert_eq!(engine.active_workers().await, 0);

    engine.hot_update_rules(vec![counting("busy", 2)]).await;
    assert!(engine.state_of("busy").await.unwrap().is_empty());
    assert!(engine.evaluate(event_at(22.3, 114.2, 10)).await.is_empty());
}

#[tokio::test]
async fn content_update_preserves_state() {
    let engine = engine();
    engine.hot_update_rules(vec![counting("busy", 3)]).await;

    assert!(engine.evaluate(event_at(22.3, 114.2, 0)).await.is_empty());
    assert!(engine.evaluate(event_at(22.3, 114.2, 10)).await.is_empty());

    // Lower the threshold; the two events already seen still count.
    let diff = engine.hot_update_rules(vec![counting("busy", 2)]).await;
    assert_eq!(diff.updated, vec!["busy".to_string()]);
    assert_eq!(engine.state_of("busy").await.unwrap().recent_events.len(), 2);

    assert_eq!(engine.evaluate(event_at(22.3, 114.2, 20)).await.len(), 1);
}

#[tokio::test]
async fn disabled_rule_has_state_but_no_worker() {
    let engine = engine();
    let mut off = speeding("off", 1, false);
    off.enabled = false;
    engine.hot_update_rules(vec![off.clone()]).await;

    assert!(engine.evaluate(fast_event("v1")).await.is_empty());
    assert!(engine.has_state("off").await);
    assert_eq!(engine.active_workers().await, 0);

    off.enabled = true;
    engine.hot_update_rule(off).await;
    assert_eq!(engine.active_workers().await, 1);
    assert_eq!(engine.evaluate(fast_event("v1")).await.len(), 1);
}

#[tokio::test]
async fn workers_start_lazily() {
    let engine = RuleEngine::with_rules(
        Arc::new(EvalContext::new()),
        EngineSettings::default(),
        vec![speeding("a", 1, false), speeding("a", 2, false)],
    );
    assert_eq!(engine.active_workers().await, 0);
    assert_eq!(engine.rules().await.len(), 1);
    assert_eq!(engine.rules().await[0].priority, 2);

    assert_eq!(engine.evaluate(fast_event("v1")).await.len(), 1);
    assert_eq!(engine.active_workers().await, 1);
}

#[tokio::test]
async fn shutdown_stops_workers() {
    let engine = engine();
    engine
        .hot_update_rules(vec![speeding("a", 1, false), speeding("b", 1, false)])
        .await;
    engine.evaluate(fast_event("v1")).await;
    assert_eq!(engine.active_workers().await, 2);

    engine.shutdown().await;
    assert_eq!(engine.active_workers().await, 0);
    assert!(engine.has_state("a").await);
}

#[tokio::test(flavor = "current_thread")]
async fn busy_rule_does_not_stall_other_rules() {
    let engine = RuleEngine::new(
        Arc::new(EvalContext::new()),
        EngineSettings {
            settle_timeout: Duration::from_millis(150),
            join_timeout: Duration::from_millis(200),
        },
    );
    engine
        .hot_update_rules(vec![speeding("slow", 1, false), speeding("fast", 2, false)])
        .await;
    assert_eq!(ids(&engine.evaluate(fast_event("v1")).await), vec!["fast", "slow"]);

    // Keep the slow rule's state busy from another thread.
    let state = Arc::clone(&engine.topology.read().await.states["slow"]);
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let holder = std::thread::spawn(move || {
        let _guard = state.lock().unwrap();
        locked_tx.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(600));
    });
    locked_rx.recv().unwrap();

    let started = std::time::Instant::now();
    let alerts = engine.evaluate(fast_event("v2")).await;
    assert_eq!(ids(&alerts), vec!["fast"]);
    assert!(started.elapsed() < Duration::from_millis(500));

    holder.join().unwrap();
    assert_eq!(ids(&engine.evaluate(fast_event("v3")).await), vec!["fast", "slow"]);
    engine.shutdown().await;
}

#[tokio::test]
async fn concurrent_evaluations_keep_their_own_alerts() {
    let engine = Arc::new(engine());
    engine.hot_update_rules(vec![speeding("a", 1, false)]).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.evaluate(fast_event(&format!("v{i}"))).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let alerts = handle.await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity_id, format!("v{i}"));
    }
}
