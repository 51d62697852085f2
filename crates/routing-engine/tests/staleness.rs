//! Staleness detection, reassignment and the background sweep

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use engage_routing::prelude::*;
use pretty_assertions::assert_eq;

fn engine_with_pool() -> RoutingEngine {
    let engine = RoutingEngine::new(EngineConfig::default()).unwrap();
    engine
        .set_org_config(OrganizationRoutingConfig::new("acme", Some(PoolId::from("p")), Vec::new()).unwrap())
        .unwrap();
    engine
}

fn add_agent(engine: &RoutingEngine, id: &str, capacity: u32, pool: Option<&str>) {
    engine.register_agent(id.into(), format!("conn-{}", id).into(), AgentProfile::new(id, capacity));
    if let Some(pool) = pool {
        engine.set_membership(&id.into(), vec![PoolMembership::primary(pool)]).unwrap();
    }
}

fn add_visitor(engine: &RoutingEngine, id: &str) {
    engine.register_visitor(id.into(), format!("conn-{}", id).into(), "acme".into(), "https://acme.com/");
}

#[test]
fn test_stale_agents_only_reports_idle() {
    let engine = engine_with_pool();
    for id in ["idle", "busy", "away", "presenting"] {
        add_agent(&engine, id, 2, Some("p"));
    }
    add_visitor(&engine, "v1");
    add_visitor(&engine, "v2");
    engine.set_agent_in_call(&"busy".into(), Some("v1".into()));
    engine.set_agent_status(&"away".into(), AgentStatus::Away);
    engine.assign_visitor(&"v2".into(), &"presenting".into());

    let later = Utc::now() + ChronoDuration::hours(6);
    let stale = engine.stale_agents_as_of(Duration::from_secs(60), later);
    assert_eq!(stale, vec![AgentId::from("idle")]);

    // Fresh heartbeats are not stale, and a pure read changes nothing
    assert!(engine.stale_agents(Duration::from_secs(60)).is_empty());
    assert_eq!(engine.agent(&"idle".into()).unwrap().status(), AgentStatus::Idle);
    assert!(!engine.heartbeat(&"ghost".into()));
}

#[test]
fn test_in_call_agent_is_never_stale() {
    let engine = engine_with_pool();
    add_agent(&engine, "a", 1, None);
    add_visitor(&engine, "v1");
    let offer = engine
        .create_request(&"v1".into(), &"a".into(), &"acme".into(), "/")
        .unwrap();
    engine.accept_request(&offer.request_id).unwrap();

    for hours in [1, 24, 24 * 365] {
        let later = Utc::now() + ChronoDuration::hours(hours);
        assert!(engine.stale_agents_as_of(Duration::from_millis(1), later).is_empty());
    }
}

#[test]
fn test_reassignment_stays_in_pool() {
    let engine = engine_with_pool();
    add_agent(&engine, "a", 3, Some("p"));
    add_agent(&engine, "b", 1, Some("p"));
    add_agent(&engine, "outsider", 5, Some("elsewhere"));

    for (visitor, agent) in [("v1", "a"), ("v2", "a"), ("v3", "b")] {
        add_visitor(&engine, visitor);
        assert!(engine.assign_visitor(&visitor.into(), &agent.into()));
    }

    engine.set_agent_status(&"a".into(), AgentStatus::Away);
    let outcome = engine.reassign_visitors(&"a".into(), None);

    assert!(outcome.reassigned.is_empty());
    assert_eq!(outcome.unassigned, vec![VisitorId::from("v1"), VisitorId::from("v2")]);
    assert!(engine.agent(&"outsider".into()).unwrap().current_assignments.is_empty());
    assert!(engine.agent(&"a".into()).unwrap().current_assignments.is_empty());
    assert_eq!(engine.visitor(&"v1".into()).unwrap().assigned_agent_id, None);
}

#[test]
fn test_reassignment_moves_visitors_and_spares_excluded() {
    let engine = engine_with_pool();
    add_agent(&engine, "a", 3, Some("p"));
    add_agent(&engine, "b", 3, Some("p"));

    for visitor in ["v1", "v2", "v3"] {
        add_visitor(&engine, visitor);
        assert!(engine.assign_visitor(&visitor.into(), &"a".into()));
    }

    let outcome = engine.reassign_visitors(&"a".into(), Some(&"v2".into()));
    assert_eq!(outcome.reassigned.get(&VisitorId::from("v1")), Some(&AgentId::from("b")));
    assert_eq!(outcome.reassigned.get(&VisitorId::from("v3")), Some(&AgentId::from("b")));
    assert!(outcome.unassigned.is_empty());

    let a = engine.agent(&"a".into()).unwrap();
    assert_eq!(a.current_assignments, vec![VisitorId::from("v2")]);
    assert_eq!(engine.visitor(&"v3".into()).unwrap().matched_pool_id, Some(PoolId::from("p")));

    let events = RoutingEvent::from_reassignment(&"a".into(), &outcome);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.agent_id() == &AgentId::from("b")));
}

#[test]
fn test_reassignment_keeps_visitor_on_call() {
    let engine = engine_with_pool();
    add_agent(&engine, "a", 3, Some("p"));
    add_agent(&engine, "b", 3, Some("p"));
    for visitor in ["v1", "v2"] {
        add_visitor(&engine, visitor);
        assert!(engine.assign_visitor(&visitor.into(), &"a".into()));
    }
    let offer = engine
        .create_request(&"v1".into(), &"a".into(), &"acme".into(), "/")
        .unwrap();
    engine.accept_request(&offer.request_id).unwrap();

    let outcome = engine.reassign_visitors(&"a".into(), None);
    assert_eq!(outcome.reassigned.len(), 1);
    assert_eq!(outcome.reassigned.get(&VisitorId::from("v2")), Some(&AgentId::from("b")));
    assert!(outcome.unassigned.is_empty());

    let a = engine.agent(&"a".into()).unwrap();
    assert_eq!(a.current_assignments, vec![VisitorId::from("v1")]);
    assert_eq!(a.status(), AgentStatus::InCall);
    let v1 = engine.visitor(&"v1".into()).unwrap();
    assert_eq!(v1.assigned_agent_id, Some(AgentId::from("a")));
    assert_eq!(v1.state, VisitorState::InCall);
}

#[test]
fn test_sweep_marks_away_without_feeding_stale_agents() {
    let engine = engine_with_pool();
    add_agent(&engine, "old-1", 2, Some("p"));
    add_agent(&engine, "old-2", 2, Some("p"));

    let later = Utc::now() + ChronoDuration::minutes(10);
    let sweeps = engine.sweep_stale_agents_as_of(Duration::from_secs(120), later);
    assert_eq!(sweeps.len(), 2);
    assert!(sweeps.iter().all(|s| s.outcome.is_empty()));

    for id in ["old-1", "old-2"] {
        assert_eq!(engine.agent(&id.into()).unwrap().status(), AgentStatus::Away);
    }
    assert!(engine.select_agent(Some(&PoolId::from("p")), None).is_none());

    // Already away: a second sweep finds nothing
    assert!(engine.sweep_stale_agents_as_of(Duration::from_secs(120), later).is_empty());
}

#[tokio::test]
async fn test_server_sweep_publishes_events() {
    let mut config = EngineConfig::default();
    config.agents.staleness_threshold_ms = 20;
    config.agents.staleness_sweep_interval_ms = 25;

    let engine = Arc::new(RoutingEngine::new(config).unwrap());
    add_agent(&engine, "sleepy", 2, None);

    let mut server = RoutingServerBuilder::new()
        .with_engine(Arc::clone(&engine))
        .build()
        .unwrap();
    let mut events = server.subscribe();
    server.start().await.unwrap();
    assert!(server.is_running());
    assert!(server.start().await.is_err());

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("sweep should run")
        .expect("channel open");
    assert_eq!(event, RoutingEvent::AgentMarkedAway { agent_id: "sleepy".into() });
    assert_eq!(engine.agent(&"sleepy".into()).unwrap().status(), AgentStatus::Away);

    server.stop().await.unwrap();
    assert!(!server.is_running());
}

#[tokio::test]
async fn test_sweep_now_without_subscribers() {
    let server = RoutingServer::new(EngineConfig::default()).unwrap();
    server.engine().register_agent("fresh".into(), "c1".into(), AgentProfile::new("Fresh", 1));
    assert!(server.sweep_now().is_empty());

    let missing = RoutingServerBuilder::new().build();
    assert!(matches!(missing, Err(RoutingError::Configuration(_))));
}
