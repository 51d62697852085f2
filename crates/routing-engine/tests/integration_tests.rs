//! Integration tests for the routing engine
//!
//! These tests drive the public engine API the way a connection layer would:
//! agents and visitors connect, get routed, and disconnect, while the
//! dispatcher's fairness, tiering and capacity guarantees are checked.

use engage_routing::prelude::*;
use pretty_assertions::assert_eq;

fn create_test_engine() -> RoutingEngine {
    RoutingEngine::new(EngineConfig::default()).expect("default config is valid")
}

fn add_agent(engine: &RoutingEngine, id: &str, capacity: u32) {
    engine.register_agent(
        AgentId::from(id),
        ConnectionId::from(format!("conn-{}", id)),
        AgentProfile::new(id.to_uppercase(), capacity),
    );
}

fn add_visitor(engine: &RoutingEngine, id: &str, url: &str) {
    engine.register_visitor(
        VisitorId::from(id),
        ConnectionId::from(format!("conn-{}", id)),
        OrganizationId::from("acme"),
        url,
    );
}

/// Pool `support` for /docs/**, pool `sales` for /pricing*, default `general`
fn acme_config() -> OrganizationRoutingConfig {
    OrganizationRoutingConfig::new(
        "acme",
        Some(PoolId::from("general")),
        vec![
            RoutingRule::with_patterns("docs", "*", "/docs/**", "support", 10),
            RoutingRule::with_patterns("pricing", "*.acme.com", "/pricing*", "sales", 5),
        ],
    )
    .expect("rules are valid")
}

fn selected(engine: &RoutingEngine, pool: &str) -> Option<String> {
    engine
        .select_agent(Some(&PoolId::from(pool)), None)
        .map(|agent| agent.agent_id.to_string())
}

#[test]
fn test_tier_precedence() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 1);
    add_agent(&engine, "b", 1);
    engine.set_membership(&"a".into(), vec![PoolMembership::new("p", 1)]).unwrap();
    engine.set_membership(&"b".into(), vec![PoolMembership::new("p", 2)]).unwrap();

    // Repeated reads never leak to the overflow tier
    for _ in 0..3 {
        assert_eq!(selected(&engine, "p"), Some("a".to_string()));
    }

    add_visitor(&engine, "v1", "/");
    assert!(engine.assign_visitor(&"v1".into(), &"a".into()));
    assert_eq!(selected(&engine, "p"), Some("b".to_string()));
}

#[test]
fn test_example_scenario_away_primary() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 1);
    add_agent(&engine, "b", 1);
    engine.set_membership(&"a".into(), vec![PoolMembership::primary("p")]).unwrap();
    engine.set_membership(&"b".into(), vec![PoolMembership::new("p", 2)]).unwrap();

    add_visitor(&engine, "v1", "/");
    assert!(engine.assign_visitor(&"v1".into(), &"a".into()));
    assert_eq!(selected(&engine, "p"), Some("b".to_string()));

    assert!(engine.set_agent_status(&"a".into(), AgentStatus::Away));
    assert_eq!(selected(&engine, "p"), Some("b".to_string()));
}

#[test]
fn test_round_robin_fairness() {
    let engine = create_test_engine();
    let ids = ["a", "b", "c", "d"];
    for id in ids {
        add_agent(&engine, id, 3);
    }

    let mut picked = Vec::new();
    for n in 0..ids.len() {
        let visitor = format!("v{}", n);
        add_visitor(&engine, &visitor, "/");
        let selection = engine.route_visitor(&visitor.as_str().into(), None).unwrap();
        picked.push(selection.agent.agent_id.to_string());
    }

    picked.sort();
    picked.dedup();
    assert_eq!(picked.len(), ids.len());
}

#[test]
fn test_repeatable_ordering_across_rounds() {
    let engine = create_test_engine();
    for id in ["a", "b", "c"] {
        add_agent(&engine, id, 2);
    }

    let mut rounds = Vec::new();
    for round in 0..2 {
        let mut order = Vec::new();
        for n in 0..3 {
            let visitor = format!("r{}-v{}", round, n);
            add_visitor(&engine, &visitor, "/");
            let selection = engine.route_visitor(&visitor.as_str().into(), None).unwrap();
            order.push(selection.agent.agent_id.to_string());
            // Low traffic: the visitor leaves before the next one arrives
            engine.unregister_visitor(&visitor.as_str().into());
        }
        rounds.push(order);
    }

    assert_eq!(rounds[0], vec!["a", "b", "c"]);
    assert_eq!(rounds[0], rounds[1]);
}

#[test]
fn test_least_connections_fallback() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 5);
    add_agent(&engine, "b", 5);

    for (visitor, agent) in [("v1", "a"), ("v2", "a"), ("v3", "a"), ("v4", "b")] {
        add_visitor(&engine, visitor, "/");
        assert!(engine.assign_visitor(&visitor.into(), &agent.into()));
    }

    let next = engine.select_agent(None, None).unwrap();
    assert_eq!(next.agent_id, AgentId::from("b"));
    assert_eq!(next.load(), 1);
}

#[test]
fn test_status_filtering() {
    let engine = create_test_engine();
    add_agent(&engine, "solo", 3);
    engine.set_membership(&"solo".into(), vec![PoolMembership::primary("p")]).unwrap();

    for status in [AgentStatus::Away, AgentStatus::Offline] {
        assert!(engine.set_agent_status(&"solo".into(), status));
        assert!(engine.select_agent(None, None).is_none());
        assert!(engine.select_agent(Some(&PoolId::from("p")), None).is_none());
    }

    assert!(engine.set_agent_status(&"solo".into(), AgentStatus::Idle));
    add_visitor(&engine, "v1", "/");
    assert!(engine.set_agent_in_call(&"solo".into(), Some("v1".into())));
    assert_eq!(engine.agent(&"solo".into()).unwrap().status(), AgentStatus::InCall);
    assert!(engine.select_agent(None, None).is_none());

    // InCall can only come from a call
    assert!(engine.set_agent_in_call(&"solo".into(), None));
    assert!(!engine.set_agent_status(&"solo".into(), AgentStatus::InCall));
    assert_eq!(selected(&engine, "p"), Some("solo".to_string()));
}

#[test]
fn test_exclude_skips_rejecting_agent() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 1);
    assert!(engine.select_agent(None, Some(&"a".into())).is_none());

    add_agent(&engine, "b", 1);
    assert_eq!(
        engine.select_agent(None, Some(&"a".into())).unwrap().agent_id,
        AgentId::from("b")
    );
}

#[test]
fn test_capacity_invariant_holds() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 2);

    for n in 0..4 {
        add_visitor(&engine, &format!("v{}", n), "/");
    }

    assert!(engine.assign_visitor(&"v0".into(), &"a".into()));
    assert!(engine.route_visitor(&"v1".into(), None).is_some());
    assert!(!engine.assign_visitor(&"v2".into(), &"a".into()));
    assert!(engine.route_visitor(&"v3".into(), None).is_none());

    let agent = engine.agent(&"a".into()).unwrap();
    assert_eq!(agent.load(), 2);
    assert!(agent.load() <= agent.profile.max_concurrent_assignments as usize);
    assert_eq!(agent.status(), AgentStatus::InSimulation);
    assert_eq!(engine.unassigned_visitors().len(), 2);
}

#[test]
fn test_url_rules_drive_pool_selection() {
    let engine = create_test_engine();
    engine.set_org_config(acme_config()).unwrap();
    add_agent(&engine, "sam", 2);
    add_agent(&engine, "sue", 2);
    add_agent(&engine, "gus", 2);
    engine.set_membership(&"sam".into(), vec![PoolMembership::primary("sales")]).unwrap();
    engine.set_membership(&"sue".into(), vec![PoolMembership::primary("support")]).unwrap();
    engine.set_membership(&"gus".into(), vec![PoolMembership::primary("general")]).unwrap();

    let org = OrganizationId::from("acme");
    assert_eq!(engine.resolve_pool(&org, "https://www.acme.com/pricing/teams"), Some(PoolId::from("sales")));
    assert_eq!(engine.resolve_pool(&org, "https://acme.com/docs/a/b"), Some(PoolId::from("support")));
    assert_eq!(engine.resolve_pool(&org, "https://acme.com/blog"), Some(PoolId::from("general")));
    assert_eq!(engine.resolve_pool(&"unknown".into(), "https://acme.com/docs"), None);

    let selection = engine
        .select_agent_for_visitor(&org, "https://acme.com/docs/setup", None)
        .unwrap();
    assert_eq!(selection.agent.agent_id, AgentId::from("sue"));
    assert_eq!(selection.pool_id, Some(PoolId::from("support")));

    add_visitor(&engine, "v1", "https://www.acme.com/pricing");
    let routed = engine.route_visitor(&"v1".into(), None).unwrap();
    assert_eq!(routed.agent.agent_id, AgentId::from("sam"));
    assert_eq!(engine.visitor(&"v1".into()).unwrap().matched_pool_id, Some(PoolId::from("sales")));
}

#[test]
fn test_exhausted_pool_falls_back_to_any_agent() {
    let engine = create_test_engine();
    engine.set_org_config(acme_config()).unwrap();
    add_agent(&engine, "sue", 1);
    add_agent(&engine, "gus", 1);
    engine.set_membership(&"sue".into(), vec![PoolMembership::primary("support")]).unwrap();

    add_visitor(&engine, "v1", "https://acme.com/docs/one");
    add_visitor(&engine, "v2", "https://acme.com/docs/two");

    let first = engine.route_visitor(&"v1".into(), None).unwrap();
    assert_eq!(first.agent.agent_id, AgentId::from("sue"));

    let second = engine.route_visitor(&"v2".into(), None).unwrap();
    assert_eq!(second.agent.agent_id, AgentId::from("gus"));
    assert_eq!(second.pool_id, None);
}

#[test]
fn test_query_param_conditions() {
    let engine = create_test_engine();
    let config = OrganizationRoutingConfig::new(
        "acme",
        None,
        vec![
            RoutingRule::with_conditions(
                "enterprise",
                vec![
                    RoutingCondition::domain(MatchOperator::EndsWith, "acme.com"),
                    RoutingCondition::query_param("plan", MatchOperator::IsExactly, "enterprise"),
                ],
                "enterprise",
                20,
            ),
            RoutingRule::with_conditions(
                "not-partner",
                vec![RoutingCondition::query_param("ref", MatchOperator::DoesNotContain, "partner")],
                "direct",
                10,
            ),
        ],
    )
    .unwrap();
    engine.set_org_config(config).unwrap();

    let org = OrganizationId::from("acme");
    assert_eq!(engine.resolve_pool(&org, "https://shop.ACME.com/?plan=Enterprise"), Some(PoolId::from("enterprise")));
    // A missing parameter satisfies does_not_contain only
    assert_eq!(engine.resolve_pool(&org, "https://acme.com/"), Some(PoolId::from("direct")));
    assert_eq!(engine.resolve_pool(&org, "/landing?ref=partner-42"), None);
    assert_eq!(engine.resolve_pool(&org, "/landing?ref=newsletter"), Some(PoolId::from("direct")));
}

#[test]
fn test_org_config_last_write_wins() {
    let engine = create_test_engine();
    engine.set_org_config(acme_config()).unwrap();

    let replacement = OrganizationRoutingConfig::new(
        "acme",
        None,
        vec![
            RoutingRule::with_patterns("old", "*", "/docs/**", "legacy", 50).inactive(),
            RoutingRule::with_patterns("docs", "*", "/docs/**", "docs-v2", 1),
        ],
    )
    .unwrap();
    engine.set_org_config(replacement).unwrap();

    let org = OrganizationId::from("acme");
    assert_eq!(engine.resolve_pool(&org, "/docs/intro"), Some(PoolId::from("docs-v2")));
    assert_eq!(engine.resolve_pool(&org, "/pricing"), None);
    assert_eq!(engine.org_config(&org).unwrap().rules.len(), 1);

    assert!(engine.remove_org_config(&org));
    assert_eq!(engine.resolve_pool(&org, "/docs/intro"), None);
}

#[test]
fn test_membership_replace_and_primary_pool() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 2);
    let a = AgentId::from("a");

    engine
        .set_membership(&a, vec![PoolMembership::primary("sales"), PoolMembership::new("general", 3)])
        .unwrap();
    assert_eq!(engine.agent_primary_pool(&a), Some(PoolId::from("sales")));
    assert_eq!(engine.priority_rank(&a, &"general".into()), 3);
    assert_eq!(engine.priority_rank(&a, &"support".into()), 1);

    engine.set_membership(&a, vec![PoolMembership::new("support", 2)]).unwrap();
    assert!(engine.agents_in_pool(&"sales".into()).is_empty());
    assert_eq!(engine.agent_primary_pool(&a), Some(PoolId::from("support")));

    let rank_zero = engine.set_membership(&a, vec![PoolMembership::new("sales", 0)]);
    assert!(matches!(rank_zero, Err(RoutingError::InvalidInput(_))));
    // A rejected replacement leaves the previous set in place
    assert_eq!(engine.agent_pools(&a), vec![PoolMembership::new("support", 2)]);

    engine.add_agent_to_pool(&a, &"sales".into(), 1).unwrap();
    assert_eq!(engine.agents_in_pool(&"sales".into())[0].agent_id, a);
    assert!(engine.remove_agent_from_pool(&a, &"sales".into()));
    assert!(!engine.remove_agent_from_pool(&a, &"sales".into()));
}

#[test]
fn test_agent_reconnect_keeps_state() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 3);
    for visitor in ["v1", "v2", "v3"] {
        add_visitor(&engine, visitor, "/");
        assert!(engine.assign_visitor(&visitor.into(), &"a".into()));
    }

    let registration = engine.register_agent(
        "a".into(),
        "conn-a-2".into(),
        AgentProfile::new("A", 1),
    );
    assert!(registration.reconnected);
    assert_eq!(registration.agent.connection_id, ConnectionId::from("conn-a-2"));
    assert_eq!(registration.agent.current_assignments, vec![VisitorId::from("v1")]);
    assert_eq!(registration.detached_visitors, vec![VisitorId::from("v2"), VisitorId::from("v3")]);
    assert_eq!(registration.agent.status(), AgentStatus::InSimulation);

    assert_eq!(engine.visitor(&"v2".into()).unwrap().assigned_agent_id, None);
    assert_eq!(engine.visitor(&"v1".into()).unwrap().assigned_agent_id, Some(AgentId::from("a")));
    assert!(engine.agent_by_connection(&"conn-a".into()).is_none());
    assert!(engine.agent_by_connection(&"conn-a-2".into()).is_some());
}

#[test]
fn test_unregister_agent_orphans_visitors() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 3);
    engine.set_membership(&"a".into(), vec![PoolMembership::primary("p")]).unwrap();
    for visitor in ["v1", "v2"] {
        add_visitor(&engine, visitor, "/");
        assert!(engine.assign_visitor(&visitor.into(), &"a".into()));
    }

    let affected = engine.unregister_agent(&"a".into());
    assert_eq!(affected, vec![VisitorId::from("v1"), VisitorId::from("v2")]);
    assert!(engine.agent(&"a".into()).is_none());
    assert!(engine.agents_in_pool(&"p".into()).is_empty());
    assert_eq!(engine.unassigned_visitors().len(), 2);

    assert!(engine.unregister_agent(&"a".into()).is_empty());
}

#[test]
fn test_visitor_lifecycle() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 2);
    add_visitor(&engine, "v1", "https://acme.com/");

    let visitor = engine.visitor(&"v1".into()).unwrap();
    assert_eq!(visitor.state, VisitorState::Browsing);
    assert!(visitor.first_interaction_at.is_none());

    engine.route_visitor(&"v1".into(), None).unwrap();
    let visitor = engine.visitor(&"v1".into()).unwrap();
    assert_eq!(visitor.state, VisitorState::WatchingSimulation);
    let first_seen = visitor.first_interaction_at.unwrap();

    assert!(engine.update_visitor_url(&"v1".into(), "https://acme.com/pricing"));
    assert!(engine.update_visitor_state(&"v1".into(), VisitorState::Browsing));
    assert!(engine.update_visitor_state(&"v1".into(), VisitorState::WatchingSimulation));
    let visitor = engine.visitor_by_connection(&"conn-v1".into()).unwrap();
    assert_eq!(visitor.current_url, "https://acme.com/pricing");
    assert_eq!(visitor.first_interaction_at, Some(first_seen));

    assert!(engine.remove_visitor_from_agent(&"a".into(), &"v1".into()));
    assert_eq!(engine.agent(&"a".into()).unwrap().status(), AgentStatus::Idle);
    assert_eq!(engine.visitor(&"v1".into()).unwrap().assigned_agent_id, None);

    assert!(engine.unregister_visitor(&"v1".into()).is_some());
    assert!(engine.unregister_visitor(&"v1".into()).is_none());
    assert!(!engine.update_visitor_url(&"v1".into(), "/"));
}

#[test]
fn test_assign_waiting_visitors_on_login() {
    let engine = create_test_engine();
    for n in 0..3 {
        let visitor = format!("v{}", n);
        add_visitor(&engine, &visitor, "/");
        assert!(engine.route_visitor(&visitor.as_str().into(), None).is_none());
    }

    add_agent(&engine, "a", 2);
    let placed = engine.assign_waiting_visitors(&"a".into());
    assert_eq!(
        placed,
        vec![(VisitorId::from("v0"), None), (VisitorId::from("v1"), None)]
    );
    assert_eq!(engine.unassigned_visitors()[0].visitor_id, VisitorId::from("v2"));
    assert!(engine.assign_waiting_visitors(&"ghost".into()).is_empty());
}

#[test]
fn test_stats_snapshot() {
    let engine = create_test_engine();
    add_agent(&engine, "a", 3);
    add_agent(&engine, "b", 3);
    add_agent(&engine, "c", 3);
    engine.set_membership(&"a".into(), vec![PoolMembership::primary("p")]).unwrap();
    engine.set_membership(&"b".into(), vec![PoolMembership::primary("p"), PoolMembership::new("q", 2)]).unwrap();
    assert!(engine.set_agent_status(&"c".into(), AgentStatus::Offline));

    for (visitor, agent) in [("v1", "a"), ("v2", "b"), ("v3", "b")] {
        add_visitor(&engine, visitor, "/");
        assert!(engine.assign_visitor(&visitor.into(), &agent.into()));
    }
    add_visitor(&engine, "v4", "/");
    engine.create_request(&"v4".into(), &"a".into(), &"acme".into(), "/").unwrap();

    let stats = engine.stats();
    assert_eq!(stats.total_agents, 3);
    assert_eq!(stats.online_agents, 2);
    assert_eq!(stats.total_assignments, 3);
    assert_eq!(stats.total_visitors, 4);
    assert_eq!(stats.active_calls, 0);
    assert_eq!(stats.pending_requests, 1);
    assert_eq!(stats.pool_count, 2);
    assert_eq!(stats.agents_by_pool.get(&PoolId::from("p")), Some(&2));
    assert_eq!(stats.agents_by_pool.get(&PoolId::from("q")), Some(&1));

    assert_eq!(engine.agent_stats(&"a".into()), Some(AgentPoolStats { pool_visitors: 3 }));
    assert_eq!(engine.agent_stats(&"c".into()), Some(AgentPoolStats { pool_visitors: 0 }));
    assert_eq!(engine.agent_stats(&"ghost".into()), None);
}

#[test]
fn test_scenario_file_seeds_engine() {
    let path = std::env::temp_dir().join(format!("routing-scenario-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "organizations": [
                { "organization_id": "acme", "default_pool_id": "general",
                  "rules": [ { "id": "docs", "path_pattern": "/docs/**", "pool_id": "support", "priority": 10 } ] }
            ],
            "agents": [
                { "agent_id": "sue", "display_name": "Sue", "pools": [ { "pool_id": "support" } ] },
                { "agent_id": "gus", "display_name": "Gus", "max_concurrent_assignments": 1,
                  "pools": [ { "pool_id": "general" }, { "pool_id": "support", "priority_rank": 2 } ] }
            ]
        }"#,
    )
    .unwrap();

    let scenario = RoutingScenario::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let engine = create_test_engine();
    scenario.apply(&engine).unwrap();

    let selection = engine
        .select_agent_for_visitor(&"acme".into(), "https://acme.com/docs/start", None)
        .unwrap();
    assert_eq!(selection.agent.agent_id, AgentId::from("sue"));

    let overflow = engine
        .select_agent_for_visitor(&"acme".into(), "https://acme.com/docs/start", Some(&"sue".into()))
        .unwrap();
    assert_eq!(overflow.agent.agent_id, AgentId::from("gus"));
    assert_eq!(overflow.pool_id, Some(PoolId::from("support")));
}
