use rusqlite::Connection;
use serde_json::json;
use tram_core::db::open_db_in_memory;
use tram_core::model::route::RouteDraft;
use tram_core::model::stop::Stop;
use tram_core::repo::connection_repo::SqliteConnectionGraph;
use tram_core::repo::stop_repo::SqliteStopStore;
use tram_core::repo::EntityRef;
use tram_core::service::connection_service::ConnectionService;
use tram_core::service::stop_service::StopService;
use tram_core::{RegistryError, RouteService, ValidationIssue};

struct Network {
    oak: Stop,
    pine: Stop,
    elm: Stop,
    ash: Stop,
}

/// Line graph `Oak - Pine - Elm` plus an isolated `Ash`.
fn seed_network(conn: &Connection) -> Network {
    let stops = StopService::new(SqliteStopStore::try_new(conn).unwrap());
    let network = Network {
        oak: stops.create_stop("Oak").unwrap(),
        pine: stops.create_stop("Pine").unwrap(),
        elm: stops.create_stop("Elm").unwrap(),
        ash: stops.create_stop("Ash").unwrap(),
    };
    let graph = ConnectionService::new(
        SqliteConnectionGraph::try_new(conn).unwrap(),
        SqliteStopStore::try_new(conn).unwrap(),
    );
    graph.connect(network.oak.id, network.pine.id, None).unwrap();
    graph.connect(network.pine.id, network.elm.id, Some(4)).unwrap();
    network
}

fn issues(err: RegistryError) -> Vec<ValidationIssue> {
    match err {
        RegistryError::Invalid(failure) => failure.into_issues(),
        other => panic!("expected validation failure, got {other}"),
    }
}

fn route_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM routes;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_route_persists_caller_order_at_dense_positions() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let detail = routes
        .create_route(&RouteDraft::new(7, vec![net.elm.id, net.pine.id, net.oak.id]))
        .unwrap();
    assert_eq!(detail.number, 7);
    assert_eq!(detail.name, "Elm - Oak");
    assert_eq!(detail.stop_ids(), vec![net.elm.id, net.pine.id, net.oak.id]);

    let rows = conn
        .prepare("SELECT stop_id, position FROM route_stops WHERE route_id = ?1 ORDER BY position;")
        .unwrap()
        .query_map([detail.id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(rows, vec![(net.elm.id, 1), (net.pine.id, 2), (net.oak.id, 3)]);
}

#[test]
fn adjacency_is_checked_in_given_order_only() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let found = issues(
        routes
            .create_route(&RouteDraft::new(1, vec![net.oak.id, net.elm.id, net.pine.id]))
            .unwrap_err(),
    );
    assert_eq!(
        found,
        vec![ValidationIssue::StopsNotConnected {
            from: net.oak.id,
            to: net.elm.id,
            position: 1,
        }]
    );
    assert_eq!(route_count(&conn), 0);
}

#[test]
fn routes_need_at_least_two_stops() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let single = issues(
        routes
            .create_route(&RouteDraft::new(1, vec![net.oak.id]))
            .unwrap_err(),
    );
    assert_eq!(single, vec![ValidationIssue::TooFewStops { count: 1 }]);

    let empty = issues(routes.create_route(&RouteDraft::new(1, vec![])).unwrap_err());
    assert_eq!(empty, vec![ValidationIssue::TooFewStops { count: 0 }]);
    assert_eq!(route_count(&conn), 0);
}

#[test]
fn every_issue_is_reported_in_one_failure() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    routes
        .create_route(&RouteDraft::new(5, vec![net.oak.id, net.pine.id]))
        .unwrap();

    let found = issues(
        routes
            .create_route(&RouteDraft::new(
                5,
                vec![net.oak.id, 999, net.pine.id, net.ash.id],
            ))
            .unwrap_err(),
    );
    assert_eq!(
        found,
        vec![
            ValidationIssue::DuplicateRouteNumber { number: 5 },
            ValidationIssue::UnknownStop { stop: 999 },
            ValidationIssue::StopsNotConnected {
                from: net.pine.id,
                to: net.ash.id,
                position: 3,
            },
        ]
    );
    assert_eq!(route_count(&conn), 1);
}

#[test]
fn failed_update_leaves_previous_membership_untouched() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    let original = routes
        .create_route(&RouteDraft::new(3, vec![net.oak.id, net.pine.id, net.elm.id]))
        .unwrap();

    let err = routes
        .update_route(3, &RouteDraft::new(4, vec![net.oak.id, net.ash.id]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Invalid(_)));

    let reloaded = routes.get_route(3).unwrap();
    assert_eq!(reloaded, original);
    assert!(matches!(
        routes.get_route(4),
        Err(RegistryError::NotFound(EntityRef::Route(4)))
    ));
}

#[test]
fn update_replaces_membership_and_recomputes_name() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    let created = routes
        .create_route(&RouteDraft::new(9, vec![net.elm.id, net.pine.id, net.oak.id]))
        .unwrap();
    assert_eq!(created.name, "Elm - Oak");

    let updated = routes
        .update_route(9, &RouteDraft::new(9, vec![net.oak.id, net.pine.id, net.elm.id]))
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Oak - Elm");
    assert_eq!(updated.stop_ids(), vec![net.oak.id, net.pine.id, net.elm.id]);
}

#[test]
fn update_can_renumber_but_not_onto_another_route() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    let first = routes
        .create_route(&RouteDraft::new(1, vec![net.oak.id, net.pine.id]))
        .unwrap();
    routes
        .create_route(&RouteDraft::new(2, vec![net.pine.id, net.elm.id]))
        .unwrap();

    let clash = issues(
        routes
            .update_route(1, &RouteDraft::new(2, vec![net.oak.id, net.pine.id]))
            .unwrap_err(),
    );
    assert_eq!(clash, vec![ValidationIssue::DuplicateRouteNumber { number: 2 }]);

    let renumbered = routes
        .update_route(1, &RouteDraft::new(11, vec![net.pine.id, net.oak.id]))
        .unwrap();
    assert_eq!(renumbered.id, first.id);
    assert_eq!(renumbered.number, 11);
    assert!(matches!(
        routes.get_route(1),
        Err(RegistryError::NotFound(EntityRef::Route(1)))
    ));
}

#[test]
fn updating_missing_route_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    assert!(matches!(
        routes.update_route(42, &RouteDraft::new(42, vec![net.oak.id, net.pine.id])),
        Err(RegistryError::NotFound(EntityRef::Route(42)))
    ));
    assert!(matches!(
        routes.update_route_from_json(42, &json!({"number": "x"})),
        Err(RegistryError::NotFound(EntityRef::Route(42)))
    ));
}

#[test]
fn removing_a_connection_later_keeps_existing_routes() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    routes
        .create_route(&RouteDraft::new(6, vec![net.oak.id, net.pine.id, net.elm.id]))
        .unwrap();

    let graph = ConnectionService::new(
        SqliteConnectionGraph::try_new(&conn).unwrap(),
        SqliteStopStore::try_new(&conn).unwrap(),
    );
    let edge = graph
        .list_connections()
        .unwrap()
        .into_iter()
        .find(|edge| edge.joins(net.pine.id, net.elm.id))
        .unwrap();
    graph.disconnect(edge.id).unwrap();

    let detail = routes.get_route(6).unwrap();
    assert_eq!(detail.stop_ids(), vec![net.oak.id, net.pine.id, net.elm.id]);

    let resubmitted = issues(
        routes
            .update_route(6, &RouteDraft::new(6, detail.stop_ids()))
            .unwrap_err(),
    );
    assert_eq!(
        resubmitted,
        vec![ValidationIssue::StopsNotConnected {
            from: net.pine.id,
            to: net.elm.id,
            position: 2,
        }]
    );
}

#[test]
fn payload_shape_issues_merge_with_semantic_issues() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let payload = json!({
        "number": 12,
        "stops": [{"id": net.oak.id, "name": "Oak"}, {"id": net.elm.id}],
    });
    let found = issues(routes.create_route_from_json(&payload).unwrap_err());
    assert_eq!(
        found,
        vec![
            ValidationIssue::UnexpectedField {
                path: "stops[0].name".to_string()
            },
            ValidationIssue::StopsNotConnected {
                from: net.oak.id,
                to: net.elm.id,
                position: 1,
            },
        ]
    );
    assert_eq!(route_count(&conn), 0);
}

#[test]
fn unreadable_payload_reports_shape_issues_only() {
    let conn = open_db_in_memory().unwrap();
    seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let found = issues(
        routes
            .create_route_from_json(&json!({"stops": [{"id": "one"}]}))
            .unwrap_err(),
    );
    assert!(found.contains(&ValidationIssue::MissingField {
        path: "number".to_string()
    }));
    assert!(found
        .iter()
        .any(|issue| matches!(issue, ValidationIssue::MalformedField { path, .. } if path == "stops[0].id")));
    assert_eq!(route_count(&conn), 0);
}

#[test]
fn well_formed_payload_creates_route() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let detail = routes
        .create_route_from_json(&json!({
            "number": 21,
            "stops": [{"id": net.pine.id}, {"id": net.oak.id}],
        }))
        .unwrap();
    assert_eq!(detail.name, "Pine - Oak");

    let updated = routes
        .update_route_from_json(
            21,
            &json!({"number": 22, "stops": [{"id": net.pine.id}, {"id": net.elm.id}]}),
        )
        .unwrap();
    assert_eq!(updated.number, 22);
    assert_eq!(updated.name, "Pine - Elm");
}

#[test]
fn validation_issues_serialize_with_codes() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let err = routes
        .create_route(&RouteDraft::new(3, vec![net.oak.id, net.ash.id]))
        .unwrap_err();
    let failure = err.validation().unwrap();
    let value = serde_json::to_value(failure.issues()).unwrap();
    assert_eq!(
        value,
        json!([{
            "code": "stops_not_connected",
            "from": net.oak.id,
            "to": net.ash.id,
            "position": 1,
        }])
    );
}

fn fail_second_membership_insert(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER fail_second_position
         BEFORE INSERT ON route_stops
         WHEN NEW.position = 2
         BEGIN
            SELECT RAISE(ABORT, 'membership write refused');
         END;",
    )
    .unwrap();
}

fn membership_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM route_stops;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn write_failure_during_create_leaves_no_route_behind() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    fail_second_membership_insert(&conn);
    let routes = RouteService::try_new(&conn).unwrap();

    let err = routes
        .create_route(&RouteDraft::new(7, vec![net.oak.id, net.pine.id]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Repo(_)), "unexpected error: {err}");
    assert!(!err.is_retryable());

    assert_eq!(route_count(&conn), 0);
    assert_eq!(membership_count(&conn), 0);
    assert!(matches!(
        routes.get_route(7),
        Err(RegistryError::NotFound(EntityRef::Route(7)))
    ));
}

#[test]
fn write_failure_during_update_restores_number_and_membership() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    let original = routes
        .create_route(&RouteDraft::new(1, vec![net.oak.id, net.pine.id]))
        .unwrap();
    fail_second_membership_insert(&conn);

    let err = routes
        .update_route(1, &RouteDraft::new(2, vec![net.pine.id, net.elm.id]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Repo(_)), "unexpected error: {err}");

    assert_eq!(routes.get_route(1).unwrap(), original);
    assert!(matches!(
        routes.get_route(2),
        Err(RegistryError::NotFound(EntityRef::Route(2)))
    ));
    assert_eq!(membership_count(&conn), 2);
}

#[test]
fn echoed_route_read_fields_are_ignored_on_update() {
    let conn = open_db_in_memory().unwrap();
    let net = seed_network(&conn);
    let routes = RouteService::try_new(&conn).unwrap();
    let created = routes
        .create_route(&RouteDraft::new(3, vec![net.oak.id, net.pine.id]))
        .unwrap();

    let updated = routes
        .update_route_from_json(
            3,
            &json!({
                "id": created.id,
                "name": created.name,
                "number": 3,
                "stops": [{"id": net.oak.id}, {"id": net.pine.id}, {"id": net.elm.id}],
            }),
        )
        .unwrap();
    assert_eq!(updated.name, "Oak - Elm");
    assert_eq!(updated.stop_ids(), vec![net.oak.id, net.pine.id, net.elm.id]);
}
