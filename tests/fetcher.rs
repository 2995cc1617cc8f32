//! Data fetcher tests.
//!
//! Uses wiremock to mock the Alasco API and check how a property name
//! narrows every following request.

use alasco::{
    AlascoClient, Config, DataFetcher, EntityType, PARENT_ID_COLUMN, PARENT_TYPE_COLUMN,
    PROPERTY_ID_COLUMN,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer) -> DataFetcher {
    let config = Config::new("test-token", "test-key").with_base_url(server.uri());
    DataFetcher::new(AlascoClient::new(&config).unwrap())
}

fn page(data: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"data": data, "links": {"next": null}}))
}

fn record(id: &str, attributes: Value, relationships: &[(&str, &str)]) -> Value {
    let mut rels = serde_json::Map::new();
    for (name, related) in relationships {
        rels.insert((*name).to_string(), json!({"data": {"id": related}}));
    }
    json!({"id": id, "attributes": attributes, "relationships": rels})
}

async fn mount_list(server: &MockServer, route: &str, filter: (&str, &str), data: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param(filter.0, filter.1))
        .respond_with(page(data))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unknown_property_is_not_found() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Nowhere"),
        vec![],
    )
    .await;

    let err = fetcher(&server)
        .get_all_df(Some("Nowhere"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("0 matches"));
}

#[tokio::test]
async fn test_ambiguous_property_is_not_found() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Tower A"),
        vec![
            record("prop-1", json!({"name": "Tower A"}), &[]),
            record("prop-9", json!({"name": "Tower A"}), &[]),
        ],
    )
    .await;

    let err = fetcher(&server)
        .resolve_property("Tower A")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("2 matches"));
}

#[tokio::test]
async fn test_partial_name_matches_are_ignored() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Tower A"),
        vec![
            record("prop-1", json!({"name": "Tower A"}), &[]),
            record("prop-2", json!({"name": "Tower AB"}), &[]),
        ],
    )
    .await;

    let properties = fetcher(&server).resolve_property("Tower A").await.unwrap();
    assert_eq!(properties.ids(), vec!["prop-1"]);
}

#[tokio::test]
async fn test_property_scopes_every_fetch() {
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Tower A"),
        vec![record("prop-1", json!({"name": "Tower A"}), &[])],
    )
    .await;
    mount_list(
        &server,
        "/projects/",
        ("filter[property.in]", "prop-1"),
        vec![record("proj-1", json!({"name": "Shell"}), &[("property", "prop-1")])],
    )
    .await;
    mount_list(
        &server,
        "/contract_units/",
        ("filter[project.in]", "proj-1"),
        vec![record("cu-1", json!({"name": "Structure"}), &[("project", "proj-1")])],
    )
    .await;
    mount_list(
        &server,
        "/contracts/",
        ("filter[contract_unit.in]", "cu-1"),
        vec![
            record(
                "c-1",
                json!({"name": "Rohbau"}),
                &[("contract_unit", "cu-1"), ("contractor", "k-1")],
            ),
            record(
                "c-2",
                json!({"name": "Dach"}),
                &[("contract_unit", "cu-1"), ("contractor", "k-1")],
            ),
        ],
    )
    .await;
    mount_list(
        &server,
        "/contractors/",
        ("filter[id.in]", "k-1"),
        vec![record("k-1", json!({"name": "Bau GmbH"}), &[])],
    )
    .await;
    mount_list(
        &server,
        "/invoices/",
        ("filter[contract.in]", "c-1,c-2"),
        vec![record(
            "inv-1",
            json!({"invoice_number": "RE-001"}),
            &[("contract", "c-2")],
        )],
    )
    .await;
    mount_list(
        &server,
        "/change_orders/",
        ("filter[contract.in]", "c-1,c-2"),
        vec![],
    )
    .await;

    for (route, doc_id) in [
        ("/contracts/c-1/documents/", Some("doc-c1")),
        ("/contracts/c-2/documents/", None),
        ("/invoices/inv-1/documents/", Some("doc-i1")),
    ] {
        let data = doc_id
            .map(|id| vec![json!({"id": id, "attributes": {"name": "scan.pdf"}})])
            .unwrap_or_default();
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(page(data))
            .expect(1)
            .mount(&server)
            .await;
    }

    let tables = fetcher(&server).get_all_df(Some("Tower A")).await.unwrap();

    assert_eq!(tables.len(), EntityType::ALL.len());
    assert_eq!(tables.get(EntityType::Contracts).unwrap().len(), 2);
    assert_eq!(tables.get(EntityType::Contractors).unwrap().ids(), vec!["k-1"]);
    assert!(tables.get(EntityType::ChangeOrders).unwrap().is_empty());

    let documents = tables.get(EntityType::Documents).unwrap();
    assert_eq!(documents.ids(), vec!["doc-c1", "doc-i1"]);
    assert_eq!(
        documents.column_values(PARENT_TYPE_COLUMN),
        vec!["contract", "invoice"]
    );
    assert_eq!(documents.column_values(PARENT_ID_COLUMN), vec!["c-1", "inv-1"]);
    assert_eq!(
        documents.column_values(PROPERTY_ID_COLUMN),
        vec!["prop-1", "prop-1"]
    );
}

#[tokio::test]
async fn test_failing_entity_aborts_the_chain() {
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Tower A"),
        vec![record("prop-1", json!({"name": "Tower A"}), &[])],
    )
    .await;
    mount_list(
        &server,
        "/projects/",
        ("filter[property.in]", "prop-1"),
        vec![record("proj-1", json!({}), &[("property", "prop-1")])],
    )
    .await;
    mount_list(
        &server,
        "/contract_units/",
        ("filter[project.in]", "proj-1"),
        vec![record("cu-1", json!({}), &[("project", "proj-1")])],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/contracts/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/"))
        .respond_with(page(vec![]))
        .expect(0)
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .get_all_df(Some("Tower A"))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("contracts"));
}

#[tokio::test]
async fn test_empty_scope_sends_no_child_requests() {
    let server = MockServer::start().await;

    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Empty Lot"),
        vec![record("prop-7", json!({"name": "Empty Lot"}), &[])],
    )
    .await;
    mount_list(
        &server,
        "/projects/",
        ("filter[property.in]", "prop-7"),
        vec![],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/contracts/"))
        .respond_with(page(vec![]))
        .expect(0)
        .mount(&server)
        .await;

    let tables = fetcher(&server).get_all_df(Some("Empty Lot")).await.unwrap();

    assert_eq!(tables.get(EntityType::Properties).unwrap().len(), 1);
    for entity in [
        EntityType::Projects,
        EntityType::ContractUnits,
        EntityType::Contracts,
        EntityType::Contractors,
        EntityType::Invoices,
        EntityType::ChangeOrders,
        EntityType::Documents,
    ] {
        assert!(tables.get(entity).unwrap().is_empty(), "{entity} not empty");
    }
}

#[tokio::test]
async fn test_unscoped_fetch_reads_every_collection() {
    let server = MockServer::start().await;

    for route in [
        "/properties/",
        "/projects/",
        "/contract_units/",
        "/contracts/",
        "/contractors/",
        "/invoices/",
        "/change_orders/",
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(page(vec![]))
            .expect(1)
            .mount(&server)
            .await;
    }

    let tables = fetcher(&server).get_all_df(None).await.unwrap();
    assert_eq!(tables.len(), EntityType::ALL.len());
}

#[tokio::test]
async fn test_reporting_requests_ten_projects_at_a_time() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reporting/contract_units"))
        .respond_with(page(vec![record(
            "cu-1",
            json!({"budget": {"net": 100}}),
            &[("project", "proj-0")],
        )]))
        .expect(3)
        .mount(&server)
        .await;

    let project_ids: Vec<String> = (0..25).map(|i| format!("proj-{i}")).collect();
    let reporting = fetcher(&server).get_reporting(&project_ids).await.unwrap();

    assert_eq!(reporting.len(), 3);
    assert!(reporting.has_column("budget.net"));
}

#[tokio::test]
async fn test_reporting_without_projects_sends_nothing() {
    let server = MockServer::start().await;

    let reporting = fetcher(&server).get_reporting(&[]).await.unwrap();
    assert!(reporting.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_contracting_entities_filter_by_name() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        "/contracting_entities/",
        ("filter[name.contains]", "Holding"),
        vec![record("ce-1", json!({"name": "Tower Holding GmbH"}), &[])],
    )
    .await;

    let entities = fetcher(&server)
        .get_contracting_entities(Some("Holding"))
        .await
        .unwrap();

    assert_eq!(entities.ids(), vec!["ce-1"]);
    assert_eq!(
        entities.column_values("name"),
        vec!["Tower Holding GmbH"]
    );
}

#[tokio::test]
async fn test_contracting_entities_without_name_lists_all() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contracting_entities/"))
        .respond_with(page(vec![
            record("ce-1", json!({"name": "Tower Holding GmbH"}), &[]),
            record("ce-2", json!({"name": "Lofts KG"}), &[]),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let entities = fetcher(&server).get_contracting_entities(None).await.unwrap();

    assert_eq!(entities.ids(), vec!["ce-1", "ce-2"]);
    let request = &server.received_requests().await.unwrap()[0];
    assert!(request.url.query().is_none());
}

#[tokio::test]
async fn test_project_name_narrows_the_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/properties/"))
        .respond_with(page(vec![
            record("prop-1", json!({"name": "Tower A"}), &[]),
            record("prop-2", json!({"name": "Harbour Lofts"}), &[]),
        ]))
        .expect(1)
        .mount(&server)
        .await;
    mount_list(
        &server,
        "/projects/",
        ("filter[name.contains]", "Shell"),
        vec![
            record("proj-1", json!({"name": "Shell"}), &[("property", "prop-1")]),
            record("proj-2", json!({"name": "Shell B"}), &[("property", "prop-2")]),
        ],
    )
    .await;
    mount_list(
        &server,
        "/contract_units/",
        ("filter[project.in]", "proj-1,proj-2"),
        vec![],
    )
    .await;

    let tables = fetcher(&server)
        .get_all_df_with_project(None, Some("Shell"))
        .await
        .unwrap();

    assert_eq!(tables.get(EntityType::Properties).unwrap().len(), 2);
    assert_eq!(
        tables.get(EntityType::Projects).unwrap().ids(),
        vec!["proj-1", "proj-2"]
    );
    assert!(tables.get(EntityType::Contracts).unwrap().is_empty());
    assert!(tables.get(EntityType::Documents).unwrap().is_empty());
}

#[tokio::test]
async fn test_project_name_keeps_only_projects_of_the_property() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        "/properties/",
        ("filter[name.contains]", "Tower A"),
        vec![record("prop-1", json!({"name": "Tower A"}), &[])],
    )
    .await;
    mount_list(
        &server,
        "/projects/",
        ("filter[name.contains]", "Shell"),
        vec![
            record("proj-1", json!({"name": "Shell"}), &[("property", "prop-1")]),
            record("proj-2", json!({"name": "Shell B"}), &[("property", "prop-2")]),
        ],
    )
    .await;
    mount_list(
        &server,
        "/contract_units/",
        ("filter[project.in]", "proj-1"),
        vec![],
    )
    .await;

    let tables = fetcher(&server)
        .get_all_df_with_project(Some("Tower A"), Some("Shell"))
        .await
        .unwrap();

    assert_eq!(tables.get(EntityType::Properties).unwrap().ids(), vec!["prop-1"]);
    assert_eq!(tables.get(EntityType::Projects).unwrap().ids(), vec!["proj-1"]);
    assert!(tables.get(EntityType::ContractUnits).unwrap().is_empty());
}
