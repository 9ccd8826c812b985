use fnav::AppCommand;
use fnav::export::Bundle;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOLDINGS_BODY: &str = concat!(
    r#"var apidata={ content:"<table><thead><tr><th>序号</th></tr></thead><tbody>"#,
    r#"<tr><td>1</td><td><a>600519</a></td><td><a>贵州茅台</a></td><td>6.29%</td></tr>"#,
    r#"</tbody></table>",arryear:[2026],curyear:2026};"#,
);

async fn mount_valuation(server: &MockServer, code: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/js/{code}.js")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Points every provider at the mock server and pins the data path, so
/// sequential `run_command` invocations share one persisted state.
fn write_config(server_uri: &str, data_dir: &TempDir) -> tempfile::NamedTempFile {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
providers:
  valuation:
    base_url: {server_uri}
  holdings:
    base_url: {server_uri}
  quotes:
    base_url: {server_uri}
  search:
    base_url: {server_uri}
data_path: "{}"
"#,
        data_dir.path().display()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");
    config_file
}

async fn export_bundle(config_path: &str, data_dir: &TempDir) -> Bundle {
    let export_path = data_dir.path().join("bundle.json");
    fnav::run_command(
        AppCommand::Export {
            path: Some(export_path.to_str().unwrap().to_string()),
        },
        Some(config_path),
    )
    .await
    .expect("Export failed");
    let raw = fs::read_to_string(&export_path).expect("Failed to read export");
    serde_json::from_str(&raw).expect("Export is not a valid bundle")
}

#[test_log::test(tokio::test)]
async fn test_add_then_export_flow() {
    let server = MockServer::start().await;
    mount_valuation(
        &server,
        "000001",
        r#"jsonpgz({"fundcode":"000001","name":"X基金","dwjz":"1.234","gsz":"1.240","gszzl":"0.49","gztime":"2026-08-28 09:30"});"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/FundArchivesDatas.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOLDINGS_BODY))
        .mount(&server)
        .await;
    // The quote endpoint is not mocked: the per-holding change lookup
    // fails and must degrade without failing the add.

    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);
    let config_path = config.path().to_str().unwrap();

    // 999999 has no mock (404, empty body) and lands in the failure
    // list; the batch still succeeds because 000001 was added.
    let result = fnav::run_command(
        AppCommand::Add {
            codes: vec!["000001".to_string(), "999999".to_string()],
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "Add failed with: {:?}", result.err());

    let bundle = export_bundle(config_path, &data_dir).await;
    assert_eq!(bundle.funds.len(), 1);
    let fund = &bundle.funds[0];
    assert_eq!(fund.code, "000001");
    assert_eq!(fund.name, "X基金");
    assert_eq!(fund.prior_nav, "1.234");
    assert_eq!(fund.estimated_nav, "1.240");
    assert_eq!(fund.holdings.len(), 1);
    assert_eq!(fund.holdings[0].code, "600519");
    assert!(fund.holdings[0].change.is_none());
}

#[test_log::test(tokio::test)]
async fn test_add_rejects_when_nothing_added() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);

    let result = fnav::run_command(
        AppCommand::Add {
            codes: vec!["999999".to_string()],
        },
        Some(config.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_refresh_failure_retains_tracked_record() {
    let server = MockServer::start().await;
    mount_valuation(
        &server,
        "000001",
        r#"jsonpgz({"fundcode":"000001","name":"X基金","dwjz":"1.234","gsz":"1.240","gszzl":"0.49","gztime":"2026-08-28 09:30"});"#,
    )
    .await;

    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);
    let config_path = config.path().to_str().unwrap();

    fnav::run_command(
        AppCommand::Add {
            codes: vec!["000001".to_string()],
        },
        Some(config_path),
    )
    .await
    .expect("Add failed");

    // Same state, but every endpoint now fails.
    let broken_server = MockServer::start().await;
    let broken_config = write_config(&broken_server.uri(), &data_dir);
    let broken_path = broken_config.path().to_str().unwrap();

    fnav::run_command(AppCommand::List, Some(broken_path))
        .await
        .expect("List should absorb per-fund refresh failures");

    let bundle = export_bundle(broken_path, &data_dir).await;
    assert_eq!(bundle.funds.len(), 1);
    assert_eq!(bundle.funds[0].name, "X基金");
    assert_eq!(bundle.funds[0].estimated_nav, "1.240");
}

#[test_log::test(tokio::test)]
async fn test_remove_cascades_and_preferences_persist() {
    let server = MockServer::start().await;
    mount_valuation(
        &server,
        "000001",
        r#"jsonpgz({"fundcode":"000001","name":"A","dwjz":"1.0","gsz":"1.0","gszzl":"0.0","gztime":""});"#,
    )
    .await;
    mount_valuation(
        &server,
        "000002",
        r#"jsonpgz({"fundcode":"000002","name":"B","dwjz":"2.0","gsz":"2.0","gszzl":"0.0","gztime":""});"#,
    )
    .await;

    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);
    let config_path = config.path().to_str().unwrap();

    fnav::run_command(
        AppCommand::Add {
            codes: vec!["000001".to_string(), "000002".to_string()],
        },
        Some(config_path),
    )
    .await
    .unwrap();

    for cmd in [
        AppCommand::Fav {
            code: "000001".to_string(),
        },
        AppCommand::Expand {
            code: "000001".to_string(),
        },
        AppCommand::View {
            mode: "card".to_string(),
        },
        AppCommand::Interval { ms: 15_000 },
    ] {
        fnav::run_command(cmd, Some(config_path)).await.unwrap();
    }

    fnav::run_command(
        AppCommand::Remove {
            codes: vec!["000001".to_string()],
        },
        Some(config_path),
    )
    .await
    .unwrap();

    let bundle = export_bundle(config_path, &data_dir).await;
    assert_eq!(bundle.funds.len(), 1);
    assert_eq!(bundle.funds[0].code, "000002");
    // Flags for the removed fund are gone; preferences survive.
    assert!(bundle.favorites.is_empty());
    assert!(bundle.expanded.is_empty());
    assert_eq!(bundle.refresh_interval_ms, Some(15_000));
    assert_eq!(bundle.view_mode.map(|m| m.to_string()), Some("card".into()));
}

#[test_log::test(tokio::test)]
async fn test_import_merges_into_existing_state() {
    let server = MockServer::start().await;
    mount_valuation(
        &server,
        "000001",
        r#"jsonpgz({"fundcode":"000001","name":"local","dwjz":"1.0","gsz":"1.0","gszzl":"0.0","gztime":""});"#,
    )
    .await;

    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);
    let config_path = config.path().to_str().unwrap();

    fnav::run_command(
        AppCommand::Add {
            codes: vec!["000001".to_string()],
        },
        Some(config_path),
    )
    .await
    .unwrap();

    let bundle_path = data_dir.path().join("incoming.json");
    fs::write(
        &bundle_path,
        r#"{
            "version": 1,
            "exported_at": "2026-08-28T00:00:00Z",
            "funds": [
                {"code":"000001","name":"imported-dup","prior_nav":"9.9",
                 "estimated_nav":"9.9","estimated_change_pct":0.0,"estimated_at":"","holdings":[]},
                {"code":"000003","name":"imported-new","prior_nav":"3.0",
                 "estimated_nav":"3.0","estimated_change_pct":"--","estimated_at":"","holdings":[]}
            ],
            "favorites": ["000003"]
        }"#,
    )
    .unwrap();

    fnav::run_command(
        AppCommand::Import {
            path: bundle_path.to_str().unwrap().to_string(),
        },
        Some(config_path),
    )
    .await
    .unwrap();

    let bundle = export_bundle(config_path, &data_dir).await;
    assert_eq!(bundle.funds.len(), 2);
    // Local record wins the collision; the new fund is appended.
    assert_eq!(bundle.funds[0].name, "local");
    assert_eq!(bundle.funds[1].name, "imported-new");
    assert_eq!(bundle.favorites, vec!["000003".to_string()]);
}

#[test_log::test(tokio::test)]
async fn test_malformed_import_is_rejected() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);
    let config_path = config.path().to_str().unwrap();

    let bundle_path = data_dir.path().join("bad.json");
    fs::write(&bundle_path, "{ definitely not a bundle").unwrap();

    let result = fnav::run_command(
        AppCommand::Import {
            path: bundle_path.to_str().unwrap().to_string(),
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_search_filters_and_adds_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/FundSearch/api/FundSearchAPI.ashx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"Datas":[
                {"CODE":"000001","NAME":"X基金","CATEGORYDESC":"基金","FundBaseInfo":{"FTYPE":"混合型"}},
                {"CODE":"600519","NAME":"贵州茅台","CATEGORYDESC":"股票","FundBaseInfo":null}
            ]}"#,
        ))
        .mount(&server)
        .await;
    mount_valuation(
        &server,
        "000001",
        r#"jsonpgz({"fundcode":"000001","name":"X基金","dwjz":"1.0","gsz":"1.0","gszzl":"0.0","gztime":""});"#,
    )
    .await;

    let data_dir = TempDir::new().unwrap();
    let config = write_config(&server.uri(), &data_dir);
    let config_path = config.path().to_str().unwrap();

    fnav::run_command(
        AppCommand::Search {
            query: "X".to_string(),
            add: true,
        },
        Some(config_path),
    )
    .await
    .expect("Search --add failed");

    let bundle = export_bundle(config_path, &data_dir).await;
    // Only the public-fund match was added; the stock row was filtered.
    assert_eq!(bundle.funds.len(), 1);
    assert_eq!(bundle.funds[0].code, "000001");
}
