//! Integration tests for Sanctions-Sweep
//!
//! These tests drive complete collection runs against a scripted in-memory
//! registry and against a mock HTTP server.

mod support;

use sanctions_sweep::collector::{collect_now, collect_with, CancelToken, CollectionCoordinator};
use sanctions_sweep::config::Config;
use sanctions_sweep::model::{CountryOutcome, CountryStatus, RunOutcome};
use sanctions_sweep::output::read_dataset;
use sanctions_sweep::storage::{RunHistory, RunStatus, SqliteRunHistory};
use sanctions_sweep::RunSummary;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::{
    detail_page, results_table, search_page, test_config, Registry, ScriptedFactory,
};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn outcome<'a>(summary: &'a RunSummary, country: &str) -> &'a CountryOutcome {
    summary
        .countries
        .iter()
        .find(|c| c.country == country)
        .unwrap_or_else(|| panic!("no outcome for {}", country))
}

async fn run_scripted(config: &Config, registry: Arc<Registry>) -> RunSummary {
    let mut history = SqliteRunHistory::new_in_memory().unwrap();
    let factory = ScriptedFactory::new(registry);
    let cancel = CancelToken::new();

    tokio::time::timeout(
        Duration::from_secs(10),
        collect_with(config, factory, &mut history, "test-hash", &cancel),
    )
    .await
    .expect("run did not finish")
    .unwrap()
}

fn acme_detail() -> String {
    detail_page(
        &[("strong", "ACME CO"), ("weak", "ACME LTD")],
        &[["1 Main Rd", "Alphaville", "", "", "Alpha"]],
    )
}

#[tokio::test]
async fn test_end_to_end_collection() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha", "Beta"]);

    let registry = Arc::new(
        Registry::new()
            .with_listing("Alpha", &[("ACME TRADING", Some("Details.aspx?id=1"))])
            .with_detail("Details.aspx?id=1", acme_detail())
            .with_no_results("Beta"),
    );

    let summary = run_scripted(&config, registry).await;

    assert_eq!(summary.outcome, RunOutcome::Succeeded);
    assert!(summary.dataset_written);
    assert!(!summary.cancelled);
    assert_eq!(summary.entity_count, 1);

    let alpha = outcome(&summary, "Alpha");
    assert_eq!(alpha.status, CountryStatus::Ok);
    assert_eq!(alpha.rows_seen, 1);
    assert_eq!(alpha.entities, 1);

    let beta = outcome(&summary, "Beta");
    assert_eq!(beta.status, CountryStatus::Ok);
    assert_eq!(beta.entities, 0);

    let dataset = read_dataset(Path::new(&config.output.dataset_path)).unwrap();
    assert_eq!(dataset.len(), 1);

    let row = dataset.rows().next().unwrap();
    assert_eq!(row.get("Name"), Some("ACME TRADING"));
    assert_eq!(row.get("Country"), Some("Alpha"));
    assert_eq!(
        row.get("Link"),
        Some("https://registry.example.com/Details.aspx?id=1")
    );
    assert_eq!(row.get("Remarks"), Some("Front company"));
    assert_eq!(row.get("Aliases"), Some("strong: ACME CO; weak: ACME LTD"));
    assert_eq!(row.get("Addresses"), Some("1 Main Rd, Alphaville, Alpha"));
    assert_eq!(row.aliases().len(), 2);
}

#[tokio::test]
async fn test_failed_country_does_not_affect_others() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha", "Beta", "Gamma"]);

    let registry = Arc::new(
        Registry::new()
            .with_listing("Alpha", &[("ALPHA CORP", Some("Details.aspx?id=1"))])
            .with_detail("Details.aspx?id=1", acme_detail())
            .with_listing("Beta", &[("BETA CORP", Some("Details.aspx?id=2"))])
            .with_fatal_search("Beta")
            .with_listing("Gamma", &[("GAMMA CORP", Some("Details.aspx?id=3"))])
            .with_detail("Details.aspx?id=3", acme_detail()),
    );

    let summary = run_scripted(&config, registry).await;

    assert_eq!(summary.outcome, RunOutcome::Succeeded);
    assert_eq!(summary.tally.ok, 2);
    assert_eq!(summary.tally.failed, 1);
    assert!(outcome(&summary, "Beta").status.is_failed());
    assert_eq!(outcome(&summary, "Alpha").entities, 1);
    assert_eq!(outcome(&summary, "Gamma").entities, 1);

    let dataset = read_dataset(Path::new(&config.output.dataset_path)).unwrap();
    let mut countries = dataset.countries();
    countries.sort();
    assert_eq!(countries, vec!["Alpha", "Gamma"]);
}

#[tokio::test]
async fn test_transient_row_retried_a_bounded_number_of_times() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha"]);

    let registry = Arc::new(
        Registry::new()
            .with_listing(
                "Alpha",
                &[
                    ("FLAKY CORP", Some("Details.aspx?id=1")),
                    ("STEADY CORP", Some("Details.aspx?id=2")),
                ],
            )
            .with_transient_link("Details.aspx?id=1")
            .with_detail("Details.aspx?id=2", acme_detail()),
    );

    let summary = run_scripted(&config, Arc::clone(&registry)).await;

    assert_eq!(registry.activations("Details.aspx?id=1"), 3);
    assert_eq!(registry.activations("Details.aspx?id=2"), 1);

    let alpha = outcome(&summary, "Alpha");
    assert_eq!(alpha.status, CountryStatus::Partial { rows_lost: 1 });
    assert_eq!(alpha.entities, 1);
    assert_eq!(summary.outcome, RunOutcome::Succeeded);
}

#[tokio::test]
async fn test_fatal_row_keeps_entities_collected_so_far() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha"]);

    let registry = Arc::new(
        Registry::new()
            .with_listing(
                "Alpha",
                &[
                    ("FIRST CORP", Some("Details.aspx?id=1")),
                    ("CRASH CORP", Some("Details.aspx?id=2")),
                    ("LAST CORP", Some("Details.aspx?id=3")),
                ],
            )
            .with_detail("Details.aspx?id=1", acme_detail())
            .with_fatal_link("Details.aspx?id=2")
            .with_detail("Details.aspx?id=3", acme_detail()),
    );

    let summary = run_scripted(&config, Arc::clone(&registry)).await;

    let alpha = outcome(&summary, "Alpha");
    assert_eq!(alpha.status, CountryStatus::Partial { rows_lost: 2 });
    assert_eq!(alpha.entities, 1);
    assert_eq!(registry.activations("Details.aspx?id=2"), 1);
    assert_eq!(registry.activations("Details.aspx?id=3"), 0);
}

#[tokio::test]
async fn test_row_without_detail_link_is_kept() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha"]);

    let registry = Arc::new(Registry::new().with_listing("Alpha", &[("PLAIN CORP", None)]));

    let summary = run_scripted(&config, registry).await;
    assert_eq!(outcome(&summary, "Alpha").status, CountryStatus::Ok);

    let dataset = read_dataset(Path::new(&config.output.dataset_path)).unwrap();
    let row = dataset.rows().next().unwrap();
    assert_eq!(row.get("Name"), Some("PLAIN CORP"));
    assert_eq!(row.get("Link"), Some(""));
    assert!(row.aliases().is_empty());
}

#[tokio::test]
async fn test_failed_run_keeps_existing_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha", "Beta"]);
    std::fs::write(&config.output.dataset_path, "previous run\n").unwrap();

    let registry = Arc::new(
        Registry::new()
            .with_listing("Alpha", &[])
            .with_fatal_search("Alpha")
            .with_listing("Beta", &[])
            .with_fatal_search("Beta"),
    );

    let summary = run_scripted(&config, registry).await;

    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert!(!summary.dataset_written);
    assert_eq!(
        std::fs::read_to_string(&config.output.dataset_path).unwrap(),
        "previous run\n"
    );
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha", "Beta"]);

    let registry = Arc::new(
        Registry::new()
            .with_listing("Alpha", &[("ALPHA CORP", None)])
            .with_listing("Beta", &[("BETA CORP", None)]),
    );

    let mut history = SqliteRunHistory::new_in_memory().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let summary = collect_with(
        &config,
        ScriptedFactory::new(registry),
        &mut history,
        "test-hash",
        &cancel,
    )
    .await
    .unwrap();

    assert!(summary.cancelled);
    assert!(!summary.dataset_written);
    assert_eq!(summary.tally.failed, 2);
    assert!(!Path::new(&config.output.dataset_path).exists());

    let run = history.get_run(summary.run_id).unwrap();
    assert!(run.cancelled);
    assert_eq!(run.status, RunStatus::Finished(RunOutcome::Failed));
}

#[tokio::test]
async fn test_cancel_mid_run_aborts_after_grace_period() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path(), &["Alpha", "Beta", "Gamma"]);
    config.coordinator.max_workers = 1;
    config.coordinator.grace_period_ms = 100;

    let registry = Arc::new(
        Registry::new()
            .with_listing("Alpha", &[("ALPHA CORP", None)])
            .with_listing("Beta", &[("BETA CORP", None)])
            .with_listing("Gamma", &[("GAMMA CORP", None)])
            .with_hanging_open(),
    );

    let mut history = SqliteRunHistory::new_in_memory().unwrap();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        collect_with(
            &config,
            ScriptedFactory::new(registry),
            &mut history,
            "test-hash",
            &cancel,
        ),
    )
    .await
    .expect("run did not stop after cancellation")
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(summary.cancelled);
    assert!(!summary.dataset_written);
    assert!(!Path::new(&config.output.dataset_path).exists());

    let reason = |country: &str| match &outcome(&summary, country).status {
        CountryStatus::Failed { reason } => reason.clone(),
        other => panic!("{} should have failed, got {}", country, other),
    };
    assert_eq!(reason("Alpha"), "worker did not finish");
    assert_eq!(reason("Beta"), "cancelled before start");
    assert_eq!(reason("Gamma"), "cancelled before start");

    let run = history.get_run(summary.run_id).unwrap();
    assert!(run.cancelled);
}

#[tokio::test]
async fn test_worker_pool_is_bounded() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path(), &[]);
    config.collector.settle_delay_ms = 5;
    config.coordinator.max_workers = 2;

    let countries = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta"];
    let mut registry = Registry::new();
    for (i, country) in countries.iter().enumerate() {
        let link = format!("Details.aspx?id={}", i);
        registry = registry
            .with_listing(country, &[("CORP", Some(link.as_str()))])
            .with_detail(&link, acme_detail());
    }
    let registry = Arc::new(registry);

    let coordinator =
        CollectionCoordinator::new(&config, ScriptedFactory::new(Arc::clone(&registry))).unwrap();
    let requested: Vec<String> = countries.iter().map(|c| c.to_string()).collect();
    let report = coordinator.run(&requested, &CancelToken::new()).await;

    assert!(registry.max_open_sessions() <= 2);
    assert_eq!(report.tally().ok, 6);
    assert_eq!(report.entities.len(), 6);

    let order: Vec<&str> = report.outcomes.iter().map(|o| o.country.as_str()).collect();
    assert_eq!(order, countries);
}

#[tokio::test]
async fn test_run_history_is_recorded() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), &["Alpha", "Beta"]);

    let registry = Arc::new(
        Registry::new()
            .with_listing("Alpha", &[("ALPHA CORP", None)])
            .with_no_results("Beta"),
    );

    let mut history = SqliteRunHistory::new_in_memory().unwrap();
    let summary = collect_with(
        &config,
        ScriptedFactory::new(registry),
        &mut history,
        "abc123",
        &CancelToken::new(),
    )
    .await
    .unwrap();

    let run = history.latest_run().unwrap().unwrap();
    assert_eq!(run.id, summary.run_id);
    assert_eq!(run.config_hash, "abc123");
    assert_eq!(run.status, RunStatus::Finished(RunOutcome::Succeeded));
    assert_eq!(run.entity_count, 1);
    assert!(run.dataset_written);

    let countries = history.country_results(run.id).unwrap();
    assert_eq!(countries.len(), 2);
    assert!(countries.iter().all(|c| c.status == "ok"));
}

async fn mount_registry(server: &MockServer) {
    let countries = ["Alpha", "Beta"];

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&countries, "")))
        .mount(server)
        .await;

    let alpha_results = results_table(&[("ACME TRADING", Some("Details.aspx?id=1"))]);
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("ddlCountry=Alpha"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(search_page(&countries, &alpha_results)),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("ddlCountry=Beta"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(
            &countries,
            "<p>Your search has not returned any results.</p>",
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Details.aspx"))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(acme_detail()))
        .mount(server)
        .await;
}

fn http_config(dir: &Path, server: &MockServer) -> Config {
    let mut config = test_config(dir, &[]);
    config.site.base_url = format!("{}/", server.uri());
    config.site.search_path = String::new();
    config.site.request_timeout_secs = 5;
    config
}

#[tokio::test]
async fn test_http_collection_with_country_discovery() {
    let server = MockServer::start().await;
    mount_registry(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let config = http_config(temp_dir.path(), &server);

    let summary = collect_now(&config, "test-hash", &CancelToken::new())
        .await
        .unwrap();

    let countries: Vec<&str> = summary.countries.iter().map(|c| c.country.as_str()).collect();
    assert_eq!(countries, vec!["Alpha", "Beta"]);
    assert_eq!(outcome(&summary, "Alpha").status, CountryStatus::Ok);
    assert_eq!(outcome(&summary, "Beta").entities, 0);
    assert_eq!(summary.outcome, RunOutcome::Succeeded);

    let dataset = read_dataset(Path::new(&config.output.dataset_path)).unwrap();
    assert_eq!(dataset.len(), 1);

    let row = dataset.rows().next().unwrap();
    assert_eq!(row.get("Name"), Some("ACME TRADING"));
    assert_eq!(
        row.get("Link"),
        Some(format!("{}/Details.aspx?id=1", server.uri()).as_str())
    );
    assert_eq!(row.get("Aliases"), Some("strong: ACME CO; weak: ACME LTD"));

    let history = SqliteRunHistory::new(Path::new(&config.output.history_path)).unwrap();
    let run = history.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Finished(RunOutcome::Succeeded));
}

#[tokio::test]
async fn test_http_registry_down_fails_country() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = http_config(temp_dir.path(), &server);
    config.countries = vec!["Alpha".to_string()];

    let summary = collect_now(&config, "test-hash", &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome(&summary, "Alpha").status.is_failed());
    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert!(!Path::new(&config.output.dataset_path).exists());
}
