mod common;

use std::sync::Arc;

use cheek_dashboard::{
    Dashboard, DashboardEvent, FetchError, FetchStatus, JobName, JobStorePhase, JobsListStore,
    LogsComponent, Method, Page, Resource, Settled, StatusReply, TextSlot, TriggerAction,
    VersionBadge,
};
use serde_json::json;

use common::harness;

#[tokio::test]
async fn listing_accepts_object_keyed_by_name() {
    let h = harness();
    h.backend.reply_json(
        Method::Get,
        "/api/jobs/",
        json!({
            "backup": {"cron": "0 1 * * *", "command": ["backup.sh"]},
            "report": {"command": ["report", "--daily"]}
        }),
    );

    let store = JobsListStore::new(h.api.clone(), h.events.clone());
    assert_eq!(store.init().await.unwrap(), Settled::Updated);

    let listing = store.jobs_or_empty();
    assert_eq!(listing.names().collect::<Vec<_>>(), ["backup", "report"]);
    assert_eq!(listing.get("backup").map(|job| job.name.as_str()), Some("backup"));
}

#[tokio::test]
async fn listing_failure_leaves_it_empty() {
    let h = harness();
    h.backend.reply_status(Method::Get, "/api/jobs/", 502);

    let store = JobsListStore::new(h.api.clone(), h.events.clone());
    assert!(matches!(store.fetch_jobs().await, Settled::Degraded(_)));
    assert_eq!(store.jobs(), None);
    assert!(store.jobs_or_empty().is_empty());
    assert!(matches!(
        h.queue.drain().as_slice(),
        [DashboardEvent::FetchFailed {
            resource: Resource::Jobs,
            ..
        }]
    ));
}

#[tokio::test]
async fn each_logs_component_loads_on_its_own() {
    let h = harness();
    h.backend.reply_json(
        Method::Get,
        "/api/core/logs",
        json!([{"id": 1, "message": "scheduler started"}]),
    );

    let first = LogsComponent::new(h.api.clone(), h.events.clone());
    let second = LogsComponent::new(h.api.clone(), h.events.clone());
    assert_eq!(first.init().await.unwrap(), Settled::Updated);

    assert_eq!(
        first.logs().map(|logs| logs[0].message.clone()),
        Some("scheduler started".into())
    );
    assert_eq!(second.logs(), None);
    assert_eq!(second.status(), FetchStatus::Idle);
}

#[tokio::test]
async fn version_badge_writes_label() {
    let h = harness();
    h.backend.reply_json(
        Method::Get,
        "/api/version",
        json!({"version": "1.2.3", "commit_sha": "abc"}),
    );

    let slot = Arc::new(TextSlot::default());
    let badge = VersionBadge::new(h.api.clone(), h.events.clone(), Arc::clone(&slot));
    let info = badge.mount().await.unwrap();

    assert_eq!(info.version, "1.2.3");
    assert_eq!(slot.text(), Some("Version: 1.2.3".into()));
}

#[tokio::test]
async fn version_failure_leaves_surface_untouched() {
    let h = harness();
    h.backend.reply_status(Method::Get, "/api/version", 500);

    let slot = Arc::new(TextSlot::default());
    let badge = VersionBadge::new(h.api.clone(), h.events.clone(), Arc::clone(&slot));

    assert!(badge.mount().await.is_err());
    assert_eq!(slot.text(), None);
}

#[tokio::test]
async fn trigger_returns_before_the_backend_answers() {
    let h = harness();
    let release = h.backend.reply_gated(
        Method::Post,
        "/api/jobs/backup/trigger",
        json!({"jobs": "backup", "status": "ok"}),
    );

    let action = TriggerAction::new(h.api.clone(), h.events.clone());
    let pending = action.trigger(JobName::new("backup").unwrap());
    assert!(!pending.is_finished());

    release.send(()).unwrap();
    let reply = pending.await.unwrap().unwrap();
    assert!(reply.is_ok());
    assert!(h.queue.drain().contains(&DashboardEvent::TriggerFinished {
        job: JobName::new("backup").unwrap(),
        result: Ok(()),
    }));
}

#[tokio::test]
async fn trigger_with_non_json_body_still_succeeds() {
    let h = harness();
    h.backend.reply_error(
        Method::Post,
        "/api/jobs/backup/trigger",
        FetchError::Decode {
            path: "/api/jobs/backup/trigger".into(),
            message: "expected value at line 1 column 1".into(),
        },
    );

    let action = TriggerAction::new(h.api.clone(), h.events.clone());
    let reply = action.run(&JobName::new("backup").unwrap()).await.unwrap();

    assert_eq!(reply, StatusReply::default());
    assert_eq!(
        h.queue.drain(),
        vec![DashboardEvent::TriggerFinished {
            job: JobName::new("backup").unwrap(),
            result: Ok(()),
        }]
    );
}

#[tokio::test]
async fn listing_with_null_runs_still_loads() {
    let h = harness();
    h.backend.reply_json(
        Method::Get,
        "/api/jobs/",
        json!({
            "backup": {"command": ["backup.sh"], "runs": [{"id": 2, "status": 0}]},
            "fresh": {"command": ["y"], "runs": null}
        }),
    );

    let store = JobsListStore::new(h.api.clone(), h.events.clone());
    assert_eq!(store.fetch_jobs().await, Settled::Updated);
    assert_eq!(store.jobs_or_empty().len(), 2);
    assert!(store.jobs_or_empty().get("fresh").unwrap().runs.is_empty());
}

#[tokio::test]
async fn rejected_trigger_only_reports() {
    let h = harness();
    h.backend
        .reply_json(Method::Get, "/api/jobs/", json!({"backup": {}}));
    h.backend
        .reply_json(Method::Get, "/api/jobs/backup", json!({"name": "backup"}));
    h.backend
        .reply_json(Method::Get, "/api/jobs/backup/runs/-1", json!({"id": 4}));
    h.backend
        .reply_status(Method::Post, "/api/jobs/backup/trigger", 404);

    let dashboard = Dashboard::new(h.api.clone(), h.events.clone());
    dashboard
        .job()
        .init("/jobs/backup/latest")
        .unwrap()
        .settled()
        .await;
    dashboard.jobs().fetch_jobs().await;
    dashboard.selected().set(JobName::new("backup").unwrap());

    let job_before = dashboard.job().snapshot();
    let jobs_before = (dashboard.jobs().jobs(), dashboard.jobs().status());
    let selected_before = dashboard.selected().get();
    h.queue.drain();

    let result = dashboard
        .trigger_action()
        .run(&JobName::new("backup").unwrap())
        .await;

    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert_eq!(dashboard.job().snapshot(), job_before);
    assert_eq!(
        (dashboard.jobs().jobs(), dashboard.jobs().status()),
        jobs_before
    );
    assert_eq!(dashboard.selected().get(), selected_before);
    assert!(matches!(
        h.queue.drain().as_slice(),
        [DashboardEvent::TriggerFinished { result: Err(_), .. }]
    ));
}

#[tokio::test]
async fn overview_load_fetches_listing_and_version() {
    let h = harness();
    h.backend
        .reply_json(Method::Get, "/api/jobs/", json!([{"name": "backup"}]));
    h.backend
        .reply_json(Method::Get, "/api/version", json!({"version": "0.9.0"}));

    let dashboard = Dashboard::new(h.api.clone(), h.events.clone());
    let loaded = dashboard.load("http://127.0.0.1:8081/").settled().await;

    assert_eq!(loaded.page, Page::Overview);
    assert!(loaded.job.is_none());
    assert_eq!(loaded.jobs, Settled::Updated);
    assert!(loaded.logs.is_none());
    assert_eq!(loaded.version.map(|v| v.version), Some("0.9.0".into()));
    assert_eq!(dashboard.version_text(), Some("Version: 0.9.0".into()));
    assert_eq!(dashboard.job().phase(), JobStorePhase::Uninitialized);
    assert_eq!(dashboard.jobs().jobs_or_empty().len(), 1);
}

#[tokio::test]
async fn job_page_load_binds_the_job_store() {
    let h = harness();
    h.backend
        .reply_json(Method::Get, "/api/jobs/", json!({}));
    h.backend
        .reply_json(Method::Get, "/api/jobs/backup", json!({"name": "backup"}));
    h.backend
        .reply_json(Method::Get, "/api/jobs/backup/runs/5", json!({"id": 5}));

    let dashboard = Dashboard::new(h.api.clone(), h.events.clone());
    let loaded = dashboard.load("http://127.0.0.1:8081/jobs/backup/5").settled().await;

    assert!(matches!(loaded.page, Page::JobRun(_)));
    assert_eq!(loaded.job, Some((Settled::Updated, Settled::Updated)));
    // no version route was scripted
    assert!(loaded.version.is_none());
    assert_eq!(dashboard.version_text(), None);
    assert_eq!(dashboard.job().phase(), JobStorePhase::Ready);
}

#[tokio::test]
async fn core_logs_page_mounts_a_logs_component() {
    let h = harness();
    h.backend
        .reply_json(Method::Get, "/api/core/logs", json!([]));

    let dashboard = Dashboard::new(h.api.clone(), h.events.clone());
    let loaded = dashboard.load("/core/logs").settled().await;

    assert_eq!(loaded.page, Page::CoreLogs);
    let logs = loaded.logs.expect("logs component mounted");
    assert_eq!(logs.logs(), Some(Vec::new()));
}
