use std::time::Duration;
use svc_e2e_tests::*;
use svc_engine::domain::ServiceStatus;

#[tokio::test]
async fn test_exited_service_is_restarted() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran-once");
    // First run exits after a moment, later runs stay up
    let script = format!(
        "if [ -e {path} ]; then sleep 60; else touch {path}; sleep 0.5; exit 3; fi",
        path = marker.display()
    );
    let worker = sh_service("worker", &script).build().unwrap();
    let orchestrator = orchestrator(vec![worker], fast_settings());

    orchestrator.start().await.unwrap();
    let first_pid = orchestrator.state("worker").unwrap().pid().unwrap();

    assert!(
        wait_for(Duration::from_secs(10), || {
            let state = orchestrator.state("worker").unwrap();
            state.restart_count() == 1
                && state.status() == ServiceStatus::Running
                && state.pid().is_some()
                && state.pid() != Some(first_pid)
        })
        .await,
        "exited service was not restarted"
    );

    let state = orchestrator.state("worker").unwrap();
    assert!(state.last_error().unwrap().contains("exited with code 3"));

    let report = orchestrator.stop().await;
    assert_eq!(report.status_of("worker"), Some(ServiceStatus::Stopped));
}

#[tokio::test]
async fn test_crash_loop_stops_at_ceiling() {
    let worker = sh_service("worker", "sleep 0.3; exit 1").build().unwrap();
    let mut settings = fast_settings();
    settings.restart_ceiling = 2;
    let orchestrator = orchestrator(vec![worker], settings);

    orchestrator.start().await.unwrap();

    assert!(
        wait_for_status(&orchestrator, "worker", ServiceStatus::Failed, Duration::from_secs(10)).await,
        "crash loop never gave up"
    );
    let state = orchestrator.state("worker").unwrap();
    assert_eq!(state.restart_count(), 2);
    assert!(state.pid().is_none());

    let report = orchestrator.stop().await;
    assert_eq!(report.status_of("worker"), Some(ServiceStatus::Failed));
    assert_eq!(report.totals.failed, 1);
}

#[tokio::test]
async fn test_exit_of_one_service_leaves_others_alone() {
    let steady = sh_service("steady", "sleep 60").build().unwrap();
    let flaky = sh_service("flaky", "sleep 0.3; exit 1").build().unwrap();
    let mut settings = fast_settings();
    settings.restart_ceiling = 1;
    let orchestrator = orchestrator(vec![steady, flaky], settings);

    orchestrator.start().await.unwrap();
    let steady_pid = orchestrator.state("steady").unwrap().pid().unwrap();

    assert!(wait_for_status(&orchestrator, "flaky", ServiceStatus::Failed, Duration::from_secs(10)).await);

    let steady = orchestrator.state("steady").unwrap();
    assert_eq!(steady.status(), ServiceStatus::Running);
    assert_eq!(steady.pid(), Some(steady_pid));
    assert_eq!(steady.restart_count(), 0);

    orchestrator.stop().await;
}
