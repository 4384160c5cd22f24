use std::time::{Duration, Instant};
use svc_e2e_tests::*;
use svc_engine::application::OrchestratorPhase;
use svc_engine::domain::{HealthCheck, ServiceStatus};

#[tokio::test]
async fn test_stop_terminates_every_process() {
    let services = (0..3)
        .map(|i| {
            sh_service(&format!("svc{i}"), "sleep 60")
                .priority(i)
                .build()
                .unwrap()
        })
        .collect();
    let orchestrator = orchestrator(services, fast_settings());

    orchestrator.start().await.unwrap();
    let pids: Vec<u32> = (0..3)
        .map(|i| orchestrator.state(&format!("svc{i}")).unwrap().pid().unwrap())
        .collect();
    assert!(pids.iter().all(|pid| pid_alive(*pid)));

    let report = within(Duration::from_secs(10), orchestrator.stop()).await;
    assert_eq!(report.totals.stopped, 3);
    assert_eq!(orchestrator.phase(), OrchestratorPhase::Stopped);
    for pid in pids {
        assert!(!pid_alive(pid), "pid {pid} survived shutdown");
    }
    for service in &report.services {
        assert!(service.pid.is_none());
    }
}

#[tokio::test]
async fn test_stop_escalates_to_sigkill() {
    let stubborn = sh_service("stubborn", "trap '' TERM; while :; do sleep 0.1; done")
        .stop_grace_period(Duration::from_secs(1))
        .build()
        .unwrap();
    let orchestrator = orchestrator(vec![stubborn], fast_settings());

    orchestrator.start().await.unwrap();
    let pid = orchestrator.state("stubborn").unwrap().pid().unwrap();
    // Let the shell install its trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    let began = Instant::now();
    let report = within(Duration::from_secs(10), orchestrator.stop()).await;
    assert!(began.elapsed() >= Duration::from_secs(1));
    assert_eq!(report.status_of("stubborn"), Some(ServiceStatus::Stopped));
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let svc = sh_service("svc", "sleep 60").build().unwrap();
    let orchestrator = orchestrator(vec![svc], fast_settings());
    orchestrator.start().await.unwrap();

    let first = orchestrator.stop().await;
    let began = Instant::now();
    let second = orchestrator.stop().await;
    assert!(began.elapsed() < Duration::from_millis(500));
    assert_eq!(first.phase, second.phase);
    assert_eq!(first.status_of("svc"), second.status_of("svc"));
}

#[tokio::test]
async fn test_stop_during_startup() {
    let server = HealthServer::start_with(false).await;
    let db = sh_service("db", "sleep 60").priority(1).build().unwrap();
    let api = sh_service("api", "sleep 60")
        .priority(2)
        .port(server.port())
        .health_check(HealthCheck::http("/"))
        .build()
        .unwrap();
    let web = sh_service("web", "sleep 60").priority(3).build().unwrap();
    let orchestrator = orchestrator(vec![db, api, web], fast_settings());

    let startup = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start().await })
    };
    assert!(
        wait_for(Duration::from_secs(5), || server.hits() >= 1).await,
        "api readiness never started"
    );

    let report = within(Duration::from_secs(10), orchestrator.stop()).await;
    assert_eq!(report.status_of("db"), Some(ServiceStatus::Stopped));
    assert_eq!(report.status_of("api"), Some(ServiceStatus::Failed));
    assert_eq!(report.status_of("web"), Some(ServiceStatus::NotStarted));

    let startup = within(Duration::from_secs(5), startup).await.unwrap().unwrap();
    assert!(startup.is_failed("api"));
    assert_eq!(startup.not_started, vec!["web"]);
}
