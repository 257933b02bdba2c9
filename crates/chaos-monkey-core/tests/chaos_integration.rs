//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "End-to-end flows through watchers, engine, assaults and metrics."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chaos_monkey_core::{
    new_registry, AssaultError, AssaultKind, BoundaryKind, CallSignature, ChaosMetrics,
    ChaosMonkey, ConfigError, CustomAssault, KillSwitch, MetricEvent, MetricEventPublisher,
    SeededRandom, Settings, SettingsHandle, Terminator, Watchers,
};
use parking_lot::Mutex;
use prometheus::Registry;

fn counter(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> u64 {
    registry
        .gather()
        .iter()
        .filter(|family| family.get_name() == name)
        .flat_map(|family| family.get_metric())
        .filter(|metric| {
            labels.iter().all(|(key, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
            })
        })
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

fn settings_with(kind: AssaultKind, level: u32) -> Settings {
    let mut settings = Settings {
        enabled: true,
        level,
        ..Settings::default()
    };
    settings.chosen_assaults = [kind].into_iter().collect();
    settings.assaults.exception.active = true;
    settings.assaults.kill_app.active = true;
    settings
}

#[derive(Debug, Default)]
struct LatencyRecorder {
    millis: Mutex<Vec<u64>>,
}

impl MetricEventPublisher for LatencyRecorder {
    fn publish(&self, event: &MetricEvent<'_>) -> Result<()> {
        if let MetricEvent::LatencyInjected { millis } = event {
            self.millis.lock().push(*millis);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CountingTerminator {
    calls: AtomicUsize,
}

impl Terminator for CountingTerminator {
    fn terminate(&self, _exit_code: i32) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn disabled_monkey_leaves_calls_untouched() {
    let registry = new_registry();
    let metrics = ChaosMetrics::new(registry.clone()).unwrap();
    let mut settings = settings_with(AssaultKind::Exception, 1);
    settings.enabled = false;
    let monkey = ChaosMonkey::builder(SettingsHandle::new(settings).unwrap())
        .publisher(Arc::new(metrics))
        .build();
    let watchers = Watchers::new(&monkey);

    for _ in 0..100 {
        let value = watchers
            .service
            .intercept("shop::Orders", "list", || "orders")
            .unwrap();
        assert_eq!(value, "orders");
    }
    assert_eq!(
        counter(&registry, "chaos_monkey_watcher_calls_total", &[]),
        100
    );
    assert_eq!(counter(&registry, "chaos_monkey_requests_total", &[]), 0);
    assert_eq!(counter(&registry, "chaos_monkey_assaults_total", &[]), 0);
}

#[test]
fn controller_exception_reaches_the_caller() {
    let registry = new_registry();
    let metrics = ChaosMetrics::new(registry.clone()).unwrap();
    let mut settings = settings_with(AssaultKind::Exception, 1);
    settings.watchers.controller = true;
    settings.assaults.exception.error_type = "IllegalStateError".into();
    settings.assaults.exception.message = "controller refused".into();
    let monkey = ChaosMonkey::builder(SettingsHandle::new(settings).unwrap())
        .publisher(Arc::new(metrics))
        .build();

    let err = Watchers::new(&monkey)
        .controller
        .intercept("shop::HelloController", "hello", || "greeting")
        .unwrap_err();
    assert_eq!(
        err,
        AssaultError::Injected {
            error_type: "IllegalStateError".into(),
            message: "controller refused".into(),
        }
    );
    assert_eq!(err.to_string(), "IllegalStateError: controller refused");

    let labels = [
        ("boundary", "controller"),
        ("signature", "shop::HelloController.hello"),
    ];
    assert_eq!(counter(&registry, "chaos_monkey_watcher_calls_total", &labels), 1);
    assert_eq!(
        counter(&registry, "chaos_monkey_requests_total", &[("type", "eligible")]),
        1
    );
    assert_eq!(
        counter(&registry, "chaos_monkey_requests_total", &[("type", "assaulted")]),
        1
    );
    assert_eq!(
        counter(
            &registry,
            "chaos_monkey_assaults_total",
            &[("assault", "exception")]
        ),
        1
    );
}

#[test]
fn unwatched_service_is_never_attacked() {
    let registry = new_registry();
    let metrics = ChaosMetrics::new(registry.clone()).unwrap();
    let mut settings = settings_with(AssaultKind::Exception, 1);
    settings.watchers.service = false;
    let monkey = ChaosMonkey::builder(SettingsHandle::new(settings).unwrap())
        .publisher(Arc::new(metrics))
        .build();
    let signature = CallSignature::new(BoundaryKind::Service, "shop::Orders", "list");

    for _ in 0..50 {
        assert!(monkey.notify_boundary_entry(&signature).is_ok());
        monkey.record_watcher_call(&signature);
    }
    assert_eq!(counter(&registry, "chaos_monkey_watcher_calls_total", &[]), 0);
    assert_eq!(counter(&registry, "chaos_monkey_assaults_total", &[]), 0);
}

#[test]
fn assault_rate_tracks_the_level() {
    let monkey = ChaosMonkey::builder(
        SettingsHandle::new(settings_with(AssaultKind::Exception, 5)).unwrap(),
    )
    .random(Arc::new(SeededRandom::new(0x5eed)))
    .build();
    let signature = CallSignature::new(BoundaryKind::Service, "shop::Orders", "list");

    let calls = 10_000;
    let failures = (0..calls)
        .filter(|_| monkey.notify_boundary_entry(&signature).is_err())
        .count();
    // Expected 2000 failures at level 5.
    assert!((1_700..=2_300).contains(&failures), "failures = {failures}");
}

#[test]
fn eligible_calls_get_exactly_one_assault() {
    let hits = Arc::new(AtomicUsize::new(0));
    let custom_hits = Arc::clone(&hits);
    let mut settings = settings_with(AssaultKind::Exception, 1);
    settings.chosen_assaults.insert(AssaultKind::custom("slow-disk"));
    settings
        .assaults
        .custom
        .insert("slow-disk".into(), Default::default());

    let monkey = ChaosMonkey::builder(SettingsHandle::new(settings).unwrap())
        .random(Arc::new(SeededRandom::new(11)))
        .assault(Arc::new(CustomAssault::new("slow-disk", move |_| {
            custom_hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })))
        .build();
    let signature = CallSignature::new(BoundaryKind::Repository, "shop::OrderRepo", "save");

    let calls = 1_000;
    let failures = (0..calls)
        .filter(|_| monkey.notify_boundary_entry(&signature).is_err())
        .count();
    let custom = hits.load(Ordering::SeqCst);
    assert_eq!(failures + custom, calls);
    assert!(failures > 0 && custom > 0);
}

#[test]
fn kill_app_terminates_once_under_concurrency() {
    let terminator = Arc::new(CountingTerminator::default());
    let switch = Arc::new(KillSwitch::new());
    let monkey = ChaosMonkey::builder(
        SettingsHandle::new(settings_with(AssaultKind::KillApp, 1)).unwrap(),
    )
    .kill_switch(Arc::clone(&switch))
    .terminator(terminator.clone())
    .build();
    let signature = CallSignature::new(BoundaryKind::Service, "shop::Orders", "list");

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let monkey = monkey.clone();
            let signature = signature.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    monkey.notify_boundary_entry(&signature).unwrap();
                }
            });
        }
    });
    assert!(switch.is_tripped());
    assert_eq!(terminator.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_replacement_keeps_running_configuration() {
    let handle = SettingsHandle::new(settings_with(AssaultKind::Exception, 3)).unwrap();
    let monkey = ChaosMonkey::new(handle.clone());

    let err = handle
        .replace(Settings {
            level: 0,
            ..handle.load().as_ref().clone()
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLevel { level: 0, .. }));
    assert_eq!(monkey.settings().load().level, 3);
}

#[test]
fn replacement_takes_effect_on_the_next_call() {
    let handle = SettingsHandle::new(settings_with(AssaultKind::Exception, 1)).unwrap();
    let monkey = ChaosMonkey::new(handle.clone());
    let signature = CallSignature::new(BoundaryKind::Service, "shop::Orders", "list");
    assert!(monkey.notify_boundary_entry(&signature).is_err());

    handle.disable().unwrap();
    assert!(monkey.notify_boundary_entry(&signature).is_ok());
}

#[test]
fn chosen_but_inactive_assault_emits_nothing() {
    let registry = new_registry();
    let metrics = ChaosMetrics::new(registry.clone()).unwrap();
    let mut settings = settings_with(AssaultKind::Exception, 1);
    settings.assaults.exception.active = false;
    let monkey = ChaosMonkey::builder(SettingsHandle::new(settings).unwrap())
        .publisher(Arc::new(metrics))
        .build();
    let signature = CallSignature::new(BoundaryKind::Service, "shop::Orders", "list");

    assert!(monkey.notify_boundary_entry(&signature).is_ok());
    assert_eq!(counter(&registry, "chaos_monkey_requests_total", &[]), 0);
}

#[test]
fn watched_custom_services_narrow_the_blast_radius() {
    let mut settings = settings_with(AssaultKind::Exception, 1);
    settings.watched_custom_services = vec!["shop::Payments.charge".into()];
    let monkey = ChaosMonkey::new(SettingsHandle::new(settings).unwrap());

    let charge = CallSignature::new(BoundaryKind::Service, "shop::Payments", "charge");
    let refund = CallSignature::new(BoundaryKind::Service, "shop::Payments", "refund");
    assert!(monkey.notify_boundary_entry(&charge).is_err());
    assert!(monkey.notify_boundary_entry(&refund).is_ok());
}

#[test]
fn latency_stays_within_configured_bounds() {
    let recorder = Arc::new(LatencyRecorder::default());
    let mut settings = settings_with(AssaultKind::Latency, 1);
    settings.assaults.latency.range_start_ms = 50;
    settings.assaults.latency.range_end_ms = 150;
    let monkey = ChaosMonkey::builder(SettingsHandle::new(settings).unwrap())
        .random(Arc::new(SeededRandom::new(3)))
        .publisher(recorder.clone())
        .build();
    let watcher = Watchers::new(&monkey).service;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        for _ in 0..20 {
            watcher
                .intercept_async("shop::Orders", "list", async {})
                .await
                .unwrap();
        }
    });

    let millis = recorder.millis.lock();
    assert_eq!(millis.len(), 20);
    assert!(millis.iter().all(|ms| (50..=150).contains(ms)));
}

#[tokio::test(start_paused = true)]
async fn fixed_latency_delays_by_exactly_that_amount() {
    let mut settings = settings_with(AssaultKind::Latency, 1);
    settings.assaults.latency.range_start_ms = 100;
    settings.assaults.latency.range_end_ms = 100;
    let monkey = ChaosMonkey::new(SettingsHandle::new(settings).unwrap());
    let signature = CallSignature::new(BoundaryKind::Component, "shop::Cache", "get");

    let started = tokio::time::Instant::now();
    monkey
        .notify_boundary_entry_async(&signature)
        .await
        .unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(110));
}
