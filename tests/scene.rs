use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scenevisor::{
    BoxError, EventKind, PropTracker, Scene, SceneConfig, SceneError, SceneState, Subscribe,
    TimeoutKind,
};
use tokio::time::Instant;

const MS: Duration = Duration::from_millis(1);

type Counts = Arc<Mutex<HashMap<String, usize>>>;

fn counting(counts: &Counts) -> impl FnOnce(&str, &u32) -> Result<(), BoxError> + Send + 'static {
    let counts = Arc::clone(counts);
    move |key: &str, _v: &u32| -> Result<(), BoxError> {
        *counts.lock().unwrap().entry(key.to_string()).or_default() += 1;
        Ok(())
    }
}

#[tokio::test]
async fn store_fetch_dispose_round_trip() {
    let scene: Scene<u32> = Scene::start();
    scene.store("k", 1).await.unwrap();
    assert_eq!(scene.fetch("k").await.unwrap(), 1);
    assert_eq!(scene.dispose("k").await.unwrap(), 1);

    let err = scene.fetch("k").await.unwrap_err();
    assert!(err.is_prop_not_found());
    assert!(scene.dispose("k").await.unwrap_err().is_prop_not_found());
    scene.stop().await.unwrap();
}

#[tokio::test]
async fn store_never_overwrites() {
    let scene: Scene<&'static str> = Scene::start();
    scene.store("k", "v1").await.unwrap();

    let err = scene.store("k", "v2").await.unwrap_err();
    assert!(err.is_prop_already_exists());
    assert_eq!(scene.fetch("k").await.unwrap(), "v1");
    scene.stop().await.unwrap();
}

#[tokio::test]
async fn every_cleanup_runs_exactly_once() {
    let counts: Counts = Arc::default();
    let scene: Scene<u32> = Scene::start();
    for i in 0..5 {
        scene
            .store_clean(format!("p{i}"), i, counting(&counts))
            .await
            .unwrap();
    }
    scene.dispose("p1").await.unwrap();
    scene.dispose("p3").await.unwrap();
    assert_eq!(counts.lock().unwrap().len(), 2);

    scene.stop().await.unwrap();
    let counts = counts.lock().unwrap();
    assert_eq!(counts.len(), 5);
    assert!(counts.values().all(|&n| n == 1), "{counts:?}");
}

#[tokio::test]
async fn teardown_finishes_despite_failures() {
    let ran = Arc::new(AtomicUsize::new(0));
    let scene: Scene<u32> = Scene::start();
    for (key, fail) in [("a", true), ("b", false), ("c", true)] {
        let ran = Arc::clone(&ran);
        scene
            .store_clean(key, 0, move |_k: &str, _v: &u32| -> Result<(), BoxError> {
                ran.fetch_add(1, Ordering::SeqCst);
                if fail { Err("disk full".into()) } else { Ok(()) }
            })
            .await
            .unwrap();
    }

    let err = scene.stop().await.unwrap_err();
    assert!(err.is_cleanup_failed());
    assert!(err.to_string().contains("disk full"));
    assert_eq!(ran.load(Ordering::SeqCst), 3);

    // The terminal error never changes afterwards.
    assert!(scene.wait().await.unwrap_err().is_cleanup_failed());
    assert!(scene.stop().await.unwrap_err().is_cleanup_failed());
}

#[tokio::test]
async fn panicking_cleanup_is_reported() {
    let scene: Scene<u32> = Scene::start();
    scene
        .store_clean("p", 0, |_k: &str, _v: &u32| -> Result<(), BoxError> {
            panic!("cleanup exploded")
        })
        .await
        .unwrap();

    let err = scene.dispose("p").await.unwrap_err();
    assert!(err.is_cleanup_failed());
    assert!(err.to_string().contains("cleanup exploded"));
    assert!(scene.fetch("p").await.unwrap_err().is_prop_not_found());
    scene.stop().await.unwrap();
}

#[tokio::test]
async fn dispose_cleanup_failure_only_reaches_that_caller() {
    let scene: Scene<u32> = Scene::start();
    scene
        .store_clean("p", 9, |_k: &str, _v: &u32| -> Result<(), BoxError> {
            Err("nope".into())
        })
        .await
        .unwrap();

    assert!(scene.dispose("p").await.unwrap_err().is_cleanup_failed());
    scene.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn inactivity_timeout_when_idle() {
    let start = Instant::now();
    let scene: Scene<u32> = Scene::start_limited(50 * MS, Duration::ZERO);

    let err = scene.wait().await.unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::Inactivity));
    let elapsed = start.elapsed();
    assert!(elapsed >= 50 * MS && elapsed < 100 * MS, "ended after {elapsed:?}");
    assert_eq!(scene.state(), SceneState::Ended);
}

#[tokio::test(start_paused = true)]
async fn activity_keeps_inactivity_timer_away() {
    let scene: Scene<u32> = Scene::start_limited(30 * MS, Duration::ZERO);
    for i in 0..10 {
        tokio::time::sleep(10 * MS).await;
        scene.store(format!("k{i}"), i).await.unwrap();
    }
    assert_eq!(scene.state(), SceneState::Active);
    scene.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn absolute_timeout_despite_activity() {
    let start = Instant::now();
    let scene: Scene<u32> = Scene::start_limited(Duration::ZERO, 100 * MS);

    let mut i = 0;
    let last = loop {
        let res = if i % 2 == 0 {
            scene.store("k", i).await
        } else {
            scene.dispose("k").await.map(|v| assert_eq!(v, i - 1))
        };
        if let Err(e) = res {
            break e;
        }
        i += 1;
        tokio::time::sleep(10 * MS).await;
    };
    assert!(i >= 10, "only {i} calls before the deadline");
    assert!(last.is_ended() || last.is_timeout(), "{last:?}");

    let err = scene.wait().await.unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::Absolute));
    let elapsed = start.elapsed();
    assert!(elapsed >= 100 * MS && elapsed < 120 * MS, "ended after {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn timeout_still_cleans_up() {
    let counts: Counts = Arc::default();
    let scene: Scene<u32> = Scene::start_limited(20 * MS, Duration::ZERO);
    scene.store_clean("a", 1, counting(&counts)).await.unwrap();
    scene.store_clean("b", 2, counting(&counts)).await.unwrap();

    assert!(scene.wait().await.unwrap_err().is_timeout());
    assert_eq!(counts.lock().unwrap().len(), 2);

    let err = scene.fetch("a").await.unwrap_err();
    assert!(err.is_ended());
}

#[tokio::test]
async fn signal_wakes_every_waiter_once() {
    let scene: Scene<u32> = Scene::start();
    let mut events = scene.subscribe_events();

    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let scene = scene.clone();
            tokio::spawn(async move { scene.wait_signal_limited("go", Duration::ZERO).await })
        })
        .collect();

    let mut registered = 0;
    while registered < 2 {
        if events.recv().await.unwrap().kind == EventKind::WaiterRegistered {
            registered += 1;
        }
    }

    scene.signal("go").await.unwrap();
    for w in waiters {
        w.await.unwrap().unwrap();
    }
    assert!(scene.signal("go").await.unwrap_err().is_no_subscriber());
    scene.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn bounded_wait_expires() {
    let start = Instant::now();
    let scene: Scene<u32> = Scene::start();

    let err = scene.wait_signal_limited("never", 20 * MS).await.unwrap_err();
    assert!(err.is_waited_too_long());
    let elapsed = start.elapsed();
    assert!(elapsed >= 20 * MS && elapsed < 30 * MS, "expired after {elapsed:?}");

    // The expired waiter does not count as a subscriber.
    assert!(scene.signal("never").await.unwrap_err().is_no_subscriber());
    scene.stop().await.unwrap();
}

#[tokio::test]
async fn operations_fail_after_stop() {
    let scene: Scene<u32> = Scene::start();
    scene.store("k", 1).await.unwrap();
    scene.stop().await.unwrap();

    assert!(scene.store("x", 1).await.unwrap_err().is_ended());
    assert!(scene.fetch("k").await.unwrap_err().is_ended());
    assert!(scene.dispose("k").await.unwrap_err().is_ended());
    assert!(scene.signal("t").await.unwrap_err().is_ended());
    assert!(scene.wait_signal("t").await.unwrap_err().is_ended());
}

#[tokio::test]
async fn abort_is_terminal_for_every_observer() {
    let scene: Scene<u32> = Scene::start();
    scene
        .store_clean("p", 0, |_k: &str, _v: &u32| -> Result<(), BoxError> {
            Err("cleanup failed too".into())
        })
        .await
        .unwrap();

    let observers: Vec<_> = (0..3)
        .map(|_| {
            let scene = scene.clone();
            tokio::spawn(async move { scene.wait().await })
        })
        .collect();

    scene.abort(std::io::Error::other("upstream closed"));
    for o in observers {
        let err = o.await.unwrap().unwrap_err();
        assert!(matches!(err, SceneError::Aborted { .. }), "{err:?}");
        assert!(err.to_string().contains("upstream closed"));
    }

    assert!(scene.store("x", 1).await.unwrap_err().is_ended());
    assert!(matches!(
        scene.stop().await.unwrap_err(),
        SceneError::Aborted { .. }
    ));
}

#[tokio::test]
async fn first_abort_wins() {
    let scene: Scene<u32> = Scene::start();
    let mut events = scene.subscribe_events();
    scene.abort("first");
    scene.abort("second");
    let err = scene.wait().await.unwrap_err();
    assert!(err.to_string().contains("first"), "{err}");

    scene.abort("after the end");
    let mut aborts = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::AbortRequested {
            aborts.push(ev.reason.unwrap_or_default());
        }
    }
    assert_eq!(aborts.len(), 1, "{aborts:?}");
    assert!(aborts[0].contains("first"));
}

#[tokio::test(start_paused = true)]
async fn abort_during_timeout_teardown_keeps_timeout() {
    let scene: Scene<u32> = Scene::start_limited(20 * MS, Duration::ZERO);
    let late = scene.clone();
    scene
        .store_clean("p", 1, move |_k: &str, _v: &u32| -> Result<(), BoxError> {
            late.abort("too late");
            Ok(())
        })
        .await
        .unwrap();

    let err = scene.wait().await.unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::Inactivity), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn huge_inactivity_timeout_is_accepted() {
    let scene: Scene<u32> = Scene::start_limited(Duration::MAX, Duration::ZERO);
    scene.store("k", 1).await.unwrap();
    assert_eq!(scene.fetch("k").await.unwrap(), 1);
    assert_eq!(scene.state(), SceneState::Active);
    scene.stop().await.unwrap();

    let scene: Scene<u32> = Scene::start_limited(Duration::from_secs(u64::MAX), Duration::MAX);
    scene.store("k", 1).await.unwrap();
    scene.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn call_overtaken_by_deadline_gets_timeout() {
    let scene: Scene<u32> = Scene::start_limited(Duration::ZERO, 50 * MS);
    scene
        .store_clean("slow", 1, |_k: &str, _v: &u32| -> Result<(), BoxError> {
            // Keeps the backend busy past the absolute deadline.
            std::thread::sleep(Duration::from_millis(150));
            Ok(())
        })
        .await
        .unwrap();

    let busy = {
        let scene = scene.clone();
        tokio::spawn(async move { scene.dispose("slow").await })
    };
    tokio::time::sleep(20 * MS).await;

    // Enqueued while the backend is still inside the cleanup above.
    let err = scene.fetch("slow").await.unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::Absolute), "{err:?}");

    assert_eq!(busy.await.unwrap().unwrap(), 1);
    assert!(scene.wait().await.unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn pending_waiter_sees_timeout() {
    let scene: Scene<u32> = Scene::start_limited(50 * MS, Duration::ZERO);
    let unbounded = {
        let scene = scene.clone();
        tokio::spawn(async move { scene.wait_signal("never").await })
    };
    let bounded = scene.wait_signal_limited("later", Duration::from_secs(10)).await;

    assert_eq!(
        bounded.unwrap_err().timeout_kind(),
        Some(TimeoutKind::Inactivity)
    );
    assert!(unbounded.await.unwrap().unwrap_err().is_timeout());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_stores_have_one_winner() {
    let scene: Scene<usize> = Scene::start();
    let racers: Vec<_> = (0..16)
        .map(|i| {
            let scene = scene.clone();
            tokio::spawn(async move { scene.store("slot", i).await })
        })
        .collect();

    let mut winners = 0;
    for r in racers {
        match r.await.unwrap() {
            Ok(()) => winners += 1,
            Err(e) => assert!(e.is_prop_already_exists(), "{e:?}"),
        }
    }
    assert_eq!(winners, 1);
    scene.stop().await.unwrap();
}

#[tokio::test]
async fn dropping_every_handle_ends_scene() {
    let counts: Counts = Arc::default();
    let scene: Scene<u32> = Scene::start();
    let mut events = scene.subscribe_events();
    scene.store_clean("p", 1, counting(&counts)).await.unwrap();
    drop(scene);

    let mut ended = false;
    while let Ok(ev) = events.recv().await {
        if ev.kind == EventKind::SceneEnded {
            assert_eq!(ev.count, Some(1));
            assert!(ev.reason.is_none());
            ended = true;
        }
    }
    assert!(ended);
    assert_eq!(counts.lock().unwrap().get("p"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn timeout_events_describe_deadline() {
    let scene: Scene<u32> = Scene::start_limited(40 * MS, Duration::ZERO);
    let mut events = scene.subscribe_events();
    let _ = scene.wait().await;

    let mut hit = None;
    let mut ended = None;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::TimeoutHit => hit = Some(ev),
            EventKind::SceneEnded => ended = Some(ev),
            _ => {}
        }
    }
    let hit = hit.unwrap();
    assert_eq!(hit.reason.as_deref(), Some("inactivity"));
    assert_eq!(hit.timeout_ms, Some(40));
    assert!(ended.unwrap().reason.unwrap().contains("inactivity"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn prop_tracker_follows_props() {
    let tracker = PropTracker::new();
    let scene: Scene<u32> = Scene::builder(SceneConfig::default())
        .with_subscriber(Arc::new(tracker.clone()) as Arc<dyn Subscribe>)
        .build();

    scene.store("a", 1).await.unwrap();
    scene.store("b", 2).await.unwrap();
    scene.dispose("a").await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..200 {
        seen = tracker.snapshot().await;
        if seen == ["b"] {
            break;
        }
        tokio::time::sleep(5 * MS).await;
    }
    assert_eq!(seen, ["b"]);
    scene.stop().await.unwrap();
}
