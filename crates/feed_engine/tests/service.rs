//! Client-facing operations and live fan-out.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use feed_engine::prelude::*;
use feed_models::{ModelConfig, ModelType, WalkStep};
use infra_store::{ConfigStore, InstrumentRecord, MemoryStore, PriceSample, PriceStore};
use tokio::sync::watch;
use tokio::time::Instant;

async fn service_with(names: &[&str]) -> (PriceFeedService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    for name in names {
        store
            .upsert_instrument(&InstrumentRecord::new(*name, 100))
            .await
            .unwrap();
    }
    let manager = Arc::new(ModelManager::new(store.clone()));
    let hub = Arc::new(BroadcastHub::new(HubConfig::default(), store.clone()));
    (PriceFeedService::new(manager, hub), store)
}

#[tokio::test]
async fn unknown_instrument_is_not_found_everywhere() {
    let (service, _) = service_with(&["FTSE"]).await;
    let now = Utc::now();

    let results = [
        service.get_configurations("NOPE").await.map(|_| ()),
        service.switch_model("NOPE", "Flat").await.map(|_| ()),
        service.update_tick_interval("NOPE", 100).await.map(|_| ()),
        service
            .update_random_multiplicative_config("NOPE", 0.01, 0.0)
            .await
            .map(|_| ()),
        service
            .update_mean_reverting_config("NOPE", 100.0, 1.0, 1.0, 0.01)
            .await
            .map(|_| ()),
        service
            .update_random_additive_walk_config("NOPE", vec![WalkStep::new(1.0, 0.1)])
            .await
            .map(|_| ()),
        service
            .get_historical_data("NOPE", now - ChronoDuration::hours(1), now)
            .await
            .map(|_| ()),
    ];

    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{err}");
    }
}

#[tokio::test]
async fn invalid_parameters_are_rejected() {
    let (service, _) = service_with(&["FTSE"]).await;

    let errors = [
        service.switch_model("FTSE", "Heston").await.map(|_| ()),
        service.update_tick_interval("FTSE", 0).await.map(|_| ()),
        service
            .update_random_multiplicative_config("FTSE", 0.0, 0.0)
            .await
            .map(|_| ()),
        service
            .update_mean_reverting_config("FTSE", 100.0, -1.0, 1.0, 0.01)
            .await
            .map(|_| ()),
        service
            .update_mean_reverting_config("FTSE", 100.0, 1.0, 1.0, 0.0)
            .await
            .map(|_| ()),
        service
            .update_random_additive_walk_config(
                "FTSE",
                vec![WalkStep::new(1.2, 0.1), WalkStep::new(-0.2, 0.0)],
            )
            .await
            .map(|_| ()),
    ];

    for result in errors {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}

#[tokio::test]
async fn configurations_reflect_updates() {
    let (service, _) = service_with(&["FTSE"]).await;

    let initial = service.get_configurations("FTSE").await.unwrap();
    assert_eq!(initial.model_type, ModelType::RandomMultiplicative);
    assert_eq!(initial.tick_interval_ms, 100);

    service
        .update_random_additive_walk_config(
            "FTSE",
            vec![WalkStep::new(0.5, -1.0), WalkStep::new(0.5, 1.0)],
        )
        .await
        .unwrap();
    service.switch_model("FTSE", "RandomAdditiveWalk").await.unwrap();
    service.update_tick_interval("FTSE", 750).await.unwrap();

    let current = service.get_configurations("FTSE").await.unwrap();
    assert_eq!(current.model_type, ModelType::RandomAdditiveWalk);
    assert_eq!(current.tick_interval_ms, 750);
    match current.configs.get(&ModelType::RandomAdditiveWalk) {
        Some(ModelConfig::RandomAdditiveWalk(c)) => assert_eq!(c.steps.len(), 2),
        other => panic!("unexpected config: {other:?}"),
    }
    assert_eq!(service.get_supported_models().len(), 4);
}

#[tokio::test]
async fn historical_data_is_ordered_and_bounded() {
    let (service, store) = service_with(&["FTSE"]).await;
    let base = Utc::now() - ChronoDuration::minutes(10);
    for i in 0..6 {
        store
            .append(PriceSample::new(
                "FTSE",
                100.0 + i as f64,
                base + ChronoDuration::minutes(i),
            ))
            .await
            .unwrap();
    }

    let history = service
        .get_historical_data(
            "FTSE",
            base + ChronoDuration::minutes(1),
            base + ChronoDuration::minutes(4),
        )
        .await
        .unwrap();
    let values: Vec<f64> = history.iter().map(|u| u.value).collect();
    assert_eq!(values, vec![101.0, 102.0, 103.0, 104.0]);
    assert!(history.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
}

#[tokio::test]
async fn every_subscriber_receives_every_matching_update() {
    let (service, store) = service_with(&["FTSE", "DAX"]).await;
    for name in ["FTSE", "DAX"] {
        store
            .append(PriceSample::new(name, 100.0, Utc::now()))
            .await
            .unwrap();
    }
    service.switch_model("FTSE", "Flat").await.unwrap();
    service.switch_model("DAX", "Flat").await.unwrap();

    let mut ftse_subscribers: Vec<_> = (0..5)
        .map(|_| service.subscribe_to_prices(["FTSE"]))
        .collect();
    let mut dax_only = service.subscribe_to_prices([" DAX "]);
    let mut everything = service.subscribe_to_prices(Vec::<String>::new());

    let scheduler = GenerationScheduler::new(
        SchedulerConfig {
            rng_seed: Some(1),
            ..SchedulerConfig::default()
        },
        service.manager().clone(),
        store,
        service.hub().clone(),
    );
    scheduler.start().await.unwrap();

    let t0 = Instant::now();
    for i in 0..3 {
        scheduler
            .run_pass(t0 + std::time::Duration::from_millis(i * 100))
            .await
            .unwrap();
    }

    for subscriber in &mut ftse_subscribers {
        let received: Vec<_> = std::iter::from_fn(|| subscriber.try_recv()).collect();
        assert_eq!(received.len(), 3);
        assert!(received.iter().all(|u| u.instrument == "FTSE"));
    }
    let dax: Vec<_> = std::iter::from_fn(|| dax_only.try_recv()).collect();
    assert_eq!(dax.len(), 3);
    assert!(dax.iter().all(|u| u.instrument == "DAX"));
    assert_eq!(std::iter::from_fn(|| everything.try_recv()).count(), 6);

    let stats = service.hub().stats();
    assert_eq!(stats.published, 6);
    assert_eq!(stats.delivered, 3 * 5 + 3 + 6);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test]
async fn cancelled_stream_ends_cleanly_and_unsubscribes() {
    let (service, _) = service_with(&["FTSE"]).await;
    let hub = service.hub().clone();
    let mut subscription = service.subscribe_to_prices(["FTSE"]);
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let reader = tokio::spawn(async move {
        let mut received = 0;
        while let Some(_update) = subscription.recv_until(&mut cancel_rx).await {
            received += 1;
        }
        received
    });

    for i in 0..3 {
        hub.publish(PriceUpdate::new("FTSE", i as f64, Utc::now()));
    }
    assert_eq!(hub.stats().delivered, 3);
    tokio::task::yield_now().await;

    cancel_tx.send(true).unwrap();
    let received = reader.await.unwrap();
    assert!(received <= 3);
    assert_eq!(hub.subscriber_count(), 0);
}
