use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use feed_models::{ModelConfig, ModelType};
use infra_store::{ConfigStore, InstrumentRecord, MemoryStore, PriceSample, PriceStore};

#[tokio::test]
async fn price_range_is_inclusive_and_ordered() {
    let store = MemoryStore::new();
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();

    for i in 0..10 {
        let sample = PriceSample::new("FTSE", 100.0 + i as f64, base + Duration::seconds(i));
        store.append(sample).await.unwrap();
    }
    store
        .append(PriceSample::new("DAX", 1.0, base + Duration::seconds(3)))
        .await
        .unwrap();

    let window = store
        .range("FTSE", base + Duration::seconds(2), base + Duration::seconds(5))
        .await
        .unwrap();
    let values: Vec<f64> = window.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![102.0, 103.0, 104.0, 105.0]);
    assert!(window.iter().all(|s| s.instrument == "FTSE"));

    assert!(store
        .range("UNKNOWN", base, base + Duration::seconds(100))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn latest_returns_most_recent_sample() {
    let store = MemoryStore::new();
    assert!(store.latest("FTSE").await.unwrap().is_none());

    let base = Utc::now();
    store.append(PriceSample::new("FTSE", 1.0, base)).await.unwrap();
    store
        .append(PriceSample::new("FTSE", 2.0, base + Duration::milliseconds(10)))
        .await
        .unwrap();

    let latest = store.latest("FTSE").await.unwrap().unwrap();
    assert_eq!(latest.value, 2.0);
    assert_eq!(store.sample_count("FTSE").await, 2);
}

#[tokio::test]
async fn config_store_crud() {
    let store = MemoryStore::new();

    store
        .upsert_instrument(&InstrumentRecord::new("FTSE", 1000))
        .await
        .unwrap();
    store
        .upsert_instrument(&InstrumentRecord::new("CAC", 250).with_model(ModelConfig::Flat))
        .await
        .unwrap();

    let names: Vec<String> = store
        .list_instruments()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["CAC".to_string(), "FTSE".to_string()]);

    store
        .save_config("FTSE", &ModelConfig::default_for(ModelType::MeanReverting))
        .await
        .unwrap();
    let ftse = store.get_instrument("FTSE").await.unwrap().unwrap();
    assert!(ftse.configs.contains_key(&ModelType::MeanReverting));
    assert_eq!(ftse.model_type, None);

    assert!(store.delete_instrument("FTSE").await.unwrap());
    assert!(!store.delete_instrument("FTSE").await.unwrap());
    assert!(store.get_instrument("FTSE").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_cascades_configs_only() {
    let store = MemoryStore::new();
    let record = InstrumentRecord::new("FTSE", 1000).with_model(ModelConfig::Flat);
    store.upsert_instrument(&record).await.unwrap();
    store
        .append(PriceSample::new("FTSE", 100.0, Utc::now()))
        .await
        .unwrap();

    store.delete_instrument("FTSE").await.unwrap();

    // Re-creating the instrument starts without the old configurations.
    store
        .upsert_instrument(&InstrumentRecord::new("FTSE", 1000))
        .await
        .unwrap();
    assert!(store.get_instrument("FTSE").await.unwrap().unwrap().configs.is_empty());
    assert_eq!(store.sample_count("FTSE").await, 1);
}

#[tokio::test]
async fn concurrent_appends_are_all_recorded() {
    let store = Arc::new(MemoryStore::new());
    let base = Utc::now();

    let handles: Vec<_> = (0..8)
        .map(|task| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..50 {
                    let ts = base + Duration::milliseconds(task * 1000 + i);
                    store
                        .append(PriceSample::new("FTSE", i as f64, ts))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let samples = store.samples("FTSE").await;
    assert_eq!(samples.len(), 400);
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
