// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use dongbu_app::{CAR_LOGS, COMMENTS, STORAGE_ITEMS};
use dongbu_store::MemoryStore;
use dongbu_testkit::DemoFaker;

const DEMO_SEED: u64 = 20_240_501;

/// Fills a fresh in-memory store with believable rows for every tab.
pub fn seed_demo_store(cars: &[String]) -> Result<MemoryStore> {
    let store = MemoryStore::new();
    let mut faker = DemoFaker::new(DEMO_SEED);

    for _ in 0..8 + faker.int_n(5) {
        store
            .insert_record(&COMMENTS, &faker.comment())
            .context("seed demo comment")?;
    }
    for _ in 0..12 + faker.int_n(6) {
        store
            .insert_record(&STORAGE_ITEMS, &faker.storage_item())
            .context("seed demo storage item")?;
    }
    for car in cars {
        for _ in 0..4 + faker.int_n(5) {
            store
                .insert_record(&CAR_LOGS, &faker.car_log(car))
                .with_context(|| format!("seed demo trip log for {car}"))?;
        }
    }

    tracing::info!(
        comments = store.row_count(COMMENTS.name),
        storage_items = store.row_count(STORAGE_ITEMS.name),
        car_logs = store.row_count(CAR_LOGS.name),
        "seeded demo store"
    );
    Ok(store)
}
