use std::sync::Arc;

use chrono::{Days, NaiveDate};
use common::{AttemptToken, DateRange, SystemClock};
use criterion::{Criterion, criterion_group, criterion_main};
use inventory::{
    AvailabilityEngine, DEFAULT_LEDGER_TTL, InMemoryIdempotencyLedger, InMemoryRoomRepository,
    NewRoom,
};

fn engine(rt: &tokio::runtime::Runtime, rooms: usize) -> AvailabilityEngine {
    let ledger = InMemoryIdempotencyLedger::new(DEFAULT_LEDGER_TTL, Arc::new(SystemClock));
    let engine = AvailabilityEngine::new(Arc::new(InMemoryRoomRepository::new()), Arc::new(ledger));
    rt.block_on(async {
        for n in 0..rooms {
            engine
                .add_room(NewRoom::new(1, format!("{}", 100 + n)))
                .await
                .unwrap();
        }
    });
    engine
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn bench_confirm_release(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine(&rt, 1);
    let room = rt.block_on(engine.list_rooms()).unwrap()[0].id;
    let dates = DateRange::new(base(), base() + Days::new(2)).unwrap();

    c.bench_function("engine/confirm_release", |b| {
        b.iter(|| {
            rt.block_on(async {
                let token = AttemptToken::generate();
                assert!(engine.confirm(room, dates, &token).await.unwrap());
                engine.release(room, &token).await.unwrap();
            });
        });
    });
}

fn bench_recommend(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine(&rt, 50);
    rt.block_on(async {
        for room in engine.list_rooms().await.unwrap().iter().step_by(3) {
            let stay = DateRange::new(base(), base() + Days::new(5)).unwrap();
            engine.record_stay(room.id, stay).await.unwrap();
        }
    });
    let dates = DateRange::new(base() + Days::new(2), base() + Days::new(4)).unwrap();

    c.bench_function("engine/recommend_50_rooms", |b| {
        b.iter(|| rt.block_on(engine.recommend_rooms(dates)).unwrap());
    });
}

criterion_group!(benches, bench_confirm_release, bench_recommend);
criterion_main!(benches);
