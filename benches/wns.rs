use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use wns::{build_request, ArchiveHistory, ObservationRecord, UnitSystem, UploaderConfig};

fn sample_record(minute: u32) -> ObservationRecord {
    ObservationRecord::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        UnitSystem::Us,
    )
    .with("outTemp", 68.4)
    .with("outHumidity", 61.0)
    .with("barometer", 29.98)
    .with("pressure", 29.1)
    .with("windSpeed", 7.0)
    .with("windGust", 12.0)
    .with("windDir", 225.0)
    .with("dayRain", 0.12)
    .with("soilTemp1", 55.2)
}

fn bench_build_request(c: &mut Criterion) {
    let config = UploaderConfig::builder()
        .station("12345")
        .api_key("ABCDE")
        .overrides(BTreeMap::from([("TSOI10".to_string(), "soilTemp1".to_string())]))
        .build()
        .unwrap();
    let record = sample_record(30);
    c.bench_function("build_request", |b| {
        b.iter(|| build_request(black_box(&record), black_box(&config)))
    });

    let mut history = ArchiveHistory::new();
    for minute in 0..30 {
        history.push(sample_record(minute));
    }
    c.bench_function("augment", |b| b.iter(|| history.augment(black_box(&record))));
}

criterion_group!(benches, bench_build_request);
criterion_main!(benches);
