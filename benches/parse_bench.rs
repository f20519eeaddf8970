//! Benchmarks for ESO parsing, querying and export
//!
//! Run with: cargo bench

use chrono::{Datelike, Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use eplusout::eso::{parse_eso_str, ParseOptions};
use eplusout::query::{query, ExportOptions, ResultsRequest};
use eplusout::storage::{Frequency, Variable};
use tempfile::tempdir;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Hourly ESO text with `zones` zone temperatures over `days` days
fn synthetic_eso(days: i64, zones: u32) -> String {
    let mut text = String::from(
        "Program Version,EnergyPlus, Version 9.4.0\n\
         1,5,Environment Title[],Latitude[deg],Longitude[deg],Time Zone[],Elevation[m]\n\
         2,8,Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],Hour[],StartMinute[],EndMinute[],DayType\n",
    );
    for zone in 0..zones {
        text.push_str(&format!(
            "{},1,BLOCK1:ZONE{},Zone Mean Air Temperature [C] !Hourly\n",
            10 + zone,
            zone + 1
        ));
    }
    text.push_str("End of Data Dictionary\n");
    text.push_str("1,RUN PERIOD 1,  48.15,  17.10,   1.00, 138.00\n");

    let first = NaiveDate::from_ymd_opt(2002, 1, 1).unwrap();
    for day in 0..days {
        let date = first + Duration::days(day);
        let name = DAY_NAMES[date.weekday().num_days_from_monday() as usize];
        for hour in 1..=24 {
            text.push_str(&format!(
                "2,{}, {}, {}, 0,{},0.00,60.00,{}\n",
                day + 1,
                date.month(),
                date.day(),
                hour,
                name
            ));
            for zone in 0..zones {
                text.push_str(&format!("{},{:.2}\n", 10 + zone, 20.0 + hour as f64 * 0.1));
            }
        }
    }
    text.push_str("End of Data\n");
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let options = ParseOptions::new().year(2002);

    for days in [7, 31, 365] {
        let text = synthetic_eso(days, 10);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_function(format!("hourly_{}_days", days), |b| {
            b.iter(|| parse_eso_str(black_box(&text), &options).unwrap())
        });
    }

    group.bench_function("inferred_year_31_days", |b| {
        let text = synthetic_eso(31, 10);
        b.iter(|| parse_eso_str(black_box(&text), &ParseOptions::default()).unwrap())
    });

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let store = parse_eso_str(&synthetic_eso(365, 20), &ParseOptions::new().year(2002)).unwrap();

    group.bench_function("all_variables_year", |b| {
        let request = ResultsRequest::all(Frequency::Hourly);
        b.iter(|| query(&store, black_box(&request)).unwrap())
    });

    group.bench_function("alike_one_zone_week", |b| {
        let start = NaiveDate::from_ymd_opt(2002, 3, 1)
            .and_then(|d| d.and_hms_opt(1, 0, 0))
            .unwrap();
        let request = ResultsRequest::new(
            [Variable::any().with_key("ZONE7")],
            Frequency::Hourly,
        )
        .alike(true)
        .start(start)
        .end(start + Duration::days(7));
        b.iter(|| query(&store, black_box(&request)).unwrap())
    });

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    let store = parse_eso_str(&synthetic_eso(31, 10), &ParseOptions::new().year(2002)).unwrap();
    let view = query(&store, &ResultsRequest::all(Frequency::Hourly)).unwrap();

    group.bench_function("csv_month", |b| {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        let options = ExportOptions::default();
        b.iter(|| view.to_csv(black_box(&path), &options).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_query, bench_export);
criterion_main!(benches);
