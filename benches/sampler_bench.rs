use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use hoststat::config::SamplerConfig;
use hoststat::system::mock::{HostFrame, ScriptedSource, process};
use hoststat::system::process::{ProcessInfo, rank_top};
use hoststat::system::source::ProcessReading;
use hoststat::system::{ManualClock, Sampler};

fn make_readings(n: usize, tick: u64) -> Vec<ProcessReading> {
    (0..n)
        .map(|i| {
            let pid = i as u32 + 1;
            process(
                pid,
                &format!("proc_{i}"),
                tick * (i as u64 % 97) * 10,
                ((n - i) as u64 + 1) * 1024,
            )
        })
        .collect()
}

fn make_infos(n: usize) -> Vec<ProcessInfo> {
    (0..n)
        .map(|i| ProcessInfo {
            pid: i as u32 + 1,
            name: format!("proc_{i}"),
            cpu_percent: (i % 100) as f32,
            memory_percent: 0.1,
        })
        .collect()
}

fn bench_poll_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_steady_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let source = ScriptedSource::new(HostFrame::idle().with_processes(make_readings(size, 0)));
        let clock = ManualClock::new();
        let mut sampler = Sampler::new(source.clone(), clock.clone(), SamplerConfig::default());
        sampler.poll();
        source.update(|frame| frame.processes = Some(make_readings(size, 1)));

        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                clock.advance(Duration::from_secs(1));
                black_box(sampler.poll());
            })
        });
    }

    group.finish();
}

fn bench_poll_full_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_churn_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let source = ScriptedSource::new(HostFrame::idle());
        let clock = ManualClock::new();
        let mut sampler = Sampler::new(source.clone(), clock.clone(), SamplerConfig::default());
        let mut offset = 0u32;

        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                // every pid is new each poll, so every handle is evicted next time
                offset = offset.wrapping_add(size as u32);
                let readings: Vec<ProcessReading> = (0..size as u32)
                    .map(|i| process(offset.wrapping_add(i), "short", 0, 0))
                    .collect();
                source.update(|frame| frame.processes = Some(readings));
                clock.advance(Duration::from_millis(100));
                black_box(sampler.poll());
            })
        });
    }

    group.finish();
}

fn bench_rank_top(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_top_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let infos = make_infos(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &infos, |b, infos| {
            b.iter(|| black_box(rank_top(black_box(infos.clone()), 50)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_poll_steady_state,
    bench_poll_full_churn,
    bench_rank_top
);
criterion_main!(benches);
