use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rlsift::config::ViewerConfig;
use rlsift::search::{ChunkPlanner, CompiledMatcher, SearchCriteria, SearchEvent};
use rlsift::Session;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARN", "ERROR", "FATAL"];
const SERVICES: [&str; 5] = ["auth", "database", "cache", "payment", "notification"];
const ERRORS: [&str; 4] = ["timeout", "connection_failed", "null_pointer", "out_of_memory"];

fn create_log_file_with_patterns(size_kb: usize, pattern_frequency: usize) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let target_size = size_kb * 1024;
    let mut current_size = 0;
    let mut line_num = 0;

    while current_size < target_size {
        let log_level = LOG_LEVELS[line_num % LOG_LEVELS.len()];
        let service = SERVICES[line_num % SERVICES.len()];

        let log_line = if line_num % pattern_frequency == 0 {
            let error = ERRORS[line_num / pattern_frequency % ERRORS.len()];
            format!(
                "[2024-09-02T10:{}:{:02}] {} {}: Request {} failed with {} user_{}\n",
                (line_num / 3600) % 24,
                (line_num / 60) % 60,
                log_level,
                service,
                line_num,
                error,
                line_num % 1000
            )
        } else {
            format!(
                "[2024-09-02T10:{}:{:02}] {} {}: Request {} processed successfully user_{}\n",
                (line_num / 3600) % 24,
                (line_num / 60) % 60,
                log_level,
                service,
                line_num,
                line_num % 1000
            )
        };

        temp_file.write_all(log_line.as_bytes()).unwrap();
        current_size += log_line.len();
        line_num += 1;
    }

    temp_file.flush().unwrap();
    temp_file
}

fn size_label(size_kb: usize) -> String {
    if size_kb < 1024 {
        format!("{}KB", size_kb)
    } else {
        format!("{}MB", size_kb / 1024)
    }
}

fn run_search(rt: &Runtime, session: &Session, criteria: &SearchCriteria) -> usize {
    rt.block_on(async {
        let handle = session.search(criteria.clone()).await.unwrap();
        match handle.wait().await {
            SearchEvent::Finished(summary) => summary.total_hits,
            other => panic!("search did not finish: {:?}", other),
        }
    })
}

fn bench_search_modes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_modes");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let sizes_kb = [500, 5000, 60000];
    let pattern_frequency = 100;

    for &size_kb in &sizes_kb {
        let temp_file = create_log_file_with_patterns(size_kb, pattern_frequency);
        let session = Session::open(temp_file.path(), &ViewerConfig::default()).unwrap();
        let label = size_label(size_kb);

        let exhaustive = SearchCriteria::new().include(["timeout"]);
        group.bench_with_input(BenchmarkId::new("exhaustive", &label), &session, |b, s| {
            b.iter(|| black_box(run_search(&rt, s, &exhaustive)));
        });

        let excluded = SearchCriteria::new()
            .include(["failed", "auth"])
            .exclude(["DEBUG"]);
        group.bench_with_input(
            BenchmarkId::new("include_exclude", &label),
            &session,
            |b, s| {
                b.iter(|| black_box(run_search(&rt, s, &excluded)));
            },
        );

        let regex = SearchCriteria::new()
            .include([r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}"])
            .regex(true);
        group.bench_with_input(BenchmarkId::new("regex", &label), &session, |b, s| {
            b.iter(|| black_box(run_search(&rt, s, &regex)));
        });

        let preview = SearchCriteria::preview(None).include(["timeout"]);
        group.bench_with_input(BenchmarkId::new("preview", &label), &session, |b, s| {
            b.iter(|| black_box(run_search(&rt, s, &preview)));
        });

        let sampled = SearchCriteria::new()
            .include(["timeout"])
            .sampling_ratio(Some(0.25));
        group.bench_with_input(BenchmarkId::new("sampled", &label), &session, |b, s| {
            b.iter(|| black_box(run_search(&rt, s, &sampled)));
        });

        rt.block_on(session.close());
    }

    group.finish();
}

fn bench_worker_scaling(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("worker_scaling");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let temp_file = create_log_file_with_patterns(20000, 50);
    let criteria = SearchCriteria::new().include(["connection_failed"]);

    for workers in [1, 2, 4, 8] {
        let mut config = ViewerConfig::default();
        config.search.workers = workers;
        let session = Session::open(temp_file.path(), &config).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &session, |b, s| {
            b.iter(|| black_box(run_search(&rt, s, &criteria)));
        });

        rt.block_on(session.close());
    }

    group.finish();
}

fn bench_line_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_matching");

    let mut rng = ChaCha8Rng::seed_from_u64(42); // Fixed seed for reproducibility
    let lines: Vec<String> = (0..10_000)
        .map(|n| {
            format!(
                "{} {}: Request {} finished with {}",
                LOG_LEVELS[rng.gen_range(0..LOG_LEVELS.len())],
                SERVICES[rng.gen_range(0..SERVICES.len())],
                n,
                ERRORS[rng.gen_range(0..ERRORS.len())]
            )
        })
        .collect();

    let cases = [
        ("single_literal", SearchCriteria::new().include(["timeout"])),
        (
            "all_of_two",
            SearchCriteria::new().include(["ERROR", "payment"]),
        ),
        (
            "any_of_three",
            SearchCriteria::new()
                .include(["FATAL", "null_pointer", "cache"])
                .require_all_includes(false),
        ),
        (
            "whole_word_with_exclude",
            SearchCriteria::new()
                .include(["auth"])
                .exclude(["DEBUG", "INFO"])
                .whole_word(true),
        ),
    ];

    for (name, criteria) in &cases {
        let matcher = CompiledMatcher::compile(criteria).unwrap();
        group.bench_with_input(BenchmarkId::new("match_line", name), &matcher, |b, m| {
            b.iter(|| {
                let matched = lines.iter().filter(|line| m.match_line(line).is_some()).count();
                black_box(matched)
            });
        });
    }

    group.finish();
}

fn bench_chunk_planning(c: &mut Criterion) {
    let planner = ChunkPlanner::default();

    c.bench_function("plan_100m_lines", |b| {
        b.iter(|| black_box(planner.plan(black_box(100_000_000), 8).len()));
    });
}

criterion_group!(
    benches,
    bench_search_modes,
    bench_worker_scaling,
    bench_line_matching,
    bench_chunk_planning
);
criterion_main!(benches);
