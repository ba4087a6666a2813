//! Benchmarks for axis-template rendering (spec.md §4.2, §5 hot path).

use calm_core::persister::templates::{render, TemplateContext};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const FULL_TEMPLATE: &str = "Goal: {goal}\nHypothesis: {hypothesis}\nAction: {action}\nPrediction: {prediction}\nOutcome: {outcome_status} — {result}[\nSurprise: {surprise}][\nRoot cause ({root_cause_category}): {root_cause_description}][\nLesson: {lesson}]";

fn full_context() -> TemplateContext {
    TemplateContext::new()
        .with("goal", "reproduce the flaky port-bind failure")
        .with("hypothesis", "a previous test leaks its listener socket")
        .with("action", "add SO_REUSEADDR and rerun the suite ten times")
        .with("prediction", "zero bind failures across all ten runs")
        .with("outcome_status", "falsified")
        .with("result", "still flaky, but less often than before")
        .with_opt("surprise", Some("the leak was a red herring"))
        .with_opt("root_cause_category", Some("logic-error"))
        .with_opt(
            "root_cause_description",
            Some("test teardown doesn't await the listener's drop"),
        )
        .with_opt("lesson", Some("await async drops in teardown"))
}

fn minimal_context() -> TemplateContext {
    TemplateContext::new()
        .with("goal", "reproduce the flaky port-bind failure")
        .with("hypothesis", "a previous test leaks its listener socket")
        .with("action", "add SO_REUSEADDR and rerun the suite ten times")
        .with("prediction", "zero bind failures across all ten runs")
        .with("outcome_status", "confirmed")
        .with("result", "no bind failures across ten runs")
}

fn bench_render_with_every_optional_section_present(c: &mut Criterion) {
    let ctx = full_context();
    c.bench_function("render_full_template_all_optionals_present", |b| {
        b.iter(|| render(black_box(FULL_TEMPLATE), black_box(&ctx)).unwrap());
    });
}

fn bench_render_with_every_optional_section_elided(c: &mut Criterion) {
    let ctx = minimal_context();
    c.bench_function("render_full_template_all_optionals_elided", |b| {
        b.iter(|| render(black_box(FULL_TEMPLATE), black_box(&ctx)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_render_with_every_optional_section_present,
    bench_render_with_every_optional_section_elided
);
criterion_main!(benches);
