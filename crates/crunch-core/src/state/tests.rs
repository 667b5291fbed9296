use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::error::config_error;
use crate::pipe::SimpleEvaluationContext;
use crate::record::channel_set;
use crate::test_support::{eval_one, flag, record};
use crate::value::Value;

/// Emits one event named after `channel` whenever that channel is true.
struct EmitWhen(&'static str);

impl EvaluationFunction for EmitWhen {
    fn eval(&mut self, ctx: &mut dyn EvaluationContext) -> CoreResult<()> {
        let r = ctx.get();
        if r.get_bool(self.0) == Some(true) {
            let event = Event::new(r.timestamp(), self.0, r.source());
            ctx.collect(event);
        }
        Ok(())
    }

    fn channels(&self) -> ChannelSet {
        channel_set([self.0])
    }
}

struct Fails;

impl EvaluationFunction for Fails {
    fn eval(&mut self, _ctx: &mut dyn EvaluationContext) -> CoreResult<()> {
        Err(config_error("boom"))
    }

    fn channels(&self) -> ChannelSet {
        ChannelSet::new()
    }
}

fn when(channel: &'static str) -> EvaluationFunctionDef {
    EvaluationFunctionDef::new(channel, move || Ok(EmitWhen(channel)))
}

type Failures = Arc<Mutex<Vec<(FailureKind, Vec<String>)>>>;

/// Builder preloaded with extractors: completion emits `DONE` carrying the
/// number of results, errors are recorded into the returned log.
fn with_extractors() -> (MultiStepEvaluationFunctionBuilder, Failures) {
    let failures: Failures = Arc::default();
    let log = Arc::clone(&failures);
    let builder = MultiStepEvaluationFunction::builder()
        .error_extractor_fn(move |results, failure, _ctx| {
            let aliases: Vec<String> = results.keys().cloned().collect();
            log.lock().unwrap().push((failure.kind(), aliases));
        })
        .completion_extractor_fn(|results, ctx| {
            let r = ctx.get();
            let event = Event::new(r.timestamp(), "DONE", r.source())
                .with_parameter("steps", results.len() as i64);
            ctx.collect(event);
        });
    (builder, failures)
}

// -- 1. happy path ------------------------------------------------------------

#[test]
fn two_steps_complete_once_then_restart() {
    let (builder, failures) = with_extractors();
    let mut f = builder
        .add_step(when("a"), "first")
        .add_step(when("b"), "second")
        .build()
        .unwrap();

    assert!(eval_one(&mut f, &record(1, vec![("a", flag(true))])).is_empty());
    assert_eq!(f.current_step(), 1);
    assert_eq!(f.results_seen(), 1);
    assert!(f.results().contains_key("first"));

    // step 0 is no longer active; `a` alone does nothing
    assert!(eval_one(&mut f, &record(2, vec![("a", flag(true))])).is_empty());
    assert_eq!(f.current_step(), 1);

    let out = eval_one(&mut f, &record(3, vec![("b", flag(true))]));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name(), "DONE");
    assert_eq!(out[0].timestamp(), 3);
    assert_eq!(out[0].parameter("steps").and_then(Value::as_long), Some(2));

    assert_eq!(f.current_step(), 0);
    assert_eq!(f.results_seen(), 0);
    assert!(f.results().is_empty());
    assert!(f.overall_deadline().is_none());
    assert!(failures.lock().unwrap().is_empty());

    // a second pass works the same way
    eval_one(&mut f, &record(4, vec![("a", flag(true))]));
    let out = eval_one(&mut f, &record(5, vec![("b", flag(true))]));
    assert_eq!(out.len(), 1);
}

#[test]
fn single_step_completes_immediately() {
    let (builder, _) = with_extractors();
    let mut f = builder.add_step(when("a"), "only").build().unwrap();
    let out = eval_one(&mut f, &record(1, vec![("a", flag(true))]));
    assert_eq!(out.len(), 1);
    assert_eq!(f.current_step(), 0);
}

#[test]
fn deadlines_are_set_on_progress() {
    let (builder, _) = with_extractors();
    let mut f = builder
        .add_step_with_timeout(when("a"), "first", 50)
        .add_step_with_timeout(when("b"), "second", 10)
        .with_overall_timeout_ms(100)
        .build()
        .unwrap();
    assert!(f.step_deadline().is_none());
    assert!(f.overall_deadline().is_none());

    eval_one(&mut f, &record(1_000, vec![("a", flag(true))]));
    // the step deadline bounds the step that is now waiting
    assert_eq!(f.step_deadline(), Some(1_010));
    assert_eq!(f.overall_deadline(), Some(1_100));
}

// -- 2. failures --------------------------------------------------------------

#[test]
fn step_timeout_resets_to_first_step() {
    let (builder, failures) = with_extractors();
    let mut f = builder
        .add_step(when("a"), "first")
        .add_step_with_timeout(when("b"), "second", 10)
        .build()
        .unwrap();

    eval_one(&mut f, &record(0, vec![("a", flag(true))]));
    assert!(eval_one(&mut f, &record(9, vec![])).is_empty());
    assert_eq!(f.current_step(), 1);

    // deadline reached exactly: timed out, even though `b` is true
    let out = eval_one(&mut f, &record(10, vec![("b", flag(true))]));
    assert!(out.is_empty());
    assert_eq!(f.current_step(), 0);
    assert_eq!(f.results_seen(), 0);

    let log = failures.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, FailureKind::StepTimeout);
    assert_eq!(log[0].1, ["first"]);
}

#[test]
fn failed_rebuild_still_clears_the_pass() {
    let down = Arc::new(AtomicBool::new(false));
    let flag_ = Arc::clone(&down);
    let first = EvaluationFunctionDef::new("a", move || {
        if flag_.swap(false, Ordering::SeqCst) {
            Err(config_error("factory down"))
        } else {
            Ok(EmitWhen("a"))
        }
    });
    let (builder, failures) = with_extractors();
    let mut f = builder
        .add_step(first, "first")
        .add_step_with_timeout(when("b"), "second", 10)
        .build()
        .unwrap();

    eval_one(&mut f, &record(0, vec![("a", flag(true))]));
    assert_eq!(f.current_step(), 1);

    down.store(true, Ordering::SeqCst);
    let late = record(20, vec![]);
    let mut ctx = SimpleEvaluationContext::new(&late);
    assert!(f.eval(&mut ctx).is_err());
    assert_eq!(f.current_step(), 0);
    assert_eq!(f.results_seen(), 0);
    assert!(f.results().is_empty());
    assert!(f.step_deadline().is_none());
    assert!(f.overall_deadline().is_none());
    assert_eq!(failures.lock().unwrap().len(), 1);

    // the next record rebuilds step 0 and starts a clean pass
    assert!(eval_one(&mut f, &record(30, vec![("a", flag(true))])).is_empty());
    assert_eq!(f.current_step(), 1);
    assert_eq!(f.results_seen(), 1);
    assert_eq!(failures.lock().unwrap().len(), 1);
}

#[test]
fn several_events_from_one_step_count_once() {
    struct Burst;

    impl EvaluationFunction for Burst {
        fn eval(&mut self, ctx: &mut dyn EvaluationContext) -> CoreResult<()> {
            let (ts, source) = (ctx.get().timestamp(), ctx.get().source().to_string());
            for name in ["x", "y", "z"] {
                ctx.collect(Event::new(ts, name, source.as_str()));
            }
            Ok(())
        }

        fn channels(&self) -> ChannelSet {
            ChannelSet::new()
        }
    }

    let (builder, _) = with_extractors();
    let mut f = builder
        .add_step(EvaluationFunctionDef::new("burst", || Ok(Burst)), "burst")
        .add_step(when("b"), "second")
        .build()
        .unwrap();
    eval_one(&mut f, &record(1, vec![]));
    assert_eq!(f.current_step(), 1);
    assert_eq!(f.results_seen(), 1);
}

#[test]
fn overall_timeout_reports_partial_results() {
    let (builder, failures) = with_extractors();
    let mut f = builder
        .add_step(when("a"), "first")
        .add_step_with_timeout(when("b"), "second", 100)
        .add_step_with_timeout(when("c"), "third", 100)
        .with_overall_timeout_ms(15)
        .build()
        .unwrap();

    eval_one(&mut f, &record(0, vec![("a", flag(true))]));
    eval_one(&mut f, &record(5, vec![("b", flag(true))]));
    assert_eq!(f.current_step(), 2);

    eval_one(&mut f, &record(20, vec![("c", flag(true))]));
    assert_eq!(f.current_step(), 0);

    let log = failures.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, FailureKind::OverallTimeout);
    assert_eq!(log[0].1, ["first", "second"]);
}

#[test]
fn step_error_is_reported_not_propagated() {
    let (builder, failures) = with_extractors();
    let mut f = builder
        .add_step(when("a"), "first")
        .add_step(EvaluationFunctionDef::new("fails", || Ok(Fails)), "second")
        .build()
        .unwrap();

    eval_one(&mut f, &record(0, vec![("a", flag(true))]));
    let r = record(1, vec![]);
    let mut ctx = crate::pipe::SimpleEvaluationContext::new(&r);
    assert!(f.eval(&mut ctx).is_ok());
    assert_eq!(f.current_step(), 0);

    let log = failures.lock().unwrap();
    assert_eq!(log[0].0, FailureKind::Evaluation);
    assert_eq!(log[0].1, ["first"]);
}

#[test]
fn error_extractor_can_emit() {
    let mut f = MultiStepEvaluationFunction::builder()
        .add_step(when("a"), "first")
        .add_step_with_timeout(when("b"), "second", 1)
        .error_extractor_fn(|_, failure, ctx| {
            let r = ctx.get();
            let event = Event::new(r.timestamp(), "FAILED", r.source())
                .with_parameter("reason", failure.to_string());
            ctx.collect(event);
        })
        .completion_extractor_fn(|_, _| {})
        .build()
        .unwrap();

    eval_one(&mut f, &record(0, vec![("a", flag(true))]));
    let out = eval_one(&mut f, &record(5, vec![]));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name(), "FAILED");
    assert_eq!(
        out[0].parameter("reason").and_then(Value::as_str),
        Some("step timeout")
    );
}

// -- 3. construction ----------------------------------------------------------

#[test]
fn build_validation() {
    let (no_steps, _) = with_extractors();
    assert!(no_steps.build().is_err());

    let (dup, _) = with_extractors();
    assert!(
        dup.add_step(when("a"), "x")
            .add_step(when("b"), "x")
            .build()
            .is_err()
    );

    let (neg, _) = with_extractors();
    assert!(
        neg.add_step_with_timeout(when("a"), "x", -1)
            .build()
            .is_err()
    );

    let no_error = MultiStepEvaluationFunction::builder()
        .add_step(when("a"), "x")
        .completion_extractor_fn(|_, _| {})
        .build();
    assert!(no_error.is_err());

    let no_completion = MultiStepEvaluationFunction::builder()
        .add_step(when("a"), "x")
        .error_extractor_fn(|_, _, _| {})
        .build();
    assert!(no_completion.is_err());
}

#[test]
fn channels_union_steps_and_extractors() {
    let f = MultiStepEvaluationFunction::builder()
        .add_step(when("a"), "first")
        .add_step(when("b"), "second")
        .error_extractor(error_extractor_fn(|_, _, _| {}).reading(channel_set(["err"])))
        .completion_extractor(completion_extractor_fn(|_, _| {}).reading(channel_set(["done"])))
        .build()
        .unwrap();
    assert_eq!(f.channels(), channel_set(["a", "b", "done", "err"]));
}
