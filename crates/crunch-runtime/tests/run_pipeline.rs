//! Drives complete pipelines through both executors: reordering, windowed
//! and trigger functions, multi-step chains, partition isolation and
//! cancellation.

use std::time::Duration;

use crunch_config::EngineConfig;
use crunch_core::pipe::{EvaluationFunctionDef, SubStream};
use crunch_core::state::MultiStepEvaluationFunction;
use crunch_core::supplier::{boolean_channel, double_channel};
use crunch_core::trigger::{
    ExtractorTriggerHandler, TriggerEvaluationFunction, on_become_true, on_true,
};
use crunch_core::windowed::{GroupByExtractor, WindowedEvaluationFunction, aggregate, bit_active};
use crunch_core::{Event, MRecord, TypedRecord, Value};
use crunch_runtime::{
    ChannelSink, ChannelSource, CollectingSink, EvaluationPipeline, Executor,
    PartitionedExecutor, VecSource,
};
use tokio::sync::mpsc;

const CONFIG: &str = r#"
[engine]
channel_capacity = 8

[stream_defaults]
sort_window = "10ms"

[stream.press]
late_policy = "drop"
"#;

fn pressure_window() -> EvaluationFunctionDef {
    EvaluationFunctionDef::new("pressure-window", || {
        WindowedEvaluationFunction::builder()
            .record_window(bit_active(boolean_channel("running")))
            .try_extractor(|| {
                GroupByExtractor::builder()
                    .aggregate(aggregate::max(), double_channel("pressure"))
                    .aggregate(aggregate::count(), double_channel("pressure"))
                    .build()
            })
            .build()
    })
}

fn alarm_trigger() -> EvaluationFunctionDef {
    EvaluationFunctionDef::new("alarm", || {
        TriggerEvaluationFunction::builder()
            .strategy(on_become_true(boolean_channel("alarm")))
            .handler(ExtractorTriggerHandler::new("ALARM"))
            .build()
    })
}

fn press_stream(config: &EngineConfig) -> SubStream {
    SubStream::builder()
        .with_config(&config.stream("press"))
        .predicate(|r| r.source().starts_with("press"))
        .evaluation_function(pressure_window())
        .evaluation_function(alarm_trigger())
        .build()
        .unwrap()
}

fn press(ts: i64) -> TypedRecord {
    TypedRecord::new("press-1", ts)
}

fn names(events: &[Event]) -> Vec<&str> {
    events.iter().map(Event::name).collect()
}

// -- 1. sequential executor ---------------------------------------------------

#[tokio::test]
async fn sequential_run_reorders_and_evaluates() {
    let config: EngineConfig = CONFIG.parse().unwrap();
    let pipeline = EvaluationPipeline::new("plant", [press_stream(&config)]).unwrap();

    let mut source = VecSource::new([
        press(0).with("running", true).with("pressure", 1.0),
        press(20).with("running", true).with("pressure", 5.0),
    ]);
    source.push_idle();
    // late by 5ms, inside the 10ms reordering horizon
    source.push(press(15).with("running", true).with("pressure", 3.0));
    source.push(press(40).with("running", false).with("alarm", false));
    source.push_idle();
    source.push(press(60).with("alarm", true));
    source.push(press(80).with("alarm", true));
    // from another line: rejected by the predicate
    source.push(TypedRecord::new("oven-1", 90).with("alarm", true));

    let sink = CollectingSink::new();
    let mut writer = sink.clone();
    let stats = Executor::new(pipeline)
        .run(&mut source, &mut writer)
        .await
        .unwrap();

    assert_eq!(stats.records, 7);
    assert_eq!(stats.idle_polls, 2);
    assert_eq!(stats.events, 2);

    let events = sink.events();
    assert_eq!(names(&events), ["GROUP_40", "ALARM"]);
    let group = &events[0];
    assert_eq!(group.timestamp(), 40);
    assert_eq!(group.parameter("max.pressure"), Some(&Value::Double(5.0)));
    assert_eq!(group.parameter("count.pressure"), Some(&Value::Long(3)));
    assert_eq!(events[1].timestamp(), 60);
    assert_eq!(events[1].source(), "press-1");
}

#[tokio::test]
async fn multi_step_chain_runs_inside_a_stream() {
    let chain = EvaluationFunctionDef::new("start-then-stop", || {
        let step = |channel: &'static str| {
            EvaluationFunctionDef::new(channel, move || {
                TriggerEvaluationFunction::builder()
                    .strategy(on_true(boolean_channel(channel)))
                    .handler(ExtractorTriggerHandler::new(channel))
                    .build()
            })
        };
        MultiStepEvaluationFunction::builder()
            .add_step(step("start"), "start")
            .add_step_with_timeout(step("stop"), "stop", 100)
            .error_extractor_fn(|_, failure, ctx| {
                let r = ctx.get();
                let event = Event::new(r.timestamp(), "CYCLE_FAILED", r.source())
                    .with_parameter("reason", failure.to_string());
                ctx.collect(event);
            })
            .completion_extractor_fn(|results, ctx| {
                let started = results.get("start").map_or(0, Event::timestamp);
                let r = ctx.get();
                let event = Event::new(r.timestamp(), "CYCLE", r.source())
                    .with_parameter("duration", r.timestamp() - started);
                ctx.collect(event);
            })
            .build()
    });
    let stream = SubStream::builder()
        .identifier("cycles")
        .predicate(|_| true)
        .evaluation_function(chain)
        .build()
        .unwrap();
    let pipeline = EvaluationPipeline::new("cycles", [stream]).unwrap();

    let mut source = VecSource::new([
        press(0).with("start", true),
        press(30).with("stop", true),
        press(50).with("start", true),
        press(200).with("stop", true),
    ]);
    let sink = CollectingSink::new();
    let mut writer = sink.clone();
    Executor::new(pipeline)
        .run(&mut source, &mut writer)
        .await
        .unwrap();

    let events = sink.events();
    assert_eq!(names(&events), ["CYCLE", "CYCLE_FAILED"]);
    assert_eq!(events[0].parameter("duration"), Some(&Value::Long(30)));
    assert_eq!(
        events[1].parameter("reason").and_then(Value::as_str),
        Some("step timeout")
    );
}

// -- 2. partitioned executor --------------------------------------------------

#[tokio::test]
async fn partitions_keep_per_source_state_apart() {
    let stream = SubStream::builder()
        .identifier("press")
        .predicate(|_| true)
        .evaluation_function(pressure_window())
        .build()
        .unwrap();
    let pipeline = EvaluationPipeline::new("plant", [stream]).unwrap();

    let rec = |source: &str, ts: i64| TypedRecord::new(source, ts);
    let mut source = VecSource::new([
        rec("press-1", 0).with("running", true).with("pressure", 1.0),
        rec("press-2", 5).with("running", false),
        rec("press-1", 10).with("running", true).with("pressure", 2.0),
        rec("press-2", 12).with("running", true).with("pressure", 9.0),
        rec("press-1", 20).with("running", false),
        rec("press-2", 30).with("running", false),
    ]);

    let sink = CollectingSink::new();
    let mut writer = sink.clone();
    let stats = PartitionedExecutor::new(pipeline, 2)
        .run(&mut source, &mut writer)
        .await
        .unwrap();
    assert_eq!(stats.partitions, 2);
    assert_eq!(stats.records, 6);
    assert_eq!(stats.events, 2);

    let mut events = sink.events();
    events.sort_by(|a, b| a.source().cmp(b.source()));
    assert_eq!(events[0].source(), "press-1");
    assert_eq!(events[0].name(), "GROUP_20");
    assert_eq!(events[0].parameter("max.pressure"), Some(&Value::Double(2.0)));
    assert_eq!(events[0].parameter("count.pressure"), Some(&Value::Long(2)));
    assert_eq!(events[1].source(), "press-2");
    assert_eq!(events[1].name(), "GROUP_30");
    assert_eq!(events[1].parameter("max.pressure"), Some(&Value::Double(9.0)));
}

#[tokio::test]
async fn partitioned_capacity_comes_from_config() {
    let config: EngineConfig = CONFIG.parse().unwrap();
    let pipeline = EvaluationPipeline::new("plant", [press_stream(&config)]).unwrap();
    let mut source = VecSource::new((0..50).map(|i| press(i * 10).with("alarm", i % 2 == 0)));

    let sink = CollectingSink::new();
    let mut writer = sink.clone();
    let stats = PartitionedExecutor::from_config(pipeline, &config)
        .run(&mut source, &mut writer)
        .await
        .unwrap();
    // the first `true` has no known previous value
    assert_eq!(stats.events, 24);
    assert!(sink.events().iter().all(|e| e.name() == "ALARM"));
}

// -- 3. cancellation ----------------------------------------------------------

#[tokio::test]
async fn cancellation_stops_an_open_source() {
    let stream = SubStream::builder()
        .identifier("alarms")
        .predicate(|_| true)
        .evaluation_function(EvaluationFunctionDef::new("alarm", || {
            TriggerEvaluationFunction::builder()
                .strategy(on_true(boolean_channel("alarm")))
                .handler(ExtractorTriggerHandler::new("ALARM"))
                .build()
        }))
        .build()
        .unwrap();
    let executor = Executor::new(EvaluationPipeline::new("p", [stream]).unwrap());
    let cancel = executor.cancel_token();

    let (record_tx, mut source) = ChannelSource::channel(4);
    let (event_tx, mut event_rx) = mpsc::channel(4);
    let mut sink = ChannelSink::new(event_tx);
    let run = tokio::spawn(async move { executor.run(&mut source, &mut sink).await });

    let record: Box<dyn MRecord> = Box::new(press(1).with("alarm", true));
    record_tx.send(record).await.unwrap();
    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.name(), "ALARM");

    // the sender stays open; only cancellation can end the run
    cancel.cancel();
    let stats = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("executor did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(stats.records, 1);
    drop(record_tx);
}
