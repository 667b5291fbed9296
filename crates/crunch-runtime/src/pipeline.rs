use std::collections::BTreeSet;
use std::sync::Arc;

use crunch_core::pipe::SubStream;
use crunch_core::{CoreReason, CoreResult, Event, MRecord, RawRecord};
use orion_error::StructError;

use crate::runner::StreamRunner;

/// An identified, ordered set of sub-streams sharing one record flow.
///
/// The pipeline itself holds only definitions; each
/// [`instantiate`](Self::instantiate) call yields independent runners.
#[derive(Debug, Clone)]
pub struct EvaluationPipeline {
    identifier: String,
    sub_streams: Vec<SubStream>,
}

impl EvaluationPipeline {
    pub fn new(
        identifier: impl Into<String>,
        sub_streams: impl IntoIterator<Item = SubStream>,
    ) -> CoreResult<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(StructError::from(CoreReason::Configuration)
                .with_detail("pipeline requires an identifier".to_string()));
        }
        let sub_streams: Vec<SubStream> = sub_streams.into_iter().collect();
        if sub_streams.is_empty() {
            return Err(StructError::from(CoreReason::Configuration)
                .with_detail(format!("pipeline {identifier:?} has no sub-streams")));
        }
        let mut seen = BTreeSet::new();
        for s in &sub_streams {
            if !seen.insert(s.identifier()) {
                return Err(StructError::from(CoreReason::Configuration).with_detail(format!(
                    "pipeline {identifier:?}: duplicate sub-stream {:?}",
                    s.identifier()
                )));
            }
        }
        Ok(Self {
            identifier,
            sub_streams,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn sub_streams(&self) -> &[SubStream] {
        &self.sub_streams
    }

    /// Fresh runners for every sub-stream, in declaration order.
    pub fn instantiate(&self) -> CoreResult<PipelineInstance> {
        let runners = self
            .sub_streams
            .iter()
            .map(StreamRunner::new)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(PipelineInstance {
            identifier: self.identifier.clone(),
            runners,
        })
    }
}

/// Live state of one pipeline: one runner per sub-stream.
pub struct PipelineInstance {
    identifier: String,
    runners: Vec<StreamRunner>,
}

impl PipelineInstance {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn runners(&self) -> &[StreamRunner] {
        &self.runners
    }

    /// Route `record` to every sub-stream whose predicate accepts it.
    pub fn offer(&mut self, record: Arc<dyn MRecord>) -> Vec<Event> {
        let mut out = Vec::new();
        for runner in &mut self.runners {
            if runner.accepts(record.as_ref()) {
                out.extend(runner.offer(Arc::clone(&record)));
            }
        }
        out
    }

    /// Type a connector record under its prefixed channel names, then route
    /// it like [`offer`](Self::offer).
    pub fn offer_raw(&mut self, record: &RawRecord) -> Vec<Event> {
        self.offer(Arc::new(record.to_typed()))
    }

    /// End of stream for every sub-stream.
    pub fn finish(&mut self) -> Vec<Event> {
        self.runners.iter_mut().flat_map(StreamRunner::finish).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crunch_core::TypedRecord;
    use crunch_core::pipe::EvaluationFunctionDef;
    use crunch_core::supplier::{boolean_channel, long_channel};
    use crunch_core::trigger::{
        ChannelMapExtractor, ExtractorTriggerHandler, TriggerEvaluationFunction, on_true,
    };

    fn alarm_def() -> EvaluationFunctionDef {
        EvaluationFunctionDef::new("alarm", || {
            TriggerEvaluationFunction::builder()
                .strategy(on_true(boolean_channel("alarm")))
                .handler(
                    ExtractorTriggerHandler::new("ALARM")
                        .with_extractor(ChannelMapExtractor::new([
                            long_channel("zone").into_value(),
                        ])),
                )
                .build()
        })
    }

    fn sub_stream(id: &str, source: &'static str) -> SubStream {
        SubStream::builder()
            .identifier(id)
            .predicate(move |r| r.source() == source)
            .evaluation_function(alarm_def())
            .build()
            .unwrap()
    }

    fn alarm(source: &str, ts: i64) -> Arc<dyn MRecord> {
        Arc::new(
            TypedRecord::new(source, ts)
                .with("alarm", true)
                .with("zone", 4i64),
        )
    }

    #[test]
    fn routes_by_predicate() {
        let p = EvaluationPipeline::new(
            "plant",
            [sub_stream("ovens", "oven"), sub_stream("presses", "press")],
        )
        .unwrap();
        let mut inst = p.instantiate().unwrap();

        let out = inst.offer(alarm("oven", 1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name(), "ALARM");
        assert_eq!(out[0].source(), "oven");
        assert_eq!(out[0].parameter("zone").and_then(|v| v.as_long()), Some(4));

        assert!(inst.offer(alarm("mixer", 2)).is_empty());
        assert!(inst.finish().is_empty());
    }

    #[test]
    fn raw_records_are_typed_with_prefix() {
        let stream = SubStream::builder()
            .identifier("line1")
            .predicate(|r| r.source() == "plc")
            .evaluation_function(EvaluationFunctionDef::new("alarm", || {
                TriggerEvaluationFunction::builder()
                    .strategy(on_true(boolean_channel("line1_alarm")))
                    .handler(ExtractorTriggerHandler::new("ALARM"))
                    .build()
            }))
            .build()
            .unwrap();
        let p = EvaluationPipeline::new("plant", [stream]).unwrap();
        let mut inst = p.instantiate().unwrap();

        let raw = RawRecord::new("plc", 1, "line1").with("alarm", serde_json::json!(true));
        let out = inst.offer_raw(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name(), "ALARM");
        assert_eq!(inst.runners()[0].filtered(), 0);

        let other = RawRecord::new("plc", 2, "line2").with("alarm", serde_json::json!(true));
        assert!(inst.offer_raw(&other).is_empty());
        assert_eq!(inst.runners()[0].filtered(), 1);
    }

    #[test]
    fn instances_are_independent() {
        let p = EvaluationPipeline::new("plant", [sub_stream("ovens", "oven")]).unwrap();
        let a = p.instantiate().unwrap();
        let b = p.instantiate().unwrap();
        assert_eq!(a.runners().len(), 1);
        assert_eq!(b.identifier(), "plant");
    }

    #[test]
    fn rejects_bad_definitions() {
        assert!(EvaluationPipeline::new("", [sub_stream("a", "x")]).is_err());
        assert!(EvaluationPipeline::new("p", Vec::<SubStream>::new()).is_err());
        assert!(
            EvaluationPipeline::new("p", [sub_stream("a", "x"), sub_stream("a", "y")]).is_err()
        );
    }
}
