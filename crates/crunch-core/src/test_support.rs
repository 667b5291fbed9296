use crate::event::Event;
use crate::pipe::{EvaluationContext, EvaluationFunction, SimpleEvaluationContext};
use crate::record::TypedRecord;
use crate::value::Value;

pub const SOURCE: &str = "test";

/// A typed record from `test` at `ts` with the given channels.
pub fn record(ts: i64, channels: Vec<(&str, Value)>) -> TypedRecord {
    channels
        .into_iter()
        .fold(TypedRecord::new(SOURCE, ts), |r, (k, v)| r.with(k, v))
}

pub fn long(n: i64) -> Value {
    Value::Long(n)
}

pub fn double(f: f64) -> Value {
    Value::Double(f)
}

pub fn flag(b: bool) -> Value {
    Value::Bool(b)
}

pub fn text(s: &str) -> Value {
    Value::Str(s.to_string())
}

/// Evaluate one record and return what the function collected.
pub fn eval_one(function: &mut dyn EvaluationFunction, record: &TypedRecord) -> Vec<Event> {
    let mut ctx = SimpleEvaluationContext::new(record);
    function.eval(&mut ctx).unwrap();
    ctx.into_events()
}

/// Emit one event named `name` for every record it sees.
pub fn emit_event(ctx: &mut dyn EvaluationContext, name: &str) {
    let record = ctx.get();
    let event = Event::new(record.timestamp(), name, record.source());
    ctx.collect(event);
}
