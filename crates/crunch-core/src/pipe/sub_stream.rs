use std::fmt;
use std::sync::Arc;

use crunch_config::{LatePolicy, StreamConfig};

use super::function::{EvaluationFunction, EvaluationFunctionDef};
use super::handler::{RecordHandler, RecordHandlerFactory};
use crate::error::{CoreResult, config_error};
use crate::record::{ChannelSet, MRecord};
use crate::supplier::Supplier;

/// Decides whether a record belongs to a sub-stream.
pub type RecordPredicate = Arc<dyn Fn(&dyn MRecord) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// SubStream — one logical stream: predicate, reordering horizon, functions
// ---------------------------------------------------------------------------

/// A validated sub-stream definition.
///
/// Holds function *definitions*; every stream instance calls
/// [`instantiate_functions`](Self::instantiate_functions) to obtain its own
/// private set of function instances.
#[derive(Clone)]
pub struct SubStream {
    identifier: String,
    predicate: RecordPredicate,
    sort_window_ms: i64,
    late_policy: LatePolicy,
    channel_filter: bool,
    merge_channels: bool,
    functions: Vec<EvaluationFunctionDef>,
    handlers: Vec<RecordHandlerFactory>,
    channels: ChannelSet,
}

impl SubStream {
    pub fn builder() -> SubStreamBuilder {
        SubStreamBuilder::default()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn sort_window_ms(&self) -> i64 {
        self.sort_window_ms
    }

    pub fn late_policy(&self) -> LatePolicy {
        self.late_policy
    }

    pub fn channel_filter(&self) -> bool {
        self.channel_filter
    }

    pub fn merge_channels(&self) -> bool {
        self.merge_channels
    }

    pub fn function_defs(&self) -> &[EvaluationFunctionDef] {
        &self.functions
    }

    /// Union of the channels every function declares.
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn accepts(&self, record: &dyn MRecord) -> bool {
        (self.predicate)(record)
    }

    /// Fresh function instances, in configuration order.
    pub fn instantiate_functions(&self) -> CoreResult<Vec<Box<dyn EvaluationFunction>>> {
        self.functions.iter().map(EvaluationFunctionDef::create).collect()
    }

    /// Fresh record handlers, in configuration order.
    pub fn instantiate_handlers(&self) -> Vec<Box<dyn RecordHandler>> {
        self.handlers.iter().map(|f| f()).collect()
    }
}

impl fmt::Debug for SubStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubStream")
            .field("identifier", &self.identifier)
            .field("sort_window_ms", &self.sort_window_ms)
            .field("late_policy", &self.late_policy)
            .field("functions", &self.functions)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SubStreamBuilder
// ---------------------------------------------------------------------------

pub struct SubStreamBuilder {
    identifier: Option<String>,
    predicate: Option<RecordPredicate>,
    sort_window_ms: i64,
    late_policy: LatePolicy,
    channel_filter: bool,
    merge_channels: bool,
    functions: Vec<EvaluationFunctionDef>,
    handlers: Vec<RecordHandlerFactory>,
}

impl Default for SubStreamBuilder {
    fn default() -> Self {
        Self {
            identifier: None,
            predicate: None,
            sort_window_ms: 0,
            late_policy: LatePolicy::Emit,
            channel_filter: true,
            merge_channels: false,
            functions: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

impl SubStreamBuilder {
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn MRecord) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Use a boolean supplier as predicate; an absent result rejects the record.
    pub fn predicate_supplier(self, supplier: Supplier<bool>) -> Self {
        self.predicate(move |r| supplier.extract(r).unwrap_or(false))
    }

    pub fn sort_window_ms(mut self, window_ms: i64) -> Self {
        self.sort_window_ms = window_ms;
        self
    }

    pub fn late_policy(mut self, policy: LatePolicy) -> Self {
        self.late_policy = policy;
        self
    }

    pub fn channel_filter(mut self, enabled: bool) -> Self {
        self.channel_filter = enabled;
        self
    }

    pub fn merge_channels(mut self, enabled: bool) -> Self {
        self.merge_channels = enabled;
        self
    }

    /// Take reordering and filtering settings from a resolved stream config.
    /// The identifier is set from the config name unless already given.
    pub fn with_config(mut self, config: &StreamConfig) -> Self {
        if self.identifier.is_none() {
            self.identifier = Some(config.name.clone());
        }
        self.sort_window_ms = config.sort_window_ms();
        self.late_policy = config.late_policy;
        self.channel_filter = config.channel_filter;
        self.merge_channels = config.merge_channels;
        self
    }

    pub fn evaluation_function(mut self, def: EvaluationFunctionDef) -> Self {
        self.functions.push(def);
        self
    }

    pub fn evaluation_functions(
        mut self,
        defs: impl IntoIterator<Item = EvaluationFunctionDef>,
    ) -> Self {
        self.functions.extend(defs);
        self
    }

    pub fn record_handler<F, H>(mut self, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: RecordHandler + 'static,
    {
        self.handlers
            .push(Arc::new(move || Box::new(factory()) as Box<dyn RecordHandler>));
        self
    }

    /// Validate and build.
    ///
    /// Every function definition is instantiated once here so a broken
    /// definition fails at construction rather than on the first record.
    pub fn build(self) -> CoreResult<SubStream> {
        let identifier = self
            .identifier
            .filter(|id| !id.is_empty())
            .ok_or_else(|| config_error("sub-stream requires an identifier"))?;
        let predicate = self
            .predicate
            .ok_or_else(|| config_error(format!("sub-stream {identifier:?} requires a predicate")))?;
        if self.functions.is_empty() {
            return Err(config_error(format!(
                "sub-stream {identifier:?} requires at least one evaluation function"
            )));
        }
        if self.sort_window_ms < 0 {
            return Err(config_error(format!(
                "sub-stream {identifier:?}: sort window must be >= 0, got {}",
                self.sort_window_ms
            )));
        }

        let mut channels = ChannelSet::new();
        for def in &self.functions {
            channels.extend(def.channels()?);
        }

        Ok(SubStream {
            identifier,
            predicate,
            sort_window_ms: self.sort_window_ms,
            late_policy: self.late_policy,
            channel_filter: self.channel_filter,
            merge_channels: self.merge_channels,
            functions: self.functions,
            handlers: self.handlers,
            channels,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
