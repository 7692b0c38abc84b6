//! Pluggable per-line transforms

use sluice_core::{Config, ProcessorKind};
use std::borrow::Cow;

/// Transform applied to each line before it is written.
///
/// Implementations may keep per-line state; the engine calls `process`
/// exactly once per input line, in input order.
pub trait LineProcessor: Send {
    fn process<'a>(&mut self, line: &'a [u8]) -> Cow<'a, [u8]>;
}

/// Identity processor: lines pass through unchanged
pub struct NoProcessor;

impl LineProcessor for NoProcessor {
    fn process<'a>(&mut self, line: &'a [u8]) -> Cow<'a, [u8]> {
        Cow::Borrowed(line)
    }
}

/// Prepends a fixed byte string to every line
pub struct PrefixProcessor {
    prefix: Vec<u8>,
}

impl PrefixProcessor {
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl LineProcessor for PrefixProcessor {
    fn process<'a>(&mut self, line: &'a [u8]) -> Cow<'a, [u8]> {
        if self.prefix.is_empty() {
            return Cow::Borrowed(line);
        }
        let mut out = Vec::with_capacity(self.prefix.len() + line.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(line);
        Cow::Owned(out)
    }
}

/// Build the processor selected by the configuration
pub fn processor_for(config: &Config) -> Box<dyn LineProcessor> {
    match config.processor {
        ProcessorKind::None => Box::new(NoProcessor),
        ProcessorKind::Prefix => Box::new(PrefixProcessor::new(config.prefix.as_bytes())),
    }
}
