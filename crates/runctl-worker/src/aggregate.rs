// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accumulates chunks into the final `output_data`, honoring the soft cap
//! on in-memory aggregation. Object storage for spilled output is an
//! external collaborator (out of scope here); once the cap is crossed this
//! only records that a spill would be needed and returns a reference
//! marker instead of the full value.

use runctl_core::MAX_AGGREGATE_BYTES;
use serde_json::Value;

pub struct OutputAggregator {
    chunks: Vec<Value>,
    size_bytes: usize,
    spilled: bool,
}

impl OutputAggregator {
    pub fn new() -> Self {
        Self { chunks: Vec::new(), size_bytes: 0, spilled: false }
    }

    pub fn push(&mut self, chunk: &Value) {
        if self.spilled {
            return;
        }
        let approx_size = serde_json::to_vec(chunk).map(|b| b.len()).unwrap_or(0);
        if self.size_bytes + approx_size > MAX_AGGREGATE_BYTES {
            self.spilled = true;
            self.chunks.clear();
            return;
        }
        self.size_bytes += approx_size;
        self.chunks.push(chunk.clone());
    }

    /// The final `output_data` value: either the concatenated chunks (for
    /// string chunks, joined; otherwise an array) or a spill reference.
    pub fn finish(self) -> Value {
        if self.spilled {
            return serde_json::json!({ "spilled": true, "reason": "exceeded in-memory aggregation cap" });
        }
        if self.chunks.iter().all(|c| c.is_string()) {
            let joined: String =
                self.chunks.iter().map(|c| c.as_str().unwrap_or_default()).collect();
            Value::String(joined)
        } else {
            Value::Array(self.chunks)
        }
    }
}

impl Default for OutputAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_chunks_are_concatenated() {
        let mut agg = OutputAggregator::new();
        agg.push(&Value::String("he".into()));
        agg.push(&Value::String("llo".into()));
        assert_eq!(agg.finish(), Value::String("hello".into()));
    }

    #[test]
    fn non_string_chunks_become_an_array() {
        let mut agg = OutputAggregator::new();
        agg.push(&serde_json::json!({"a": 1}));
        agg.push(&serde_json::json!({"b": 2}));
        assert_eq!(agg.finish(), serde_json::json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn exceeding_the_cap_spills_instead_of_accumulating_forever() {
        let mut agg = OutputAggregator::new();
        let big = Value::String("x".repeat(MAX_AGGREGATE_BYTES + 1));
        agg.push(&big);
        let out = agg.finish();
        assert_eq!(out["spilled"], Value::Bool(true));
    }
}
