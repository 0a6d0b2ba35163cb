//! arbiter-interchange: the JSON form of Arbiter rule sets.
//!
//! Every node is an object tagged by a `"type"` field. Arithmetic
//! expressions use the operator name itself as the tag:
//!
//! ```json
//! {"type": "PLUS", "lhs": {"type": "number", "value": 1}, "rhs": {"type": "attribute", "name": "x"}}
//! ```
//!
//! Decoding produces the by-name [`RuleSet<String>`](arbiter_core::RuleSet);
//! resolve it with [`arbiter_core::resolve`] before evaluating.

pub mod decode;
pub mod encode;

pub use decode::{decode_rule_set, from_json_str, InterchangeError};
pub use encode::{encode_resolved, encode_rule_set};
