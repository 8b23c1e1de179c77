mod check;
mod coverage;
mod examples;
mod run;
mod server;

use std::fs;
use std::path::{Path, PathBuf};

pub const DISCOUNT_PROGRAM: &str = r#"{
  "name": "discounts",
  "entities": [
    {"name": "order", "fields": [
      {"name": "total", "type": "number"},
      {"name": "discountPercent", "type": "number"},
      {"name": "status", "type": "string"}
    ]}
  ],
  "rules": [
    {
      "id": "discount-high-value",
      "priority": 10,
      "when": {"compare": {"lhs": {"fact": "order.total"}, "operator": "greater", "rhs": {"value": 100}}},
      "then": [{"set": {"target": "order.discountPercent", "value": {"value": 10}}}]
    },
    {
      "id": "mark-reviewed",
      "when": {"exists": {"fact": "order.total"}},
      "then": [{"set": {"target": "order.status", "value": {"value": "reviewed"}}}]
    }
  ],
  "examples": [
    {
      "id": "big-order",
      "input": {"order": {"total": 120}},
      "expected": {"order": {"discountPercent": 10, "status": "reviewed"}}
    }
  ]
}"#;

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
