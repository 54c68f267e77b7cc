//! Splitter and batch planner fuzzer.
//!
//! Feeds arbitrary UTF-8 text through the splitter and checks that:
//! - every statement is a trimmed, non-empty slice;
//! - the meaningful statements are a subsequence of the raw ones;
//! - batching at a threshold derived from the input keeps every statement,
//!   in order, and only exceeds the threshold with single-statement batches.

use honggfuzz::fuzz;
use seed_loader::{is_meaningful, meaningful_statements, plan_batches, split_statements};

fn check(sql: &str, threshold: usize) {
    let raw = split_statements(sql);
    for statement in &raw {
        assert!(!statement.is_empty());
        assert_eq!(statement.trim(), *statement);
    }

    let meaningful = meaningful_statements(sql);
    let expected: Vec<&str> = raw.iter().copied().filter(|s| is_meaningful(s)).collect();
    assert_eq!(meaningful, expected);

    let batches = plan_batches(meaningful.iter().copied(), threshold);
    let mut flattened = Vec::with_capacity(meaningful.len());
    for batch in &batches {
        assert!(!batch.is_empty());
        assert!(batch.size() <= threshold || batch.len() == 1);
        assert_eq!(batch.size(), batch.to_query().len());
        flattened.extend_from_slice(batch.statements());
    }
    assert_eq!(flattened, meaningful);
}

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            let Some((&first, rest)) = data.split_first() else {
                return;
            };
            if let Ok(sql) = std::str::from_utf8(rest) {
                check(sql, usize::from(first) * 16 + 1);
            }
        });
    }
}
