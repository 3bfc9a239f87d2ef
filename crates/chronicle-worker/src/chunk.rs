//! Splitting a channel's messages into viewer parts.

use chronicle_core::models::ExportMessage;
use chronicle_core::ExportLimits;

/// Split `messages` into order-preserving chunks of at most `requested_limit`.
///
/// The limit is normalised first (non-positive means the configured default,
/// then clamped into bounds). An empty input yields exactly one empty chunk so
/// a channel without messages still exports a single-part archive.
pub fn split_messages(
    messages: Vec<ExportMessage>,
    requested_limit: i64,
    limits: &ExportLimits,
) -> Vec<Vec<ExportMessage>> {
    split_into_chunks(messages, limits.normalize_slice_limit(requested_limit))
}

/// Same as [`split_messages`] with an already normalised limit.
pub fn split_into_chunks(messages: Vec<ExportMessage>, limit: usize) -> Vec<Vec<ExportMessage>> {
    let limit = limit.max(1);
    if messages.is_empty() {
        return vec![Vec::new()];
    }

    let mut chunks = Vec::with_capacity(messages.len().div_ceil(limit));
    let mut current = Vec::with_capacity(limit.min(messages.len()));
    for message in messages {
        current.push(message);
        if current.len() == limit {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn messages(n: usize) -> Vec<ExportMessage> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                ExportMessage::new(
                    format!("m{}", i),
                    "alice",
                    format!("message {}", i),
                    base + Duration::seconds(i as i64),
                )
            })
            .collect()
    }

    fn ids(chunks: &[Vec<ExportMessage>]) -> Vec<String> {
        chunks.iter().flatten().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_empty_input_yields_one_empty_chunk() {
        let chunks = split_into_chunks(Vec::new(), 10);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn test_chunk_count_and_sizes() {
        for n in 1..=25 {
            for limit in 1..=7 {
                let input = messages(n);
                let expected_ids: Vec<String> = input.iter().map(|m| m.id.clone()).collect();
                let chunks = split_into_chunks(input, limit);

                assert_eq!(chunks.len(), n.div_ceil(limit), "n={} limit={}", n, limit);
                assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= limit));
                assert_eq!(ids(&chunks), expected_ids);
            }
        }
    }

    #[test]
    fn test_three_messages_limit_two() {
        let chunks = split_into_chunks(messages(3), 2);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_requested_limit_is_normalised() {
        let limits = ExportLimits {
            default_slice_limit: 4,
            min_slice_limit: 2,
            max_slice_limit: 5,
            ..ExportLimits::default()
        };

        // non-positive falls back to the default
        assert_eq!(split_messages(messages(8), 0, &limits).len(), 2);
        assert_eq!(split_messages(messages(8), -3, &limits).len(), 2);
        // below min is raised, above max is lowered
        assert_eq!(split_messages(messages(8), 1, &limits).len(), 4);
        assert_eq!(split_messages(messages(10), 1000, &limits).len(), 2);
    }

    #[test]
    fn test_zero_limit_does_not_loop() {
        assert_eq!(split_into_chunks(messages(3), 0).len(), 3);
    }
}
