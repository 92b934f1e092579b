//! Bounded Memory for the Agent Loop
//!
//! Keeps the conversation of one task as ordered (input, output) pairs: the
//! model's raw response and the observation it produced. The total token
//! estimate of the retained pairs never exceeds the configured ceiling;
//! the oldest pairs are evicted first when a save pushes it over.

use serde::Serialize;

/// Default token ceiling
pub const DEFAULT_TOKEN_LIMIT: usize = 4000;

/// Smallest ceiling accepted; leaves room for the seed pair and a short exchange
pub const MIN_TOKEN_LIMIT: usize = 64;

/// Average characters per token (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

/// Fixed per-pair overhead for role labels and separators
const PAIR_OVERHEAD: usize = 10;

/// Appended to text cut short to fit under the ceiling
const TRUNCATION_MARKER: &str = "…[truncated]";

const SEED_INPUT: &str = "\ninit";
const SEED_OUTPUT: &str = "\nSession started";

/// One remembered exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// What was said to the memory (the model's raw response)
    pub input: String,

    /// What came back (the observation)
    pub output: String,
}

impl Exchange {
    fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Token estimate: ceil(chars / 4) plus the fixed overhead
    fn estimate_tokens(&self) -> usize {
        let chars = self.input.chars().count() + self.output.chars().count();
        chars.div_ceil(CHARS_PER_TOKEN) + PAIR_OVERHEAD
    }

    /// Cut the output (then the input) so the pair alone fits in `limit`
    fn fit_within(&mut self, limit: usize) {
        let max_chars = limit.saturating_sub(PAIR_OVERHEAD) * CHARS_PER_TOKEN;
        let input_chars = self.input.chars().count();
        if input_chars + self.output.chars().count() <= max_chars {
            return;
        }

        if input_chars < max_chars {
            self.output = truncate_chars(&self.output, max_chars - input_chars);
        } else {
            self.output.clear();
            self.input = truncate_chars(&self.input, max_chars);
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return text.chars().take(max_chars).collect();
    }

    let mut cut: String = text.chars().take(max_chars - marker_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Token-capped conversational log
#[derive(Debug, Clone)]
pub struct BoundedMemory {
    /// Retained pairs, oldest first
    pairs: Vec<Exchange>,

    /// Maximum number of tokens retained
    token_limit: usize,

    /// Current estimated token count
    token_count: usize,
}

impl BoundedMemory {
    /// Create a memory with the default ceiling
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_TOKEN_LIMIT)
    }

    /// Create a memory with a specific ceiling (raised to `MIN_TOKEN_LIMIT`)
    pub fn with_limit(token_limit: usize) -> Self {
        let mut memory = Self {
            pairs: Vec::new(),
            token_limit: token_limit.max(MIN_TOKEN_LIMIT),
            token_count: 0,
        };
        memory.reset();
        memory
    }

    /// Drop everything and start over from the seed pair
    pub fn reset(&mut self) {
        let seed = Exchange::new(SEED_INPUT, SEED_OUTPUT);
        self.token_count = seed.estimate_tokens();
        self.pairs.clear();
        self.pairs.push(seed);
    }

    /// Append a pair, evicting the oldest pairs while over the ceiling
    pub fn save(&mut self, input: impl Into<String>, output: impl Into<String>) {
        let mut exchange = Exchange::new(input, output);
        if exchange.estimate_tokens() > self.token_limit {
            tracing::debug!(
                "Truncating oversized exchange ({} tokens, limit {})",
                exchange.estimate_tokens(),
                self.token_limit
            );
            exchange.fit_within(self.token_limit);
        }

        self.token_count += exchange.estimate_tokens();
        self.pairs.push(exchange);

        let mut evicted = 0;
        while self.token_count > self.token_limit && self.pairs.len() > 1 {
            let removed = self.pairs.remove(0);
            self.token_count = self.token_count.saturating_sub(removed.estimate_tokens());
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!("Evicted {} exchange(s) from memory", evicted);
        }
    }

    /// Retained pairs, oldest first
    pub fn render(&self) -> &[Exchange] {
        &self.pairs
    }

    /// Prompt rendering: one `Human:`/`AI:` block per pair
    pub fn transcript(&self) -> String {
        self.pairs
            .iter()
            .map(|pair| format!("Human: {}\nAI: {}", pair.input, pair.output))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of retained pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Current token estimate
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }
}

impl Default for BoundedMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_memory_holds_seed_pair() {
        let memory = BoundedMemory::new();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.render()[0].input, "\ninit");
        assert_eq!(memory.render()[0].output, "\nSession started");
        assert_eq!(memory.token_limit(), DEFAULT_TOKEN_LIMIT);
        assert!(memory.token_count() > 0);
    }

    #[test]
    fn test_limit_is_raised_to_minimum() {
        let memory = BoundedMemory::with_limit(1);
        assert_eq!(memory.token_limit(), MIN_TOKEN_LIMIT);
    }

    #[test]
    fn test_save_appends_in_order() {
        let mut memory = BoundedMemory::new();
        memory.save("first", "one");
        memory.save("second", "two");

        let pairs = memory.render();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1].input, "first");
        assert_eq!(pairs[2].output, "two");
    }

    #[test]
    fn test_estimate_is_monotonic_in_length() {
        let short = Exchange::new("Hi", "ok");
        let long = Exchange::new(
            "This is a much longer message with many more words",
            "and a long observation",
        );
        assert_eq!(short.estimate_tokens(), 1 + PAIR_OVERHEAD);
        assert!(long.estimate_tokens() > short.estimate_tokens());
    }

    #[test]
    fn test_oldest_pairs_are_evicted_first() {
        let mut memory = BoundedMemory::with_limit(100);
        for i in 0..20 {
            memory.save(format!("response {}", i), format!("observation {}", i));
        }

        assert!(memory.token_count() <= memory.token_limit());
        let pairs = memory.render();
        assert_eq!(pairs.last().unwrap().input, "response 19");
        assert!(pairs.iter().all(|p| p.input != "\ninit"));

        // survivors are a contiguous suffix of what was saved
        let first_kept: usize = pairs[0]
            .input
            .trim_start_matches("response ")
            .parse()
            .unwrap();
        for (offset, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.input, format!("response {}", first_kept + offset));
        }
    }

    #[test]
    fn test_oversized_pair_is_truncated_not_dropped() {
        let mut memory = BoundedMemory::with_limit(MIN_TOKEN_LIMIT);
        let huge = "x".repeat(10_000);
        memory.save("short response", huge);

        assert!(memory.token_count() <= memory.token_limit());
        let last = memory.render().last().unwrap();
        assert_eq!(last.input, "short response");
        assert!(last.output.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_oversized_input_is_truncated_too() {
        let mut memory = BoundedMemory::with_limit(MIN_TOKEN_LIMIT);
        memory.save("y".repeat(10_000), "observation");

        assert!(memory.token_count() <= memory.token_limit());
        let last = memory.render().last().unwrap();
        assert!(last.input.ends_with(TRUNCATION_MARKER));
        assert!(last.output.is_empty());
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_transcript_format() {
        let mut memory = BoundedMemory::new();
        memory.save("{\"name\":\"echo\"}", "\nObservation:\nhi");
        assert_eq!(
            memory.transcript(),
            "Human: \ninit\nAI: \nSession started\nHuman: {\"name\":\"echo\"}\nAI: \nObservation:\nhi"
        );
    }

    #[test]
    fn test_reset_restores_seed() {
        let mut memory = BoundedMemory::new();
        memory.save("a", "b");
        let seeded = BoundedMemory::new().token_count();

        memory.reset();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.token_count(), seeded);
    }

    #[test]
    fn test_truncate_chars_respects_multibyte_text() {
        let text = "查询北京到上海的火车票".repeat(10);
        let cut = truncate_chars(&text, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with(TRUNCATION_MARKER));
    }
}
