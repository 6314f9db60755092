use serde::{Deserialize, Serialize};

/// Words judged to sit on the same printed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineGroup {
    /// Representative vertical position; fixed when the group is opened.
    pub anchor_y: i32,
    /// `(left_x, text)` pairs, left to right once finalized.
    pub words: Vec<(i32, String)>,
}

impl LineGroup {
    pub fn new(anchor_y: i32) -> Self {
        Self { anchor_y, words: Vec::new() }
    }

    pub fn push(&mut self, left_x: i32, text: impl Into<String>) {
        self.words.push((left_x, text.into()));
    }

    /// Sort words left to right. Stable, so equal x keeps arrival order.
    pub fn sort_words(&mut self) {
        self.words.sort_by_key(|(x, _)| *x);
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.words.iter().map(|(_, t)| t.as_str()).collect()
    }

    /// Tokens joined with single spaces.
    pub fn text(&self) -> String {
        self.tokens().join(" ")
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
