//! Target-side vocabulary with the reserved control symbols the tree
//! decoder depends on, plus the per-batch OOV extension used by the
//! copy mechanism.
//!
//! Reserved ids are fixed: the linearizer, the greedy driver, and the
//! loss mask all assume PAD=0 and NON_TERMINAL=4.

use std::collections::HashMap;

/// Padding / no-entry marker. Never a real token; masked out of the loss.
pub const PAD: u32 = 0;
/// Sequence opener for the root queue position.
pub const START: u32 = 1;
/// Sequence terminator for every queue position.
pub const END: u32 = 2;
/// Unknown word; OOV ids are remapped here before embedding lookup.
pub const UNK: u32 = 3;
/// "This child expands into a subtree" placeholder. Also the sequence
/// opener for every non-root queue position.
pub const NON_TERMINAL: u32 = 4;

const RESERVED: &[&str] = &["<P>", "<S>", "<E>", "<U>", "("];

/// Bidirectional target vocabulary: reserved symbols followed by the
/// ordinary output words.
pub struct Vocab {
    encode_map: HashMap<String, u32>,
    decode_map: Vec<String>,
}

impl Vocab {
    /// Build a vocabulary from the ordinary output words. Reserved
    /// symbols occupy ids `0..5`; `words[i]` gets id `5 + i`.
    pub fn new(words: &[&str]) -> Self {
        let mut encode_map = HashMap::with_capacity(RESERVED.len() + words.len());
        let mut decode_map = Vec::with_capacity(RESERVED.len() + words.len());

        for &word in RESERVED.iter().chain(words.iter()) {
            encode_map.insert(word.to_string(), decode_map.len() as u32);
            decode_map.push(word.to_string());
        }

        Vocab {
            encode_map,
            decode_map,
        }
    }

    /// Look up a word's id.
    pub fn encode(&self, word: &str) -> Option<u32> {
        self.encode_map.get(word).copied()
    }

    /// Look up an id's word.
    pub fn decode(&self, id: u32) -> Option<&str> {
        self.decode_map.get(id as usize).map(|s| s.as_str())
    }

    /// Vocabulary size including reserved symbols.
    pub fn size(&self) -> usize {
        self.decode_map.len()
    }

    pub fn start_id(&self) -> u32 {
        START
    }

    pub fn end_id(&self) -> u32 {
        END
    }

    pub fn unk_id(&self) -> u32 {
        UNK
    }

    pub fn non_terminal_id(&self) -> u32 {
        NON_TERMINAL
    }
}

/// Per-batch extended vocabulary for the copy mechanism.
///
/// Every out-of-vocabulary word seen in the current source gets a slot
/// `base_size + k`; the mixer's output distribution covers
/// `extended_size()` entries. Discarded after the batch.
pub struct OovDict {
    base_size: usize,
    encode_map: HashMap<String, u32>,
    words: Vec<String>,
}

impl OovDict {
    pub fn new(base_size: usize) -> Self {
        OovDict {
            base_size,
            encode_map: HashMap::new(),
            words: Vec::new(),
        }
    }

    /// Extended id for an OOV word, assigning the next free slot on
    /// first sight. The same word always maps to the same slot.
    pub fn lookup_or_add(&mut self, word: &str) -> u32 {
        if let Some(&id) = self.encode_map.get(word) {
            return id;
        }
        let id = (self.base_size + self.words.len()) as u32;
        self.encode_map.insert(word.to_string(), id);
        self.words.push(word.to_string());
        id
    }

    /// Number of distinct OOV words seen so far.
    pub fn num_oov(&self) -> usize {
        self.words.len()
    }

    /// Base vocabulary size plus OOV count.
    pub fn extended_size(&self) -> usize {
        self.base_size + self.words.len()
    }

    /// Word behind an extended id, if it is one of ours.
    pub fn decode(&self, id: u32) -> Option<&str> {
        let idx = (id as usize).checked_sub(self.base_size)?;
        self.words.get(idx).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_are_fixed() {
        let vocab = Vocab::new(&["a", "b"]);
        assert_eq!(vocab.encode("<S>"), Some(START));
        assert_eq!(vocab.encode("<E>"), Some(END));
        assert_eq!(vocab.encode("<U>"), Some(UNK));
        assert_eq!(vocab.encode("("), Some(NON_TERMINAL));
        assert_eq!(vocab.encode("a"), Some(5));
        assert_eq!(vocab.encode("b"), Some(6));
        assert_eq!(vocab.size(), 7);
    }

    #[test]
    fn oov_dict_extends_past_base() {
        let mut oov = OovDict::new(10);
        let first = oov.lookup_or_add("foo");
        let second = oov.lookup_or_add("bar");
        assert_eq!(first, 10);
        assert_eq!(second, 11);
        assert_eq!(oov.lookup_or_add("foo"), 10);
        assert_eq!(oov.num_oov(), 2);
        assert_eq!(oov.extended_size(), 12);
        assert_eq!(oov.decode(11), Some("bar"));
        assert_eq!(oov.decode(9), None);
    }
}
