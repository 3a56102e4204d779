//! English stop words.
//!
//! A general-purpose list trimmed of words that carry meaning in app reviews
//! (`call`, `help`, `service`, `send`, `limit`, ...); those are theme
//! keywords and must survive tokenisation.

use std::{collections::HashSet, sync::LazyLock};

const STOP_WORDS: &[&str] = &[
  "a", "about", "above", "after", "again", "against", "all", "almost", "also",
  "although", "am", "among", "an", "and", "another", "any", "anyone",
  "anything", "are", "around", "as", "at", "be", "because", "been", "before",
  "being", "below", "between", "both", "but", "by", "can", "could", "did",
  "do", "does", "doing", "done", "down", "during", "each", "either", "else",
  "even", "ever", "every", "everyone", "everything", "for", "from", "further",
  "get", "go", "had", "has", "have", "having", "he", "her", "here", "hers",
  "herself", "him", "himself", "his", "how", "however", "i", "if", "in",
  "into", "is", "it", "its", "itself", "just", "let", "may", "me", "might",
  "mine", "more", "most", "much", "must", "my", "myself", "neither", "no",
  "nor", "not", "nothing", "now", "of", "off", "often", "on", "once", "one",
  "only", "or", "other", "others", "our", "ours", "ourselves", "out", "over",
  "own", "per", "perhaps", "quite", "rather", "really", "same", "shall",
  "she", "should", "since", "so", "some", "someone", "something", "still",
  "such", "than", "that", "the", "their", "theirs", "them", "themselves",
  "then", "there", "these", "they", "this", "those", "though", "through",
  "thus", "to", "too", "under", "until", "up", "upon", "us", "very", "via",
  "was", "we", "were", "what", "whatever", "when", "where", "whether",
  "which", "while", "who", "whom", "whose", "why", "will", "with", "within",
  "without", "would", "yet", "you", "your", "yours", "yourself",
  "yourselves",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
  LazyLock::new(|| STOP_WORDS.iter().copied().collect());

pub fn is_stop_word(word: &str) -> bool { STOP_SET.contains(word) }
