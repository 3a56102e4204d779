//! Text analysis shared by the theme tagger and the keyword extractor.
//!
//! Review text is lower-cased, split into alphabetic words, lemmatised and
//! stripped of stop words. Both consumers see exactly the same token stream,
//! so a theme keyword and a salient keyword always agree on word forms.

mod lemma;
mod stopwords;

use std::collections::HashSet;

pub use lemma::Lemmatizer;
pub use stopwords::is_stop_word;

/// Shortest word kept as a content token.
const MIN_WORD_CHARS: usize = 2;

/// Split `text` into lower-cased alphabetic words.
///
/// Apostrophes inside a word are resolved here: `n't` contractions keep their
/// verb (`doesn't` → `does`), other clitics are dropped (`app's` → `app`).
pub fn words(text: &str) -> Vec<String> {
  text
    .split(|c: char| !(c.is_alphabetic() || c == '\'' || c == '\u{2019}'))
    .filter_map(|raw| {
      let raw = raw.trim_matches(|c| c == '\'' || c == '\u{2019}');
      if raw.is_empty() {
        return None;
      }
      let lower = raw.to_lowercase().replace('\u{2019}', "'");
      let word = match lower.find('\'') {
        Some(_) if lower.ends_with("n't") => lemma::expand_negated(&lower),
        Some(idx) => lower[..idx].to_owned(),
        None => lower,
      };
      (!word.is_empty()).then_some(word)
    })
    .collect()
}

/// Lemmatising analyzer producing content tokens.
#[derive(Debug, Clone, Default)]
pub struct TextAnalyzer {
  lemmatizer: Lemmatizer,
  /// Words and lemmas kept even when they are stop words or too short.
  kept:       HashSet<String>,
}

impl TextAnalyzer {
  pub fn new(lemmatizer: Lemmatizer) -> Self { Self { lemmatizer, kept: HashSet::new() } }

  /// Keep every word of `phrases`, and its lemma, as a content token.
  pub fn with_kept_words<S: AsRef<str>>(mut self, phrases: impl IntoIterator<Item = S>) -> Self {
    for phrase in phrases {
      for word in words(phrase.as_ref()) {
        self.kept.insert(self.lemmatizer.lemma(&word));
        self.kept.insert(word);
      }
    }
    self
  }

  pub fn lemmatizer(&self) -> &Lemmatizer { &self.lemmatizer }

  fn is_content(&self, word: &str) -> bool {
    self.kept.contains(word)
      || (word.chars().count() >= MIN_WORD_CHARS && !is_stop_word(word))
  }

  /// Content lemmas of `text` in order of appearance, stop words removed.
  pub fn lemmas(&self, text: &str) -> Vec<String> {
    words(text)
      .into_iter()
      .filter(|w| self.is_content(w))
      .map(|w| self.lemmatizer.lemma(&w))
      .filter(|l| self.is_content(l))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn words_split_on_punctuation_and_digits() {
    assert_eq!(words("Login failed!! Error 404, again..."), vec![
      "login", "failed", "error", "again"
    ]);
  }

  #[test]
  fn words_resolve_clitics() {
    assert_eq!(words("The app's UI doesn't load"), vec![
      "the", "app", "ui", "does", "load"
    ]);
    assert_eq!(words("can’t login"), vec!["can", "login"]);
  }

  #[test]
  fn lemmas_drop_stop_words_and_inflection() {
    let analyzer = TextAnalyzer::default();
    assert_eq!(analyzer.lemmas("The app crashes constantly"), vec![
      "app", "crash", "constantly"
    ]);
    assert_eq!(analyzer.lemmas("slow transfer failed"), vec![
      "slow", "transfer", "fail"
    ]);
  }

  #[test]
  fn kept_words_bypass_the_stop_list() {
    let analyzer = TextAnalyzer::default().with_kept_words(["down", "not working"]);
    assert_eq!(analyzer.lemmas("the app is down"), vec!["app", "down"]);
    assert_eq!(analyzer.lemmas("transfer not working"), vec!["transfer", "not", "work"]);
    assert!(TextAnalyzer::default().lemmas("down").is_empty());
  }

  #[test]
  fn blank_and_non_alphabetic_text_yields_nothing() {
    let analyzer = TextAnalyzer::default();
    assert!(analyzer.lemmas("").is_empty());
    assert!(analyzer.lemmas("123 !!! 😀").is_empty());
  }
}
