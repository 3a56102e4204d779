//! Rule-based English lemmatizer.
//!
//! Lemmas are found in three steps: an irregular-form table, then the known
//! vocabulary (a word that is already a base form is returned unchanged), then
//! suffix rules. Each suffix rule proposes candidate bases; the first one in
//! the vocabulary wins, otherwise the rule's default candidate is used.
//! Seeding the vocabulary with domain keywords (see
//! [`Lemmatizer::with_vocabulary`]) lets inflected forms such as `freezing`
//! reach `freeze` rather than `freez`.

use std::collections::{HashMap, HashSet};

/// Irregular forms that no suffix rule can recover.
const IRREGULAR: &[(&str, &str)] = &[
  ("am", "be"),
  ("are", "be"),
  ("been", "be"),
  ("being", "be"),
  ("best", "good"),
  ("better", "good"),
  ("bought", "buy"),
  ("came", "come"),
  ("cannot", "can"),
  ("children", "child"),
  ("did", "do"),
  ("does", "do"),
  ("done", "do"),
  ("found", "find"),
  ("froze", "freeze"),
  ("frozen", "freeze"),
  ("gave", "give"),
  ("given", "give"),
  ("goes", "go"),
  ("gone", "go"),
  ("got", "get"),
  ("gotten", "get"),
  ("had", "have"),
  ("has", "have"),
  ("hung", "hang"),
  ("is", "be"),
  ("kept", "keep"),
  ("knew", "know"),
  ("known", "know"),
  ("left", "leave"),
  ("lost", "lose"),
  ("made", "make"),
  ("men", "man"),
  ("paid", "pay"),
  ("ran", "run"),
  ("said", "say"),
  ("sent", "send"),
  ("spent", "spend"),
  ("stole", "steal"),
  ("stolen", "steal"),
  ("taken", "take"),
  ("thought", "think"),
  ("told", "tell"),
  ("took", "take"),
  ("was", "be"),
  ("went", "go"),
  ("were", "be"),
  ("women", "woman"),
  ("worse", "bad"),
  ("worst", "bad"),
  ("wrote", "write"),
];

/// Base forms common in app-store reviews. Words listed here are returned
/// as-is and act as targets for suffix candidates.
const BASE_VOCABULARY: &[&str] = &[
  "access", "account", "activate", "add", "address", "agent", "allow", "always",
  "amazing", "amount", "app", "application", "apply", "approve", "assist",
  "available", "awesome", "bad", "balance", "bank", "banking", "bill", "block",
  "branch", "bug", "bus", "business", "button", "buy", "cancel", "card",
  "care", "case", "cash", "change", "charge", "check", "choose", "close",
  "code", "come", "complain", "complete", "confirm", "connect", "connection",
  "continue", "convenient", "cost", "crash", "create", "credential", "customer",
  "data", "date", "day", "debit", "delay", "delete", "deposit", "design",
  "device", "disappoint", "display", "download", "easy", "enable", "enter",
  "error", "excellent", "expect", "experience", "fail", "failure", "fast",
  "feature", "fee", "find", "fine", "fix", "freeze", "friendly", "fund",
  "good", "great", "hang", "happen", "hate", "help", "helpful", "hope",
  "improve", "improvement", "install", "interface", "internet", "issue",
  "lag", "language", "layout", "like", "limit", "link", "load", "log",
  "login", "lose", "love", "manage", "message", "minute", "mobile", "money",
  "month", "morning", "need", "nice", "notification", "number", "offer", "ok", "open", "option",
  "otp", "page", "password", "pay", "payment", "phone", "pin", "please",
  "problem", "process", "provide", "purchase", "reach", "receive", "recommend",
  "refresh", "register", "registration", "reliable", "reply", "request",
  "require", "reset", "respond", "response", "restart", "retry", "review",
  "safe", "save", "screen", "secure", "security", "send", "server", "service",
  "session", "setting", "share", "show", "sign", "simple", "sms", "smooth",
  "solve", "start", "statement", "status", "stop", "store", "stuck", "suck",
  "super", "support", "system", "take", "thank", "ticket", "time", "today",
  "top", "transaction", "transfer", "try", "ui", "update", "upgrade", "use",
  "useful", "user", "ux", "verify", "version", "wait", "want", "waste",
  "wallet", "week", "work", "worry", "wow", "year",
];

/// Expand a negated contraction to its verb: `doesn't` → `does`.
pub(crate) fn expand_negated(word: &str) -> String {
  match word {
    "can't" => "can".into(),
    "won't" => "will".into(),
    "shan't" => "shall".into(),
    _ => word.trim_end_matches("n't").to_owned(),
  }
}

#[derive(Debug, Clone)]
pub struct Lemmatizer {
  irregular:  HashMap<&'static str, &'static str>,
  vocabulary: HashSet<String>,
}

impl Default for Lemmatizer {
  fn default() -> Self {
    Self {
      irregular:  IRREGULAR.iter().copied().collect(),
      vocabulary: BASE_VOCABULARY.iter().map(|w| (*w).to_owned()).collect(),
    }
  }
}

impl Lemmatizer {
  /// Add base forms to the vocabulary. Multi-word entries contribute each of
  /// their words.
  pub fn with_vocabulary<I, S>(mut self, words: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    for entry in words {
      for w in super::words(entry.as_ref()) {
        self.vocabulary.insert(w);
      }
    }
    self
  }

  pub fn is_known(&self, word: &str) -> bool { self.vocabulary.contains(word) }

  /// The lemma of a lower-cased word.
  pub fn lemma(&self, word: &str) -> String {
    if let Some(base) = self.irregular.get(word) {
      return (*base).to_owned();
    }
    if self.is_known(word) {
      return word.to_owned();
    }
    let (candidates, default) = suffix_candidates(word);
    candidates
      .into_iter()
      .find(|c| self.is_known(c))
      .or(default)
      .unwrap_or_else(|| word.to_owned())
  }
}

/// Candidate bases for `word` in preference order, plus the fallback used
/// when none of them is a known base form.
fn suffix_candidates(word: &str) -> (Vec<String>, Option<String>) {
  let n = word.chars().count();
  let strip = |k: usize| -> String { word[..word.len() - k].to_owned() };

  if n > 4 && word.ends_with("ies") {
    let y = format!("{}y", strip(3));
    return (vec![y.clone(), strip(1)], Some(y));
  }
  if n > 3 && word.ends_with("es") {
    let sibilant = ["ches", "shes", "sses", "xes", "zzes"]
      .iter()
      .any(|s| word.ends_with(s));
    let without_es = strip(2);
    let without_s = strip(1);
    let default = if sibilant { without_es.clone() } else { without_s.clone() };
    return (vec![without_s, without_es], Some(default));
  }
  if n > 3
    && word.ends_with('s')
    && !["ss", "us", "is"].iter().any(|s| word.ends_with(s))
  {
    let base = strip(1);
    return (vec![base.clone()], Some(base));
  }
  if n > 4 && word.ends_with("ied") {
    let y = format!("{}y", strip(3));
    return (vec![y.clone(), strip(1)], Some(y));
  }
  if n > 4 && word.ends_with("ing") && has_vowel(&strip(3)) {
    return verb_candidates(&strip(3));
  }
  if n > 3 && word.ends_with("eed") {
    // `agreed` → `agree`, but `need` and `speed` stay whole.
    return (vec![strip(1)], None);
  }
  if n > 3 && word.ends_with("ed") && has_vowel(&strip(2)) {
    let (mut candidates, default) = verb_candidates(&strip(2));
    // `used` → `use`: the `d` alone may be the suffix.
    candidates.insert(1, strip(1));
    return (candidates, default);
  }
  if n > 5 && word.ends_with("iest") {
    return (vec![format!("{}y", strip(4))], None);
  }
  if n > 4 && word.ends_with("ier") {
    return (vec![format!("{}y", strip(3))], None);
  }
  if n > 4 && word.ends_with("est") {
    return (comparative_candidates(&strip(3)), None);
  }
  if n > 3 && word.ends_with("er") {
    return (comparative_candidates(&strip(2)), None);
  }
  (Vec::new(), None)
}

/// Candidates for a verb stem left after removing `-ing` or `-ed`.
fn verb_candidates(stem: &str) -> (Vec<String>, Option<String>) {
  let with_e = format!("{stem}e");
  let undoubled = undouble(stem);
  let mut candidates = vec![stem.to_owned(), with_e.clone()];
  if let Some(u) = &undoubled {
    candidates.push(u.clone());
  }

  let default = if let Some(u) = undoubled {
    u
  } else if ["at", "bl", "iz"].iter().any(|s| stem.ends_with(s)) || is_short_cvc(stem) {
    with_e
  } else {
    stem.to_owned()
  };
  (candidates, Some(default))
}

/// Comparative stems are only accepted when known, so no default.
fn comparative_candidates(stem: &str) -> Vec<String> {
  let mut candidates = vec![stem.to_owned(), format!("{stem}e")];
  if let Some(u) = undouble(stem) {
    candidates.push(u);
  }
  candidates
}

fn is_vowel(c: char) -> bool { matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') }

fn has_vowel(stem: &str) -> bool { stem.chars().any(|c| is_vowel(c) || c == 'y') }

/// `stopp` → `stop`; `l`, `s` and `z` doublings are kept (`fall`, `pass`).
fn undouble(stem: &str) -> Option<String> {
  let mut chars = stem.chars().rev();
  let (last, prev) = (chars.next()?, chars.next()?);
  if last == prev && !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
    Some(stem[..stem.len() - last.len_utf8()].to_owned())
  } else {
    None
  }
}

/// A short consonant-vowel-consonant stem such as `hop` or `cod`.
fn is_short_cvc(stem: &str) -> bool {
  let chars: Vec<char> = stem.chars().collect();
  if chars.len() != 3 {
    return false;
  }
  let (c1, v, c2) = (chars[0], chars[1], chars[2]);
  !is_vowel(c1) && is_vowel(v) && !is_vowel(c2) && !matches!(c2, 'w' | 'x' | 'y')
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lemma(word: &str) -> String { Lemmatizer::default().lemma(word) }

  #[test]
  fn plurals() {
    assert_eq!(lemma("transfers"), "transfer");
    assert_eq!(lemma("payments"), "payment");
    assert_eq!(lemma("crashes"), "crash");
    assert_eq!(lemma("freezes"), "freeze");
    assert_eq!(lemma("replies"), "reply");
    assert_eq!(lemma("fixes"), "fix");
  }

  #[test]
  fn protected_words_are_not_stripped() {
    assert_eq!(lemma("access"), "access");
    assert_eq!(lemma("status"), "status");
    assert_eq!(lemma("sms"), "sms");
    assert_eq!(lemma("always"), "always");
  }

  #[test]
  fn verb_forms() {
    assert_eq!(lemma("crashing"), "crash");
    assert_eq!(lemma("freezing"), "freeze");
    assert_eq!(lemma("lagging"), "lag");
    assert_eq!(lemma("failed"), "fail");
    assert_eq!(lemma("used"), "use");
    assert_eq!(lemma("stopped"), "stop");
    assert_eq!(lemma("updated"), "update");
    assert_eq!(lemma("hoping"), "hope");
    assert_eq!(lemma("need"), "need");
    assert_eq!(lemma("string"), "string");
  }

  #[test]
  fn irregular_and_comparative_forms() {
    assert_eq!(lemma("sent"), "send");
    assert_eq!(lemma("froze"), "freeze");
    assert_eq!(lemma("better"), "good");
    assert_eq!(lemma("easier"), "easy");
    assert_eq!(lemma("faster"), "fast");
    // Unknown comparatives stay whole rather than being mangled.
    assert_eq!(lemma("user"), "user");
    assert_eq!(lemma("together"), "together");
  }

  #[test]
  fn vocabulary_seeding_steers_unknown_stems() {
    let plain = Lemmatizer::default();
    assert_eq!(plain.lemma("glitching"), "glitch");
    assert_eq!(plain.lemma("snoozing"), "snooz");
    let seeded = Lemmatizer::default().with_vocabulary(["snooze alarm"]);
    assert_eq!(seeded.lemma("snoozing"), "snooze");
  }

  #[test]
  fn negated_contractions() {
    assert_eq!(expand_negated("doesn't"), "does");
    assert_eq!(expand_negated("won't"), "will");
  }
}
