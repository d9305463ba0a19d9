//! Path-derived tags.
//!
//! Tags are the meaningful components of a declaration's file path. Generic
//! directory names and grammatical stop-words are dropped and the remaining
//! tokens are narrowed to nouns with a part-of-speech tagger.

use crate::error::TagError;
use std::collections::HashMap;
use std::path::{Component, Path};
use std::sync::{Arc, OnceLock};

/// Directory names too generic to describe the code they contain.
pub const STOPLIST: &[&str] = &[
    "src", "lib", "utils", "common", "shared", "core", "base", "main", "app", "code", "source",
    "python", "py",
];

/// English function words that never make useful tags.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "a", "an", "is", "to", "of", "in", "for", "on", "with", "at", "by", "as",
    "this", "that", "it", "be", "are", "was", "were", "been", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "can", "must", "shall", "from",
    "up", "out", "if", "then", "than", "when", "where", "why", "how", "all", "any", "both",
    "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own",
    "same", "so", "also", "but", "very", "just", "now", "here", "there", "between", "into",
    "through", "during", "before", "after", "above", "below", "over", "under", "again",
    "further", "once", "two",
];

/// Part-of-speech tagging capability.
///
/// Tags follow the Penn Treebank set; anything starting with `NN` is a noun
/// or proper noun.
pub trait PosTagger: Send + Sync {
    /// Tag each token. The result is parallel to `tokens`.
    fn tag(&self, tokens: &[String]) -> Result<Vec<(String, String)>, TagError>;
}

/// Process-wide default tagger, built on first use.
pub fn shared_tagger() -> Arc<LexiconTagger> {
    static TAGGER: OnceLock<Arc<LexiconTagger>> = OnceLock::new();
    Arc::clone(TAGGER.get_or_init(|| Arc::new(LexiconTagger::new())))
}

/// Derive tags for `path`, relative to `root` when it lies inside it.
///
/// Without a tagger, or when tagging fails, every token that survives the
/// stoplists is kept.
pub fn derive_tags(path: &Path, root: &Path, tagger: Option<&dyn PosTagger>) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);

    let tokens: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .filter(|part| !STOPLIST.contains(part) && !part.starts_with('.'))
        .map(|part| part.trim_matches('_').to_lowercase())
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(&token.as_str()))
        .collect();

    let mut tags = match tagger {
        Some(tagger) => match tagger.tag(&tokens) {
            Ok(tagged) if tagged.len() == tokens.len() => tagged
                .into_iter()
                .filter(|(_, tag)| tag.starts_with("NN"))
                .map(|(word, _)| word.to_lowercase())
                .collect(),
            Ok(tagged) => {
                let err = TagError::LengthMismatch {
                    expected: tokens.len(),
                    got: tagged.len(),
                };
                tracing::warn!("POS tagging skipped for {}: {}", path.display(), err);
                tokens
            }
            Err(e) => {
                tracing::warn!("POS tagging skipped for {}: {}", path.display(), e);
                tokens
            }
        },
        None => tokens,
    };

    tags.sort();
    tags.dedup();
    tags
}

// ============================================================================
// Lexicon Tagger
// ============================================================================

/// Closed-class words and their Penn tags.
const LEXICON: &[(&str, &str)] = &[
    ("i", "PRP"),
    ("you", "PRP"),
    ("he", "PRP"),
    ("she", "PRP"),
    ("we", "PRP"),
    ("they", "PRP"),
    ("them", "PRP"),
    ("its", "PRP$"),
    ("my", "PRP$"),
    ("our", "PRP$"),
    ("your", "PRP$"),
    ("their", "PRP$"),
    ("these", "DT"),
    ("those", "DT"),
    ("every", "DT"),
    ("about", "IN"),
    ("against", "IN"),
    ("among", "IN"),
    ("around", "IN"),
    ("via", "IN"),
    ("within", "IN"),
    ("without", "IN"),
    ("because", "IN"),
    ("while", "IN"),
    ("get", "VB"),
    ("set", "VB"),
    ("make", "VB"),
    ("run", "VB"),
    ("use", "VB"),
    ("find", "VB"),
    ("create", "VB"),
    ("build", "VB"),
    ("load", "VB"),
    ("save", "VB"),
    ("generate", "VB"),
    ("new", "JJ"),
    ("old", "JJ"),
    ("simple", "JJ"),
    ("basic", "JJ"),
    ("general", "JJ"),
    ("internal", "JJ"),
    ("external", "JJ"),
    ("misc", "JJ"),
    ("one", "CD"),
    ("three", "CD"),
];

/// Tagger driven by a small closed-class lexicon and suffix rules.
///
/// Unknown words default to nouns, which suits path components: most
/// directory and module names are nouns already.
#[derive(Debug)]
pub struct LexiconTagger {
    lexicon: HashMap<&'static str, &'static str>,
}

impl LexiconTagger {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }

    fn tag_word(&self, word: &str) -> &'static str {
        let lower = word.to_lowercase();
        if let Some(tag) = self.lexicon.get(lower.as_str()).copied() {
            return tag;
        }
        if !lower.is_empty() && lower.chars().all(|c| c.is_ascii_digit()) {
            return "CD";
        }

        let len = lower.chars().count();
        if len > 4 && lower.ends_with("ly") {
            "RB"
        } else if len > 5 && lower.ends_with("ing") {
            "VBG"
        } else if len > 4 && lower.ends_with("ed") {
            "VBD"
        } else if len > 5 && ["ous", "ful", "ive", "able", "ible"].iter().any(|s| lower.ends_with(s)) {
            "JJ"
        } else if len > 3 && lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("is") {
            "NNS"
        } else {
            "NN"
        }
    }
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl PosTagger for LexiconTagger {
    fn tag(&self, tokens: &[String]) -> Result<Vec<(String, String)>, TagError> {
        Ok(tokens
            .iter()
            .map(|token| (token.clone(), self.tag_word(token).to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct BrokenTagger;

    impl PosTagger for BrokenTagger {
        fn tag(&self, _tokens: &[String]) -> Result<Vec<(String, String)>, TagError> {
            Err(TagError::Unavailable("model missing".to_string()))
        }
    }

    struct VerbTagger;

    impl PosTagger for VerbTagger {
        fn tag(&self, tokens: &[String]) -> Result<Vec<(String, String)>, TagError> {
            Ok(tokens.iter().map(|t| (t.clone(), "VB".to_string())).collect())
        }
    }

    #[test]
    fn test_stoplist_and_hidden_components_dropped() {
        let root = PathBuf::from("/work");
        let path = root.join("src/.hidden/analysis/stats.py");
        let tags = derive_tags(&path, &root, None);
        assert_eq!(tags, vec!["analysis", "stats.py"]);
    }

    #[test]
    fn test_tokens_lowercased_and_underscores_trimmed() {
        let root = PathBuf::from("/work");
        let path = root.join("__Data__/The/loader.py");
        let tags = derive_tags(&path, &root, None);
        assert_eq!(tags, vec!["data", "loader.py"]);
    }

    #[test]
    fn test_tags_sorted_and_unique() {
        let root = PathBuf::from("/work");
        let path = root.join("zeta/alpha/zeta/alpha.py");
        let tags = derive_tags(&path, &root, Some(&*shared_tagger()));
        assert_eq!(tags, vec!["alpha", "alpha.py", "zeta"]);
    }

    #[test]
    fn test_tagger_filters_non_nouns() {
        let root = PathBuf::from("/work");
        let path = root.join("quickly/parsing/models/greeter.py");
        let tags = derive_tags(&path, &root, Some(&*shared_tagger()));
        assert_eq!(tags, vec!["greeter.py", "models"]);

        let tags = derive_tags(&path, &root, Some(&VerbTagger));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_tagger_failure_passes_tokens_through() {
        let root = PathBuf::from("/work");
        let path = root.join("quickly/greeter.py");
        let tags = derive_tags(&path, &root, Some(&BrokenTagger));
        assert_eq!(tags, vec!["greeter.py", "quickly"]);
    }

    #[test]
    fn test_path_outside_root_uses_full_path() {
        let tags = derive_tags(Path::new("/elsewhere/pkg/mod.py"), Path::new("/work"), None);
        assert_eq!(tags, vec!["elsewhere", "mod.py", "pkg"]);
    }

    #[test]
    fn test_lexicon_tagger_penn_tags() {
        let tagger = LexiconTagger::new();
        assert_eq!(tagger.tag_word("models"), "NNS");
        assert_eq!(tagger.tag_word("analysis"), "NN");
        assert_eq!(tagger.tag_word("2024"), "CD");
        assert_eq!(tagger.tag_word("quickly"), "RB");
        assert_eq!(tagger.tag_word("generate"), "VB");
    }
}
