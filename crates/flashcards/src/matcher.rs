//! Approximate matching of note content against free-text topic terms.
//!
//! A term matches when it is a case-insensitive substring of the content, or
//! when it is within a small edit distance of one of the content's words. The
//! allowed distance grows with the term length, see [`max_distance`].

const TRIM_CHARS: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'',
];

/// Shorter words are never fuzzy matched.
const MIN_WORD_CHARS: usize = 3;

/// The largest edit distance accepted for a term of `term_chars` characters.
pub fn max_distance(term_chars: usize) -> usize {
    match term_chars {
        0..=4 => 1,
        5..=7 => 2,
        _ => 3,
    }
}

/// Whether any of `terms` matches `content`. Blank terms are ignored, so an
/// empty or all-blank term list never matches.
pub fn matches<S: AsRef<str>>(content: &str, terms: &[S]) -> bool {
    let folded = content.to_lowercase();
    let mut words: Option<Vec<&str>> = None;

    for term in terms {
        let term = term.as_ref().trim().to_lowercase();
        if term.is_empty() {
            continue;
        }

        if folded.contains(&term) {
            return true;
        }

        let words = words.get_or_insert_with(|| tokenize(&folded));
        let limit = max_distance(term.chars().count());
        if words
            .iter()
            .any(|word| bounded_distance(&term, word, limit).is_some())
        {
            return true;
        }
    }

    false
}

fn tokenize(folded: &str) -> Vec<&str> {
    folded
        .split_whitespace()
        .map(|word| word.trim_matches(TRIM_CHARS))
        .filter(|word| word.chars().count() >= MIN_WORD_CHARS)
        .collect()
}

/// Levenshtein distance between `a` and `b` counted in chars, or None once it
/// is certain to exceed `limit`.
pub fn bounded_distance(a: &str, b: &str, limit: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > limit {
        return None;
    }

    // Single-row DP
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        let mut row_min = curr[0];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min > limit {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= limit).then_some(distance)
}
