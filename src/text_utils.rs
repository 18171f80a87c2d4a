/*!
 * Text normalization and similarity utilities.
 *
 * This module provides the canonicalization used when reconciling loosely
 * formatted document text against exact reference values:
 * - case and diacritic folding
 * - parenthetical suffix stripping for country/entity names
 * - Levenshtein-based similarity scoring
 * - language tag canonicalization to ISO 639-2/T
 */

use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Fold common Latin diacritics to their ASCII base letter.
///
/// Covers the accents that actually occur in the fund registration tables and
/// multilingual marketing text (French, German, Spanish, Portuguese, Nordic).
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ý' | 'ÿ' => 'y',
            _ => c,
        })
        .collect()
}

/// Normalize a country or entity name for comparison.
///
/// Strips parenthetical suffixes ("Luxembourg (Grand Duchy)"), folds case and
/// diacritics, and collapses whitespace. Idempotent: normalizing an already
/// normalized string returns it unchanged.
pub fn normalize_entity_name(name: &str) -> String {
    let stripped = PARENTHETICAL.replace_all(name, "");
    let folded = fold_diacritics(&stripped).to_lowercase();
    WHITESPACE.replace_all(folded.trim(), " ").to_string()
}

/// Normalize a term for cache keys: lowercase and trimmed.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Whether `needle` appears in `haystack` as a whole-word substring.
///
/// Both arguments are expected to be already normalized.
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = start == 0
            || !haystack[..start].chars().next_back().is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Canonicalize a loosely-written language tag to ISO 639-2/T.
///
/// Accepts 2-letter codes ("fr"), 3-letter codes ("fra", bibliographic "fre"),
/// and English or local language names ("French", "français"). Returns `None`
/// when the tag cannot be resolved.
pub fn canonical_language_tag(tag: &str) -> Option<String> {
    let normalized = fold_diacritics(tag.trim()).to_lowercase();

    if normalized.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized) {
            return Some(lang.to_639_3().to_string());
        }
    }

    if normalized.len() == 3 {
        if Language::from_639_3(&normalized).is_some() {
            return Some(normalized);
        }
        // Bibliographic codes that differ from the terminological form
        let part2t = match normalized.as_str() {
            "fre" => "fra",
            "ger" => "deu",
            "dut" => "nld",
            "gre" => "ell",
            "cze" => "ces",
            "rum" => "ron",
            "slo" => "slk",
            _ => return None,
        };
        return Some(part2t.to_string());
    }

    // Full language names, English or local ("french", "francais", "deutsch").
    // isolang matches English names exactly, so re-capitalize first.
    let mut chars = normalized.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => return None,
    };
    Language::from_name(&capitalized)
        .or_else(|| Language::from_autonym(&capitalized))
        .or_else(|| match normalized.as_str() {
            "francais" => Some(Language::Fra),
            "espanol" => Some(Language::Spa),
            "deutsch" => Some(Language::Deu),
            "italiano" => Some(Language::Ita),
            "portugues" => Some(Language::Por),
            "nederlands" => Some(Language::Nld),
            _ => None,
        })
        .map(|lang| lang.to_639_3().to_string())
}

/// Calculate similarity between two strings (0.0-1.0)
///
/// Uses normalized Levenshtein distance over case-folded input.
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();

    let distance = levenshtein_distance(&a_lower, &b_lower);
    let max_len = a_lower.chars().count().max(b_lower.chars().count());

    1.0 - (distance as f32 / max_len as f32)
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use two-row optimization for space efficiency
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr_row[0] = i;

        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };

            curr_row[j] = (prev_row[j] + 1)                  // deletion
                .min(curr_row[j - 1] + 1)                    // insertion
                .min(prev_row[j - 1] + cost);                // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Truncate text to a maximum length with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_length).collect();
        format!("{}...", truncated)
    }
}
