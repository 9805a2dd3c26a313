use regex::Regex;
use std::sync::OnceLock;

use super::clean::split_extension;

/// Region, dump-status, version, year and disc markers found in ROM names.
const ANNOTATION_PATTERNS: &[&str] = &[
    r"\s*\([^)]*\)",                  // (USA), (Europe), (1995)
    r"\s*\[[^\]]*\]",                 // [!], [b1], [T+Eng]
    r"\s*\{[^}]*\}",                  // {M3}, {CV}
    r"[._-]v\d+(\.\d+)*",             // _v1.1, -v2
    r"\s*\b(Rev|Version|v)\s*\d+(\.\d+)*\b", // Rev 1, Version 2, v1.0
    r"\s*-\s*\d{4}\b",                // - 1991
    r"\s+(Disc|CD)\s*\d+",            // Disc 1, CD2
];

fn annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = format!("(?i){}", ANNOTATION_PATTERNS.join("|"));
        Regex::new(&alternation).expect("annotation patterns are valid")
    })
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("whitespace pattern is valid"))
}

/// Remove bracketed and versioning annotations from a file name, keeping the
/// extension: `Super Mario World (USA) [!].sfc` becomes `Super Mario World.sfc`.
///
/// Separate from [`super::clean_filename`]; callers chain the two if they want
/// both. A name made only of annotations is returned unchanged.
pub fn strip_annotations(filename: &str) -> String {
    let (base, ext) = split_extension(filename);
    let stripped = annotation_regex().replace_all(base, "");
    let tidied = whitespace_regex().replace_all(&stripped, " ");
    let tidied = tidied.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '_');

    if tidied.is_empty() {
        return filename.to_string();
    }
    format!("{}{}", tidied, ext)
}
