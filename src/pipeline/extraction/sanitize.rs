/// Sanitize extracted text before it reaches the analyzer.
/// Strips control characters and byte-order marks, trims each line, drops
/// blank lines. Units and symbols (μ, µ, °, %) pass through untouched.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| (!c.is_control() || c.is_whitespace()) && *c != '\u{FEFF}')
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
