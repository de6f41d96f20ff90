// URL list parsing for batch input

/// Split raw multi-line input into batch entries.
///
/// Splits on `\n` only. Order is kept and blank lines pass through
/// as empty entries; nothing is trimmed or validated.
pub fn parse(raw: &str) -> Vec<String> {
    raw.split('\n').map(str::to_string).collect()
}
