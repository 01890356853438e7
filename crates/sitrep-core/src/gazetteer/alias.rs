//! Alias Normalization and Packing
//!
//! Every alias lookup in the gazetteer goes through one normalization
//! function, applied both at load time and at query time. External CSV
//! form packs alias lists into a single semicolon-separated column.

/// Normalize a location name into a canonical key for matching.
///
/// Rules:
/// - lowercase
/// - remove apostrophes: "boromels'ke" → "boromelske"
/// - turn hyphens/dashes into spaces: "yeni-kale" → "yeni kale"
/// - collapse multiple spaces
/// - strip leading/trailing spaces
pub fn normalize_location_key(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(name.len());
    let mut last_was_space = true;

    for ch in name.chars() {
        let ch = match ch {
            '\'' | '\u{2019}' | '\u{2018}' | '\u{02BC}' => continue,
            '-' | '\u{2012}' | '\u{2013}' | '\u{2014}' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        };

        if ch == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
            out.push(' ');
        } else {
            last_was_space = false;
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }

    out
}

/// Convert a semicolon-separated alias column into a list.
///
/// Whitespace around each alias is trimmed; empty entries are dropped.
pub fn unpack_aliases(aliases: &str) -> Vec<String> {
    aliases
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert an alias list back into the canonical semicolon-separated
/// CSV column.
pub fn pack_aliases(aliases: &[String]) -> String {
    aliases
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(";")
}
