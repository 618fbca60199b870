//! File-name escaping.
//!
//! Every textual template token passes through [`escape_file_name`] before
//! it becomes part of a path. The [`Charset`] decides which characters are
//! allowed at all (full Unicode, or portable ASCII), the [`EscapeMode`]
//! decides what disallowed characters turn into: visually similar
//! lookalikes, or plain typeable substitutes.
//!
//! Escaping is per *segment*: the path separator is always disallowed, so
//! a token can never span directories. Escaping a string that is already
//! clean is the identity.

use lectern_metadata::{Charset, EscapeMode};

/// Characters no path segment may contain, on any platform we care about.
/// Besides `/` (the separator) this covers the set Windows reserves, so
/// that a synchronized tree survives being copied to a FAT/NTFS drive.
const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Unicode lookalike for a reserved character, used by
/// [`EscapeMode::Similar`] when the charset permits non-ASCII.
fn similar(c: char) -> char {
    match c {
        '/' => '\u{2044}',  // fraction slash
        '\\' => '\u{29F5}', // reverse solidus operator
        ':' => '\u{2236}',  // ratio
        '*' => '\u{2217}',  // asterisk operator
        '?' => '\u{FF1F}',  // fullwidth question mark
        '"' => '\u{201D}',  // right double quotation mark
        '<' => '\u{2039}',  // single left-pointing angle quotation
        '>' => '\u{203A}',  // single right-pointing angle quotation
        '|' => '\u{2223}',  // divides
        _ => '_',
    }
}

/// Plain substitute for a reserved character, used by
/// [`EscapeMode::Typeable`] and whenever the target charset is ASCII.
fn typeable(c: char) -> char {
    match c {
        '/' | '\\' | ':' | '|' => '-',
        '*' | '?' => '_',
        '"' => '\'',
        '<' => '(',
        '>' => ')',
        _ => '_',
    }
}

/// ASCII transliteration for the non-ASCII characters that actually occur
/// in European course metadata. Anything not covered collapses to `_`.
fn transliterate(c: char, out: &mut String) {
    match c {
        'ä' => out.push_str("ae"),
        'ö' => out.push_str("oe"),
        'ü' => out.push_str("ue"),
        'Ä' => out.push_str("Ae"),
        'Ö' => out.push_str("Oe"),
        'Ü' => out.push_str("Ue"),
        'ß' => out.push_str("ss"),
        'à' | 'á' | 'â' => out.push('a'),
        'è' | 'é' | 'ê' => out.push('e'),
        'ì' | 'í' | 'î' => out.push('i'),
        'ò' | 'ó' | 'ô' => out.push('o'),
        'ù' | 'ú' | 'û' => out.push('u'),
        _ => out.push('_'),
    }
}

/// Escapes one path segment according to the view's naming policy.
///
/// # Examples
///
/// ```
/// use lectern_metadata::{Charset, EscapeMode};
/// use lectern_view::escape_file_name;
///
/// // Clean input is untouched.
/// assert_eq!(escape_file_name("slides", Charset::Unicode, EscapeMode::Similar), "slides");
/// // The separator can never survive.
/// assert_eq!(escape_file_name("a/b", Charset::Ascii, EscapeMode::Typeable), "a-b");
/// ```
pub fn escape_file_name(name: &str, charset: Charset, mode: EscapeMode) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if RESERVED.contains(&c) || c.is_control() {
            match (charset, mode) {
                (Charset::Unicode, EscapeMode::Similar) => out.push(similar(c)),
                _ => out.push(typeable(c)),
            }
        } else if charset == Charset::Ascii && !c.is_ascii() {
            transliterate(c, &mut out);
        } else {
            out.push(c);
        }
    }
    // "." and ".." are valid segments to the escaper but directories to the
    // filesystem; a file literally named that way must not change meaning.
    match out.as_str() {
        "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => out,
    }
}
