//! Decoding of quoted string and bytes literals.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnescapeError {
    #[error("unable to unescape string")]
    Malformed,
    #[error("unable to unescape string, found '\\' as last character")]
    TrailingBackslash,
    #[error("unable to unescape octal sequence in string")]
    Octal,
}

/// Decode a literal's source text (optional `r`/`R` prefix plus quotes) into
/// its value. Strings yield UTF-8; for bytes, `\x` and octal escapes yield raw
/// bytes and unicode escapes are rejected.
pub fn unescape(text: &str, is_bytes: bool) -> Result<Vec<u8>, UnescapeError> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut value = normalized.as_str();
    if value.len() < 2 {
        return Err(UnescapeError::Malformed);
    }

    let mut raw = false;
    if value.starts_with('r') || value.starts_with('R') {
        value = &value[1..];
        raw = true;
    }

    let bytes = value.as_bytes();
    let n = bytes.len();
    if n < 2 || bytes[0] != bytes[n - 1] || (bytes[0] != b'"' && bytes[0] != b'\'') {
        return Err(UnescapeError::Malformed);
    }

    let body = if n >= 6 && (value.starts_with("'''") || value.starts_with("\"\"\"")) {
        let delimiter = &value[..3];
        if !value.ends_with(delimiter) {
            return Err(UnescapeError::Malformed);
        }
        &value[3..n - 3]
    } else {
        &value[1..n - 1]
    };

    if raw || !body.contains('\\') {
        return Ok(body.as_bytes().to_vec());
    }

    let mut out = Vec::with_capacity(body.len());
    let mut rest = body;
    while !rest.is_empty() {
        rest = unescape_char(rest, is_bytes, &mut out)?;
    }
    Ok(out)
}

fn unescape_char<'a>(s: &'a str, is_bytes: bool, out: &mut Vec<u8>) -> Result<&'a str, UnescapeError> {
    let first = s.as_bytes()[0];
    if first != b'\\' {
        let c = s.chars().next().ok_or(UnescapeError::Malformed)?;
        let mut buf = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        return Ok(&s[c.len_utf8()..]);
    }

    let bytes = s.as_bytes();
    if bytes.len() <= 1 {
        return Err(UnescapeError::TrailingBackslash);
    }
    let c = bytes[1];
    let rest = &s[2..];

    let simple = match c {
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(0x0b),
        b'\\' => Some(b'\\'),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        b'`' => Some(b'`'),
        b'?' => Some(b'?'),
        _ => None,
    };
    if let Some(b) = simple {
        out.push(b);
        return Ok(rest);
    }

    match c {
        b'x' | b'X' | b'u' | b'U' => {
            let width = match c {
                b'x' | b'X' => 2,
                b'u' => 4,
                _ => 8,
            };
            if is_bytes && width > 2 {
                return Err(UnescapeError::Malformed);
            }
            let digits = rest.get(..width).ok_or(UnescapeError::Malformed)?;
            if !digits.bytes().all(|d| d.is_ascii_hexdigit()) {
                return Err(UnescapeError::Malformed);
            }
            let value = u32::from_str_radix(digits, 16).map_err(|_| UnescapeError::Malformed)?;
            push_value(value, is_bytes, out)?;
            Ok(&rest[width..])
        }
        b'0'..=b'3' => {
            let digits = rest.as_bytes().get(..2).ok_or(UnescapeError::Malformed)?;
            let mut value = u32::from(c - b'0');
            for &d in digits {
                if !(b'0'..=b'7').contains(&d) {
                    return Err(UnescapeError::Octal);
                }
                value = value * 8 + u32::from(d - b'0');
            }
            push_value(value, is_bytes, out)?;
            Ok(&rest[2..])
        }
        _ => Err(UnescapeError::Malformed),
    }
}

fn push_value(value: u32, is_bytes: bool, out: &mut Vec<u8>) -> Result<(), UnescapeError> {
    if is_bytes {
        out.push(value as u8);
        return Ok(());
    }
    let c = char::from_u32(value).ok_or(UnescapeError::Malformed)?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(text: &str) -> String {
        String::from_utf8(unescape(text, false).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_quotes() {
        assert_eq!(string("\"hello\""), "hello");
        assert_eq!(string("'hello'"), "hello");
    }

    #[test]
    fn test_triple_quotes_keep_newlines() {
        assert_eq!(string("'''a\nb'''"), "a\nb");
        assert_eq!(string("\"\"\"x\"\"\""), "x");
    }

    #[test]
    fn test_raw_keeps_backslashes() {
        assert_eq!(string("r'\\n'"), "\\n");
    }

    #[test]
    fn test_escapes_in_strings() {
        assert_eq!(string("'\\t\\\"\\u00ff'"), "\t\"\u{ff}");
        assert_eq!(string("'\\303'"), "\u{c3}");
        assert_eq!(string("'\\x41'"), "A");
    }

    #[test]
    fn test_escapes_in_bytes() {
        assert_eq!(unescape("'\\303\\277'", true).unwrap(), vec![0xc3, 0xbf]);
        assert_eq!(unescape("'\\xff'", true).unwrap(), vec![0xff]);
        assert_eq!(unescape("'\u{ff}'", true).unwrap(), vec![0xc3, 0xbf]);
    }

    #[test]
    fn test_rejects_unicode_escape_in_bytes() {
        assert_eq!(unescape("'\\u0041'", true), Err(UnescapeError::Malformed));
    }

    #[test]
    fn test_rejects_bad_sequences() {
        assert_eq!(unescape("'\\>'", false), Err(UnescapeError::Malformed));
        assert_eq!(unescape("'\\089'", false), Err(UnescapeError::Octal));
        assert_eq!(unescape("'\\ud800'", false), Err(UnescapeError::Malformed));
        assert_eq!(unescape("'abc\"", false), Err(UnescapeError::Malformed));
    }
}
