//! Go quoted literal decoding
//!
//! Mirrors `strconv.Unquote`: interpreted strings, raw strings and rune
//! literals. Escapes such as `\xff` may produce bytes that are not valid
//! UTF-8; those bytes become one U+FFFD each, the way Go converts such a
//! string to runes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnquoteError {
    #[error("invalid syntax")]
    Syntax,
}

pub fn unquote(raw: &str) -> Result<String, UnquoteError> {
    let bytes = raw.as_bytes();
    let n = bytes.len();
    if n < 2 {
        return Err(UnquoteError::Syntax);
    }
    let quote = bytes[0];
    if quote != bytes[n - 1] {
        return Err(UnquoteError::Syntax);
    }
    let body = &raw[1..n - 1];

    match quote {
        b'`' => {
            if body.contains('`') {
                return Err(UnquoteError::Syntax);
            }
            Ok(body.replace('\r', ""))
        }
        b'"' | b'\'' => {
            if body.contains('\n') {
                return Err(UnquoteError::Syntax);
            }
            let decoded = unquote_body(body.as_bytes(), quote)?;
            Ok(lossy_per_byte(&decoded))
        }
        _ => Err(UnquoteError::Syntax),
    }
}

fn unquote_body(mut s: &[u8], quote: u8) -> Result<Vec<u8>, UnquoteError> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = 0usize;
    while !s.is_empty() {
        let (rest, chunk) = unquote_char(s, quote)?;
        out.extend_from_slice(&chunk);
        chars += 1;
        s = rest;
        if quote == b'\'' && chars > 1 {
            return Err(UnquoteError::Syntax);
        }
    }
    if quote == b'\'' && chars != 1 {
        return Err(UnquoteError::Syntax);
    }
    Ok(out)
}

/// Decode one character or escape. Returns the remaining input and the bytes produced.
fn unquote_char(s: &[u8], quote: u8) -> Result<(&[u8], Vec<u8>), UnquoteError> {
    let c = s[0];
    if c == quote {
        return Err(UnquoteError::Syntax);
    }
    if c >= 0x80 {
        let width = utf8_width(s);
        return Ok((&s[width..], s[..width].to_vec()));
    }
    if c != b'\\' {
        return Ok((&s[1..], vec![c]));
    }
    if s.len() <= 1 {
        return Err(UnquoteError::Syntax);
    }
    let escape = s[1];
    let s = &s[2..];
    let simple = match escape {
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(0x0b),
        b'\\' => Some(b'\\'),
        b'\'' | b'"' if escape == quote => Some(escape),
        _ => None,
    };
    if let Some(byte) = simple {
        return Ok((s, vec![byte]));
    }
    match escape {
        b'x' | b'u' | b'U' => {
            let digits = match escape {
                b'x' => 2,
                b'u' => 4,
                _ => 8,
            };
            if s.len() < digits {
                return Err(UnquoteError::Syntax);
            }
            let mut value: u32 = 0;
            for &d in &s[..digits] {
                let v = (d as char).to_digit(16).ok_or(UnquoteError::Syntax)?;
                value = (value << 4) | v;
            }
            let rest = &s[digits..];
            if escape == b'x' {
                return Ok((rest, vec![value as u8]));
            }
            let ch = char::from_u32(value).ok_or(UnquoteError::Syntax)?;
            let mut buf = [0u8; 4];
            Ok((rest, ch.encode_utf8(&mut buf).as_bytes().to_vec()))
        }
        b'0'..=b'7' => {
            if s.len() < 2 {
                return Err(UnquoteError::Syntax);
            }
            let mut value = u32::from(escape - b'0');
            for &d in &s[..2] {
                if !(b'0'..=b'7').contains(&d) {
                    return Err(UnquoteError::Syntax);
                }
                value = (value << 3) | u32::from(d - b'0');
            }
            if value > 255 {
                return Err(UnquoteError::Syntax);
            }
            Ok((&s[2..], vec![value as u8]))
        }
        _ => Err(UnquoteError::Syntax),
    }
}

/// Byte length of the UTF-8 sequence at the start of `s`. Input comes from a
/// `&str`, so the sequence is well formed.
fn utf8_width(s: &[u8]) -> usize {
    match s[0] {
        0xf0..=0xff => 4,
        0xe0..=0xef => 3,
        _ => 2,
    }
    .min(s.len())
}

fn lossy_per_byte(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        for _ in chunk.invalid() {
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
    out
}
