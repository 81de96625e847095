/// Decode a narrow subset of HTML character references.
///
/// Contract:
/// - Named references decoded: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
/// - Numeric references decoded only when semicolon-terminated: `&#123;` and `&#x1F4A9;`.
/// - Anything else (unknown names, missing `;`, invalid scalars) passes through unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    const NAMED: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&nbsp;", '\u{00A0}'),
    ];
    const MAX_DIGITS: usize = 7; // 1114111

    let Some(first) = memchr::memchr(b'&', s.as_bytes()) else {
        return s.to_string();
    };

    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut rest = &s[first..];

    while !rest.is_empty() {
        // `rest` always starts at an '&' here.
        if let Some((pat, ch)) = NAMED.iter().find(|(pat, _)| rest.starts_with(pat)) {
            out.push(*ch);
            rest = &rest[pat.len()..];
        } else if let Some((ch, consumed)) = decode_numeric(rest, MAX_DIGITS) {
            out.push(ch);
            rest = &rest[consumed..];
        } else {
            out.push('&');
            rest = &rest[1..];
        }

        match memchr::memchr(b'&', rest.as_bytes()) {
            Some(next) => {
                out.push_str(&rest[..next]);
                rest = &rest[next..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }

    out
}

/// Returns the decoded scalar and the byte length of the reference, `&` through `;`.
fn decode_numeric(s: &str, max_digits: usize) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let (radix, digits_at) = match body.as_bytes().first() {
        Some(b'x' | b'X') => (16, 1),
        _ => (10, 0),
    };
    let digits = &body[digits_at..];
    let end = digits.find(';')?;
    if end == 0 || end > max_digits {
        return None;
    }
    let digits = &digits[..end];
    // `from_str_radix` would accept a leading sign.
    if !digits.bytes().all(|b| char::from(b).is_digit(radix)) {
        return None;
    }
    let value = u32::from_str_radix(digits, radix).ok()?;
    let ch = char::from_u32(value)?;
    Some((ch, 2 + digits_at + end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(decode_entities("120×32"), "120×32");
    }

    #[test]
    fn decodes_named_references() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
    }

    #[test]
    fn decodes_numeric_references() {
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
    }

    #[test]
    fn keeps_malformed_references() {
        assert_eq!(decode_entities("&#65 &bogus; &#xZZ;"), "&#65 &bogus; &#xZZ;");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("tail &"), "tail &");
    }

    #[test]
    fn signed_numeric_references_are_not_decoded() {
        assert_eq!(decode_entities("&#+65;&#x+41;&#-65;"), "&#+65;&#x+41;&#-65;");
    }
}
