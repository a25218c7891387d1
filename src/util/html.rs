use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;

/// Longest entity name we try to resolve (`&CounterClockwiseContourIntegral;` is 31)
const MAX_ENTITY_LEN: usize = 32;

/// Decodes HTML character references in `input`.
///
/// Resolves named HTML5 entities (`&amp;`, `&nbsp;`, `&eacute;`, ...) and
/// decimal / hexadecimal references (`&#233;`, `&#xE9;`). Anything that is not
/// a recognizable reference, such as a bare `&` or an unknown name, is kept
/// literally. Code points that are not valid characters decode to U+FFFD.
///
/// Returns `Cow::Borrowed` when the input contains no `&`.
///
/// # Examples
///
/// ```
/// use gator::util::decode_html_entities;
///
/// assert_eq!(decode_html_entities("Tech &amp; Science"), "Tech & Science");
/// assert_eq!(decode_html_entities("caf&#233;"), "café");
/// assert_eq!(decode_html_entities("AT&T"), "AT&T");
/// ```
pub fn decode_html_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_reference(tail) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Decode the reference at the start of `s` (which begins with `&`).
///
/// Returns the replacement text and the number of bytes consumed, including
/// the leading `&` and trailing `;`.
fn decode_reference(s: &str) -> Option<(Cow<'static, str>, usize)> {
    let body = &s[1..];
    let semi = body
        .char_indices()
        .take(MAX_ENTITY_LEN + 1)
        .find(|&(_, c)| c == ';')
        .map(|(i, _)| i)?;
    let name = &body[..semi];
    if name.is_empty() {
        return None;
    }

    let decoded = match name.strip_prefix('#') {
        Some(number) => Cow::Owned(decode_numeric(number)?.to_string()),
        None => Cow::Borrowed(resolve_html5_entity(name)?),
    };

    Some((decoded, semi + 2))
}

fn decode_numeric(number: &str) -> Option<char> {
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u32::from_str_radix(hex, 16).unwrap_or(u32::MAX)
        }
        None if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
            number.parse::<u32>().unwrap_or(u32::MAX)
        }
        _ => return None,
    };

    Some(
        char::from_u32(code)
            .filter(|&c| c != '\0')
            .unwrap_or(char::REPLACEMENT_CHARACTER),
    )
}
