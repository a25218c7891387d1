use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

const ELLIPSIS: char = '…';

/// SEC-001: Make feed-controlled text safe to print on a terminal.
///
/// Drops ANSI escape sequences (CSI `ESC [ ... final`, OSC `ESC ] ... BEL|ST`),
/// bare ESC, DEL and C0 control characters. Tab and newline are kept.
///
/// Returns `Cow::Borrowed` when nothing needs removing.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some(&'[') => {
                    chars.next();
                    // parameters and intermediates, up to and including the final byte
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(&']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if is_unsafe(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_unsafe(c: char) -> bool {
    (c.is_ascii_control() && c != '\t' && c != '\n') || ('\u{80}'..='\u{9f}').contains(&c)
}

/// Single-line preview of feed text: control characters removed, runs of
/// whitespace collapsed to one space, then cut to `max_width` columns.
pub fn one_line(s: &str, max_width: usize) -> String {
    let cleaned = strip_control_chars(s);
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_to_width(&collapsed, max_width).into_owned()
}

/// Cut `s` to at most `max_width` terminal columns, ending in `…` when shortened.
///
/// Wide characters (CJK, emoji) count as two columns.
///
/// ```
/// use gator::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 6), "Hello…");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    let mut width = 0;
    let mut cut = None;
    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        // remember where the ellipsis would have to go
        if cut.is_none() && width + w > max_width.saturating_sub(1) {
            cut = Some(idx);
        }
        if width + w > max_width {
            let mut out = s[..cut.unwrap_or(idx)].to_string();
            if max_width > 0 {
                out.push(ELLIPSIS);
            }
            return Cow::Owned(out);
        }
        width += w;
    }
    Cow::Borrowed(s)
}
