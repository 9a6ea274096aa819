//! Positional template substitution and field accumulation
//!
//! Probe field templates carry `$1`, `$2`, ... placeholders referring to
//! regex capture groups. Both helpers here are pure functions so the
//! substitution and combine rules can be tested in isolation, instead of
//! being scattered across match handling.

/// Replace `$N` placeholders with the corresponding capture (1-indexed).
///
/// A placeholder whose group is absent (index out of range, or the group
/// did not participate in the match) is left verbatim; that is never an
/// error. The same group may feed several fields, each call substitutes
/// independently.
pub fn apply(template: &str, captures: &[Option<String>]) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            // template is valid UTF-8 and $N is all ASCII
            let group: usize = template[i + 1..j].parse().unwrap_or(0);
            match captures.get(group) {
                Some(Some(text)) if group > 0 => out.push_str(text),
                _ => out.push_str(&template[i..j]),
            }
            i = j;
        } else {
            let ch = template[i..].chars().next().unwrap_or('\u{fffd}');
            out.push(ch);
            i += ch.len_utf8();
        }
    }

    out
}

/// Accumulate evidence: empty `old` yields `new`, anything else appends
/// with a fixed separator so every matching probe's contribution survives
/// in database order.
pub fn combine(old: &str, new: &str) -> String {
    if old.is_empty() {
        new.to_string()
    } else {
        let mut s = String::with_capacity(old.len() + 3 + new.len());
        s.push_str(old);
        s.push_str(" | ");
        s.push_str(new);
        s
    }
}
