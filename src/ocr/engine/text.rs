/// Cleans one vector-extracted fragment before it is joined into a line.
///
/// Column and footnote markers come out of the content stream as a lone
/// letter glued to the front of the real text ("a Rated voltage"). Those are
/// stripped until none is left, whitespace runs collapse to a single space,
/// and the result is trimmed, so cleaning a cleaned fragment changes nothing.
pub(crate) fn clean_fragment_text(text: &str) -> String {
    let mut current = collapse_whitespace(text).trim().to_string();
    while let Some(rest) = strip_leading_marker(&current) {
        current = rest.trim_start().to_string();
    }
    current
}

/// Returns the remainder when `text` opens with a single ASCII letter that
/// stands on its own as a word.
fn strip_leading_marker(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    match chars.next() {
        Some(next) if is_word_char(next) => None,
        _ => Some(&text[first.len_utf8()..]),
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    let mut out = String::new();
    let mut last_space = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out
}

/// Joins the texts of one line, skipping fragments that cleaned down to nothing.
pub(super) fn join_line<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_lone_marker_letter() {
        assert_eq!(clean_fragment_text("a Rated voltage"), "Rated voltage");
        assert_eq!(clean_fragment_text("b)  Ripple"), ") Ripple");
    }

    #[test]
    fn keeps_words_starting_with_a_letter() {
        assert_eq!(clean_fragment_text("Ausgang output"), "Ausgang output");
        assert_eq!(clean_fragment_text("A1 terminal"), "A1 terminal");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            clean_fragment_text("  Betriebsanzeige \t operating\n indicator "),
            "Betriebsanzeige operating indicator"
        );
    }

    #[test]
    fn cleaning_is_idempotent() {
        for raw in [
            "a b Umklemmbar tappings",
            "x  24 V DC",
            "c",
            "",
            "Restwelligkeit   ripple",
            "q-factor",
        ] {
            let once = clean_fragment_text(raw);
            assert_eq!(clean_fragment_text(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn join_line_skips_empty_fragments() {
        assert_eq!(join_line(["24 V", "", "DC"]), "24 V DC");
        assert_eq!(join_line(Vec::<&str>::new()), "");
    }
}
