fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

/// Word capitalisation where any non-letter starts a new word, so
/// `"o'neil 2nd"` becomes `"O'Neil 2Nd"`. Exports were title-cased this way
/// historically and canonical names depend on it.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;

    for c in s.chars() {
        if is_cased(c) {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalises_each_word() {
        assert_eq!(title_case("acme corp"), "Acme Corp");
        assert_eq!(title_case("ACME CORP"), "Acme Corp");
    }

    #[test]
    fn non_letters_start_new_words() {
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("abc1def"), "Abc1Def");
        assert_eq!(title_case("banco-sul"), "Banco-Sul");
    }

    #[test]
    fn accented_letters() {
        assert_eq!(title_case("são joão"), "São João");
    }

    #[test]
    fn idempotent() {
        let once = title_case("credor desconhecido");
        assert_eq!(title_case(&once), once);
    }

    #[test]
    fn empty_string() {
        assert_eq!(title_case(""), "");
    }
}
