//! Monetary totals in words, as printed on purchase orders.

use thiserror::Error;

use stardust_core::{Amount, CurrencyCode};

use crate::cardinal::cardinal_words;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WordsError {
    #[error("no word forms for currency '{0}'")]
    UnsupportedCurrency(String),
}

/// (singular, plural) word forms for a unit.
type Forms = (&'static str, &'static str);

fn currency_forms(code: &str) -> Option<(Forms, Forms)> {
    let forms = match code {
        "USD" | "CAD" | "AUD" | "SGD" => (("dollar", "dollars"), ("cent", "cents")),
        "EUR" => (("euro", "euros"), ("cent", "cents")),
        "GBP" => (("pound", "pounds"), ("penny", "pence")),
        "INR" => (("rupee", "rupees"), ("paisa", "paise")),
        "JPY" => (("yen", "yen"), ("sen", "sen")),
        "CNY" => (("yuan", "yuan"), ("fen", "fen")),
        "CHF" => (("franc", "francs"), ("centime", "centimes")),
        _ => return None,
    };
    Some(forms)
}

fn pick(forms: Forms, n: u64) -> &'static str {
    if n == 1 { forms.0 } else { forms.1 }
}

/// Lower-case currency rendering:
/// "one thousand, two hundred and fifty dollars, fifty cents".
fn currency_words(amount: Amount, code: &str) -> Result<String, WordsError> {
    let (major_forms, minor_forms) =
        currency_forms(code).ok_or_else(|| WordsError::UnsupportedCurrency(code.to_string()))?;

    let major = amount.major_part();
    let minor = amount.minor_part();
    let sign = if amount.is_negative() { "minus " } else { "" };

    Ok(format!(
        "{sign}{} {}, {} {}",
        cardinal_words(major),
        pick(major_forms, major),
        cardinal_words(minor),
        pick(minor_forms, minor),
    ))
}

/// Case-preserving replacement of a whole token.
fn replace_token(token: &str, replacement: &str) -> String {
    let upper = token.chars().next().is_some_and(char::is_uppercase);
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if upper => first.to_uppercase().chain(chars).collect(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn taka_words(amount: Amount) -> Result<String, WordsError> {
    let words = currency_words(amount, "INR")?.replace(',', "");
    let tokens = words
        .split_whitespace()
        .filter(|t| !t.eq_ignore_ascii_case("and"))
        .map(|t| match t.to_ascii_lowercase().as_str() {
            "rupee" | "rupees" => replace_token(t, "taka"),
            "paisa" | "paise" => replace_token(t, "poisha"),
            _ => t.to_string(),
        })
        .collect::<Vec<_>>();
    Ok(tokens.join(" "))
}

/// Render `total` in title-cased English words for `currency`.
///
/// `BDT` uses the rupee forms renamed to Taka/Poisha, without commas or the
/// conjunction "and".
pub fn amount_to_words(total: Amount, currency: &CurrencyCode) -> Result<String, WordsError> {
    let words = match currency.as_str() {
        "BDT" => taka_words(total)?,
        code => currency_words(total, code)?,
    };
    Ok(title_case(&words))
}

/// Title case with word boundaries at every non-letter: the first letter of
/// each alphabetic run is upper-cased, the rest lower-cased
/// ("twenty-one" becomes "Twenty-One").
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn dollars_and_cents() {
        let words = amount_to_words(Amount::from_minor(125_050), &code("USD")).unwrap();
        assert_eq!(words, "One Thousand, Two Hundred And Fifty Dollars, Fifty Cents");
        assert!(words.contains("Dollars"));
        assert!(words.contains("Cents"));
    }

    #[test]
    fn taka_has_no_commas_and_no_rupees() {
        let words = amount_to_words(Amount::from_major(1_250), &code("BDT")).unwrap();
        assert_eq!(words, "One Thousand Two Hundred Fifty Taka Zero Poisha");
        for banned in ["Rupee", "Paise", "Paisa", ",", "And"] {
            assert!(!words.contains(banned), "{banned:?} in {words:?}");
        }
    }

    #[test]
    fn taka_with_poisha() {
        let words = amount_to_words(Amount::from_minor(100_101), &code("bdt")).unwrap();
        assert_eq!(words, "One Thousand One Taka One Poisha");
    }

    #[test]
    fn singular_and_zero_forms() {
        assert_eq!(
            amount_to_words(Amount::from_minor(101), &code("GBP")).unwrap(),
            "One Pound, One Penny"
        );
        assert_eq!(
            amount_to_words(Amount::ZERO, &code("EUR")).unwrap(),
            "Zero Euros, Zero Cents"
        );
    }

    #[test]
    fn negative_totals_are_prefixed() {
        assert_eq!(
            amount_to_words(Amount::from_minor(-2_105), &code("USD")).unwrap(),
            "Minus Twenty-One Dollars, Five Cents"
        );
    }

    #[test]
    fn unsupported_currency_is_an_error() {
        assert_eq!(
            amount_to_words(Amount::from_major(5), &code("XYZ")),
            Err(WordsError::UnsupportedCurrency("XYZ".to_string()))
        );
    }

    #[test]
    fn title_case_follows_letter_runs() {
        assert_eq!(title_case("forty-two o'clock"), "Forty-Two O'Clock");
        assert_eq!(title_case("ALL CAPS"), "All Caps");
    }
}
