//! English cardinal numbers ("one thousand, two hundred and fifty").

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [&str; 7] = [
    "",
    "thousand",
    "million",
    "billion",
    "trillion",
    "quadrillion",
    "quintillion",
];

fn below_hundred(n: u64) -> String {
    debug_assert!(n < 100);
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    let (tens, ones) = (n / 10, n % 10);
    if ones == 0 {
        TENS[tens as usize].to_string()
    } else {
        format!("{}-{}", TENS[tens as usize], ONES[ones as usize])
    }
}

fn below_thousand(n: u64) -> String {
    debug_assert!(n > 0 && n < 1000);
    let (hundreds, rest) = (n / 100, n % 100);
    match (hundreds, rest) {
        (0, r) => below_hundred(r),
        (h, 0) => format!("{} hundred", ONES[h as usize]),
        (h, r) => format!("{} hundred and {}", ONES[h as usize], below_hundred(r)),
    }
}

/// Spell out `n` in English.
///
/// Groups of three digits are joined with ", "; a trailing remainder below
/// one hundred is joined with " and ".
pub fn cardinal_words(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    // (group value, scale index), most significant first
    let mut groups = Vec::new();
    let mut rest = n;
    let mut scale = 0;
    while rest > 0 {
        groups.push((rest % 1000, scale));
        rest /= 1000;
        scale += 1;
    }
    groups.reverse();

    let mut out = String::new();
    let mut remaining = n;
    for (value, scale) in groups {
        let place = 1000u64.pow(scale as u32);
        if value == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push_str(if remaining < 100 { " and " } else { ", " });
        }
        out.push_str(&below_thousand(value));
        if scale > 0 {
            out.push(' ');
            out.push_str(SCALES[scale]);
        }
        remaining -= value * place;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn small_numbers() {
        assert_eq!(cardinal_words(0), "zero");
        assert_eq!(cardinal_words(7), "seven");
        assert_eq!(cardinal_words(19), "nineteen");
        assert_eq!(cardinal_words(40), "forty");
        assert_eq!(cardinal_words(42), "forty-two");
    }

    #[test]
    fn hundreds_use_and() {
        assert_eq!(cardinal_words(100), "one hundred");
        assert_eq!(cardinal_words(150), "one hundred and fifty");
        assert_eq!(cardinal_words(999), "nine hundred and ninety-nine");
    }

    #[test]
    fn groups_are_comma_joined() {
        assert_eq!(cardinal_words(1_250), "one thousand, two hundred and fifty");
        assert_eq!(cardinal_words(1_001), "one thousand and one");
        assert_eq!(cardinal_words(1_000_100), "one million, one hundred");
        assert_eq!(cardinal_words(2_000_050), "two million and fifty");
        assert_eq!(cardinal_words(50_000), "fifty thousand");
        assert_eq!(
            cardinal_words(12_345_678),
            "twelve million, three hundred and forty-five thousand, six hundred and seventy-eight"
        );
    }

    #[test]
    fn largest_value() {
        assert!(cardinal_words(u64::MAX).starts_with("eighteen quintillion"));
    }

    proptest! {
        /// "and" only ever introduces a final remainder below one hundred.
        #[test]
        fn and_only_before_small_remainder(n in 0u64..10_000_000_000u64) {
            let words = cardinal_words(n);
            prop_assert!(!words.contains("zero") || n == 0);
            if let Some((_, tail)) = words.rsplit_once(" and ") {
                prop_assert!(!tail.contains("hundred"));
                prop_assert!(!tail.contains("thousand"));
                prop_assert!(!tail.contains(','));
            }
        }
    }
}
