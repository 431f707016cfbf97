//! Fixed-point amount formatting and parsing.
//!
//! Amounts are signed 64-bit integers in the smallest unit (satoshi for
//! Bitcoin, cents for fiat). Valid values lie in `[-MAX_VALUE, MAX_VALUE]`.

use crate::network::CoinParams;

pub const MAX_VALUE: i64 = i64::MAX;

/// Separator and sign characters used when rendering or reading amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub decimal_point: char,
    pub group_separator: char,
    pub negative_sign: char,
    pub positive_sign: char,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            decimal_point: '.',
            group_separator: ',',
            negative_sign: '-',
            positive_sign: '+',
        }
    }
}

impl Locale {
    fn group(&self, digits: &str) -> String {
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(self.group_separator);
            }
            out.push(c);
        }
        out
    }

    /// Strip correctly placed group separators ("1,234,567"). Misplaced ones
    /// yield `None`.
    fn ungroup(&self, text: &str) -> Option<String> {
        if !text.contains(self.group_separator) {
            return Some(text.to_string());
        }
        let groups: Vec<&str> = text.split(self.group_separator).collect();
        let (first, rest) = groups.split_first()?;
        if first.is_empty() || first.chars().count() > 3 {
            return None;
        }
        if rest.iter().any(|g| g.chars().count() != 3) {
            return None;
        }
        Some(groups.concat())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub full_name: &'static str,
    pub unit: &'static str,
    /// (minimum, maximum) fractional digits.
    pub decimal_size: (usize, usize),
}

pub const USD: Currency = Currency {
    full_name: "US Dollar",
    unit: "USD",
    decimal_size: (2, 2),
};

pub const EUR: Currency = Currency {
    full_name: "Euro",
    unit: "EUR",
    decimal_size: (2, 2),
};

/// Placeholder fiat currency used before any rate is known.
pub const NO_FIAT: Currency = Currency {
    full_name: "-- None --",
    unit: "N/A",
    decimal_size: (2, 2),
};

impl Currency {
    pub fn decimal_divisor(&self) -> i64 {
        10i64.pow(self.decimal_size.1 as u32)
    }

    pub fn is_valid_value(&self, value: i128) -> bool {
        (-(MAX_VALUE as i128)..=MAX_VALUE as i128).contains(&value)
    }

    /// Parse "[sign]int[.frac]". With a locale, non-strict parsing drops
    /// group separators wherever they appear; strict parsing only accepts
    /// well-placed ones.
    pub fn from_string(&self, source: &str, strict: bool, locale: Option<&Locale>) -> Option<i64> {
        let c_locale = Locale::default();
        let loc = locale.unwrap_or(&c_locale);

        let mut chars = source.chars();
        let first = chars.next()?;
        let (negative, body) = if first == '-' || first == loc.negative_sign {
            (true, chars.as_str())
        } else if first == '+' || first == loc.positive_sign {
            (false, chars.as_str())
        } else {
            (false, source)
        };

        let parts: Vec<&str> = body.split(loc.decimal_point).collect();
        let (integer, fraction) = match parts.as_slice() {
            [integer] => (*integer, ""),
            [integer, fraction] => (*integer, *fraction),
            _ => return None,
        };
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        let divisor = self.decimal_divisor() as i128;
        let mut result: i128 = 0;

        if !integer.is_empty() {
            let digits = match locale {
                Some(loc) if strict => loc.ungroup(integer)?,
                Some(loc) => integer.replace(loc.group_separator, ""),
                None => integer.to_string(),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let value: i128 = digits.parse().ok()?;
            result = value.checked_mul(divisor)?;
        }

        if !fraction.is_empty() {
            let max_digits = self.decimal_size.1;
            if fraction.len() > max_digits || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let mut value: i128 = fraction.parse().ok()?;
            for _ in fraction.len()..max_digits {
                value *= 10;
            }
            result = result.checked_add(value)?;
        }

        if negative {
            result = -result;
        }
        if !self.is_valid_value(result) {
            return None;
        }
        i64::try_from(result).ok()
    }

    /// Render an amount, trimming trailing fractional zeros down to the
    /// minimum decimal size. Zero and out-of-range values render as "0".
    pub fn to_string(&self, value: i64, locale: Option<&Locale>) -> String {
        if value == 0 || !self.is_valid_value(value as i128) {
            return "0".to_string();
        }
        let mut result = String::new();
        if value < 0 {
            result.push(locale.map_or('-', |l| l.negative_sign));
        }

        let magnitude = value.unsigned_abs();
        let divisor = self.decimal_divisor() as u64;
        let (integer, fraction) = (magnitude / divisor, magnitude % divisor);

        let integer = integer.to_string();
        match locale {
            Some(loc) => result.push_str(&loc.group(&integer)),
            None => result.push_str(&integer),
        }

        if fraction != 0 {
            let (min_digits, max_digits) = self.decimal_size;
            let mut digits = format!("{fraction:0max_digits$}");
            while digits.len() > min_digits && digits.ends_with('0') {
                digits.pop();
            }
            result.push(locale.map_or('.', |l| l.decimal_point));
            result.push_str(&digits);
        }
        result
    }
}

impl CoinParams {
    pub fn currency(&self) -> Currency {
        Currency {
            full_name: self.full_name,
            unit: self.unit,
            decimal_size: self.decimal_size,
        }
    }
}

/// Price of one whole coin expressed in the fiat currency's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiatRate {
    pub value: i64,
    pub currency: Currency,
}

impl Default for FiatRate {
    fn default() -> Self {
        Self {
            value: 0,
            currency: NO_FIAT,
        }
    }
}

impl FiatRate {
    /// Coin amount → fiat amount, rounded toward negative infinity.
    pub fn to_fiat_amount(&self, coin: &Currency, value: i64) -> Option<i64> {
        let product = value as i128 * self.value as i128;
        let fiat = product.div_euclid(coin.decimal_divisor() as i128);
        if self.currency.is_valid_value(fiat) {
            i64::try_from(fiat).ok()
        } else {
            None
        }
    }

    /// Fiat amount → coin amount, rounded up. A zero rate converts to zero.
    pub fn from_fiat_amount(&self, coin: &Currency, value: i64) -> Option<i64> {
        let scaled = value as i128 * coin.decimal_divisor() as i128;
        let amount = if self.value == 0 {
            0
        } else {
            let rate = self.value as i128;
            let quotient = scaled.div_euclid(rate);
            if scaled.rem_euclid(rate) != 0 && rate > 0 {
                quotient + 1
            } else {
                quotient
            }
        };
        if coin.is_valid_value(amount) {
            i64::try_from(amount).ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::CoinId;
    use proptest::prelude::*;

    fn btc() -> Currency {
        CoinId::Bitcoin.params().currency()
    }

    #[test]
    fn parses_plain_amounts() {
        let c = btc();
        assert_eq!(c.from_string("1", true, None), Some(100_000_000));
        assert_eq!(c.from_string("0.00000001", true, None), Some(1));
        assert_eq!(c.from_string("-1.5", true, None), Some(-150_000_000));
        assert_eq!(c.from_string("+.5", true, None), Some(50_000_000));
        assert_eq!(c.from_string("5.", true, None), Some(500_000_000));
    }

    #[test]
    fn rejects_malformed_amounts() {
        let c = btc();
        assert_eq!(c.from_string("", true, None), None);
        assert_eq!(c.from_string(".", true, None), None);
        assert_eq!(c.from_string("-", true, None), None);
        assert_eq!(c.from_string("1.2.3", true, None), None);
        assert_eq!(c.from_string("--1", true, None), None);
        assert_eq!(c.from_string("1.000000001", true, None), None);
        assert_eq!(c.from_string("1e5", true, None), None);
        assert_eq!(c.from_string("1,000", true, None), None);
        assert_eq!(c.from_string("0.-1", true, None), None);
    }

    #[test]
    fn range_is_symmetric() {
        let c = Currency {
            full_name: "unit",
            unit: "U",
            decimal_size: (0, 0),
        };
        assert_eq!(
            c.from_string("9223372036854775807", true, None),
            Some(i64::MAX)
        );
        assert_eq!(c.from_string("9223372036854775808", true, None), None);
        assert_eq!(c.from_string("-9223372036854775808", true, None), None);
        assert_eq!(btc().from_string("92233720368.54775808", true, None), None);
    }

    #[test]
    fn formats_amounts() {
        let c = btc();
        assert_eq!(c.to_string(0, None), "0");
        assert_eq!(c.to_string(100_000_000, None), "1");
        assert_eq!(c.to_string(150_000_000, None), "1.5");
        assert_eq!(c.to_string(1, None), "0.00000001");
        assert_eq!(c.to_string(-1_234_500_000, None), "-12.345");
        assert_eq!(c.to_string(i64::MIN, None), "0");
    }

    #[test]
    fn fiat_keeps_minimum_decimals() {
        assert_eq!(USD.to_string(150, None), "1.50");
        assert_eq!(USD.to_string(105, None), "1.05");
        assert_eq!(USD.to_string(100, None), "1");
    }

    #[test]
    fn locale_grouping() {
        let loc = Locale {
            decimal_point: ',',
            group_separator: '.',
            negative_sign: '-',
            positive_sign: '+',
        };
        let c = btc();
        assert_eq!(c.to_string(123_456_789_000_000, Some(&loc)), "1.234.567,89");
        assert_eq!(
            c.from_string("1.234.567,89", true, Some(&loc)),
            Some(123_456_789_000_000)
        );
        assert_eq!(c.from_string("12.34.567,89", true, Some(&loc)), None);
        assert_eq!(
            c.from_string("12.34.567,89", false, Some(&loc)),
            Some(123_456_789_000_000)
        );
    }

    #[test]
    fn fiat_conversion_rounding() {
        let coin = btc();
        let rate = FiatRate {
            value: 3_000_000, // 30000.00 USD per BTC
            currency: USD,
        };
        assert_eq!(rate.to_fiat_amount(&coin, 100_000_000), Some(3_000_000));
        assert_eq!(rate.to_fiat_amount(&coin, 1), Some(0));
        assert_eq!(rate.to_fiat_amount(&coin, -1), Some(-1));
        assert_eq!(rate.from_fiat_amount(&coin, 3_000_000), Some(100_000_000));
        assert_eq!(rate.from_fiat_amount(&coin, 1), Some(34));
        assert_eq!(FiatRate::default().from_fiat_amount(&coin, 500), Some(0));
    }

    proptest! {
        #[test]
        fn format_then_parse_is_identity(value in -MAX_VALUE..=MAX_VALUE) {
            let c = btc();
            prop_assert_eq!(c.from_string(&c.to_string(value, None), true, None), Some(value));
        }

        #[test]
        fn localized_format_then_parse_is_identity(value in -MAX_VALUE..=MAX_VALUE) {
            let c = btc();
            let loc = Locale::default();
            let text = c.to_string(value, Some(&loc));
            prop_assert_eq!(c.from_string(&text, true, Some(&loc)), Some(value));
        }
    }
}
