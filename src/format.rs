//! Turkish-locale number and currency formatting used by reports and exports.

use crate::currency::Currency;

const COMPACT_UNITS: [(f64, &str); 3] = [(1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Compact TRY amount: `₺1.0K`, `₺2.5M`, `-₺1.5K`.
pub fn format_compact(value: f64) -> String {
    format_compact_in(value, Currency::Try)
}

pub fn format_compact_in(value: f64, currency: Currency) -> String {
    let abs = value.abs();
    let sign = if value < 0.0 && abs.round() > 0.0 {
        "-"
    } else {
        ""
    };
    let symbol = currency.symbol();

    for (idx, (divisor, suffix)) in COMPACT_UNITS.iter().enumerate() {
        if abs < *divisor {
            continue;
        }

        let scaled = abs / divisor;
        // 999_960 would print as "1000.0K"; show it in the next unit instead.
        if (scaled * 10.0).round() / 10.0 >= 1000.0 && idx > 0 {
            let (bigger, bigger_suffix) = COMPACT_UNITS[idx - 1];
            return format!("{}{}{:.1}{}", sign, symbol, abs / bigger, bigger_suffix);
        }
        return format!("{}{}{:.1}{}", sign, symbol, scaled, suffix);
    }

    // 999.6 rounds up to a full thousand.
    if abs.round() >= 1000.0 {
        let (divisor, suffix) = COMPACT_UNITS[COMPACT_UNITS.len() - 1];
        return format!("{}{}{:.1}{}", sign, symbol, abs / divisor, suffix);
    }

    format!(
        "{}{}{}",
        sign,
        symbol,
        group_thousands(abs.round() as u64, '.')
    )
}

/// Whole-lira amount with Turkish thousands separators: `₺150.549`.
pub fn format_full_try(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!(
        "{}{}{}",
        sign,
        Currency::Try.symbol(),
        group_thousands(rounded.abs() as u64, '.')
    )
}

/// Amount with `.` grouping and `,` decimals: `₺1.234,56`.
pub fn format_currency(value: f64, currency: Currency, decimals: u32) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let body = format_decimal(value.abs(), decimals);
    if body.chars().all(|c| c == '0' || c == ',' || c == '.') {
        return format!("{}{}", currency.symbol(), body);
    }
    format!("{}{}{}", sign, currency.symbol(), body)
}

/// Turkish percent notation puts the sign first: `%12,5`.
pub fn format_percent(value: f64, decimals: u32) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}%{}", sign, format_decimal(value.abs(), decimals))
}

fn format_decimal(abs: f64, decimals: u32) -> String {
    let factor = 10u64.pow(decimals);
    let scaled = (abs * factor as f64).round() as u64;
    let whole = group_thousands(scaled / factor, '.');
    if decimals == 0 {
        return whole;
    }
    format!(
        "{},{:0width$}",
        whole,
        scaled % factor,
        width = decimals as usize
    )
}

pub fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(1000.0), "₺1.0K");
        assert_eq!(format_compact(1_000_000.0), "₺1.0M");
        assert_eq!(format_compact(-1500.0), "-₺1.5K");
        assert_eq!(format_compact(2_500_000_000.0), "₺2.5B");
        assert_eq!(format_compact(950.0), "₺950");
        assert_eq!(format_compact(0.0), "₺0");
    }

    #[test]
    fn test_format_compact_promotes_unit() {
        assert_eq!(format_compact(999_960.0), "₺1.0M");
        assert_eq!(format_compact(999_940.0), "₺999.9K");
        assert_eq!(format_compact(999.6), "₺1.0K");
        assert_eq!(format_compact(-999.6), "-₺1.0K");
        assert_eq!(format_compact(999.4), "₺999");
    }

    #[test]
    fn test_format_compact_other_currency() {
        assert_eq!(format_compact_in(12_300.0, Currency::Usd), "$12.3K");
    }

    #[test]
    fn test_format_full_try() {
        assert_eq!(format_full_try(150549.0), "₺150.549");
        assert_eq!(format_full_try(999.4), "₺999");
        assert_eq!(format_full_try(1_234_567.0), "₺1.234.567");
        assert_eq!(format_full_try(-2500.0), "-₺2.500");
    }

    #[test]
    fn test_format_currency_and_percent() {
        assert_eq!(format_currency(1234.56, Currency::Try, 2), "₺1.234,56");
        assert_eq!(format_currency(-0.001, Currency::Eur, 2), "€0,00");
        assert_eq!(format_currency(-10.5, Currency::Usd, 1), "-$10,5");
        assert_eq!(format_percent(12.5, 1), "%12,5");
        assert_eq!(format_percent(-3.0, 0), "-%3");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0, '.'), "0");
        assert_eq!(group_thousands(100, '.'), "100");
        assert_eq!(group_thousands(1000, '.'), "1.000");
        assert_eq!(group_thousands(12345678, ','), "12,345,678");
    }
}
