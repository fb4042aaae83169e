/// Format a money amount for display: `11 225,00`.
pub fn format_money(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    let is_zero = whole.bytes().chain(cents.bytes()).all(|b| b == b'0');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    format!("{}{},{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_money(11225.0), "11 225,00");
        assert_eq!(format_money(1_000_000.5), "1 000 000,50");
        assert_eq!(format_money(999.999), "1 000,00");
        assert_eq!(format_money(0.0), "0,00");
        assert_eq!(format_money(-1500.25), "-1 500,25");
    }

    #[test]
    fn huge_amounts_keep_every_digit() {
        assert_eq!(format_money(1e20), "100 000 000 000 000 000 000,00");
        assert_eq!(format_money(-1e18), "-1 000 000 000 000 000 000,00");
        assert_eq!(format_money(-0.001), "0,00");
    }

    #[test]
    fn non_finite_is_zero() {
        assert_eq!(format_money(f64::NAN), "0,00");
        assert_eq!(format_money(f64::NEG_INFINITY), "0,00");
    }
}
