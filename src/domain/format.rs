// src/domain/format.rs

/// Human-readable VND amount: "1.50 tỷ", "850.0 triệu", "500 nghìn".
pub fn format_price(price: f64) -> String {
    if price >= 1_000_000_000.0 {
        format!("{:.2} tỷ", price / 1_000_000_000.0)
    } else if price >= 1_000_000.0 {
        format!("{:.1} triệu", price / 1_000_000.0)
    } else if price >= 1_000.0 {
        format!("{:.0} nghìn", price / 1_000.0)
    } else {
        group_thousands(price.round() as i64)
    }
}

pub fn format_price_per_m2(price: f64) -> String {
    format!("{:.2} triệu/m²", price / 1_000_000.0)
}

/// Vietnamese digit grouping: 1234567 -> "1.234.567".
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
