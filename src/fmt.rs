use rust_decimal::{Decimal, RoundingStrategy};

use crate::valuation::Variation;

/// Format a decimal as Brazilian currency: R$ 1.234,56
pub fn money(val: Decimal) -> String {
    let negative = val.is_sign_negative() && !val.is_zero();
    let cents = val
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{cents:.2}");
    let (int_part, dec_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-R$ {grouped},{dec_part}")
    } else {
        format!("R$ {grouped},{dec_part}")
    }
}

/// `▲ 12,5%` / `▼ 3,0%`
pub fn variation(v: &Variation) -> String {
    let arrow = if v.is_positive { "▲" } else { "▼" };
    let pct = format!("{:.1}", v.percentage).replace('.', ",");
    format!("{arrow} {pct}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::new(123456, 2)), "R$ 1.234,56");
        assert_eq!(money(Decimal::new(-50000, 2)), "-R$ 500,00");
        assert_eq!(money(Decimal::ZERO), "R$ 0,00");
        assert_eq!(money(Decimal::new(100000099, 2)), "R$ 1.000.000,99");
        assert_eq!(money(Decimal::new(421, 1)), "R$ 42,10");
        assert_eq!(money(Decimal::new(5, 3)), "R$ 0,01");
    }

    #[test]
    fn test_variation_formatting() {
        let up = Variation {
            percentage: Decimal::new(125, 1),
            is_positive: true,
        };
        assert_eq!(variation(&up), "▲ 12,5%");
        let down = Variation {
            percentage: Decimal::from(3),
            is_positive: false,
        };
        assert_eq!(variation(&down), "▼ 3,0%");
    }
}
