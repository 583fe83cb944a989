// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Display formatting for prices, distances, durations and phone numbers.

/// `150.5` -> `D 150.50`
pub fn format_currency(amount: f64) -> String {
    format!("D {:.2}", amount)
}

/// `2.4` -> `2.4 km`
pub fn format_distance(km: f64) -> String {
    format!("{:.1} km", km)
}

/// `12` -> `12 min`, `65` -> `1h 5m`
pub fn format_duration(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    if total < 60 {
        format!("{} min", total)
    } else {
        format!("{}h {}m", total / 60, total % 60)
    }
}

/// `+2207654321` -> `+220 765 4321`; anything else is returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format!("+{} {} {}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        phone.to_string()
    }
}

/// Gambian numbers: `220` followed by at least seven digits.
pub fn is_valid_gambian_number(phone: &str) -> bool {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    digits.len() >= 10 && digits.starts_with("220")
}
