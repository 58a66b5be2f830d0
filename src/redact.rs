/// Redaction utilities for logging
///
/// Masks credentials and dial targets so startup summaries and cycle logs
/// stay useful without leaking secrets or PII.

/// Redact a secret (API key, client secret), keeping only the last 4
/// characters visible. Example: "sk-abcdef123456" -> "***********3456"
pub fn secret(value: &str) -> String {
    if value.len() <= 4 {
        return "*".repeat(value.len());
    }

    // Find a char boundary 4 visible chars from the end
    let mut cut = value.len() - 4;
    while cut > 0 && !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let visible = &value[cut..];
    format!("{}{}", "*".repeat(value[..cut].chars().count()), visible)
}

/// Redact a dial target (extension or phone number), keeping only the last
/// 4 digits visible. Example: "5551234567" -> "******4567"
pub fn dial_target(number: &str) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() <= 4 {
        // Too short to meaningfully redact
        return "*".repeat(digits.len());
    }

    let visible = &digits[digits.len() - 4..];
    format!("{}{}", "*".repeat(digits.len() - 4), visible)
}

/// Redact an email address, keeping domain visible.
/// Example: "user@example.com" -> "u***@example.com"
pub fn email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        if at_pos == 0 {
            return email.to_string();
        }
        let local = &email[..at_pos];
        let domain = &email[at_pos..];

        // Use chars to properly handle unicode
        let mut chars = local.chars();
        if let Some(first_char) = chars.next() {
            if chars.next().is_none() {
                // Single character local part
                format!("*{}", domain)
            } else {
                format!("{}***{}", first_char, domain)
            }
        } else {
            // Empty local part
            email.to_string()
        }
    } else {
        // Not a valid email, return as-is
        email.to_string()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// secret redaction never panics
        #[test]
        fn secret_redaction_never_panics(s in ".*") {
            let _ = secret(&s);
        }

        /// dial_target redaction never panics
        #[test]
        fn dial_target_redaction_never_panics(s in ".*") {
            let _ = dial_target(&s);
        }

        /// email redaction never panics
        #[test]
        fn email_redaction_never_panics(s in ".*") {
            let _ = email(&s);
        }

        /// dial_target always shows exactly 4 trailing digits for long numbers
        #[test]
        fn dial_target_keeps_last_4(digits in "[0-9]{5,15}") {
            let redacted = dial_target(&digits);
            prop_assert!(redacted.ends_with(&digits[digits.len()-4..]));
        }

        /// no digit from a long secret's masked prefix survives redaction
        #[test]
        fn secret_prefix_fully_masked(s in "[a-zA-Z0-9]{5,40}") {
            let redacted = secret(&s);
            let masked = &redacted[..redacted.len() - 4];
            prop_assert!(masked.chars().all(|c| c == '*'));
        }
    }
}

/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Helper: generate a bounded-length digit string for Kani
    fn any_digit_string<const N: usize>() -> String {
        let mut s = String::new();
        for _ in 0..N {
            let digit: u8 = kani::any();
            kani::assume(digit < 10);
            s.push((b'0' + digit) as char);
        }
        s
    }

    /// Proves: dial_target preserves length for 10-digit input
    #[kani::proof]
    #[kani::unwind(12)]
    fn dial_target_length_preserved() {
        let input = any_digit_string::<10>();
        let result = dial_target(&input);
        kani::assert(result.len() == 10, "output length must equal input digit count");
    }

    /// Proves: short numbers (<=4 digits) are fully masked
    #[kani::proof]
    #[kani::unwind(6)]
    fn dial_target_short_fully_masked() {
        let input = any_digit_string::<4>();
        let result = dial_target(&input);
        for c in result.chars() {
            kani::assert(c == '*', "short numbers must be fully masked");
        }
    }

    /// Proves: original digits never appear in the masked prefix
    #[kani::proof]
    #[kani::unwind(12)]
    fn dial_target_prefix_only_asterisks() {
        let input = any_digit_string::<10>();
        let result = dial_target(&input);
        for c in result.chars().take(6) {
            kani::assert(c == '*', "prefix must be all asterisks");
        }
    }
}
