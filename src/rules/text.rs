//! Pure text helpers for the fraud rules: address similarity, suspicious
//! pattern matching, Bangladesh mobile validation, private-range IPs.

use std::net::Ipv4Addr;

/// Levenshtein edit distance over unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized similarity: (longer - distance) / longer. Two empty strings
/// are fully similar. Case-sensitive, raw strings as submitted.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 1.0;
    }
    (longer - levenshtein(a, b)) as f64 / longer as f64
}

const FRAUD_KEYWORDS: [&str; 4] = ["test", "fake", "spam", "bot"];

/// Number of suspicious text patterns matching the combined name+address.
/// The four checks are independent and stack.
pub fn suspicious_pattern_count(text: &str) -> usize {
    let mut count = 0;
    let lower = text.to_lowercase();
    if FRAUD_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        count += 1;
    }
    if has_repeated_run(text, 5) {
        count += 1;
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        count += 1;
    }
    if single_case_letters(text) {
        count += 1;
    }
    count
}

fn has_repeated_run(text: &str, min_len: usize) -> bool {
    let mut run = 0;
    let mut last: Option<char> = None;
    for c in text.chars() {
        if Some(c) == last {
            run += 1;
        } else {
            run = 1;
            last = Some(c);
        }
        if run >= min_len {
            return true;
        }
    }
    false
}

/// True when the text contains letters and every letter is one case.
/// Non-letters are ignored; caseless scripts (Bengali included) never
/// count as single-case.
fn single_case_letters(text: &str) -> bool {
    let mut saw_letter = false;
    let mut all_lower = true;
    let mut all_upper = true;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        saw_letter = true;
        all_lower &= c.is_lowercase();
        all_upper &= c.is_uppercase();
    }
    saw_letter && (all_lower || all_upper)
}

/// Bangladesh mobile validation after stripping non-digits: `01[3-9]` plus
/// 8 digits, optionally prefixed with country code 88.
pub fn is_valid_bd_mobile(raw: &str) -> bool {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if let Some(local) = digits.strip_prefix("88") {
        if digits.len() == 13 {
            return is_local_bd_mobile(local);
        }
    }
    digits.len() == 11 && is_local_bd_mobile(&digits)
}

fn is_local_bd_mobile(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    bytes.len() == 11 && bytes[0] == b'0' && bytes[1] == b'1' && (b'3'..=b'9').contains(&bytes[2])
}

/// Private (RFC1918) or loopback IPv4. Such addresses should never arrive
/// as a public client IP, so their presence marks a proxied or spoofed
/// submission.
pub fn is_private_or_loopback(ip: &str) -> bool {
    match ip.parse::<Ipv4Addr>() {
        Ok(addr) => addr.is_private() || addr.is_loopback(),
        Err(_) => false,
    }
}
