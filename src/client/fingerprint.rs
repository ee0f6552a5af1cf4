// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Best-effort browser fingerprint used as the advisory limiter key.
//!
//! Not a security boundary: any client can change every input.

use serde::{Deserialize, Serialize};

/// Traits a page can read about the browser it runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTraits {
    pub user_agent: String,
    pub language: String,
    /// Minutes behind UTC, as browsers report it (UTC+1 is `-60`)
    pub timezone_offset: i32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u32,
}

impl BrowserTraits {
    /// Components joined with `|` in a fixed order.
    pub fn components(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.user_agent,
            self.language,
            self.timezone_offset,
            self.screen_width,
            self.screen_height,
            self.color_depth
        )
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.components())
    }
}

/// Rolling 32-bit hash over UTF-16 code units (`h = h * 31 + unit`),
/// rendered as the absolute value in hex, zero-padded to 8 digits.
pub fn fingerprint(text: &str) -> String {
    let hash = text.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    format!("{:08x}", i64::from(hash).unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> BrowserTraits {
        BrowserTraits {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
            language: "en-GB".to_string(),
            timezone_offset: -60,
            screen_width: 1920,
            screen_height: 1080,
            color_depth: 24,
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(fingerprint(""), "00000000");
        assert_eq!(fingerprint("a"), "00000061");
        // 97 * 31 + 98
        assert_eq!(fingerprint("ab"), "00000c21");
    }

    #[test]
    fn test_components_order() {
        assert_eq!(
            desktop().components(),
            "Mozilla/5.0 (X11; Linux x86_64)|en-GB|-60|1920|1080|24"
        );
    }

    #[test]
    fn test_stable_and_distinct() {
        let a = desktop();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_eq!(a.fingerprint().len(), 8);

        let mut b = desktop();
        b.screen_width = 1280;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_overflowing_input_stays_hex() {
        let long = "x".repeat(10_000);
        let fp = fingerprint(&long);
        assert!(fp.len() >= 8);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
