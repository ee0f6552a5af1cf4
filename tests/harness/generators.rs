// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for flood and abuse scenarios.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of distinct client addresses.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate well-formed contact bodies.
pub fn generate_forms(count: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| {
            serde_json::json!({
                "name": format!("Visitor {i}"),
                "email": format!("visitor{i}@example.com"),
                "message": format!("Hello from visitor {i}"),
            })
        })
        .collect()
}

/// Bodies that must be refused before the limiter is consulted.
pub fn generate_incomplete_forms() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({}),
        serde_json::json!({ "name": "A", "email": "a@example.com" }),
        serde_json::json!({ "name": "", "email": "a@example.com", "message": "hi" }),
        serde_json::json!({ "name": "A", "email": "   ", "message": "hi" }),
        serde_json::json!({ "name": "A", "email": "a@example.com", "message": "\n\t" }),
        serde_json::json!({ "name": null, "email": "a@example.com", "message": "hi" }),
    ]
}

/// Token values an attacker might try to get reflected into the denial page.
pub fn generate_hostile_tokens() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "\"><img src=x onerror=alert(1)>",
        "'; alert(1); '",
        "</code><h1>owned</h1>",
        "&lt;already-escaped&gt;",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_forms() {
        let forms = generate_forms(3);
        assert_eq!(forms[2]["email"], "visitor2@example.com");
    }
}
