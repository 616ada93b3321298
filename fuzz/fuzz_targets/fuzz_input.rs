// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary service responses must never panic, and ranking must hold
fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(candidates) = leaflens::plant_id::parse_candidates(body, Some("file:///fuzz.jpg")) {
        assert!(candidates.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(candidates.iter().all(|c| (0.0..=1.0).contains(&c.confidence)));
        if let Some(top) = candidates.first() {
            assert!(!top.gallery.is_empty());
        }
    }
});
