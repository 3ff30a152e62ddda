// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use busrpc::SubjectResolver;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(subject) = std::str::from_utf8(data) else {
        return;
    };

    let resolver = SubjectResolver::default();
    if let Some(routed) = resolver.parse("Greeter", subject) {
        // Valid tokens resolve back to the parsed subject
        if let Ok(resolved) = resolver.resolve("Greeter", routed.method, routed.routing_key) {
            assert_eq!(resolved.as_str(), subject);
        }
    }
});
