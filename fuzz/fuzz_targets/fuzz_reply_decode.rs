// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use busrpc::envelope::{decode_reply, encode_reply};
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let frame = Bytes::copy_from_slice(data);

    // Frames under the failure message cap re-encode byte for byte
    if let Ok(reply) = decode_reply(&frame) {
        if frame.len() <= 64 * 1024 {
            assert_eq!(encode_reply(&reply), frame);
        }
    }
});
