#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use milli_tls::{NoVerification, TlsConfig, TlsConnection};

fuzz_target!(|data: &[u8]| {
    // Arbitrary server bytes against a fresh client, split at every 97th
    // byte to exercise reassembly.
    let Ok(config) = TlsConfig::builder(Arc::new(NoVerification))
        .server_name("fuzz.local")
        .build()
    else {
        return;
    };
    let Ok(mut conn) = TlsConnection::new_client(Arc::new(config)) else {
        return;
    };
    let mut out = [0u8; 4096];
    while conn.poll_output(&mut out).is_some() {}
    for chunk in data.chunks(97) {
        if conn.feed_data(chunk).is_err() {
            break;
        }
        while conn.poll_output(&mut out).is_some() {}
    }
    let _ = conn.feed_eof();
});
