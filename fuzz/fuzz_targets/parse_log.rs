#![no_main]

use asyncfix_diagnostics::{group_by_file, parse_diagnostics};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let locations = parse_diagnostics(&text, "CS1998");
    for (_, lines) in group_by_file(&locations) {
        assert!(lines.windows(2).all(|w| w[0] > w[1]));
    }
});
