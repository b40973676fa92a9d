#![no_main]

use asyncfix_domain::brackets::check_balance;
use asyncfix_domain::lexer::lex;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };

    // Lexing either fails cleanly or classifies every byte.
    if let Ok(lexed) = lex(text) {
        assert_eq!(lexed.len(), text.len());
        let _ = check_balance(text, &lexed);

        let code = lexed.code_view(text, 0..text.len());
        assert_eq!(code.len(), text.len());
    }
});
