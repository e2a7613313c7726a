#[cfg(test)]
mod scanner_tests {
    use quill::error::QuillError;
    use quill::scanner::*;
    use quill::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn single(source: &str) -> TokenType {
        let tokens = tokenize(source).expect("scans");
        assert_eq!(tokens.len(), 2, "expected one token plus EOF in {:?}", source);
        tokens[0].token_type.clone()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})[];:",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "= == ! != < <= > >= && || := ++ -- - /",
            &[
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::AND_AND, "&&"),
                (TokenType::OR_OR, "||"),
                (TokenType::COLON_EQUAL, ":="),
                (TokenType::PLUS_PLUS, "++"),
                (TokenType::MINUS_MINUS, "--"),
                (TokenType::MINUS, "-"),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "if else func return break for var type nil true false iffy _x1",
            &[
                (TokenType::IF, "if"),
                (TokenType::ELSE, "else"),
                (TokenType::FUNC, "func"),
                (TokenType::RETURN, "return"),
                (TokenType::BREAK, "break"),
                (TokenType::FOR, "for"),
                (TokenType::VAR, "var"),
                (TokenType::TYPE, "type"),
                (TokenType::NIL, "nil"),
                (TokenType::TRUE, "true"),
                (TokenType::FALSE, "false"),
                (TokenType::IDENTIFIER, "iffy"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_and_lines() {
        let tokens = tokenize("a // ignored ( {\nb\n\n// tail").expect("scans");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].lexeme, "a");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].token_type, TokenType::EOF);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_scanner_05_literals() {
        match single("12345") {
            TokenType::NUMBER(n) => assert_eq!(n, 12345),
            other => panic!("expected NUMBER, got {:?}", other),
        }

        match single(r#""a\tb\n\"q\"""#) {
            TokenType::STRING(s) => assert_eq!(s, "a\tb\n\"q\""),
            other => panic!("expected STRING, got {:?}", other),
        }

        match single(r#"@"2024-01-02T15:04:05Z""#) {
            TokenType::TIME(s) => assert_eq!(s, "2024-01-02T15:04:05Z"),
            other => panic!("expected TIME, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_06_durations() {
        let cases: &[(&str, i64)] = &[
            ("5ns", 5),
            ("3us", 3_000),
            ("250ms", 250_000_000),
            ("2s", 2_000_000_000),
            ("1m", 60_000_000_000),
            ("1h30m", 5_400_000_000_000),
            ("2s500ms", 2_500_000_000),
        ];

        for (source, nanos) in cases {
            match single(source) {
                TokenType::DURATION(n) => assert_eq!(n, *nanos, "{}", source),
                other => panic!("expected DURATION for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_scanner_07_lexical_errors() {
        let bad_unit = tokenize("10days").unwrap_err();
        assert!(bad_unit.to_string().contains("Invalid duration unit"));

        let unterminated = tokenize("\"abc").unwrap_err();
        assert!(unterminated.to_string().contains("Unterminated string"));

        let overflow = tokenize("99999999999999999999").unwrap_err();
        assert!(matches!(overflow, QuillError::Lex { .. }));

        let lone_amp = tokenize("a & b").unwrap_err();
        assert!(lone_amp.to_string().contains("Unexpected character: &"));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token, QuillError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("Expected token {:?}, got error: {}", expected_type, e),
            }
        }
    }

    #[test]
    fn test_multibyte_unexpected_char_recovers() {
        let results: Vec<_> = Scanner::new("é+").collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert!(matches!(&results[1], Ok(t) if t.token_type == TokenType::PLUS));
    }

    #[test]
    fn test_token_display() {
        let tokens = tokenize("x 42 \"hi\"").expect("scans");

        assert_eq!(tokens[0].to_string(), "IDENTIFIER x null");
        assert_eq!(tokens[1].to_string(), "NUMBER 42 42");
        assert_eq!(tokens[2].to_string(), "STRING \"hi\" hi");
        assert_eq!(tokens[3].to_string(), "EOF  null");
    }
}
