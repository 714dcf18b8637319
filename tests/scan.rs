//! Scanner behaviour on small rule sets: munch order, rule bodies, separators, positions.

use std::{io, sync::Arc};

use rulelex::lexer::{
    CharSource, ReaderSource, StrSource, Token, Tokenizer,
    tables::{RuleSet, Tables, TokenKind, dfa::WORD},
};

fn tables(rules: RuleSet) -> Arc<Tables> {
    Arc::new(rules.build())
}

fn pairs(tokens: &[Token]) -> Vec<(TokenKind, &str)> {
    tokens.iter().map(|t| (t.kind, t.text.as_str())).collect()
}

fn c_like() -> RuleSet {
    RuleSet::new()
        .add_keywords(["if", "else", "begin"])
        .add_operators(["<", "<=", "=", "==", "+", "(", ")"])
        .add_comment("/*", "*/")
        .add_line_comment("//")
        .add_literal("\"", "\\")
        .add_separators(" \t\r\n")
}

#[test]
fn longest_operator_wins() {
    let t = tables(RuleSet::new().add_operators(["<", "<="]));
    assert_eq!(
        pairs(&t.tokenize("<=x", true)),
        [(TokenKind::Operator, "<="), (TokenKind::Word, "x")]
    );

    let t = tables(RuleSet::new().add_operators(["<", "<<="]));
    assert_eq!(
        pairs(&t.tokenize("<<=y", true)),
        [(TokenKind::Operator, "<<="), (TokenKind::Word, "y")]
    );
}

#[test]
fn failed_prefix_stays_word_text() {
    let t = tables(RuleSet::new().add_operators(["<<="]));
    // "<<" never completes a rule, so it joins the surrounding word.
    assert_eq!(pairs(&t.tokenize("a<<b", true)), [(TokenKind::Word, "a<<b")]);

    let t = tables(RuleSet::new().add_keywords(["begin"]));
    assert_eq!(pairs(&t.tokenize("bag", true)), [(TokenKind::Word, "bag")]);
    assert_eq!(pairs(&t.tokenize("abeg", true)), [(TokenKind::Word, "abeg")]);
}

#[test]
fn keyword_is_not_boundary_aware() {
    let t = tables(RuleSet::new().add_keywords(["begin"]));
    assert_eq!(
        pairs(&t.tokenize("beginning", true)),
        [(TokenKind::Keyword, "begin"), (TokenKind::Word, "ning")]
    );
}

#[test]
fn escaped_literal_is_one_token() {
    let t = tables(RuleSet::new().add_literal("\"", "\\"));
    let toks = t.tokenize(r#""a\"b""#, true);
    assert_eq!(pairs(&toks), [(TokenKind::Literal, r#""a\"b""#)]);
    assert_eq!((toks[0].line(), toks[0].column()), (1, 1));
}

#[test]
fn doubled_border_escapes_itself() {
    let t = tables(RuleSet::new().add_literal("'", "'").add_separators(" "));
    assert_eq!(
        pairs(&t.tokenize("'it''s' x", true)),
        [(TokenKind::Literal, "'it''s'"), (TokenKind::Word, "x")]
    );
}

#[test]
fn truncated_literal_is_emitted_at_end() {
    let t = tables(RuleSet::new().add_literal("\"", ""));
    let mut tok = Tokenizer::new(Arc::clone(&t));
    tok.bind(StrSource::new("\"abc")).unwrap();
    let first = tok.next_token().unwrap().unwrap();
    assert_eq!((first.kind, first.text.as_str()), (TokenKind::Literal, "\"abc"));
    // The end marker repeats.
    assert!(tok.next_token().unwrap().is_none());
    assert!(tok.next_token().unwrap().is_none());
}

#[test]
fn literals_close_only_on_their_own_border() {
    let t = tables(RuleSet::new().add_literal("\"", "\\").add_literal("'", ""));
    assert_eq!(
        pairs(&t.tokenize(r#""it's"'say "hi"'"#, true)),
        [(TokenKind::Literal, r#""it's""#), (TokenKind::Literal, r#"'say "hi"'"#)]
    );
}

#[test]
fn separators_coalesce_and_skip() {
    let t = tables(RuleSet::new().add_separators(" \t\n"));
    let toks = t.tokenize("x   y", true);
    assert_eq!(pairs(&toks), [(TokenKind::Word, "x"), (TokenKind::Word, "y")]);
    assert_eq!(toks[1].column(), 5);

    let toks = t.tokenize("x \t y", false);
    assert_eq!(
        pairs(&toks),
        [
            (TokenKind::Word, "x"),
            (TokenKind::Separator, " \t "),
            (TokenKind::Word, "y")
        ]
    );
}

#[test]
fn case_folding_shares_the_lexeme_state() {
    let t = tables(RuleSet::new().add_keywords(["Begin"]).set_ignore_case(true));
    let id = t.lexeme_state("begin").expect("folded lexeme");
    for src in ["begin", "BEGIN", "BeGiN"] {
        let toks = t.tokenize(src, true);
        assert_eq!(toks.len(), 1, "{src}");
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(toks[0].state, id);
        // Text is reported as written.
        assert_eq!(toks[0].text, src);
    }
    assert_eq!(t.lexeme_of(id), Some("begin"));
}

#[test]
fn case_is_significant_without_folding() {
    let t = tables(RuleSet::new().add_keywords(["begin"]));
    assert_eq!(pairs(&t.tokenize("BEGIN", true)), [(TokenKind::Word, "BEGIN")]);
}

#[test]
fn comments_close_on_overlapping_sequences() {
    let t = tables(c_like());
    assert_eq!(
        pairs(&t.tokenize("/* a **/x", true)),
        [(TokenKind::Comment, "/* a **/"), (TokenKind::Word, "x")]
    );
}

#[test]
fn line_comment_includes_its_newline() {
    let t = tables(c_like());
    let toks = t.tokenize("a // note\nb", true);
    assert_eq!(
        pairs(&toks),
        [
            (TokenKind::Word, "a"),
            (TokenKind::Comment, "// note\n"),
            (TokenKind::Word, "b")
        ]
    );
    assert_eq!((toks[2].line(), toks[2].column()), (2, 1));
}

#[test]
fn comment_without_close_runs_to_end() {
    let t = tables(RuleSet::new().add_comment("#!", "").add_separators(" "));
    assert_eq!(
        pairs(&t.tokenize("x #! rest of\nfile", true)),
        [(TokenKind::Word, "x"), (TokenKind::Comment, "#! rest of\nfile")]
    );
}

#[test]
fn lone_slash_is_word_text() {
    let t = tables(c_like());
    assert_eq!(pairs(&t.tokenize("a/b", true)), [(TokenKind::Word, "a/b")]);
}

#[test]
fn positions_track_lines_and_columns() {
    let t = tables(c_like());
    let toks = t.tokenize("if (a <= b)\n  x = \"s\"\nelse", true);
    let got: Vec<(&str, usize, usize)> = toks
        .iter()
        .map(|t| (t.text.as_str(), t.line(), t.column()))
        .collect();
    assert_eq!(
        got,
        [
            ("if", 1, 1),
            ("(", 1, 4),
            ("a", 1, 5),
            ("<=", 1, 7),
            ("b", 1, 10),
            (")", 1, 11),
            ("x", 2, 3),
            ("=", 2, 5),
            ("\"s\"", 2, 7),
            ("else", 3, 1),
        ]
    );
}

#[test]
fn exact_tokens_report_their_lexeme_state() {
    let t = tables(c_like());
    let toks = t.tokenize("x == y", true);
    assert_eq!(toks[0].state, WORD);
    assert_eq!(Some(toks[1].state), t.lexeme_state("=="));
    assert_eq!(toks[2].state, WORD);
}

#[test]
fn lossless_without_skipping() {
    let t = tables(c_like());
    let src = "if(a<=b)/*c*/ else \"x\\\"y\"\n// tail\n\"open";
    let joined: String = t.tokenize(src, false).into_iter().map(|t| t.text).collect();
    assert_eq!(joined, src);
}

#[test]
fn empty_input_yields_nothing() {
    let t = tables(c_like());
    assert!(t.tokenize("", true).is_empty());
    assert!(t.tokenize("   \n", true).is_empty());
    assert_eq!(t.tokenize("   \n", false).len(), 1);
}

#[test]
fn current_accessors_follow_next() {
    let t = tables(c_like());
    let mut tok = Tokenizer::new(Arc::clone(&t));
    tok.bind(StrSource::new("if x")).unwrap();
    assert_eq!(tok.current_kind(), TokenKind::Empty);

    tok.next_token().unwrap();
    assert_eq!(tok.current_text(), Some("if"));
    assert_eq!(tok.current_kind(), TokenKind::Keyword);
    assert_eq!(tok.current_state_id(), t.lexeme_state("if"));

    tok.next_token().unwrap();
    assert_eq!(tok.current_text(), Some("x"));
    assert_eq!((tok.current_line(), tok.current_column()), (Some(1), Some(4)));

    assert!(tok.next_token().unwrap().is_none());
    assert_eq!(tok.current_kind(), TokenKind::Empty);
}

#[test]
fn rebinding_resets_the_cursor() {
    let mut tok: Tokenizer<StrSource> = c_like().new_tokenizer();
    tok.bind(StrSource::new("a\nb")).unwrap();
    tok.next_token().unwrap();
    tok.bind(StrSource::new("c")).unwrap();
    let t = tok.next_token().unwrap().unwrap();
    assert_eq!((t.text.as_str(), t.line(), t.column()), ("c", 1, 1));

    assert!(tok.unbind().unwrap().is_some());
    assert!(!tok.is_bound());
    assert!(tok.next_token().unwrap().is_none());
}

#[test]
fn skip_setting_can_change_between_tokens() {
    let mut tok: Tokenizer<StrSource> = c_like().set_skip_separators(false).new_tokenizer();
    tok.bind(StrSource::new("a b c")).unwrap();
    assert_eq!(tok.next_token().unwrap().unwrap().text, "a");
    assert_eq!(tok.next_token().unwrap().unwrap().kind, TokenKind::Separator);
    tok.set_skip_separators(true);
    assert_eq!(tok.next_token().unwrap().unwrap().text, "b");
    assert_eq!(tok.next_token().unwrap().unwrap().text, "c");
}

#[test]
fn reader_source_scans_multibyte_text() {
    let t = tables(c_like());
    let mut tok = Tokenizer::new(Arc::clone(&t));
    tok.bind(ReaderSource::new("ü <= \"é\"".as_bytes())).unwrap();
    let got: Vec<(TokenKind, String)> = tok
        .map(|r| r.map(|t| (t.kind, t.text)))
        .collect::<io::Result<_>>()
        .unwrap();
    assert_eq!(
        got,
        [
            (TokenKind::Word, "ü".to_owned()),
            (TokenKind::Operator, "<=".to_owned()),
            (TokenKind::Literal, "\"é\"".to_owned()),
        ]
    );
}

#[test]
fn invalid_utf8_fails_the_scan() {
    let t = tables(c_like());
    let mut tok = Tokenizer::new(Arc::clone(&t));
    tok.bind(ReaderSource::new(&b"ab\xFFcd"[..])).unwrap();
    let err = tok.next_token().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

struct Failing {
    left: usize,
}

impl CharSource for Failing {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        if self.left == 0 {
            return Err(io::Error::other("disk gone"));
        }
        self.left -= 1;
        Ok(Some('x'))
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn source_errors_propagate_unchanged() {
    let t = tables(c_like());
    let mut tok = Tokenizer::new(Arc::clone(&t));
    tok.bind(Failing { left: 3 }).unwrap();
    let err = tok.next_token().unwrap_err();
    assert_eq!(err.to_string(), "disk gone");

    let mut tok = Tokenizer::new(t);
    assert!(tok.bind(Failing { left: 0 }).is_err());
}

#[test]
fn nul_and_max_bmp_are_ordinary_characters() {
    let t = tables(c_like());
    let src = "a\0b\u{FFFF}c";
    assert_eq!(pairs(&t.tokenize(src, true)), [(TokenKind::Word, src)]);
}

#[test]
fn malformed_rules_change_nothing() {
    let empty = RuleSet::new().build();
    assert_eq!(RuleSet::new().add_literal("", "\\").build(), empty);
    assert_eq!(RuleSet::new().add_comment("", "*/").build(), empty);
    assert_eq!(RuleSet::new().add_keywords([""]).build(), empty);
    assert_eq!(RuleSet::new().add_operators([""]).build(), empty);
    assert!(RuleSet::new().add_literal("", "\\").add_keywords([""]).is_empty());
}

#[test]
fn last_registration_wins() {
    let t = tables(RuleSet::new().add_keywords(["x"]).add_operators(["x"]));
    let toks = t.tokenize("x", true);
    assert_eq!(pairs(&toks), [(TokenKind::Operator, "x")]);
    assert_eq!(Some(toks[0].state), t.lexeme_state("x"));

    let t = tables(RuleSet::new().add_operators(["x"]).add_keywords(["x"]));
    assert_eq!(pairs(&t.tokenize("x", true)), [(TokenKind::Keyword, "x")]);
}

#[test]
fn declared_separator_beats_case_folding() {
    let t = tables(
        RuleSet::new()
            .add_keywords(["x"])
            .add_separators("X ")
            .set_ignore_case(true),
    );
    assert_eq!(
        pairs(&t.tokenize("x X x", false)),
        [
            (TokenKind::Keyword, "x"),
            (TokenKind::Separator, " X "),
            (TokenKind::Keyword, "x")
        ]
    );
}

#[test]
fn one_tokenizer_serves_mixed_sources() {
    let mut tok: Tokenizer<Box<dyn CharSource>> =
        Tokenizer::new(tables(c_like())).with_skip_separators(true);
    let sources: Vec<Box<dyn CharSource>> = vec![
        Box::new(StrSource::new("if a")),
        Box::new(ReaderSource::new("b <= c".as_bytes())),
    ];
    let mut texts = Vec::new();
    for source in sources {
        tok.bind(source).unwrap();
        while let Some(t) = tok.next_token().unwrap() {
            texts.push(t.text);
        }
    }
    assert_eq!(texts, ["if", "a", "b", "<=", "c"]);
}
