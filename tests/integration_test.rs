use mathsol::{
    ast::printer::AstPrinter,
    interpreter::{Environment, ExecutionError, Globals, Interpreter, RuntimeError, Value},
    parser,
    tokenizer::{self, Token, Tokenizer},
};

fn interpret(tokens: &[Token]) -> Result<Option<Value>, ExecutionError> {
    let program = parser::program(tokens)
        .into_result()
        .expect("Parse should work on valid program");
    let mut interpreter = Interpreter::new(Globals::new());
    interpreter.interpret(&program)
}

fn test_valid_program(source: &str, expected: Value) {
    let tokens = tokenizer::tokens(source);
    let value = interpret(&tokens).expect("Interpret should work on valid program");
    assert_eq!(value, Some(expected), "source: {:?}", source);
}

#[test]
fn test_precedence() {
    test_valid_program("1 + 2 * 3", Value::Number(7.0));
}

#[test]
fn test_grouping() {
    test_valid_program("(1+2)*3", Value::Number(9.0));
    test_valid_program("1*3+2*3", Value::Number(9.0));
}

#[test]
fn test_variables_across_statements() {
    let source = r#"
    # compound interest, one period
    base = 100
    rate = 0.5;
    base + base * rate
    "#;
    test_valid_program(source, Value::Number(150.0));
}

#[test]
fn test_chained_assignment() {
    test_valid_program("a = b = 3\na * b", Value::Number(9.0));
}

#[test]
fn test_string_concatenation() {
    test_valid_program(
        r#"greeting = 'hello, ' + "world"; greeting"#,
        Value::String("hello, world".to_string()),
    );
}

#[test]
fn test_boolean_logic() {
    test_valid_program("1 + 1 == 2 and not (3 < 2)", Value::Boolean(true));
    test_valid_program("false || 2 >= 3", Value::Boolean(false));
    test_valid_program("!true != false", Value::Boolean(false));
}

#[test]
fn test_infinity_keyword() {
    test_valid_program("-inf < -1000000", Value::Boolean(true));
    test_valid_program("inf == 1 / 0", Value::Boolean(true));
}

#[test]
fn test_crlf_source() {
    test_valid_program("x = 2\r\nx * 21\r\n", Value::Number(42.0));
}

#[test]
fn test_type_error_aborts_statement() {
    let tokens = tokenizer::tokens("a = 1\n-'x'\na = 2");
    let program = parser::program(&tokens).into_result().unwrap();
    let mut interpreter = Interpreter::new(Globals::new());
    let error = interpreter.interpret(&program).unwrap_err();
    assert_eq!(
        error.kind(),
        &RuntimeError::InvalidNegate(Value::String("x".to_string()))
    );
    assert!(error.to_string().contains("(- \"x\");"));
    assert_eq!(interpreter.environment().get("a"), Ok(Value::Number(1.0)));
}

#[test]
fn test_undeclared_variable() {
    let error = interpret(&tokenizer::tokens("missing + 1")).unwrap_err();
    assert_eq!(
        error.kind(),
        &RuntimeError::UndeclaredVariable("missing".to_string())
    );
}

#[test]
fn test_interpreter_state_survives_between_programs() {
    let mut interpreter = Interpreter::new(Globals::new());
    for (line, expected) in [("x = 5", 5.0), ("x = x * 2", 10.0), ("x - 1", 9.0)] {
        let program = parser::program(&tokenizer::tokens(line))
            .into_result()
            .unwrap();
        assert_eq!(
            interpreter.interpret(&program).unwrap(),
            Some(Value::Number(expected))
        );
    }
}

#[test]
fn test_char_by_char_pipeline() {
    let source = "total = 12.25 * 4\ntotal >= 49 && total <= 49.0\n";
    let mut tokenizer = Tokenizer::new();
    let mut tokens = Vec::new();
    for (i, c) in source.char_indices() {
        tokens.extend(tokenizer.tokenize(&source[i..i + c.len_utf8()]));
    }
    tokens.extend(tokenizer.eof());

    assert_eq!(interpret(&tokens).unwrap(), Some(Value::Boolean(true)));
}

#[test]
fn test_line_by_line_like_a_repl() {
    let mut tokenizer = Tokenizer::new();
    let mut interpreter = Interpreter::new(Globals::new());
    let mut last = None;
    for line in ["width = 3\n", "height = 4 # rectangle\n", "width * height\n"] {
        let tokens = tokenizer.tokenize(line);
        assert_eq!(tokenizer.pending(), "");
        let program = parser::program(&tokens).into_result().unwrap();
        last = interpreter.interpret(&program).unwrap();
    }
    assert_eq!(last, Some(Value::Number(12.0)));

    let tokens = tokenizer.eof();
    assert_eq!(tokens.len(), 1);
    assert!(parser::program(&tokens).program.0.is_empty());
}

#[test]
fn test_syntax_error_keeps_earlier_statements() {
    let tokens = tokenizer::tokens("1 + 1\n(2 * 3\n4");
    let parsed = parser::program(&tokens);
    assert_eq!(parsed.program.0.len(), 1);
    assert!(parsed.error.is_some());

    let printed = AstPrinter::new().print_parsed(&parsed);
    assert!(printed.starts_with("[ExpressionStatement\n  [Binary: +"));
    assert!(printed.ends_with("[<unparsed: Expected \")\"]\n"));
}

#[test]
fn test_deeply_nested_source_is_a_parse_error() {
    let source = "x = 1\n".to_string() + &"(".repeat(20_000) + "x" + &")".repeat(20_000);
    let parsed = parser::program(&tokenizer::tokens(&source));
    assert_eq!(parsed.program.0.len(), 1);
    assert_eq!(
        parsed.error.as_ref().map(|e| e.kind.clone()),
        Some(parser::ParseErrorKind::TooDeep)
    );

    let printed = AstPrinter::new().print_parsed(&parsed);
    assert!(printed.ends_with("[<unparsed: Expression nested too deeply]\n"));

    let mut interpreter = Interpreter::new(Globals::new());
    assert_eq!(
        interpreter.interpret(&parsed.program).unwrap(),
        Some(Value::Number(1.0))
    );
}
