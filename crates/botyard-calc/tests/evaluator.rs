use botyard_calc::{Construct, EvalError, EvalErrorKind, MAX_INPUT_CHARS, MAX_NESTING, evaluate};

fn kind(input: &str) -> EvalErrorKind {
    evaluate(input)
        .expect_err(&format!("{input} should be rejected"))
        .kind()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

// =============================================================================
// Arithmetic
// =============================================================================

#[test]
fn test_basic_arithmetic() {
    assert_eq!(evaluate("2 + 2").unwrap(), 4.0);
    assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
    assert_eq!(evaluate("2 * 3 + 4").unwrap(), 10.0);
    assert_eq!(evaluate("2 * (3 + 4)").unwrap(), 14.0);
    assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
    assert_eq!(evaluate("100 / 10 / 5").unwrap(), 2.0);
}

#[test]
fn test_power_precedence_and_associativity() {
    assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
    assert_eq!(evaluate("2 ** 10").unwrap(), 1024.0);
    assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
    assert_eq!(evaluate("(-2) ^ 2").unwrap(), 4.0);
    assert_eq!(evaluate("2 ^ -1").unwrap(), 0.5);
    assert_eq!(evaluate("3 * 2 ^ 2").unwrap(), 12.0);
}

#[test]
fn test_unary_signs() {
    assert_eq!(evaluate("--3").unwrap(), 3.0);
    assert_eq!(evaluate("+4 - -1").unwrap(), 5.0);
}

#[test]
fn test_ieee_division_and_remainder() {
    assert_eq!(evaluate("1 / 0").unwrap(), f64::INFINITY);
    assert!(evaluate("0 / 0").unwrap().is_nan());
    assert_eq!(evaluate("7 % 3").unwrap(), 1.0);
    assert_eq!(evaluate("-7 % 3").unwrap(), 2.0);
    assert_eq!(evaluate("7 % -3").unwrap(), -2.0);
    assert_eq!(evaluate("-6 % 3").unwrap(), 0.0);
    assert_eq!(evaluate("7.5 % 2").unwrap(), 1.5);
    assert_eq!(evaluate("fmod(-7, 3)").unwrap(), -1.0);
}

#[test]
fn test_literal_forms() {
    assert_eq!(evaluate("1_000 + .5").unwrap(), 1000.5);
    assert_eq!(evaluate("1e3").unwrap(), 1000.0);
    assert_eq!(evaluate("2.5e-1").unwrap(), 0.25);
}

#[test]
fn test_functions_and_constants() {
    assert_eq!(evaluate("sqrt(16)").unwrap(), 4.0);
    assert!(close(evaluate("sin(pi / 2)").unwrap(), 1.0));
    assert!(close(evaluate("log(e)").unwrap(), 1.0));
    assert!(close(evaluate("log(8, 2)").unwrap(), 3.0));
    assert!(close(evaluate("log10(1000)").unwrap(), 3.0));
    assert_eq!(evaluate("abs(-3) + fabs(-2)").unwrap(), 5.0);
    assert_eq!(evaluate("max(1, 5, 3) - min(4, 2)").unwrap(), 3.0);
    assert_eq!(evaluate("pow(2, 8)").unwrap(), 256.0);
    assert_eq!(evaluate("hypot(3, 4)").unwrap(), 5.0);
    assert_eq!(evaluate("floor(2.7) + ceil(2.1)").unwrap(), 5.0);
    assert!(close(evaluate("degrees(pi)").unwrap(), 180.0));
    assert_eq!(evaluate("factorial(6)").unwrap(), 720.0);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_disallowed_functions() {
    assert_eq!(kind(r#"open("/etc/passwd")"#), EvalErrorKind::DisallowedFunction);
    assert_eq!(kind("exec('print(1)')"), EvalErrorKind::DisallowedFunction);
    assert_eq!(kind(r#"__import__("os")"#), EvalErrorKind::DisallowedFunction);
    assert_eq!(kind("eval(1)"), EvalErrorKind::DisallowedFunction);

    let err = evaluate(r#"__import__("os")"#).unwrap_err();
    assert_eq!(err.to_string(), "Function __import__ not allowed");
}

#[test]
fn test_disallowed_names() {
    assert_eq!(kind("x + 1"), EvalErrorKind::DisallowedName);
    assert_eq!(kind("True"), EvalErrorKind::DisallowedName);
    assert_eq!(
        evaluate("sqrt(y)").unwrap_err(),
        EvalError::DisallowedName { name: "y".into() }
    );
}

#[test]
fn test_unsupported_constructs() {
    let cases = [
        ("x = 1", Construct::Assignment),
        ("x += 1", Construct::Assignment),
        ("(y := 2)", Construct::Assignment),
        ("a.b", Construct::AttributeAccess),
        ("a[0]", Construct::Subscript),
        ("lambda: 1", Construct::Lambda),
        ("lambda x, y: x + y", Construct::Lambda),
        ("[x for x in y]", Construct::Comprehension),
        ("max(x for x in y)", Construct::Comprehension),
        ("'abc'", Construct::StringLiteral),
        ("1 < 2", Construct::Comparison),
        ("1 not in y", Construct::Comparison),
        ("1 and 2", Construct::BooleanOperation),
        ("not 1", Construct::BooleanOperation),
        ("1 if 2 else 3", Construct::Conditional),
        ("[1, 2]", Construct::Collection),
        ("(1, 2)", Construct::Collection),
        ("{1: 2}", Construct::Collection),
        ("7 // 2", Construct::FloorDivision),
        ("1 << 2", Construct::BitwiseOperation),
        ("~1", Construct::BitwiseOperation),
        ("round(x=1)", Construct::KeywordArgument),
        ("max(*y)", Construct::StarredArgument),
        ("(1)(4)", Construct::IndirectCall),
    ];

    for (input, construct) in cases {
        assert_eq!(
            evaluate(input).unwrap_err(),
            EvalError::UnsupportedExpression { construct },
            "input: {input}"
        );
    }
}

#[test]
fn test_method_call_is_attribute_access() {
    assert_eq!(
        evaluate("os.system('ls')").unwrap_err(),
        EvalError::UnsupportedExpression {
            construct: Construct::AttributeAccess
        }
    );
}

#[test]
fn test_parse_failures() {
    for input in ["", "   ", "(1 + 2", "1 + 2)", "1 +", "2 3", "1 $ 2", "'open", "1; 2", "for"] {
        assert_eq!(kind(input), EvalErrorKind::ParseFailure, "input: {input:?}");
    }
}

#[test]
fn test_parse_failure_reports_position() {
    match evaluate("1 + * 2").unwrap_err() {
        EvalError::ParseFailure { position, .. } => assert_eq!(position, 4),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_invalid_arguments() {
    assert_eq!(kind("sqrt()"), EvalErrorKind::InvalidArguments);
    assert_eq!(kind("gcd(1.5, 3)"), EvalErrorKind::InvalidArguments);
    assert_eq!(kind("acos(2)"), EvalErrorKind::InvalidArguments);
}

// =============================================================================
// Resource limits
// =============================================================================

fn parse_reason(input: &str) -> String {
    match evaluate(input) {
        Err(EvalError::ParseFailure { reason, .. }) => reason,
        other => panic!("expected a parse failure, got {other:?}"),
    }
}

#[test]
fn test_deep_nesting_is_refused() {
    let depth = MAX_NESTING + 1;
    let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(parse_reason(&input), "expression nested too deeply");

    let input = format!("{}1", "-".repeat(MAX_NESTING + 1));
    assert_eq!(parse_reason(&input), "expression nested too deeply");

    let input = format!("{}1{}", "sqrt(".repeat(depth), ")".repeat(depth));
    assert_eq!(parse_reason(&input), "expression nested too deeply");
}

#[test]
fn test_nesting_within_limit_evaluates() {
    let depth = MAX_NESTING / 2;
    let input = format!("{}7{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(evaluate(&input).unwrap(), 7.0);
    assert_eq!(evaluate(&format!("{}2", "-".repeat(40))).unwrap(), 2.0);
}

#[test]
fn test_huge_inputs_do_not_overflow_the_stack() {
    // Run on a thread sized like a tokio worker.
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
            let signs = format!("{}1", "-".repeat(100_000));
            let chain = vec!["1"; 50_000].join("+");
            [parens, signs, chain]
                .iter()
                .map(|input| evaluate(input).unwrap_err().kind())
                .collect::<Vec<_>>()
        })
        .unwrap();

    let kinds = handle.join().unwrap();
    assert!(kinds.iter().all(|k| *k == EvalErrorKind::ParseFailure));
}

#[test]
fn test_input_length_limit() {
    let long = vec!["1"; MAX_INPUT_CHARS].join("+");
    assert_eq!(parse_reason(&long), "expression too long");

    let fits = vec!["1"; MAX_INPUT_CHARS / 2].join("+");
    assert_eq!(evaluate(&fits).unwrap(), (MAX_INPUT_CHARS / 2) as f64);
}
