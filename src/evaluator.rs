use crate::Error;
use crate::ast::{Closure, Procedure, Value};
use crate::builtinops::{Arity, MATH_CONSTANTS, get_builtin_ops};
use std::rc::Rc;

mod environment;

pub use environment::Environment;

/// Evaluate an S-expression in `env`
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, Error> {
    match expr {
        // Variable lookup
        Value::Symbol(name) => env.get(name),

        // Special forms and procedure application
        Value::List(elements) => eval_list(elements, env),

        // Everything else evaluates to itself
        Value::Integer(_)
        | Value::Float(_)
        | Value::Bool(_)
        | Value::Procedure(_)
        | Value::Unspecified => Ok(expr.clone()),
    }
}

/// Evaluate a list expression: a special form if the head names one, otherwise an
/// application. Special-form keywords are matched on the head symbol alone, so
/// rebinding `if` or `quote` does not change how those forms evaluate.
fn eval_list(elements: &[Value], env: &Environment) -> Result<Value, Error> {
    match elements {
        [] => Err(Error::EvalError("cannot evaluate empty list".to_owned())),

        [Value::Symbol(head), args @ ..] if is_special_form(head) => match head.as_str() {
            "quote" => eval_quote(args),
            "if" => eval_if(args, env),
            "define" => eval_define(args, env),
            "set!" => eval_set(args, env),
            _ => eval_lambda(args, env),
        },

        [func_expr, arg_exprs @ ..] => {
            let procedure = match eval(func_expr, env)? {
                Value::Procedure(procedure) => procedure,
                other => return Err(Error::NotCallable(other.to_string())),
            };

            // Arguments are evaluated strictly left to right
            let args = arg_exprs
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>, _>>()?;

            // Check arity here so the error can name the offending call
            procedure_arity(&procedure)
                .validate(args.len())
                .map_err(|err| match err {
                    Error::ArityError {
                        expected,
                        got,
                        expression: None,
                    } => Error::arity_error_with_expr(
                        expected,
                        got,
                        Value::List(Rc::from(elements)).to_string(),
                    ),
                    other => other,
                })?;

            apply(&procedure, args)
        }
    }
}

const SPECIAL_FORMS: [&str; 5] = ["quote", "if", "define", "set!", "lambda"];

fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name)
}

fn procedure_arity(procedure: &Procedure) -> Arity {
    match procedure {
        Procedure::Primitive(primitive) => primitive.arity,
        Procedure::Closure(closure) => Arity::Exact(closure.params.len()),
    }
}

/// Apply a procedure to already-evaluated arguments.
///
/// Primitives are checked against their declared [`Arity`] and then called directly.
/// Closures bind their parameters in a fresh frame whose parent is the environment
/// they captured, and evaluate their body there.
pub fn apply(procedure: &Procedure, args: Vec<Value>) -> Result<Value, Error> {
    match procedure {
        Procedure::Primitive(primitive) => {
            tracing::trace!(name = %primitive.id, args = args.len(), "apply primitive");
            primitive.arity.validate(args.len())?;
            (primitive.func)(&args)
        }
        Procedure::Closure(closure) => {
            tracing::trace!(params = ?closure.params, "apply closure");
            let frame = Environment::new_frame(&closure.params, args, &closure.env)?;
            eval(&closure.body, &frame)
        }
    }
}

/// Shape error for a special form given the wrong number of operands
fn wrong_operand_count(form: &'static str, expected: usize, got: usize) -> Error {
    let noun = if expected == 1 { "operand" } else { "operands" };
    Error::malformed(form, format!("expected {expected} {noun}, got {got}"))
}

/// `(quote x)`
fn eval_quote(args: &[Value]) -> Result<Value, Error> {
    match args {
        [expr] => Ok(expr.clone()),
        _ => Err(wrong_operand_count("quote", 1, args.len())),
    }
}

/// `(if test conseq alt)`
fn eval_if(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [test, conseq, alt] => {
            if eval(test, env)?.is_truthy() {
                eval(conseq, env)
            } else {
                eval(alt, env)
            }
        }
        _ => Err(wrong_operand_count("if", 3, args.len())),
    }
}

/// `(define name expr)`: binds in the innermost frame
fn eval_define(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval(expr, env)?;
            tracing::trace!(%name, %value, "define");
            env.define(name.as_str(), value);
            Ok(Value::Unspecified)
        }
        [target, _] => Err(Error::malformed(
            "define",
            format!("expected a symbol to bind, got {target}"),
        )),
        _ => Err(wrong_operand_count("define", 2, args.len())),
    }
}

/// `(set! name expr)`: rebinds wherever `name` is currently bound
fn eval_set(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval(expr, env)?;
            tracing::trace!(%name, %value, "set!");
            env.set(name, value)?;
            Ok(Value::Unspecified)
        }
        [target, _] => Err(Error::malformed(
            "set!",
            format!("expected a symbol to assign, got {target}"),
        )),
        _ => Err(wrong_operand_count("set!", 2, args.len())),
    }
}

/// `(lambda (params...) body)`
fn eval_lambda(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [Value::List(param_list), body] => {
            let mut params: Vec<String> = Vec::with_capacity(param_list.len());
            for param in param_list.iter() {
                match param {
                    Value::Symbol(name) if params.contains(name) => {
                        return Err(Error::malformed(
                            "lambda",
                            format!("duplicate parameter name: {name}"),
                        ));
                    }
                    Value::Symbol(name) => params.push(name.clone()),
                    other => {
                        return Err(Error::malformed(
                            "lambda",
                            format!("parameters must be symbols, got {other}"),
                        ));
                    }
                }
            }

            // Only fixed-arity parameter lists: no rest parameters, no multi-expression
            // bodies (use `begin`)
            tracing::trace!(?params, "lambda");
            Ok(Value::Procedure(Procedure::Closure(Rc::new(Closure {
                params,
                body: body.clone(),
                env: env.clone(),
            }))))
        }
        [params, _] => Err(Error::malformed(
            "lambda",
            format!("parameters must be a list, got {params}"),
        )),
        _ => Err(wrong_operand_count("lambda", 2, args.len())),
    }
}

/// Create a global environment with the built-in procedures, the math namespace and
/// the boolean constants `#t` and `#f`.
///
/// Every call returns an independent environment.
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for builtin_op in get_builtin_ops() {
        env.register_builtin_function(builtin_op.scheme_id, builtin_op.arity, builtin_op.func);
    }

    for &(name, value) in MATH_CONSTANTS {
        env.define(name, Value::Float(value));
    }

    env.define("#t", Value::Bool(true));
    env.define("#f", Value::Bool(false));

    tracing::debug!(
        bindings = env.get_all_bindings().len(),
        "created global environment"
    );
    env
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::Error;
    use crate::ast::{nil, sym, val};
    use crate::scheme::parse_scheme;

    /// Test result variants for comprehensive testing
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Value),           // Evaluation should succeed with this value
        SpecificError(&'static str), // Evaluation should fail with error containing this string
        Error,                       // Evaluation should fail (any error)
    }
    use TestResult::*;

    /// Test environment containing test cases that share state
    struct TestEnvironment(Vec<(&'static str, TestResult)>);

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> TestResult {
        EvalResult(val(value))
    }

    /// Macro for setup expressions that return Unspecified (like define)
    macro_rules! test_setup {
        ($expr:expr) => {
            ($expr, EvalResult(Value::Unspecified))
        };
    }

    /// Run tests in isolated environments with shared state
    fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
        for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
            let env = create_global_env();

            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
                execute_test_case(input, expected, &env, &test_id);
            }
        }
    }

    /// Execute a single test case with detailed error reporting
    fn execute_test_case(input: &str, expected: &TestResult, env: &Environment, test_id: &str) {
        let expr = match parse_scheme(input) {
            Ok(expr) => expr,
            Err(parse_err) => {
                panic!("{test_id}: unexpected parse error for '{input}': {parse_err:?}");
            }
        };

        match (eval(&expr, env), expected) {
            (Ok(actual), EvalResult(expected_val)) => {
                assert_eq!(
                    actual, *expected_val,
                    "{test_id}: '{input}' expected {expected_val:?}, got {actual:?}"
                );
            }
            (Err(_), Error) => {} // Expected generic error
            (Err(e), SpecificError(expected_text)) => {
                let error_msg = format!("{e}");
                assert!(
                    error_msg.contains(expected_text),
                    "{test_id}: '{input}' error should contain '{expected_text}', got: {error_msg}"
                );
            }
            (Ok(actual), Error) => {
                panic!("{test_id}: '{input}' expected error, got {actual:?}");
            }
            (Ok(actual), SpecificError(expected_text)) => {
                panic!(
                    "{test_id}: '{input}' expected error containing '{expected_text}', got {actual:?}"
                );
            }
            (Err(err), EvalResult(expected_val)) => {
                panic!("{test_id}: '{input}' expected {expected_val:?}, got error {err:?}");
            }
        }
    }

    /// Each case gets a fresh global environment
    fn run_comprehensive_tests(test_cases: Vec<(&str, TestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let env = create_global_env();
            let test_id = format!("#{}", i + 1);
            execute_test_case(input, expected, &env, &test_id);
        }
    }

    #[test]
    fn test_comprehensive_operations_data_driven() {
        let test_cases = vec![
            // === SELF-EVALUATING FORMS ===
            ("42", success(42)),
            ("-271", success(-271)),
            ("2.5", success(2.5)),
            ("9223372036854775807", success(i64::MAX)),
            ("#t", success(true)),
            ("#f", success(false)),
            // === SYMBOL LOOKUP ===
            ("undefined-var", SpecificError("Unbound variable: undefined-var")),
            ("pi", success(std::f64::consts::PI)),
            // === EMPTY LIST ===
            ("()", SpecificError("cannot evaluate empty list")),
            ("(car (quote ()))", SpecificError("car")),
            // === QUOTE ===
            ("(quote foo)", success(sym("foo"))),
            ("(quote 42)", success(42)),
            ("(quote ())", success(nil())),
            ("(quote (a b c))", success([sym("a"), sym("b"), sym("c")])),
            (
                "(quote (+ 1 2))",
                success([sym("+"), val(1), val(2)]),
            ),
            ("(quote (1 (2 3)))", success([val(1), val([2, 3])])),
            ("(quote)", SpecificError("MalformedForm: quote: expected 1 operand, got 0")),
            ("(quote a b)", SpecificError("MalformedForm: quote")),
            // === IF ===
            ("(if (> 3 2) 1 2)", success(1)),
            ("(if (< 3 2) 1 2)", success(2)),
            ("(if #t (quote yes) (quote no))", success(sym("yes"))),
            ("(if #f (quote yes) (quote no))", success(sym("no"))),
            // Only #f is false
            ("(if 0 1 2)", success(1)),
            ("(if (quote ()) 1 2)", success(1)),
            ("(if (quote x) 1 2)", success(1)),
            // Only the taken branch is evaluated
            ("(if #t 1 undefined-var)", success(1)),
            ("(if #f undefined-var 2)", success(2)),
            ("(if #t 1)", SpecificError("MalformedForm: if: expected 3 operands, got 2")),
            ("(if #t 1 2 3)", SpecificError("MalformedForm: if")),
            ("(if)", SpecificError("MalformedForm: if")),
            ("(if undefined-var 1 2)", SpecificError("Unbound variable")),
            // === DEFINE / SET! SHAPES ===
            ("(define x 10)", EvalResult(Value::Unspecified)),
            ("(define 5 10)", SpecificError("MalformedForm: define")),
            ("(define x)", SpecificError("MalformedForm: define")),
            ("(define x 1 2)", SpecificError("MalformedForm: define")),
            ("(define (f x) x)", SpecificError("MalformedForm: define")),
            ("(set! y 1)", SpecificError("Unbound variable: y")),
            ("(set! 5 1)", SpecificError("MalformedForm: set!")),
            ("(set! x)", SpecificError("MalformedForm: set!")),
            // === LAMBDA ===
            ("((lambda (x) (* x x)) 5)", success(25)),
            ("((lambda (x y) (+ x y)) 3 4)", success(7)),
            ("((lambda () 42))", success(42)),
            ("((lambda (x) x) (quote (1 2)))", success([1, 2])),
            (
                "(((lambda (x) (lambda (y) (+ x y))) 10) 5)",
                success(15),
            ),
            ("((lambda (f) (f 7)) (lambda (n) (* n n)))", success(49)),
            ("(lambda x x)", SpecificError("MalformedForm: lambda: parameters must be a list")),
            ("(lambda (x 1) x)", SpecificError("parameters must be symbols")),
            ("(lambda (x x) x)", SpecificError("duplicate parameter name: x")),
            ("(lambda (x))", SpecificError("MalformedForm: lambda")),
            ("(lambda (x) x x)", SpecificError("MalformedForm: lambda")),
            // Closure arity is exact
            (
                "((lambda (x y) x) 1)",
                SpecificError("ArityError: expression ((lambda (x y) x) 1): expected 2 arguments, got 1"),
            ),
            ("((lambda (x) x) 1 2)", SpecificError("ArityError")),
            // === APPLICATION ===
            ("(+ 1 2)", success(3)),
            ("(+ (* 2 3) (- 10 4))", success(12)),
            ("(5 1 2)", SpecificError("Not callable: 5")),
            ("((quote (1 2)) 3)", SpecificError("Not callable: (1 2)")),
            ("(#t)", SpecificError("Not callable: #t")),
            ("(undefined-fn 1)", SpecificError("Unbound variable: undefined-fn")),
            // Head is evaluated, so any expression yielding a procedure works
            ("((if #t + *) 3 4)", success(7)),
            ("((car (list car cdr)) (quote (1 2)))", success(1)),
            // Primitive arity is checked before the call
            ("(car)", SpecificError("ArityError: expression (car)")),
            ("(cons 1)", SpecificError("ArityError")),
            // Argument errors propagate before application
            ("(+ 1 undefined-var)", SpecificError("Unbound variable")),
            ("(5 undefined-var)", SpecificError("Not callable")),
            // === ERROR PROPAGATION FROM PRIMITIVES ===
            ("(+ 1 (quote a))", SpecificError("Type error")),
            ("(/ 1 0)", SpecificError("EvaluationError")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_special_forms_ignore_bindings() {
        let environment_test_cases = vec![
            TestEnvironment(vec![
                test_setup!("(define if 5)"),
                test_setup!("(define quote +)"),
                ("(if #f 1 2)", success(2)),
                ("(quote (1 2))", success([1, 2])),
                // As a plain symbol the rebound value is visible
                ("if", success(5)),
            ]),
            TestEnvironment(vec![
                // Parameters named like keywords shadow nothing at the head position
                test_setup!("(define f (lambda (quote) (quote quote)))"),
                ("(f 1)", success(sym("quote"))),
            ]),
        ];

        run_tests_in_environment(environment_test_cases);
    }

    #[test]
    fn test_environment_sensitive_operations() {
        let environment_test_cases = vec![
            // === DEFINE AND LOOKUP ===
            TestEnvironment(vec![
                test_setup!("(define x 5)"),
                ("x", success(5)),
                ("(+ x 1)", success(6)),
                // Redefinition replaces the binding
                test_setup!("(define x 6)"),
                ("x", success(6)),
                test_setup!("(define y (* x 2))"),
                ("y", success(12)),
            ]),
            // === SET! ===
            TestEnvironment(vec![
                test_setup!("(define counter 0)"),
                test_setup!("(set! counter (+ counter 1))"),
                ("counter", success(1)),
                ("(set! undefined-name 1)", SpecificError("Unbound variable: undefined-name")),
                // A failed set! does not create the binding
                ("undefined-name", SpecificError("Unbound variable")),
            ]),
            // === SHADOWING ===
            TestEnvironment(vec![
                test_setup!("(define x 1)"),
                test_setup!("(define f (lambda (x) (* x 10)))"),
                ("(f 5)", success(50)),
                // Parameter binding is confined to the call frame
                ("x", success(1)),
                // Define inside a body binds in the call frame only
                test_setup!("(define g (lambda (n) (begin (define x n) x)))"),
                ("(g 7)", success(7)),
                ("x", success(1)),
            ]),
            // === LEXICAL SCOPE ===
            TestEnvironment(vec![
                test_setup!("(define x 100)"),
                test_setup!("(define get-x (lambda () x))"),
                test_setup!("(define call-with-x (lambda (x) (get-x)))"),
                // Free variables resolve where the closure was created, not the caller
                ("(call-with-x 1)", success(100)),
                test_setup!("(define make-adder (lambda (n) (lambda (m) (+ n m))))"),
                test_setup!("(define add5 (make-adder 5))"),
                test_setup!("(define add10 (make-adder 10))"),
                ("(add5 1)", success(6)),
                ("(add10 1)", success(11)),
                ("(add5 (add10 0))", success(15)),
            ]),
            // === CLOSURES OVER MUTABLE STATE ===
            TestEnvironment(vec![
                test_setup!(
                    "(define make-counter (lambda () ((lambda (count) (lambda () (begin (set! count (+ count 1)) count))) 0)))"
                ),
                test_setup!("(define c1 (make-counter))"),
                test_setup!("(define c2 (make-counter))"),
                ("(c1)", success(1)),
                ("(c1)", success(2)),
                ("(c2)", success(1)),
                ("(c1)", success(3)),
            ]),
            // === SET! THROUGH A CLOSURE REACHES THE GLOBAL FRAME ===
            TestEnvironment(vec![
                test_setup!("(define total 0)"),
                test_setup!("(define add! (lambda (n) (set! total (+ total n))))"),
                ("(add! 5)", EvalResult(Value::Unspecified)),
                ("(add! 7)", EvalResult(Value::Unspecified)),
                ("total", success(12)),
            ]),
            // === HIGHER-ORDER FUNCTIONS ===
            TestEnvironment(vec![
                test_setup!("(define compose (lambda (f g) (lambda (x) (f (g x)))))"),
                test_setup!("(define square (lambda (x) (* x x)))"),
                test_setup!("(define inc (lambda (x) (+ x 1)))"),
                ("((compose square inc) 4)", success(25)),
                ("((compose inc square) 4)", success(17)),
                ("(map square (list 1 2 3))", success([1, 4, 9])),
                ("(map (lambda (x y) (+ x y)) (list 1 2) (list 10 20 30))", success([11, 22])),
            ]),
            // === PROCEDURES AS VALUES ===
            TestEnvironment(vec![
                test_setup!("(define f +)"),
                ("(f 2 3)", success(5)),
                ("(procedure? f)", success(true)),
                ("(eq? f +)", success(true)),
                test_setup!("(define g (lambda (x) x))"),
                test_setup!("(define h g)"),
                ("(eq? g h)", success(true)),
                ("(eq? g (lambda (x) x))", success(false)),
            ]),
            // === REBINDING BUILTINS IS ALLOWED ===
            TestEnvironment(vec![
                test_setup!("(define car cdr)"),
                ("(car (quote (1 2 3)))", success([2, 3])),
            ]),
        ];

        run_tests_in_environment(environment_test_cases);
    }

    #[test]
    fn test_recursive_functions() {
        let recursive_test_cases = vec![
            // `define` binds in the global frame, and the closure captured that frame,
            // so the body sees its own name once the define completes
            TestEnvironment(vec![
                test_setup!("(define fact (lambda (n) (if (<= n 1) 1 (* n (fact (- n 1))))))"),
                ("(fact 5)", success(120)),
                ("(fact 20)", success(2_432_902_008_176_640_000_i64)),
                ("(fact 21)", SpecificError("overflow")),
            ]),
            TestEnvironment(vec![
                test_setup!("(define is-even (lambda (n) (if (= n 0) #t (is-odd (- n 1)))))"),
                test_setup!("(define is-odd (lambda (n) (if (= n 0) #f (is-even (- n 1)))))"),
                ("(is-even 10)", success(true)),
                ("(is-odd 7)", success(true)),
                ("(is-even 7)", success(false)),
            ]),
            TestEnvironment(vec![
                test_setup!(
                    "(define fib (lambda (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))))"
                ),
                ("(fib 10)", success(55)),
                ("(map fib (list 0 1 2 3 4 5 6))", success([0, 1, 1, 2, 3, 5, 8])),
            ]),
            TestEnvironment(vec![
                test_setup!(
                    "(define countdown (lambda (n) (if (<= n 0) (list) (cons n (countdown (- n 1))))))"
                ),
                ("(countdown 3)", success([3, 2, 1])),
                ("(countdown 0)", success(nil())),
            ]),
            TestEnvironment(vec![
                test_setup!(
                    "(define range (lambda (a b) (if (= a b) (quote ()) (cons a (range (+ a 1) b)))))"
                ),
                test_setup!(
                    "(define sum (lambda (xs) (if (null? xs) 0 (+ (car xs) (sum (cdr xs))))))"
                ),
                ("(range 0 5)", success([0, 1, 2, 3, 4])),
                ("(sum (range 0 101))", success(5050)),
                ("(length (range 0 100))", success(100)),
            ]),
            TestEnvironment(vec![
                // Self-application works without relying on global bindings
                test_setup!("(define make-recursive (lambda (f) (lambda (x) ((f f) x))))"),
                test_setup!(
                    "(define fib-maker (lambda (self) (lambda (n) (if (< n 2) n (+ ((self self) (- n 1)) ((self self) (- n 2)))))))"
                ),
                test_setup!("(define fib2 (make-recursive fib-maker))"),
                ("(fib2 6)", success(8)),
            ]),
        ];

        run_tests_in_environment(recursive_test_cases);
    }

    #[test]
    fn test_errors_leave_prior_effects() {
        let env = create_global_env();
        eval(&parse_scheme("(define x 1)").unwrap(), &env).unwrap();

        // The set! runs before the failing car; it is not rolled back
        let result = eval(
            &parse_scheme("(begin (set! x 2) (car (quote ())))").unwrap(),
            &env,
        );
        assert!(matches!(result, Err(Error::EvalError(_))));
        assert_eq!(eval(&sym("x"), &env).unwrap(), val(2));
    }

    #[test]
    fn test_apply_directly() {
        let env = create_global_env();
        let Value::Procedure(plus) = env.get("+").unwrap() else {
            panic!("+ should be a procedure");
        };
        assert_eq!(apply(&plus, vec![val(1), val(2.5)]).unwrap(), val(3.5));

        let Value::Procedure(square) =
            eval(&parse_scheme("(lambda (x) (* x x))").unwrap(), &env).unwrap()
        else {
            panic!("lambda should yield a procedure");
        };
        assert_eq!(apply(&square, vec![val(9)]).unwrap(), val(81));
        assert_eq!(
            apply(&square, vec![]).unwrap_err(),
            Error::arity_error(1, 0)
        );

        let Value::Procedure(car) = env.get("car").unwrap() else {
            panic!("car should be a procedure");
        };
        assert!(matches!(
            apply(&car, vec![val(1), val(2)]),
            Err(Error::ArityError { expected: 1, got: 2, .. })
        ));
    }

    #[test]
    fn test_closure_captures_defining_environment() {
        let env = create_global_env();
        let closure = eval(&parse_scheme("(lambda (x) x)").unwrap(), &env).unwrap();
        match closure {
            Value::Procedure(Procedure::Closure(c)) => {
                assert!(c.env.ptr_eq(&env));
                assert_eq!(c.params, vec!["x".to_owned()]);
                assert_eq!(c.body, sym("x"));
            }
            other => panic!("expected closure, got {other:?}"),
        }
    }

    #[test]
    fn test_global_envs_are_independent() {
        let a = create_global_env();
        let b = create_global_env();
        eval(&parse_scheme("(define x 1)").unwrap(), &a).unwrap();

        assert_eq!(eval(&sym("x"), &a).unwrap(), val(1));
        assert_eq!(
            eval(&sym("x"), &b).unwrap_err(),
            Error::UnboundVariable("x".into())
        );
    }

    #[test]
    fn test_global_env_contents() {
        let env = create_global_env();
        for name in [
            "+", "-", "*", "/", "car", "cdr", "cons", "map", "begin", "sqrt", "floor", "gcd",
        ] {
            match env.get(name) {
                Ok(Value::Procedure(Procedure::Primitive(p))) => assert_eq!(p.id, name),
                other => panic!("{name}: expected primitive, got {other:?}"),
            }
        }
        assert_eq!(env.get("#t").unwrap(), val(true));
        assert_eq!(env.get("e").unwrap(), val(std::f64::consts::E));
        assert_eq!(env.depth(), 1);
    }
}
