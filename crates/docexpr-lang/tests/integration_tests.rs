use docexpr_lang::{
    Backend, Collation, Document, DocumentScope, Engine, Error, EvalContext, EvalError, ExprType, InnerError,
    ParseError, ParseOptions, Value,
};
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn sample() -> Value {
    json!({"a": {"b": [10, 20, 30]}, "name": "Ann", "tags": ["x", "y"], "n": null}).into()
}

fn engine(backend: Backend) -> Engine {
    let mut engine = Engine::default();
    engine.set_backend(backend);
    engine
}

fn run(backend: Backend, code: &str, document: &Value) -> Result<Vec<Value>, Error> {
    engine(backend)
        .compile(code)?
        .execute_document(document, &Collation::default())
}

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::Int32).collect()
}

#[rstest]
#[case::mul_before_add("1 + 2 * 3", ints(&[7]))]
#[case::parens("(1 + 2) * 3", ints(&[9]))]
#[case::and("1 < 2 AND 2 < 3", vec![Value::Boolean(true)])]
#[case::and_before_or("1 < 2 OR 1 > 2 AND false", vec![Value::Boolean(true)])]
#[case::left_assoc("10 - 2 - 3", ints(&[5]))]
#[case::add_before_subtract("10 - 2 + 3", ints(&[5]))]
#[case::divide_before_multiply("2 * 3 / 6", ints(&[0]))]
#[case::index("$.a.b[0]", ints(&[10]))]
#[case::negative_index("$.a.b[-1]", ints(&[30]))]
#[case::out_of_range("$.a.b[5]", vec![Value::Null])]
#[case::all("$.a.b[*]", ints(&[10, 20, 30]))]
#[case::filter("$.a.b[@ > 15]", ints(&[20, 30]))]
#[case::missing_field("$.missing", vec![Value::Null])]
#[case::bare_field("name", vec![Value::from("Ann")])]
#[case::any_eq("$.a.b[*] ANY = 20", vec![Value::Boolean(true)])]
#[case::all_gt("$.a.b[*] ALL > 15", vec![Value::Boolean(false)])]
#[case::any_in("$.tags[*] ANY IN ['y', 'z']", vec![Value::Boolean(true)])]
#[case::between("$.a.b[1] BETWEEN 15 AND 25", vec![Value::Boolean(true)])]
#[case::in_array("2 IN [1, 2, 3]", vec![Value::Boolean(true)])]
#[case::like("$.name LIKE 'a%'", vec![Value::Boolean(true)])]
#[case::ignore_case_eq("$.name = 'ANN'", vec![Value::Boolean(true)])]
#[case::count("COUNT($.a.b[*])", ints(&[3]))]
#[case::sum("SUM($.a.b[*])", ints(&[60]))]
#[case::first("FIRST($.a.b[*])", ints(&[10]))]
#[case::max("MAX($.a.b[*])", ints(&[30]))]
#[case::map("MAP($.a.b[*] => @ * 2)", ints(&[20, 40, 60]))]
#[case::map_flattens("MAP([[1, 2], [3]] => @[*])", ints(&[1, 2, 3]))]
#[case::filter_fn("FILTER($.a.b[*] => @ >= 20)", ints(&[20, 30]))]
#[case::iif("IIF($.a.b[0] > 5, 'big', 'small')", vec![Value::from("big")])]
#[case::upper("UPPER($.name)", vec![Value::from("ANN")])]
#[case::lower_null("LOWER($.n)", vec![Value::Null])]
#[case::substring("SUBSTRING('hello', 1, 3)", vec![Value::from("ell")])]
#[case::coalesce("COALESCE($.n, 1)", ints(&[1]))]
#[case::length("LENGTH($.a.b)", ints(&[3]))]
#[case::keys("KEYS($.a)", vec![Value::from("b")])]
#[case::join_split("JOIN(SPLIT('a,b', ','), '-')", vec![Value::from("a-b")])]
#[case::distinct("DISTINCT(['a', 'A', 'b'])", vec![Value::from("a"), Value::from("b")])]
#[case::top("TOP($.a.b[*], 2)", ints(&[10, 20]))]
#[case::items("ITEMS($.tags)", vec![Value::from("x"), Value::from("y")])]
#[case::extend(
    "EXTEND({a: 1, b: 1}, {b: 2})",
    vec![Value::Document(vec![("a", Value::Int32(1)), ("b", Value::Int32(2))].into_iter().collect())]
)]
#[case::document(
    "{ a, a }",
    vec![Value::Document(vec![("a", Value::from(json!({"b": [10, 20, 30]}))), ("a1", Value::from(json!({"b": [10, 20, 30]})))].into_iter().collect())]
)]
#[case::array_of_enumerable("{ xs: $.a.b[*] }", vec![Value::from(json!({"xs": [10, 20, 30]}))])]
#[case::string_concat("'id-' + STRING(1)", vec![Value::from("id-1")])]
fn test_evaluate(
    sample: Value,
    #[values(Backend::OpTree, Backend::Closure)] backend: Backend,
    #[case] code: &str,
    #[case] expected: Vec<Value>,
) {
    assert_eq!(run(backend, code, &sample).unwrap(), expected);
}

#[rstest]
#[case::any_on_scalar_field("$.a ANY = 1", vec![Value::Boolean(true)])]
#[case::parenthesized_any("($.a) ANY = 1", vec![Value::Boolean(true)])]
#[case::all_on_scalar_field("$.a ALL > 0", vec![Value::Boolean(true)])]
#[case::count_scalar_field("COUNT($.n)", ints(&[1]))]
#[case::count_missing_field("COUNT($.missing)", ints(&[1]))]
#[case::sum_scalar_field("SUM($.n)", ints(&[5]))]
#[case::map_scalar_field("MAP($.n => @ * 2)", ints(&[10]))]
#[case::count_array_field("COUNT($.xs)", ints(&[2]))]
#[case::explicit_all_on_scalar("COUNT($.n[*])", ints(&[0]))]
fn test_scalar_path_as_sequence(
    #[values(Backend::OpTree, Backend::Closure)] backend: Backend,
    #[case] code: &str,
    #[case] expected: Vec<Value>,
) {
    let document: Value = json!({"a": 1, "n": 5, "xs": [1, 2]}).into();
    assert_eq!(run(backend, code, &document).unwrap(), expected);
}

#[rstest]
#[case::any_decided_before_error("MAP([20, 10] => 100 / (@ - 10)) ANY = 10", Value::Boolean(true))]
#[case::all_decided_before_error("MAP([10, 0] => 10 / @) ALL > 5", Value::Boolean(false))]
#[case::any_like_decided_before_error("MAP(['ab', 1] => IIF(IS_STRING(@), @, 1 / 0)) ANY LIKE 'a%'", Value::Boolean(true))]
fn test_quantifier_stops_at_deciding_element(
    sample: Value,
    #[values(Backend::OpTree, Backend::Closure)] backend: Backend,
    #[case] code: &str,
    #[case] expected: Value,
) {
    assert_eq!(run(backend, code, &sample).unwrap(), vec![expected]);
}

#[rstest]
fn test_like_with_pattern_from_document(#[values(Backend::OpTree, Backend::Closure)] backend: Backend) {
    let expr = engine(backend).compile("$.name LIKE $.pattern").unwrap();
    let collation = Collation::default();

    for (pattern, expected) in [("a%", true), ("_nn", true), ("x%", false)] {
        let document: Value = json!({"name": "Ann", "pattern": pattern}).into();
        assert_eq!(
            expr.execute_document(&document, &collation).unwrap(),
            vec![Value::Boolean(expected)]
        );
    }

    let binary = Collation::binary();
    let document: Value = json!({"name": "Ann", "pattern": "a%"}).into();
    assert_eq!(
        expr.execute_document(&document, &binary).unwrap(),
        vec![Value::Boolean(false)]
    );
}

#[rstest]
#[case::zero_division("$.a.b[0] / 0", EvalError::ZeroDivision)]
#[case::filter_predicate("FILTER($.a.b[*] => $.tags[*])", EvalError::NotScalar("$.tags[*]".to_string()))]
fn test_evaluate_error(
    sample: Value,
    #[values(Backend::OpTree, Backend::Closure)] backend: Backend,
    #[case] code: &str,
    #[case] expected: EvalError,
) {
    let err = run(backend, code, &sample).unwrap_err();
    assert_eq!(err.cause, InnerError::Eval(expected));
}

#[test]
fn test_left_not_scalar_is_parse_error() {
    let err = Engine::default().compile("$.a.b[*] = 20").unwrap_err();

    assert!(matches!(
        err.cause,
        InnerError::Parse(ParseError::LeftNotScalar { ref expr }) if expr == "$.a.b[*]"
    ));
}

#[test]
fn test_immutability_flags() {
    let engine = Engine::default();

    assert!(engine.compile("1 + 2").unwrap().is_immutable());
    assert!(!engine.compile("$.a + 1").unwrap().is_immutable());
    assert!(!engine.compile("@0 + 1").unwrap().is_immutable());
    assert!(!engine.compile("NOW()").unwrap().is_immutable());
}

#[rstest]
fn test_immutable_result_does_not_depend_on_document(#[values(Backend::OpTree, Backend::Closure)] backend: Backend) {
    let expr = engine(backend).compile("UPPER('a') + STRING(1 + 2)").unwrap();
    let collation = Collation::default();

    let first = expr.execute_document(&json!({"x": 1}).into(), &collation).unwrap();
    let second = expr.execute_document(&json!({"y": [1, 2]}).into(), &collation).unwrap();

    assert!(expr.is_immutable());
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_keys_resolve_to_same_path() {
    let node = docexpr_lang::parse("{ a, a }", DocumentScope::Root).unwrap();

    assert_eq!(node.ty, ExprType::Document);
    assert_eq!(node.source, "{a:$.a,a1:$.a}");
    assert_eq!(node.fields.iter().map(|f| f.as_str()).collect::<Vec<_>>(), vec!["a"]);
}

#[rstest]
fn test_aggregate(#[values(Backend::OpTree, Backend::Closure)] backend: Backend) {
    let documents: Vec<Value> = vec![
        json!({"_id": 1, "x": 2}).into(),
        json!({"_id": 2, "x": 3}).into(),
        json!({"_id": 3}).into(),
    ];
    let engine = engine(backend);
    let collation = Collation::default();

    let sum = engine.compile("SUM(*.x)").unwrap();
    assert!(sum.use_source());
    assert_eq!(sum.execute_source(&documents, &collation).unwrap(), ints(&[5]));

    let count = engine.compile("COUNT(*)").unwrap();
    assert_eq!(count.execute_source(&documents, &collation).unwrap(), ints(&[3]));

    let ids = engine.compile("MAP(* => @._id * 10)").unwrap();
    assert_eq!(ids.execute_source(&documents, &collation).unwrap(), ints(&[10, 20, 30]));

    let root = engine.compile("$.x").unwrap();
    assert_eq!(
        root.execute_source(&documents, &collation).unwrap_err().cause,
        InnerError::Eval(EvalError::NoRootDocument("x".into()))
    );
}

#[rstest]
fn test_parameters(#[values(Backend::OpTree, Backend::Closure)] backend: Backend) {
    let expr = engine(backend).compile("$.a.b[@i] + @delta").unwrap();
    let document: Value = json!({"a": {"b": [10, 20, 30]}}).into();
    let parameters: Document = vec![("i", Value::Int32(1)), ("delta", Value::Int32(5))]
        .into_iter()
        .collect();
    let collation = Collation::default();

    let value = expr
        .execute_scalar(EvalContext::document(&document, &parameters, &collation))
        .unwrap();
    assert_eq!(value, Value::Int32(25));

    let parameters: Document = vec![("i", Value::from("one"))].into_iter().collect();
    let err = expr
        .execute_scalar(EvalContext::document(&document, &parameters, &collation))
        .unwrap_err();
    assert!(matches!(err.cause, InnerError::Eval(EvalError::IndexNotNumber(_))));
}

#[test]
fn test_compile_with_current_scope() {
    let options = ParseOptions {
        scope: DocumentScope::Current,
        ..Default::default()
    };
    let expr = Engine::default().compile_with("price * 2", &options).unwrap();

    assert_eq!(expr.source(), "@.price*2");
    assert_eq!(
        expr.execute_document(&json!({"price": 4}).into(), &Collation::default())
            .unwrap(),
        ints(&[8])
    );
}

#[test]
fn test_sort_on_optree() {
    let expr = engine(Backend::OpTree)
        .compile("MAP(SORT($.items[*] => @.k, -1) => @.k)")
        .unwrap();
    let document: Value = json!({"items": [{"k": "b"}, {"k": "C"}, {"k": "a"}]}).into();

    assert_eq!(
        expr.execute_document(&document, &Collation::default()).unwrap(),
        vec![Value::from("C"), Value::from("b"), Value::from("a")]
    );
}

#[test]
fn test_sort_unsupported_on_closure() {
    let err = engine(Backend::Closure).compile("SORT($.items[*] => @.k)").unwrap_err();
    assert_eq!(err.cause, InnerError::Eval(EvalError::Unsupported("SORT".into())));
}
