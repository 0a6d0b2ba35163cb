//! End-to-end evaluation behaviour: decision combinators, branch laziness,
//! REST calls and concurrent evaluation against one shared rule set.

use arbiter_core::{compile, Condition, Decision, RestMethod, Rule, RuleSet, Term};
use arbiter_eval::{
    evaluate, EvalError, EvaluationResult, Evaluator, NoRestClient, Request, RestClient,
    RestError, Value,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Records every call and answers from a fixed table keyed by URL.
#[derive(Default)]
struct RecordingClient {
    calls: Mutex<Vec<(String, RestMethod, Vec<(String, Value)>)>>,
    responses: Vec<(&'static str, Result<&'static str, RestError>)>,
}

impl RecordingClient {
    fn answering(responses: Vec<(&'static str, Result<&'static str, RestError>)>) -> Self {
        RecordingClient {
            calls: Mutex::new(Vec::new()),
            responses,
        }
    }

    fn calls(&self) -> Vec<(String, RestMethod, Vec<(String, Value)>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RestClient for RecordingClient {
    fn call(
        &self,
        url: &str,
        method: RestMethod,
        params: &[(String, Value)],
    ) -> Result<String, RestError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), method, params.to_vec()));
        self.responses
            .iter()
            .find(|(u, _)| *u == url)
            .map(|(_, r)| r.clone().map(str::to_string))
            .unwrap_or(Err(RestError::Status { status: 404 }))
    }
}

fn request(pairs: &[(&str, &str)]) -> Request {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn decide(src: &str, req: &Request) -> Vec<Result<Decision, EvalError>> {
    let set = compile(src, "test.rules").unwrap();
    evaluate(&set, req, &NoRestClient)
        .into_iter()
        .map(EvaluationResult::into_result)
        .collect()
}

fn only(src: &str) -> Decision {
    let out = decide(src, &Request::new());
    assert_eq!(out.len(), 1);
    out[0].clone().unwrap()
}

// ──────────────────────────────────────────────
// Combinators
// ──────────────────────────────────────────────

#[test]
fn majority_rule() {
    assert_eq!(
        only("majority permit { always permit, always permit, always deny }"),
        Decision::Permit
    );
    assert_eq!(
        only("majority permit { always permit, always deny, always deny }"),
        Decision::Undecided
    );
}

#[test]
fn all_rule() {
    assert_eq!(
        only("all permit { always permit, always permit, always deny }"),
        Decision::Undecided
    );
    assert_eq!(
        only("all deny { always deny, deny when 2 > 1 }"),
        Decision::Deny
    );
}

#[test]
fn any_rule() {
    assert_eq!(
        only("any permit { always deny, always permit, always deny }"),
        Decision::Permit
    );
}

#[test]
fn one_of_rule() {
    assert_eq!(
        only("exclusive { always permit, deny when 1 = 2 }"),
        Decision::Permit
    );
    assert_eq!(
        only("exclusive { always permit, always deny }"),
        Decision::Undecided
    );
}

#[test]
fn empty_combinators_from_hand_built_rule_sets() {
    let set = RuleSet::new(
        vec![],
        vec![
            Rule::All {
                decision: Decision::Deny,
                rules: vec![],
            },
            Rule::Majority {
                decision: Decision::Permit,
                rules: vec![],
            },
            Rule::Any {
                decision: Decision::Permit,
                rules: vec![],
            },
            Rule::OneOf(vec![]),
        ],
    );
    let out: Vec<_> = evaluate(&set, &Request::new(), &NoRestClient)
        .into_iter()
        .map(|r| r.into_result().unwrap())
        .collect();
    assert_eq!(
        out,
        vec![
            Decision::Deny,
            Decision::Undecided,
            Decision::Undecided,
            Decision::Undecided
        ]
    );
}

#[test]
fn nested_combinators() {
    let src = r#"
role = request "role"
majority permit {
    permit when role = "admin",
    any permit { permit when role = "admin", always deny },
    if role = "guest" always deny else always permit
}
"#;
    assert_eq!(
        decide(src, &request(&[("role", "admin")])),
        vec![Ok(Decision::Permit)]
    );
    assert_eq!(
        decide(src, &request(&[("role", "guest")])),
        vec![Ok(Decision::Undecided)]
    );
}

// ──────────────────────────────────────────────
// Values through the evaluator
// ──────────────────────────────────────────────

#[test]
fn cross_type_comparisons() {
    assert_eq!(only("permit when 42 > \"5\""), Decision::Permit);
    assert_eq!(only("permit when 42 > \"75\""), Decision::Undecided);
    assert_eq!(only("permit when 42 = \"42\""), Decision::Permit);
    assert_eq!(only("permit when \"x\" != 1"), Decision::Permit);
}

#[test]
fn coercion_failure_surfaces() {
    let out = decide("permit when number \"abc\" = 1", &Request::new());
    assert!(out[0].as_ref().unwrap_err().is_type_coercion());
}

#[test]
fn end_to_end_any_permit() {
    let src = "foo = \"foo\"\nbar = request \"bar\"\n\nany permit { permit when foo = bar, permit when foo = 123 }";
    assert_eq!(
        decide(src, &request(&[("bar", "foo")])),
        vec![Ok(Decision::Permit)]
    );
    assert_eq!(
        decide(src, &request(&[("bar", "baz")])),
        vec![Ok(Decision::Undecided)]
    );
}

#[test]
fn attribute_cycles_fail_their_rule_only() {
    let out = decide("a = b + 1\nb = a\npermit when a > 0\nalways deny", &Request::new());
    assert_eq!(
        out[0],
        Err(EvalError::AttributeCycle {
            attribute: "a".into()
        })
    );
    assert_eq!(out[1], Ok(Decision::Deny));
}

#[test]
fn doubling_cycle_fails_promptly_at_the_default_limit() {
    let started = std::time::Instant::now();
    let out = decide(
        "a = a + a\nb = a * a\npermit when b > 0\nalways permit",
        &Request::new(),
    );
    assert_eq!(
        out[0],
        Err(EvalError::AttributeCycle {
            attribute: "a".into()
        })
    );
    assert_eq!(out[1], Ok(Decision::Permit));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

// ──────────────────────────────────────────────
// REST terms
// ──────────────────────────────────────────────

const DIRECTORY: &str = r#"
user = request "user"
tenant = "acme"
role = POST "http://directory/roles" name=user, org=tenant
permit when role = "admin"
"#;

#[test]
fn rest_terms_send_reduced_parameters_in_order() {
    let client = RecordingClient::answering(vec![("http://directory/roles", Ok("admin"))]);
    let set = compile(DIRECTORY, "dir.rules").unwrap();
    let out = evaluate(&set, &request(&[("user", "ann")]), &client);

    assert_eq!(out[0].value(), Some(&Decision::Permit));
    assert_eq!(
        client.calls(),
        vec![(
            "http://directory/roles".to_string(),
            RestMethod::Post,
            vec![
                ("name".to_string(), Value::String("ann".into())),
                ("org".to_string(), Value::String("acme".into())),
            ]
        )]
    );
}

#[test]
fn rest_explanation_records_params_and_response() {
    let client = RecordingClient::answering(vec![("http://directory/roles", Ok("viewer"))]);
    let set = compile(DIRECTORY, "dir.rules").unwrap();
    let out = evaluate(&set, &request(&[("user", "ann")]), &client);
    let tree = out[0].explanation().unwrap().to_json();

    assert_eq!(tree["value"], "Undecided");
    let role = &tree["children"][0]["children"][0];
    assert_eq!(role["description"], "attribute role");
    let call = &role["children"][0];
    assert_eq!(call["description"], "POST http://directory/roles");
    assert_eq!(call["value"], "viewer");
    assert_eq!(call["children"][0]["description"], "params");
    assert_eq!(
        call["children"][0]["value"],
        serde_json::json!({"name": "ann", "org": "acme"})
    );
    assert_eq!(call["children"][1]["description"], "response");
}

#[test]
fn failing_parameter_skips_the_call() {
    let client = RecordingClient::default();
    let set = compile(DIRECTORY, "dir.rules").unwrap();
    let out = evaluate(&set, &Request::new(), &client);
    assert_eq!(
        out[0].error(),
        Some(&EvalError::MissingRequestParameter { key: "user".into() })
    );
    assert!(client.calls().is_empty());
}

#[test]
fn rest_failure_is_an_external_call_error() {
    let client = RecordingClient::answering(vec![(
        "http://directory/roles",
        Err(RestError::Status { status: 503 }),
    )]);
    let set = compile(DIRECTORY, "dir.rules").unwrap();
    let out = evaluate(&set, &request(&[("user", "ann")]), &client);
    assert_eq!(
        out[0].error(),
        Some(&EvalError::ExternalCall {
            url: "http://directory/roles".into(),
            message: "HTTP status 503".into()
        })
    );
}

#[test]
fn branch_reduces_only_the_selected_leg() {
    let src = r#"
flag = request "flag"
probe = GET "http://probe"
if flag = "on" permit when probe = "ok" else always deny
"#;
    let client = RecordingClient::answering(vec![("http://probe", Ok("ok"))]);
    let set = compile(src, "lazy.rules").unwrap();

    let off = evaluate(&set, &request(&[("flag", "off")]), &client);
    assert_eq!(off[0].value(), Some(&Decision::Deny));
    assert!(client.calls().is_empty());

    let on = evaluate(&set, &request(&[("flag", "on")]), &client);
    assert_eq!(on[0].value(), Some(&Decision::Permit));
    assert_eq!(client.calls().len(), 1);
}

#[test]
fn branch_does_not_fail_on_unselected_failing_leg() {
    let set = RuleSet::new(
        vec![],
        vec![Rule::branch(
            Condition::Equal(Term::Number(1), Term::Number(1)),
            Rule::Always(Decision::Permit),
            Rule::when(
                Condition::Equal(
                    Term::Rest {
                        url: "http://never".into(),
                        method: RestMethod::Get,
                        params: vec![],
                    },
                    Term::String("x".into()),
                ),
                Decision::Deny,
            ),
        )],
    );
    let out = evaluate(&set, &Request::new(), &NoRestClient);
    assert_eq!(out[0].value(), Some(&Decision::Permit));
}

#[test]
fn cancelled_evaluation_skips_rest_calls() {
    let client = RecordingClient::answering(vec![("http://directory/roles", Ok("admin"))]);
    let set = compile(DIRECTORY, "dir.rules").unwrap();
    let cancel = Arc::new(AtomicBool::new(true));
    let out = Evaluator::new(&set, &client)
        .with_cancel_flag(cancel)
        .evaluate(&request(&[("user", "ann")]));
    assert_eq!(
        out[0].error(),
        Some(&EvalError::Cancelled {
            url: "http://directory/roles".into()
        })
    );
    assert!(client.calls().is_empty());
}

// ──────────────────────────────────────────────
// Concurrency
// ──────────────────────────────────────────────

#[test]
fn one_rule_set_serves_concurrent_requests() {
    let client = RecordingClient::answering(vec![("http://directory/roles", Ok("admin"))]);
    let set = compile(DIRECTORY, "dir.rules").unwrap();
    let evaluator = Evaluator::new(&set, &client);

    let users: Vec<String> = (0..8).map(|i| format!("user{}", i)).collect();
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = users
            .iter()
            .map(|u| {
                let evaluator = &evaluator;
                s.spawn(move || evaluator.evaluate(&request(&[("user", u.as_str())])))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for out in &results {
        assert_eq!(out[0].value(), Some(&Decision::Permit));
    }
    assert_eq!(client.calls().len(), users.len());
}
