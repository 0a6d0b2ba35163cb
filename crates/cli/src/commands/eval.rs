use std::path::Path;
use std::process;

use arbiter_core::{AttrId, Decision, RuleSet};
use arbiter_eval::{
    EvaluationResult, Evaluator, NoRestClient, Request, RestClient, UreqRestClient,
};
use serde_json::{json, Value};

use crate::config::Config;
use crate::{report_error, OutputFormat};

pub(crate) struct EvalArgs<'a> {
    pub policy: &'a Path,
    pub request: &'a Path,
    pub params: &'a [String],
    pub offline: bool,
    pub fail_on_error: bool,
}

/// The request file holds either one request object or an array of them.
/// Output mirrors the shape of the input.
#[derive(Debug, PartialEq)]
enum Requests {
    Single(Request),
    Batch(Vec<Request>),
}

impl Requests {
    fn as_slice(&self) -> &[Request] {
        match self {
            Requests::Single(r) => std::slice::from_ref(r),
            Requests::Batch(rs) => rs,
        }
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut Request)) {
        match self {
            Requests::Single(r) => f(r),
            Requests::Batch(rs) => rs.iter_mut().for_each(f),
        }
    }
}

type Outcome = Vec<EvaluationResult<Decision>>;

pub(crate) fn cmd_eval(args: &EvalArgs<'_>, config: &Config, output: OutputFormat, quiet: bool) {
    let rule_set = match load_policy(args.policy) {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let overrides = match parse_params(args.params) {
        Ok(p) => p,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut requests = match read_requests(args.request) {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    requests.for_each_mut(|r| {
        for (key, value) in &overrides {
            r.insert(key.clone(), value.clone());
        }
    });

    let client: Box<dyn RestClient> = if args.offline || !config.rest.enabled {
        tracing::debug!("REST calls disabled");
        Box::new(NoRestClient)
    } else {
        Box::new(UreqRestClient::new(
            config.rest.timeout(),
            &config.rest.user_agent,
        ))
    };

    let evaluator = Evaluator::new(&rule_set, client.as_ref());
    tracing::info!(
        rules = rule_set.rules.len(),
        requests = requests.as_slice().len(),
        "evaluating policy"
    );
    let outcomes = evaluate_all(&evaluator, requests.as_slice());
    let failed = outcomes.iter().flatten().any(|r| !r.is_success());

    if !quiet {
        match output {
            OutputFormat::Text => print!("{}", render_text(&requests, &outcomes)),
            OutputFormat::Json => {
                let doc = render_json(&requests, &outcomes);
                let pretty = serde_json::to_string_pretty(&doc)
                    .unwrap_or_else(|e| format!("serialization error: {}", e));
                println!("{}", pretty);
            }
        }
    }

    if args.fail_on_error && failed {
        process::exit(1);
    }
}

/// DSL source, or a JSON AST when the file extension is `.json`.
fn load_policy(path: &Path) -> Result<RuleSet<AttrId>, String> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let src = std::fs::read_to_string(path)
            .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
        let parsed = arbiter_interchange::from_json_str(&src)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        arbiter_core::resolve(&parsed).map_err(|e| e.to_string())
    } else {
        arbiter_core::compile_file(path).map_err(|e| e.to_string())
    }
}

fn parse_params(params: &[String]) -> Result<Vec<(String, String)>, String> {
    params
        .iter()
        .map(|p| match p.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(format!("invalid --param '{}': expected KEY=VALUE", p)),
        })
        .collect()
}

fn read_requests(path: &Path) -> Result<Requests, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    let doc: Value = serde_json::from_str(&src)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))?;
    parse_requests(&doc)
}

fn parse_requests(doc: &Value) -> Result<Requests, String> {
    match doc {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| request_object(item, &format!("$[{}]", i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Requests::Batch),
        other => request_object(other, "$").map(Requests::Single),
    }
}

/// Strings pass through; numbers and booleans are taken as their JSON text.
fn request_object(value: &Value, path: &str) -> Result<Request, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("{}: expected a request object", path))?;
    obj.iter()
        .map(|(key, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(format!(
                        "{}.{}: request values must be strings, numbers or booleans",
                        path, key
                    ))
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}

/// Evaluate each request; a batch runs one scoped thread per request.
fn evaluate_all(evaluator: &Evaluator<'_>, requests: &[Request]) -> Vec<Outcome> {
    if requests.len() <= 1 {
        return requests.iter().map(|r| evaluator.evaluate(r)).collect();
    }
    std::thread::scope(|s| {
        let handles: Vec<_> = requests
            .iter()
            .map(|r| s.spawn(move || evaluator.evaluate(r)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

fn rule_line(index: usize, result: &EvaluationResult<Decision>) -> String {
    match result {
        EvaluationResult::Success { value, .. } => format!("rule {}: {}", index + 1, value.name()),
        EvaluationResult::Failure(e) => format!("rule {}: error: {}", index + 1, e),
    }
}

fn render_text(requests: &Requests, outcomes: &[Outcome]) -> String {
    let mut out = String::new();
    match requests {
        Requests::Single(_) => {
            for (i, r) in outcomes.iter().flatten().enumerate() {
                out.push_str(&rule_line(i, r));
                out.push('\n');
            }
        }
        Requests::Batch(_) => {
            for (n, outcome) in outcomes.iter().enumerate() {
                out.push_str(&format!("request {}:\n", n + 1));
                for (i, r) in outcome.iter().enumerate() {
                    out.push_str("  ");
                    out.push_str(&rule_line(i, r));
                    out.push('\n');
                }
            }
        }
    }
    out
}

fn rule_json(index: usize, result: &EvaluationResult<Decision>) -> Value {
    match result {
        EvaluationResult::Success { value, .. } => json!({
            "rule": index + 1,
            "decision": value.name(),
            "explanation": result.explanation().map(|tree| tree.to_json()),
        }),
        EvaluationResult::Failure(e) => json!({
            "rule": index + 1,
            "error": e.to_string(),
        }),
    }
}

fn outcome_json(outcome: &Outcome) -> Value {
    json!({
        "results": outcome
            .iter()
            .enumerate()
            .map(|(i, r)| rule_json(i, r))
            .collect::<Vec<_>>(),
    })
}

fn render_json(requests: &Requests, outcomes: &[Outcome]) -> Value {
    match requests {
        Requests::Single(_) => outcomes.first().map(outcome_json).unwrap_or(Value::Null),
        Requests::Batch(_) => Value::Array(outcomes.iter().map(outcome_json).collect()),
    }
}
