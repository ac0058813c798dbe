//! spanqa command-line entrypoint.
//!
//! Reads one JSON request per line from stdin:
//!
//! ```text
//! {"sentenceLength": 5, "questionLabel": {"questionString": "...", "answerJudgments": [...]}}
//! ```
//!
//! and writes the consolidated gold labels for each as one JSON line.

use std::io::{self, BufRead, BufWriter, Write};

use anyhow::Context;
use mimalloc::MiMalloc;
use serde::{Deserialize, Serialize};

use spanqa::{Config, GoldLabelConsolidator, QuestionLabel, SelectionPolicy, Span};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: spanqa [--policy union|majority|weighted] < requests.jsonl";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsolidationRequest {
    sentence_length: usize,
    question_label: QuestionLabel,
}

#[derive(Debug, Serialize)]
struct LabeledSpan {
    span: Span,
    label: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsolidatedQuestion {
    question_string: String,
    policy: SelectionPolicy,
    spans: Vec<LabeledSpan>,
    invalidity_rate: f32,
    invalidity: f32,
    num_invalids: usize,
    num_answers: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        println!("{USAGE}");
        return Ok(());
    }

    let policy = resolve_policy(&args)?;
    let consolidator = GoldLabelConsolidator::new(policy);

    tracing::info!(policy = %policy, "Consolidating question labels from stdin");

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut processed = 0usize;

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let request: ConsolidationRequest = serde_json::from_str(&line)
            .with_context(|| format!("line {}: malformed request", line_no + 1))?;
        let gold = consolidator
            .consolidate_question(request.sentence_length, &request.question_label)
            .with_context(|| format!("line {}: consolidation failed", line_no + 1))?;

        let result = ConsolidatedQuestion {
            question_string: request.question_label.question_string,
            policy,
            spans: gold
                .positive_spans()
                .map(|(span, label)| LabeledSpan { span, label })
                .collect(),
            invalidity_rate: gold.invalidity_rate(),
            invalidity: gold.invalidity(),
            num_invalids: gold.num_invalids(),
            num_answers: gold.num_answers(),
        };

        serde_json::to_writer(&mut out, &result)?;
        out.write_all(b"\n")?;
        processed += 1;
    }

    out.flush()?;
    tracing::info!(processed, "Done");
    Ok(())
}

/// `--policy` wins over `SPANQA_SPAN_SELECTION_POLICY`.
///
/// Only the policy matters for consolidation, so the objective/policy
/// cross-check of [`Config::validate`] is not applied here.
fn resolve_policy(args: &[String]) -> anyhow::Result<SelectionPolicy> {
    match policy_arg(args)? {
        Some(policy) => Ok(policy),
        None => Ok(Config::from_env()?.span_selection_policy),
    }
}

/// Parses `--policy <name>` or `--policy=<name>`.
fn policy_arg(args: &[String]) -> anyhow::Result<Option<SelectionPolicy>> {
    let value = match args {
        [] => return Ok(None),
        [flag, value] if flag == "--policy" => value.as_str(),
        [arg] => match arg.strip_prefix("--policy=") {
            Some(value) => value,
            None if arg == "--policy" => anyhow::bail!("--policy needs a value\n{USAGE}"),
            None => anyhow::bail!("unexpected argument '{arg}'\n{USAGE}"),
        },
        _ => anyhow::bail!("unexpected arguments {args:?}\n{USAGE}"),
    };
    Ok(Some(value.parse()?))
}
