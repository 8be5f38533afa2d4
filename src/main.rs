//! expense-engine CLI
//!
//! Split expenses and settle group balances from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Split one expense
//! expense-engine split --input expense.json
//!
//! # Settle a group's balances, output as JSON
//! expense-engine settle --input balances.json --format json
//!
//! # Use a whole-unit currency
//! expense-engine settle --input balances.json --policy yen.json
//!
//! # Generate random balances for testing
//! expense-engine generate --users 10 --balances 30
//! ```

use expense_engine::core::balance::PairwiseBalance;
use expense_engine::core::money::Money;
use expense_engine::core::policy::RoundingPolicy;
use expense_engine::core::user::UserId;
use expense_engine::graph::balance_graph::BalanceGraph;
use expense_engine::optimization::settlement::{SettlementOptimizer, SettlementPlan};
use expense_engine::optimization::summary::SettlementSummary;
use expense_engine::simulation::stress_test::{generate_random_balances, BalanceNetworkConfig};
use expense_engine::split::calculator::{SplitCalculator, SplitResult};
use expense_engine::split::participant::Participant;
use expense_engine::split::strategy::SplitStrategy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"expense-engine: expense splitting and debt settlement

USAGE:
    expense-engine <COMMAND> [OPTIONS]

COMMANDS:
    split       Split one expense among its participants
    settle      Compute the transfers that settle a group
    generate    Generate random pairwise balances (for testing)
    help        Show this message

OPTIONS (split, settle):
    --input <FILE>      Path to JSON input file
    --format <FORMAT>   Output format: text (default) or json
    --policy <FILE>     JSON rounding policy, e.g. {{ "scale": 2, "tolerance": "0.01" }}

OPTIONS (generate):
    --users <N>         Number of users (default: 10)
    --balances <N>      Number of balances (default: 30)
    --seed <N>          Seed for reproducible output
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    expense-engine split --input dinner.json
    expense-engine settle --input trip.json --format json
    expense-engine generate --users 20 --balances 60 --output trip.json"#
    );
}

/// JSON schema for one expense.
#[derive(Deserialize)]
struct ExpenseInput {
    total: Money,
    strategy: String,
    /// Who paid. Only used when the expense is recorded into a group.
    #[serde(default)]
    payer: Option<String>,
    participants: Vec<ParticipantInput>,
}

#[derive(Deserialize)]
struct ParticipantInput {
    user: String,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    percentage: Option<Decimal>,
}

#[derive(Deserialize, Serialize)]
struct BalanceInput {
    user_a: String,
    user_b: String,
    amount: Money,
}

/// JSON schema for the settle command. Balances and expenses are both
/// optional; expenses are recorded on top of the balances.
#[derive(Deserialize)]
struct GroupFile {
    #[serde(default)]
    balances: Vec<BalanceInput>,
    #[serde(default)]
    expenses: Vec<ExpenseInput>,
}

#[derive(Serialize)]
struct SettleOutput<'a> {
    plan: &'a SettlementPlan,
    summary: &'a SettlementSummary,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

struct CommonArgs {
    input_path: String,
    format: String,
    policy: RoundingPolicy,
}

fn parse_common_args(args: &[String]) -> CommonArgs {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut policy = RoundingPolicy::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    fail("--input requires a file path");
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    fail("--format requires 'text' or 'json'");
                });
            }
            "--policy" => {
                i += 1;
                let path = args.get(i).cloned().unwrap_or_else(|| {
                    fail("--policy requires a file path");
                });
                policy = load_policy(&path);
            }
            _ => fail(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    let input_path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    CommonArgs {
        input_path,
        format,
        policy,
    }
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read file '{}': {}", path, e)))
}

fn load_policy(path: &str) -> RoundingPolicy {
    let policy: RoundingPolicy = serde_json::from_str(&read_file(path))
        .unwrap_or_else(|e| fail(format!("invalid policy file: {}", e)));
    if let Err(e) = policy.validate() {
        fail(e);
    }
    log::debug!(
        "Using policy scale={} tolerance={}",
        policy.scale(),
        policy.tolerance()
    );
    policy
}

fn to_participants(strategy: SplitStrategy, inputs: &[ParticipantInput]) -> Vec<Participant> {
    inputs
        .iter()
        .map(|p| match (strategy, p.amount, p.percentage) {
            (SplitStrategy::Exact, Some(amount), _) => Participant::exact(p.user.as_str(), amount),
            (SplitStrategy::Percentage, _, Some(pct)) => {
                Participant::percentage(p.user.as_str(), pct)
            }
            (SplitStrategy::Equal, _, _) => Participant::equal(p.user.as_str()),
            (_, Some(amount), _) => Participant::exact(p.user.as_str(), amount),
            (_, _, Some(pct)) => Participant::percentage(p.user.as_str(), pct),
            // Missing value: validation reports the share mismatch.
            _ => Participant::equal(p.user.as_str()),
        })
        .collect()
}

fn compute_expense(calculator: &SplitCalculator, expense: &ExpenseInput) -> SplitResult {
    let strategy: SplitStrategy = expense.strategy.parse().unwrap_or_else(|e| fail(e));
    let participants = to_participants(strategy, &expense.participants);
    calculator.compute(expense.total, strategy, &participants)
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fail(format!("cannot serialize output: {}", e)));
    println!("{}", json);
}

fn cmd_split(args: &[String]) {
    let common = parse_common_args(args);
    let expense: ExpenseInput = serde_json::from_str(&read_file(&common.input_path))
        .unwrap_or_else(|e| {
            eprintln!("Error parsing JSON: {}", e);
            eprintln!("Expected format:");
            eprintln!(
                r#"{{
  "total": "100.00",
  "strategy": "EQUAL",
  "participants": [ {{ "user": "alice" }}, {{ "user": "bob" }} ]
}}"#
            );
            process::exit(1);
        });

    let calculator = SplitCalculator::new(common.policy);
    let result = compute_expense(&calculator, &expense);

    if common.format == "json" {
        print_json(&result);
    } else {
        println!("{}", result);
    }

    if !result.is_valid() {
        process::exit(2);
    }
}

fn cmd_settle(args: &[String]) {
    let common = parse_common_args(args);
    let group: GroupFile = serde_json::from_str(&read_file(&common.input_path))
        .unwrap_or_else(|e| {
            eprintln!("Error parsing JSON: {}", e);
            eprintln!("Expected format:");
            eprintln!(
                r#"{{
  "balances": [ {{ "user_a": "alice", "user_b": "bob", "amount": "30.00" }} ],
  "expenses": [ {{ "total": "90", "strategy": "EQUAL", "payer": "carol",
                  "participants": [ {{ "user": "alice" }}, {{ "user": "carol" }} ] }} ]
}}"#
            );
            process::exit(1);
        });

    let mut graph = BalanceGraph::new();
    for b in &group.balances {
        let balance = PairwiseBalance::try_new(
            UserId::new(b.user_a.as_str()),
            UserId::new(b.user_b.as_str()),
            b.amount,
        )
        .unwrap_or_else(|e| fail(e));
        graph.add_balance(&balance);
    }

    let calculator = SplitCalculator::new(common.policy);
    for (i, expense) in group.expenses.iter().enumerate() {
        let payer = expense
            .payer
            .as_deref()
            .unwrap_or_else(|| fail(format!("expense {} has no payer", i)));
        let result = compute_expense(&calculator, expense);
        if let Err(e) = graph.record_split(&UserId::new(payer), &result) {
            eprintln!("Expense {}: {}", i, e);
            for message in result.error_messages() {
                eprintln!("  - {}", message);
            }
            process::exit(2);
        }
    }

    let plan = SettlementOptimizer::new(common.policy)
        .optimize_graph(&graph)
        .unwrap_or_else(|e| fail(e));
    let summary = SettlementSummary::from_plan(&graph, &plan);

    if common.format == "json" {
        print_json(&SettleOutput {
            plan: &plan,
            summary: &summary,
        });
    } else {
        println!("{}", plan);
        println!("{}", summary);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = BalanceNetworkConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--users" => {
                i += 1;
                config.user_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--users requires a number"));
            }
            "--balances" => {
                i += 1;
                config.entry_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--balances requires a number"));
            }
            "--seed" => {
                i += 1;
                config.seed = Some(
                    args.get(i)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| fail("--seed requires a number")),
                );
            }
            "--output" => {
                i += 1;
                output_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--output requires a file path")),
                );
            }
            _ => fail(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    #[derive(Serialize)]
    struct OutputFile {
        balances: Vec<BalanceInput>,
    }

    let balances = generate_random_balances(&config).unwrap_or_else(|e| fail(e));
    let output = OutputFile {
        balances: balances
            .iter()
            .map(|b| BalanceInput {
                user_a: b.user_a().to_string(),
                user_b: b.user_b().to_string(),
                amount: b.amount(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&output)
        .unwrap_or_else(|e| fail(format!("cannot serialize output: {}", e)));

    if let Some(path) = output_path {
        fs::write(&path, &json)
            .unwrap_or_else(|e| fail(format!("cannot write to '{}': {}", path, e)));
        eprintln!(
            "Generated {} balances across {} users -> {}",
            output.balances.len(),
            config.user_count,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "split" => cmd_split(rest),
        "settle" => cmd_settle(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
