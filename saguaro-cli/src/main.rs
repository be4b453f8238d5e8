//! saguaro-cli — terminal client for the Saguaro bookkeeping assistant
//!
//! Two top-level modes mirror the two user roles: `chat` is the
//! interactive bookkeeper conversation, `submit` is the field-staff
//! expense form. `expenses` and `flags` are the admin review listings.
//!
//! # Subcommands
//! - `chat`                          — interactive categorization chat
//! - `submit --property <addr> ...`  — submit an expense (optional receipt)
//! - `expenses`                      — list submitted expenses
//! - `flags`                         — list flagged interactions
//! - `status`                        — show server health

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use saguaro_core::models::{ChatTurn, Expense, ExpenseRef, FlaggedItem};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8765";

/// Assistant turn inserted when the chat request itself fails.
const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

const WELCOME: &str = "Welcome to the CHO Bookkeeping Assistant. I can help you categorize \
transactions and answer questions about where expenses should go. Ask \
\"show me submitted expenses\" to see what the team has sent in. \
Type \"exit\" to leave.";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "saguaro-cli",
    version,
    about = "Saguaro bookkeeping assistant — terminal client"
)]
struct Cli {
    /// Saguaro HTTP server URL (overrides SAGUARO_HTTP_URL env var)
    #[arg(long, env = "SAGUARO_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive bookkeeper chat
    Chat,

    /// Submit an expense tied to a property
    Submit {
        /// Property address the expense belongs to
        #[arg(long)]
        property: String,

        /// Amount as entered on the receipt
        #[arg(long, default_value = "")]
        amount: String,

        /// Vendor name
        #[arg(long, default_value = "")]
        vendor: String,

        /// Free-form note
        #[arg(long, default_value = "")]
        note: String,

        /// Submitter name
        #[arg(long, default_value = "Team")]
        submitted_by: String,

        /// Path to a receipt image or PDF
        #[arg(long)]
        receipt: Option<PathBuf>,
    },

    /// List submitted expenses, newest first
    Expenses,

    /// List flagged interactions, newest first
    Flags,

    /// Show Saguaro server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    flagged: bool,
    #[serde(default)]
    flag_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExpensesResponse {
    #[serde(default)]
    expenses: Vec<Expense>,
}

#[derive(Debug, Default, Deserialize)]
struct FlagsResponse {
    #[serde(default)]
    flags: Vec<FlaggedItem>,
}

#[derive(Debug, Deserialize)]
struct ExpenseEnvelope {
    expense: Expense,
}

// ============================================================================
// Session state (chat mode)
// ============================================================================

/// Outcome of one chat turn as seen by the client.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub flagged: bool,
    pub flag_reason: Option<String>,
}

/// One entry in the session's query log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub query: String,
    pub response: String,
    pub flagged: bool,
}

/// State for one interactive chat session: the transcript, the query
/// log, and the expense list fetched once at startup.
#[derive(Debug, Default)]
pub struct Session {
    pub messages: Vec<ChatTurn>,
    pub query_log: Vec<LogEntry>,
    pub expenses: Vec<Expense>,
}

impl Session {
    /// Append the user turn and the assistant reply to the transcript
    /// and the query log. Turns are immutable once appended.
    pub fn push_turn(&mut self, query: &str, outcome: &TurnOutcome) {
        self.messages.push(ChatTurn::user(query));

        let mut reply = ChatTurn::assistant(outcome.response.clone());
        reply.flagged = outcome.flagged;
        reply.flag_reason = outcome.flag_reason.clone();
        self.messages.push(reply);

        self.query_log.push(LogEntry {
            query: query.to_string(),
            response: outcome.response.clone(),
            flagged: outcome.flagged,
        });
    }

    /// Optimistically prepend a just-submitted expense so the next turn
    /// references it without refetching.
    pub fn push_expense(&mut self, expense: Expense) {
        self.expenses.insert(0, expense);
    }

    /// Expense reference payload for the chat endpoint.
    pub fn expense_refs(&self) -> Vec<ExpenseRef> {
        self.expenses.iter().map(ExpenseRef::from).collect()
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// One listing line per expense, admin-panel style.
pub fn format_expense(e: &Expense) -> String {
    let amount: &str = if e.amount.is_empty() { "?" } else { &e.amount };
    let vendor: &str = if e.vendor.is_empty() { "Unknown" } else { &e.vendor };

    let mut line = format!(
        "{}  ${}  {} → {}",
        e.created_at.format("%Y-%m-%d"),
        amount,
        vendor,
        e.property
    );
    if !e.note.is_empty() {
        line.push_str(&format!("  ({})", e.note));
    }
    if e.receipt_url.is_some() {
        line.push_str("  [receipt]");
    }
    line
}

/// Flag listing entry: reason line plus the logged query and reply.
pub fn format_flag(f: &FlaggedItem) -> String {
    format!(
        "{}  {}\n    Q: {}\n    A: {}",
        f.created_at.format("%Y-%m-%d %H:%M"),
        f.flag_reason,
        truncate(&f.query, 120),
        truncate(&f.response, 200)
    )
}

/// Cap `text` at `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}

fn print_reply(outcome: &TurnOutcome) {
    println!("\n{}\n", outcome.response);
    if outcome.flagged {
        println!(
            "⚑ flagged for review: {}\n",
            outcome.flag_reason.as_deref().unwrap_or("Needs review")
        );
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn make_client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

fn fetch_expenses(
    client: &reqwest::blocking::Client,
    server: &str,
) -> anyhow::Result<Vec<Expense>> {
    let resp = client.get(format!("{}/api/expenses", server)).send()?;
    let body: ExpensesResponse = resp.json()?;
    Ok(body.expenses)
}

/// One chat turn against the server. Request failures degrade to the
/// fixed apology turn; they never abort the session.
fn send_chat_turn(
    client: &reqwest::blocking::Client,
    server: &str,
    message: &str,
    session: &Session,
) -> TurnOutcome {
    let body = serde_json::json!({
        "message": message,
        "history": session.messages,
        "submittedExpenses": session.expense_refs(),
    });

    let result = client
        .post(format!("{}/api/chat", server))
        .json(&body)
        .send()
        .and_then(|r| r.json::<ChatResponse>());

    match result {
        Ok(r) => TurnOutcome {
            response: r.response.unwrap_or_else(|| APOLOGY.to_string()),
            flagged: r.flagged,
            flag_reason: r.flag_reason,
        },
        Err(e) => {
            eprintln!("saguaro-cli: chat request failed: {}", e);
            TurnOutcome {
                response: APOLOGY.to_string(),
                flagged: false,
                flag_reason: None,
            }
        }
    }
}

fn save_flag(
    client: &reqwest::blocking::Client,
    server: &str,
    query: &str,
    outcome: &TurnOutcome,
) -> anyhow::Result<()> {
    let body = serde_json::json!({
        "query": query,
        "response": outcome.response,
        "flagReason": outcome.flag_reason,
    });

    let resp = client
        .post(format!("{}/api/flags", server))
        .json(&body)
        .send()?;

    if !resp.status().is_success() {
        anyhow::bail!("server returned {}", resp.status());
    }

    Ok(())
}

// ============================================================================
// Subcommand drivers
// ============================================================================

/// Interactive chat loop. Expenses are fetched once at startup and fail
/// open to an empty list.
fn run_chat(server: &str) -> anyhow::Result<()> {
    let client = make_client(120)?;

    let mut session = Session::default();
    session.expenses = fetch_expenses(&client, server).unwrap_or_else(|e| {
        eprintln!("saguaro-cli: could not fetch expenses: {}", e);
        Vec::new()
    });

    println!("{}", WELCOME);
    if !session.expenses.is_empty() {
        println!(
            "({} submitted expenses loaded for reference)",
            session.expenses.len()
        );
    }
    println!();

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        let outcome = send_chat_turn(&client, server, message, &session);
        session.push_turn(message, &outcome);
        print_reply(&outcome);

        // Flag persistence is client-driven, mirroring the server's
        // stateless chat endpoint.
        if outcome.flagged {
            if let Err(e) = save_flag(&client, server, message, &outcome) {
                eprintln!("saguaro-cli: failed to save flag: {}", e);
            }
        }
    }

    Ok(())
}

fn do_submit(
    server: &str,
    property: String,
    amount: String,
    vendor: String,
    note: String,
    submitted_by: String,
    receipt: Option<PathBuf>,
) -> anyhow::Result<()> {
    if property.trim().is_empty() {
        eprintln!("saguaro-cli: a property address is required");
        std::process::exit(1);
    }

    let client = make_client(60)?;

    let mut form = reqwest::blocking::multipart::Form::new()
        .text("property", property)
        .text("amount", amount)
        .text("vendor", vendor)
        .text("note", note)
        .text("submittedBy", submitted_by);

    if let Some(path) = receipt {
        form = form.file("receipt", &path)?;
    }

    let resp = client
        .post(format!("{}/api/expenses", server))
        .multipart(form)
        .send();

    let resp = match resp {
        Ok(r) => r,
        Err(e) => {
            eprintln!("saguaro-cli: connection failed: {}", e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        eprintln!("Failed to submit expense. Please try again.");
        std::process::exit(1);
    }

    let envelope: ExpenseEnvelope = resp.json()?;
    println!("Expense submitted:");
    println!("{}", format_expense(&envelope.expense));

    Ok(())
}

fn do_expenses(server: &str) -> anyhow::Result<()> {
    let client = make_client(30)?;

    let expenses = match fetch_expenses(&client, server) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("saguaro-cli: failed to fetch expenses: {}", e);
            std::process::exit(1);
        }
    };

    if expenses.is_empty() {
        println!("No submitted expenses.");
        return Ok(());
    }

    for e in &expenses {
        println!("{}", format_expense(e));
    }

    Ok(())
}

fn do_flags(server: &str) -> anyhow::Result<()> {
    let client = make_client(30)?;

    let resp = client.get(format!("{}/api/flags", server)).send();
    let flags = match resp.and_then(|r| r.json::<FlagsResponse>()) {
        Ok(body) => body.flags,
        Err(e) => {
            eprintln!("saguaro-cli: failed to fetch flags: {}", e);
            std::process::exit(1);
        }
    };

    if flags.is_empty() {
        println!("No flagged interactions.");
        return Ok(());
    }

    for f in &flags {
        println!("{}", format_flag(f));
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = make_client(10)?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Saguaro server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("PostgreSQL:     {}", body["postgresql"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("saguaro-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("saguaro-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Chat => run_chat(&server),
        Commands::Submit {
            property,
            amount,
            vendor,
            note,
            submitted_by,
            receipt,
        } => do_submit(&server, property, amount, vendor, note, submitted_by, receipt),
        Commands::Expenses => do_expenses(&server),
        Commands::Flags => do_flags(&server),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("saguaro-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
