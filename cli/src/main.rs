use std::fmt::Write as _;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tabula_core::{QueryBuilder, TableDescriptor};
use tabula_sqlite::{
    Locator, Model, RemoteColumn, RemoteIndex, SchemaChange, change_statement, describe_table,
    list_indexes, plan, record,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Student {
        #[column = "id"]
        pub id: i64,
        #[column = "age"]
        #[index = "unique"]
        pub age: i64,
        #[column = "update_time"]
        #[index = ""]
        pub update_time: i64,
        #[column = "create_time"]
        pub create_time: i64,
    }
}

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "tabula")]
#[command(about = "Reconcile and inspect record tables in SQLite")]
struct Cli {
    /// Log every executed statement.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the student model, seeding it on first creation.
    Demo(DemoArgs),
    /// Show the changes opening the student model would apply.
    Plan(PlanArgs),
    /// Print the engine catalog of a table.
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct DemoArgs {
    /// Database locator: a file path, or ":memory:".
    #[arg(long, default_value = "./app.db")]
    db: String,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Database locator: a file path, or ":memory:".
    #[arg(long, default_value = "./app.db")]
    db: String,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Database locator: a file path, or ":memory:".
    #[arg(long, default_value = "./app.db")]
    db: String,
    /// Table name.
    #[arg(long)]
    table: String,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: CliOutputFormat,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Demo(args) => run_demo(args),
        Command::Plan(args) => run_plan(args),
        Command::Inspect(args) => run_inspect(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tabula_sqlite=debug,tabula=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabula_sqlite=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// demo command
// ---------------------------------------------------------------------------

fn run_demo(args: DemoArgs) -> Result<(), String> {
    let mut changes: Vec<SchemaChange> = Vec::new();
    let students = Model::<Student>::open_with_sink(args.db.as_str(), &mut changes)
        .map_err(|e| format!("Failed to open model: {e}"))?;
    info!(changes = changes.len(), created = students.created(), "Model ready");

    if students.created() {
        let seed = [(18, 1_700_000_000), (21, 1_700_000_100), (34, 1_700_000_200)];
        let records: Vec<_> = seed
            .iter()
            .map(|&(age, time)| Student {
                id: 0,
                age,
                update_time: time,
                create_time: time,
            })
            .collect();
        let ids = students
            .insert_all(&records)
            .map_err(|e| format!("Seed failed: {e}"))?;
        println!("Seeded {} students into new table '{}'.", ids.len(), students.table_name());
    }

    let any = students
        .exists_where("", [])
        .map_err(|e| format!("Query failed: {e}"))?;
    println!("{any}");

    let rows = students
        .query_where("", [])
        .map_err(|e| format!("Query failed: {e}"))?;
    print!("{}", format_students(&rows));
    Ok(())
}

fn format_students(rows: &[Student]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>6}  {:>4}  {:>12}  {:>12}", "id", "age", "update_time", "create_time");
    for row in rows {
        let _ = writeln!(
            out,
            "{:>6}  {:>4}  {:>12}  {:>12}",
            row.id, row.age, row.update_time, row.create_time
        );
    }
    out
}

// ---------------------------------------------------------------------------
// plan command
// ---------------------------------------------------------------------------

fn run_plan(args: PlanArgs) -> Result<(), String> {
    let locator = Locator::parse(&args.db);
    let desc = TableDescriptor::of::<Student>().map_err(|e| format!("Invalid record: {e}"))?;

    // a missing file plans a full create without being created
    let (columns, indexes) = if locator.is_missing() {
        (Vec::new(), Vec::new())
    } else {
        let conn = locator.open_read_only().map_err(|e| e.to_string())?;
        (
            describe_table(&conn, &desc.table_name).map_err(|e| e.to_string())?,
            list_indexes(&conn, &desc.table_name).map_err(|e| e.to_string())?,
        )
    };
    let plan = plan(&desc, &columns, &indexes)
        .map_err(|e| format!("Table '{}' cannot be reconciled: {e}", desc.table_name))?;

    if plan.is_empty() {
        println!("Table '{}' in '{locator}' is up to date.", desc.table_name);
        return Ok(());
    }

    let builder = QueryBuilder::new(&desc);
    for change in &plan.changes {
        let marker = if change.is_destructive() { '-' } else { '+' };
        println!("{marker} {}", change_statement(&builder, change).sql);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// inspect command
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TableReport {
    table: String,
    columns: Vec<RemoteColumn>,
    indexes: Vec<RemoteIndex>,
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let locator = Locator::parse(&args.db);
    if locator.is_missing() {
        return Err(format!("Database '{locator}' does not exist"));
    }
    let conn = locator.open_read_only().map_err(|e| e.to_string())?;
    let report = TableReport {
        columns: describe_table(&conn, &args.table).map_err(|e| e.to_string())?,
        indexes: list_indexes(&conn, &args.table).map_err(|e| e.to_string())?,
        table: args.table,
    };
    if report.columns.is_empty() {
        return Err(format!("Table '{}' does not exist", report.table));
    }

    let rendered = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to render report: {e}"))?,
        CliOutputFormat::Table => format_report(&report),
    };
    println!("{rendered}");
    Ok(())
}

fn format_report(report: &TableReport) -> String {
    let mut out = format!("table {}\n", report.table);
    for column in &report.columns {
        let pk = if column.primary_key { " (pk)" } else { "" };
        let _ = writeln!(out, "  column {} {}{pk}", column.name, column.column_type);
    }
    for index in &report.indexes {
        let unique = if index.is_unique { "unique " } else { "" };
        let column = index.column_name.as_deref().unwrap_or("<expr>");
        let _ = writeln!(out, "  {unique}index {} on {column} [{}]", index.name, index.origin);
    }
    out.trim_end().to_string()
}
