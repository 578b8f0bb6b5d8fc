use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use ticketchain::error::LedgerError;
use ticketchain::persist;
use ticketchain::registry::Registry;

#[derive(Parser)]
#[command(
    name = "ticketchain",
    version,
    about = "Tamper-evident ticket ledger with hash-linked issuance records"
)]
struct Cli {
    /// Ledger snapshot file (default: ./ledger.json)
    #[arg(long, default_value = "ledger.json")]
    ledger: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger with a genesis block
    Init,
    /// Issue a ticket and append it to the ledger
    Issue {
        /// Buyer name or email
        buyer: String,
        /// Explicit ticket id (default: generated)
        #[arg(long)]
        ticket_id: Option<String>,
        /// Event name (also seeds the generated id prefix)
        #[arg(long)]
        event: Option<String>,
        /// Seat designation
        #[arg(long)]
        seat: Option<String>,
        /// Ticket price
        #[arg(long)]
        price: Option<String>,
        /// Extra descriptive fields as key=value (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Verify a ticket by its id
    Verify { ticket_id: String },
    /// Find all tickets bought by a buyer (case-insensitive)
    Buyer { name: String },
    /// Show the ledger, newest block first
    Ledger {
        /// Max blocks to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Verify the hash linkage of the whole chain
    Check,
    /// Show ledger statistics
    Stats,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => cmd_init(&cli.ledger),
        Commands::Issue {
            buyer,
            ticket_id,
            event,
            seat,
            price,
            fields,
        } => cmd_issue(&cli.ledger, &buyer, ticket_id, event, seat, price, fields),
        Commands::Verify { ticket_id } => cmd_verify(&cli.ledger, &ticket_id),
        Commands::Buyer { name } => cmd_buyer(&cli.ledger, &name),
        Commands::Ledger { limit } => cmd_ledger(&cli.ledger, limit),
        Commands::Check => cmd_check(&cli.ledger),
        Commands::Stats => cmd_stats(&cli.ledger),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_init(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(LedgerError::AlreadyInitialized.into());
    }
    let mut registry = Registry::new();
    registry.initialize()?;
    persist::save(&registry, path)?;
    println!("Initialized ledger at {}", path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_issue(
    path: &Path,
    buyer: &str,
    ticket_id: Option<String>,
    event: Option<String>,
    seat: Option<String>,
    price: Option<String>,
    extra: Vec<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut fields = extra;
    if let Some(event) = event {
        fields.push(("event".into(), event));
    }
    if let Some(seat) = seat {
        fields.push(("seat".into(), seat));
    }
    if let Some(price) = price {
        fields.push(("price".into(), price));
    }

    let mut registry = persist::load_or_init(path)?;
    let block = registry.issue(ticket_id, buyer, fields)?;
    persist::save(&registry, path)?;
    println!(
        "Issued {} to {} (block {}, hash {})",
        block.transaction.ticket_id,
        block.transaction.buyer,
        block.index,
        &block.content_hash[..10],
    );
    Ok(())
}

fn cmd_verify(path: &Path, ticket_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = persist::load(path)?;
    match registry.find_by_ticket_id(ticket_id.trim()) {
        Some(block) => {
            println!("Ticket is VALID");
            println!("Ticket ID: {}", block.transaction.ticket_id);
            println!("Buyer:     {}", block.transaction.buyer);
            for (k, v) in &block.transaction.fields {
                println!("{}: {}", k, v);
            }
            println!(
                "Block {} | {} | hash {}...",
                block.index,
                block.timestamp.format("%Y-%m-%d %H:%M:%S"),
                &block.content_hash[..10],
            );
        }
        None => println!("No record found. Ticket is INVALID or not registered."),
    }
    Ok(())
}

fn cmd_buyer(path: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = persist::load(path)?;
    let matches = registry.find_by_buyer(name);
    if matches.is_empty() {
        println!("No tickets found for this buyer.");
    } else {
        println!("Found {} ticket(s):", matches.len());
        for block in matches {
            let event = block.transaction.field("event").unwrap_or("-");
            println!(
                "  {} — {} (block {})",
                block.transaction.ticket_id, event, block.index,
            );
        }
    }
    Ok(())
}

fn cmd_ledger(path: &Path, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let registry = persist::load(path)?;
    let blocks: Vec<_> = registry.list_chain().collect();
    for block in blocks.iter().rev().take(limit) {
        if block.index == 0 {
            println!("0 genesis");
            continue;
        }
        println!(
            "{} {} {} {} {}... prev {}...",
            block.index,
            block.timestamp.format("%Y-%m-%d %H:%M:%S"),
            block.transaction.ticket_id,
            block.transaction.buyer,
            &block.content_hash[..10],
            &block.previous_hash[..10],
        );
    }
    Ok(())
}

fn cmd_check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let registry = persist::load(path)?;
    let report = registry.check_integrity();
    println!("{}", report);
    if !report.ok {
        return Err(LedgerError::Corruption(report.to_string()).into());
    }
    Ok(())
}

fn cmd_stats(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let registry = persist::load(path)?;
    print!("{}", registry.stats());
    Ok(())
}
