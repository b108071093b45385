use clap::Parser;

use burrow::cli::{Cli, Commands, commands};
use burrow::config::CliOverrides;

fn main() {
    let cli = Cli::parse();
    burrow::logging::init(cli.verbose, cli.quiet);

    let overrides = CliOverrides {
        db: cli.db.clone(),
        actor: cli.actor.clone(),
        lock_timeout_ms: cli.lock_timeout,
    };

    let result = match cli.command {
        Commands::Init {
            ref prefix,
            flat,
            force,
        } => commands::init::execute(prefix.as_deref(), flat, force, cli.json, &overrides),
        Commands::Create(ref args) => commands::create::execute(args, cli.json, &overrides),
        Commands::Q(ref args) => commands::q::execute(args, &overrides),
        Commands::Show { ref ids } => commands::show::execute(ids, cli.json, &overrides),
        Commands::List(ref args) => commands::list::execute(args, cli.json, &overrides),
        Commands::Search(ref args) => commands::search::execute(args, cli.json, &overrides),
        Commands::Update(ref args) => commands::update::execute(args, cli.json, &overrides),
        Commands::Close { ref id, ref reason } => {
            commands::close::execute(id, reason.as_deref(), cli.json, &overrides)
        }
        Commands::Reopen { ref id } => commands::reopen::execute(id, cli.json, &overrides),
        Commands::Delete { ref id, yes } => {
            commands::delete::execute(id, yes, cli.json, &overrides)
        }
        Commands::Dep { ref command } => commands::dep::execute(command, cli.json, &overrides),
        Commands::Label { ref command } => commands::label::execute(command, cli.json, &overrides),
        Commands::Comment { ref command } => {
            commands::comment::execute(command, cli.json, &overrides)
        }
        Commands::Config { ref command } => {
            commands::config::execute(command, cli.json, &overrides)
        }
        Commands::Import(ref args) => commands::import::execute(args, cli.json, &overrides),
        Commands::Export { ref out } => commands::export::execute(out.as_deref(), &overrides),
        Commands::Counters { ref command } => {
            commands::counters::execute(command, cli.json, &overrides)
        }
        Commands::Stats => commands::stats::execute(cli.json, &overrides),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(suggestion) = e.suggestion() {
            eprintln!("  {suggestion}");
        }
        std::process::exit(e.exit_code());
    }
}
