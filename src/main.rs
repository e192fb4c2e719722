mod app;
mod cli;

use bugboy_core::config::Config;
use bugboy_server::routes::{BUG_ROUTES, HEALTH_ROUTE};
use clap::Parser;
use cli::{Cli, Command, RunArgs};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(cli.run)) {
        Command::Run(args) => cmd_run(args),
        Command::Routes => {
            cmd_routes();
            Ok(())
        }
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    // Logging needs the file settings before anything else can be logged;
    // a load failure is reported once the subscriber exists.
    let loaded = Config::load(&args.config);
    let (to_file, log_dir) = match &loaded {
        Ok(cfg) => (cfg.logging_to_file, cfg.log_dir.clone()),
        Err(_) => (false, None),
    };
    let _guard =
        bugboy_core::lifecycle::logging::init_logging(&args.log_level, to_file, log_dir.as_deref());

    // Build and run on a multi-thread runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let application = app::Application::build(&args, loaded)?;
        application.serve().await
    })
}

fn cmd_routes() {
    println!("{:<6} {:<40} {}", "METHOD", "PATH", "BEHAVIOR");
    for route in std::iter::once(&HEALTH_ROUTE).chain(BUG_ROUTES) {
        let marker = if route.fatal { " [fatal]" } else { "" };
        println!(
            "{:<6} {:<40} {}{marker}",
            route.method, route.path, route.description
        );
    }
}
