//! dbconn - run a query through a tracked database connection.

use dbconn::cli::{Cli, OutputFormat};
use dbconn::config::Config;
use dbconn::connection::{Connection, Stopwatch};
use dbconn::db::{MockExecutor, PostgresExecutor, QueryExecutor};
use dbconn::error::{ConnError, Result};
use dbconn::logging;
use dbconn::output::{self, JsonReport};
use dbconn::progress::ProgressLine;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

fn main() {
    logging::init_stderr_logging();

    if let Err(e) = run() {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if cli.mock_db {
        info!("Using mock database");
        return run_query(&cli, Connection::new(MockExecutor::new()));
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let profile = cli.resolve_profile(&config)?;
    let target = profile.to_target()?;
    info!("Connection: {}", profile.display_string());

    let mut connection = Connection::new(PostgresExecutor::new()?);
    if let Some(descriptor) = target.descriptor {
        connection.set_connection_descriptor(descriptor);
    }
    if let Some(database) = target.database {
        connection.set_target_database(database);
    }

    run_query(&cli, connection)
}

fn run_query<E, S>(cli: &Cli, mut connection: Connection<E, S>) -> Result<()>
where
    E: QueryExecutor,
    S: Stopwatch,
{
    connection.subscribe(|| debug!("connection state changed"));
    let params = cli.bind_params();

    let result = if std::io::stderr().is_terminal() {
        let done = AtomicBool::new(false);
        let mut progress = ProgressLine::executing(connection.monitor());

        std::thread::scope(|scope| {
            scope.spawn(|| progress.run_until(&done, &mut std::io::stderr()));
            let result = connection.execute(&cli.query, &params);
            done.store(true, Ordering::Release);
            result
        })
    } else {
        connection.execute(&cli.query, &params)
    };

    let Some(result) = result else {
        return Err(ConnError::query("Query failed or produced no result set"));
    };

    match cli.output {
        OutputFormat::Text => {
            if cli.all {
                for set in connection.result_sets() {
                    println!("{}", output::render_table(set));
                }
            }
            print!("{}", output::render_table(&result));
        }
        OutputFormat::Json => {
            let retained = if cli.all {
                connection.result_sets()
            } else {
                &[]
            };
            let report = JsonReport {
                retained,
                result: &result,
                elapsed: connection.elapsed(),
            };
            println!("{}", output::render_json(&report)?);
        }
    }

    eprintln!("Time: {}", connection.elapsed());
    connection.close();

    Ok(())
}
