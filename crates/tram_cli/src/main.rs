//! `tram` command-line front end over `tram_core`.
//!
//! # Responsibility
//! - Map operator commands onto registry services.
//! - Print results as JSON on stdout and failures as JSON on stderr.
//!
//! Usage:
//!   tram stop add "Main St"
//!   tram connection add 1 2 --minutes 3
//!   tram route create --number 7 --stops 1,2,3
//!   tram route update 7 --json '{"number": 8, "stops": [{"id": 1}, {"id": 2}]}'

mod error;

use clap::{Args, Parser, Subcommand};
use error::CliError;
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tram_core::repo::connection_repo::SqliteConnectionGraph;
use tram_core::repo::stop_repo::SqliteStopStore;
use tram_core::service::connection_service::ConnectionService;
use tram_core::service::stop_service::StopService;
use tram_core::{
    init_logging, open_db, RegistryConfig, RouteDraft, RouteNumber, RouteService, StopId,
};

#[derive(Parser, Debug)]
#[command(name = "tram")]
#[command(version, about = "Tram network registry: stops, connections and routes")]
struct Cli {
    /// Config file (falls back to TRAM_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding `[database] path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage stops
    #[command(subcommand)]
    Stop(StopCommand),
    /// Manage connections between stops
    #[command(subcommand)]
    Connection(ConnectionCommand),
    /// Manage routes
    #[command(subcommand)]
    Route(RouteCommand),
}

#[derive(Subcommand, Debug)]
enum StopCommand {
    /// Create a stop
    Add { name: String },
    /// Rename the stop addressed by slug
    Rename { slug: String, name: String },
    /// List all stops
    List,
    /// Show a stop with the routes through it
    Show { slug: String },
    /// Delete a stop with its connections and route memberships
    Delete { slug: String },
}

#[derive(Subcommand, Debug)]
enum ConnectionCommand {
    /// Connect two stops
    Add {
        stop_a: StopId,
        stop_b: StopId,
        /// Travel time in minutes (defaults to `[network] default_travel_time_minutes`)
        #[arg(long, allow_negative_numbers = true)]
        minutes: Option<i64>,
    },
    /// List all connections
    List,
    /// List stops one hop away from a stop
    Neighbors { stop: StopId },
    /// Delete a connection by id
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum RouteCommand {
    /// Create a route
    Create(RouteInput),
    /// Replace number and membership of an existing route
    Update {
        /// Number the route currently has
        #[arg(value_name = "NUMBER", allow_negative_numbers = true)]
        current: RouteNumber,
        #[command(flatten)]
        input: RouteInput,
    },
    /// List route summaries
    List,
    /// Show a route with its ordered stops
    Show {
        #[arg(allow_negative_numbers = true)]
        number: RouteNumber,
    },
    /// Delete a route
    Delete {
        #[arg(allow_negative_numbers = true)]
        number: RouteNumber,
    },
}

#[derive(Args, Debug)]
struct RouteInput {
    /// Route number
    #[arg(long, required_unless_present = "json", allow_negative_numbers = true)]
    number: Option<RouteNumber>,

    /// Ordered stop ids, comma separated
    #[arg(long, value_delimiter = ',', conflicts_with = "json")]
    stops: Vec<StopId>,

    /// Raw `{"number", "stops": [{"id"}]}` payload
    #[arg(long, conflicts_with = "number")]
    json: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_json());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = RegistryConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &config.logging.dir {
        init_logging(config.logging.level, &absolute(dir)?)?;
    }

    let db_path = cli.db.unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)?;
    debug!(
        "event=cli_start module=cli status=ok db={} command={}",
        db_path.display(),
        cli.command.label()
    );

    match cli.command {
        Command::Stop(command) => {
            let service = StopService::new(SqliteStopStore::try_new(&conn)?);
            match command {
                StopCommand::Add { name } => print_json(&service.create_stop(&name)?),
                StopCommand::Rename { slug, name } => {
                    print_json(&service.rename_stop_by_slug(&slug, &name)?)
                }
                StopCommand::List => print_json(&service.list_stops()?),
                StopCommand::Show { slug } => {
                    print_json(&RouteService::try_new(&conn)?.stop_detail(&slug)?)
                }
                StopCommand::Delete { slug } => {
                    service.delete_stop_by_slug(&slug)?;
                    print_json(&serde_json::json!({ "deleted": slug }))
                }
            }
        }
        Command::Connection(command) => {
            let service = ConnectionService::new(
                SqliteConnectionGraph::try_new(&conn)?,
                SqliteStopStore::try_new(&conn)?,
            )
            .with_default_travel_time(config.default_travel_time());
            match command {
                ConnectionCommand::Add {
                    stop_a,
                    stop_b,
                    minutes,
                } => print_json(&service.connect(stop_a, stop_b, minutes)?),
                ConnectionCommand::List => print_json(&service.list_connections()?),
                ConnectionCommand::Neighbors { stop } => print_json(&service.neighbors(stop)?),
                ConnectionCommand::Delete { id } => {
                    service.disconnect(id)?;
                    print_json(&serde_json::json!({ "deleted": id }))
                }
            }
        }
        Command::Route(command) => {
            let service = RouteService::try_new(&conn)?;
            match command {
                RouteCommand::Create(input) => {
                    let detail = match input.into_payload()? {
                        RoutePayload::Draft(draft) => service.create_route(&draft)?,
                        RoutePayload::Json(value) => service.create_route_from_json(&value)?,
                    };
                    print_json(&detail)
                }
                RouteCommand::Update { current, input } => {
                    let detail = match input.into_payload()? {
                        RoutePayload::Draft(draft) => service.update_route(current, &draft)?,
                        RoutePayload::Json(value) => {
                            service.update_route_from_json(current, &value)?
                        }
                    };
                    print_json(&detail)
                }
                RouteCommand::List => print_json(&service.list_routes()?),
                RouteCommand::Show { number } => print_json(&service.get_route(number)?),
                RouteCommand::Delete { number } => {
                    service.delete_route(number)?;
                    print_json(&serde_json::json!({ "deleted": number }))
                }
            }
        }
    }
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Self::Stop(_) => "stop",
            Self::Connection(_) => "connection",
            Self::Route(_) => "route",
        }
    }
}

enum RoutePayload {
    Draft(RouteDraft),
    Json(Value),
}

impl RouteInput {
    fn into_payload(self) -> Result<RoutePayload, CliError> {
        if let Some(raw) = self.json {
            return Ok(RoutePayload::Json(serde_json::from_str(&raw)?));
        }
        let number = self.number.ok_or(CliError::Usage("--number is required"))?;
        Ok(RoutePayload::Draft(RouteDraft::new(number, self.stops)))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn absolute(dir: &Path) -> Result<PathBuf, CliError> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(dir))
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, RouteCommand, RoutePayload};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn route_create_parses_comma_separated_stops() {
        let cli = Cli::parse_from(["tram", "route", "create", "--number", "7", "--stops", "3,1,2"]);
        let Command::Route(RouteCommand::Create(input)) = cli.command else {
            panic!("expected route create");
        };
        match input.into_payload().unwrap() {
            RoutePayload::Draft(draft) => {
                assert_eq!(draft.number, 7);
                assert_eq!(draft.stops, vec![3, 1, 2]);
            }
            RoutePayload::Json(_) => panic!("expected draft payload"),
        }
    }

    #[test]
    fn route_update_accepts_raw_json() {
        let cli = Cli::parse_from([
            "tram",
            "route",
            "update",
            "7",
            "--json",
            r#"{"number": 8, "stops": [{"id": 1}, {"id": 2}]}"#,
        ]);
        let Command::Route(RouteCommand::Update { current, input }) = cli.command else {
            panic!("expected route update");
        };
        assert_eq!(current, 7);
        assert!(matches!(input.into_payload().unwrap(), RoutePayload::Json(_)));
    }

    #[test]
    fn route_json_conflicts_with_explicit_stops() {
        let result = Cli::try_parse_from([
            "tram", "route", "create", "--json", "{}", "--stops", "1,2",
        ]);
        assert!(result.is_err());
    }
}
