//! trino-eda - bootstrap an exploratory session against a Trino cluster.

use trino_eda::cli::Cli;
use trino_eda::config::{self, Config};
use trino_eda::db::MockQueryEngine;
use trino_eda::error::Result;
use trino_eda::logging;
use trino_eda::output::{render_result, render_schema};
use trino_eda::session::{bind_tables, bootstrap, Session};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    config::load_env_file(cli.env_file.as_deref())?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let mut connection = cli.resolve_connection(&config)?;
    connection.apply_env_defaults();

    let tables = cli.table_names();
    let exploration = if cli.mock_db {
        warn!("Using the in-memory engine; no network session is opened");
        let session = Session::with_engine(Box::new(MockQueryEngine::sample()), &connection);
        bind_tables(session, &tables).await?
    } else {
        bootstrap(&connection, &tables).await?
    };

    for table in &exploration.tables {
        if cli.no_preview {
            println!("{}", render_schema(table));
            continue;
        }

        let preview = exploration.session.head(table, cli.limit).await?;
        println!("{}", table.qualified_name());
        println!("{}", render_result(&preview));
    }

    exploration.session.close().await
}
