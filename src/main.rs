use clap::Parser;
use std::process;
use taskplan::cli::{Cli, Commands, ProjectCommand, TaskCommand};
use taskplan::cli_handlers;
use taskplan::mcp::run_mcp_server;

#[tokio::main]
async fn main() {
    // Logs go to stderr, stdout carries command output and MCP traffic
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = cli.db.as_path();

    let result = match cli.command {
        Commands::Init => cli_handlers::handle_init(db),
        Commands::Project(command) => match command {
            ProjectCommand::Add { title, desc } => {
                cli_handlers::handle_project_add(db, &title, desc.as_deref())
            }
            ProjectCommand::List => cli_handlers::handle_project_list(db),
            ProjectCommand::Show { id } => cli_handlers::handle_project_show(db, id),
            ProjectCommand::Edit {
                id,
                title,
                desc,
                no_desc,
            } => cli_handlers::handle_project_edit(
                db,
                id,
                title.as_deref(),
                desc.as_deref(),
                no_desc,
            ),
            ProjectCommand::Delete { id } => cli_handlers::handle_project_delete(db, id),
            ProjectCommand::Use { id } => cli_handlers::handle_project_use(db, id),
        },
        Commands::Task(command) => match command {
            TaskCommand::Add {
                title,
                project,
                due,
                hours,
            } => cli_handlers::handle_task_add(db, &title, project, due.as_deref(), hours),
            TaskCommand::Edit {
                id,
                title,
                due,
                no_due,
                hours,
                no_hours,
            } => cli_handlers::handle_task_edit(
                db,
                id,
                title.as_deref(),
                due.as_deref(),
                no_due,
                hours,
                no_hours,
            ),
            TaskCommand::Toggle { id } => cli_handlers::handle_task_toggle(db, id),
            TaskCommand::Delete { id } => cli_handlers::handle_task_delete(db, id),
        },
        Commands::Schedule {
            project,
            input,
            json,
        } => cli_handlers::handle_schedule(db, project, input.as_deref(), json),
        Commands::Mcp => {
            if let Err(e) = run_mcp_server(db).await {
                eprintln!("MCP server error: {e}");
                process::exit(1);
            }
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
