use clap::Parser;
use database::Database;

pub mod audit;

use audit::AuditLog;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub audit: AuditLog,
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:cards.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Record every request in the `logs` table.
    #[arg(long, env = "AUDIT_LOG", default_value_t = true, action = clap::ArgAction::Set)]
    pub audit_log: bool,
}
