use algorand_contracts::command_line::CommandLine;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    let cmd = CommandLine::parse_with_env(std::env::args_os().collect());
    cmd.execute().await
}
