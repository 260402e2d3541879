mod cli;
mod export;
mod inspect;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Export(args)) => export::export(args),
        Some(Command::Uniforms(args)) => inspect::print_uniforms(args),
        Some(Command::Shader(args)) => inspect::print_shader(args),
        None => run::run(cli.run),
    }
}
