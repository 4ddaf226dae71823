use std::process::ExitCode;

use clap::Parser;
use git_deploy::cli::Cli;
use git_deploy::error::DeployError;
use git_deploy::report;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env = env_logger::Env::default().default_filter_or(cli.log_level.as_str());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();

    match cli.execute() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<DeployError>() {
                Some(
                    run_error @ (DeployError::LockFailed { .. } | DeployError::Validation(_)),
                ) => eprint!("{}", report::render_abort(run_error)),
                _ => eprintln!("{e:#}\nAborting."),
            }
            ExitCode::FAILURE
        }
    }
}
