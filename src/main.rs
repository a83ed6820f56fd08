use clap::Parser;
use faultline::console::AppBuilder;
use faultline::debugger::process;
use faultline::localize::{FaultLocalizer, LocalizeConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "source-level debugger with spectrum fault localization", long_about = None)]
struct Args {
    /// Executable to debug
    debugee: String,

    /// Debugee arguments for an interactive session
    args: Vec<String>,

    /// Run fault localization over a test-vectors file instead of the
    /// interactive console
    #[clap(long)]
    vectors: Option<PathBuf>,

    /// File the debugee writes its observed output into
    #[clap(long, default_value = "1.txt")]
    capture: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.vectors {
        Some(vectors) => {
            let localizer = FaultLocalizer::new(LocalizeConfig {
                program: args.debugee,
                vectors,
                capture: args.capture,
            });
            let report = localizer.run()?;
            log::info!(
                target: "localize",
                "{} suspicious line(s) reported",
                report.suspicious().len()
            );
        }
        None => {
            let mut argv = vec![args.debugee.clone()];
            argv.extend(args.args);
            let pid = process::launch(&args.debugee, &argv)?;
            AppBuilder::new().build(&args.debugee, pid)?.run()?;
        }
    }

    Ok(())
}
