use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zl_sim::{SimRecord, run_closed_loop};

mod scenario;
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "zl-cli")]
#[command(about = "zloop CLI - discrete PID control loop simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in step-response demo
    Demo {
        /// Final simulation time in seconds
        #[arg(long, default_value_t = 5.0)]
        t_end: f64,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a scenario from a YAML file
    Run {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Scenario error: {0}")]
    Scenario(#[from] serde_yaml::Error),

    #[error(transparent)]
    Sim(#[from] zl_sim::SimError),
}

fn main() -> Result<(), CliError> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { t_end, output } => {
            cmd_run(&Scenario::demo(t_end), output.as_deref())
        }
        Commands::Run {
            scenario_path,
            output,
        } => {
            let text = fs::read_to_string(&scenario_path)?;
            let scenario: Scenario = serde_yaml::from_str(&text)?;
            cmd_run(&scenario, output.as_deref())
        }
    }
}

fn cmd_run(scenario: &Scenario, output: Option<&Path>) -> Result<(), CliError> {
    let (mut controller, mut plant, opts) = scenario.build();
    let record = run_closed_loop(&mut controller, &mut plant, &scenario.program, &opts)?;

    match output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            write_csv(&mut file, &record)?;
            eprintln!("Wrote {} samples to {}", record.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            write_csv(&mut stdout.lock(), &record)?;
        }
    }
    Ok(())
}

fn write_csv<W: Write>(w: &mut W, record: &SimRecord) -> io::Result<()> {
    writeln!(w, "t,target,control,measured")?;
    for i in 0..record.len() {
        writeln!(
            w,
            "{:.6},{:.6},{:.6},{:.6}",
            record.t[i], record.target[i], record.control[i], record.measured[i]
        )?;
    }
    Ok(())
}
