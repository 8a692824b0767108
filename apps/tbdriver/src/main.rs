// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Context};
use env_logger::Target;
use std::fs::File;
use std::path::PathBuf;
use structopt::StructOpt;

use harness::{HarnessConfig, Registry};

#[derive(StructOpt)]
#[structopt(name = "tbdriver", about = "Cycle-accurate testbench for the ranking table")]
struct Arguments {
    /// Name of the test to run
    #[structopt(long)]
    run: Option<String>,
    /// List the registered tests and exit
    #[structopt(long)]
    list: bool,
    /// Print the test list as JSON
    #[structopt(long)]
    json: bool,
    #[structopt(short, long, default_value = "1")]
    seed: u64,
    /// Log at debug level
    #[structopt(short, long)]
    verbose: bool,
    /// Write the log to a file instead of stderr
    #[structopt(short, long, parse(from_os_str))]
    file: Option<PathBuf>,
    /// Stop after this many errors; 0 never stops
    #[structopt(long)]
    errors: Option<u64>,
    /// Test arguments, `key=value;key=value`
    #[structopt(short, long, number_of_values = 1)]
    args: Vec<String>,
    /// Dump a waveform of the unit's pins
    #[structopt(long)]
    vcd: bool,
    /// Waveform file, `<test>.vcd` by default
    #[structopt(long, parse(from_os_str))]
    vcd_file: Option<PathBuf>,
    /// YAML harness configuration
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
}

fn init_logging(args: &Arguments) -> anyhow::Result<()> {
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let target = match &args.file {
        Some(path) => Target::Pipe(Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?,
        )),
        None => Target::Stderr,
    };
    let _logger = env_logger::builder()
        .filter_level(level)
        .target(target)
        .try_init();
    Ok(())
}

fn list(registry: &Registry, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.info())?);
        return Ok(());
    }
    for info in registry.info() {
        println!("{:<20} {}", info.name, info.about);
        for (key, default) in &info.args {
            println!("{:<20}   {}={}", "", key, default);
        }
    }
    Ok(())
}

fn run(args: Arguments) -> anyhow::Result<i32> {
    init_logging(&args)?;
    let mut registry = Registry::new();
    tbdriver::init(&mut registry);

    if args.list {
        list(&registry, args.json)?;
        return Ok(0);
    }
    let name = match &args.run {
        Some(name) => name,
        None => bail!("no test given, use --run <test> or --list"),
    };

    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(errors) = args.errors {
        config.kernel.max_errors = errors;
    }
    if args.vcd || args.vcd_file.is_some() {
        config.kernel.vcd = Some(
            args.vcd_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.vcd", name))),
        );
    }
    log::info!("{}: seed {}", name, args.seed);

    let report = tbdriver::run_test(&registry, name, &args.args, config, args.seed)?;
    println!("{}", report);
    Ok(report.exit_code())
}

fn main() {
    let args = Arguments::from_args();
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}
