// Copyright 2024 The stackwalk-diff Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stackwalk_diff::{load_dump, DumpDiff, LineWriter};

const USAGE: &str = "Usage: stackwalk-diff RUST_FILE BREAKPAD_FILE";

#[doc(hidden)]
#[macro_export]
macro_rules! handle_error {
    ($code:expr, $msg:expr, $($arg:tt)*) => {{
        eprintln!($msg, $($arg)*);
        std::process::exit($code);
    }};

    ($code:expr, $msg:expr) => {{
        eprintln!($msg);
        std::process::exit($code);
    }};
}

#[doc(hidden)]
struct Code;

impl Code {
    const SUCCESS: i32 = 0;
    const INVALID_ARGUMENT: i32 = 1;
    const INPUT_ERROR: i32 = 2;
    const OUTPUT_ERROR: i32 = 3;
}

#[doc(hidden)]
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// minidump-stackwalk output or processed crash (left)
    #[arg(allow_hyphen_values = true)]
    rust_file: String,

    /// breakpad stackwalker output or processed crash (right)
    #[arg(allow_hyphen_values = true)]
    breakpad_file: String,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

#[doc(hidden)]
fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                handle_error!(Code::INVALID_ARGUMENT, "{}", USAGE);
            }
        },
    };

    let left = match load_dump(&cli.rust_file) {
        Ok(dump) => dump,
        Err(err) => {
            handle_error!(Code::INPUT_ERROR, "Error: {}", err);
        }
    };
    let right = match load_dump(&cli.breakpad_file) {
        Ok(dump) => dump,
        Err(err) => {
            handle_error!(Code::INPUT_ERROR, "Error: {}", err);
        }
    };

    let mut writer = LineWriter::new(io::stdout().lock());
    if let Err(err) = writer.header(&cli.rust_file, &cli.breakpad_file) {
        handle_error!(Code::OUTPUT_ERROR, "Error: {}", err);
    }

    match DumpDiff::new().compare(&left, &right, &mut writer) {
        Ok(_) => std::process::exit(Code::SUCCESS),
        Err(err) => {
            handle_error!(Code::OUTPUT_ERROR, "Error: {}", err);
        }
    }
}
