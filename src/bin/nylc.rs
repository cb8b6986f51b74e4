// nyl -- a small compiled and interpreted programming language
// Copyright (C) 2025  The nyl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `nylc` - the nyl compiler driver.

use std::path::PathBuf;

use structopt::StructOpt;

use nyl::compiler;

#[derive(Debug, StructOpt)]
#[structopt(name = "nylc", about = "Compiling and running nyl programs")]
struct Opt {
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,

    /// Directory that `std/` imports resolve under.
    #[structopt(long = "std", parse(from_os_str), default_value = "std")]
    std_root: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Run a program through the tree-walking interpreter.
    #[structopt(name = "run")]
    Run {
        #[structopt(parse(from_os_str))]
        source: PathBuf,
    },
    /// Same as `run`; kept distinct for when a native backend is linked in.
    #[structopt(name = "interp")]
    Interp {
        #[structopt(parse(from_os_str))]
        source: PathBuf,
    },
    /// Parse a program and dump its tree.
    #[structopt(name = "ast")]
    Ast {
        #[structopt(parse(from_os_str))]
        source: PathBuf,
    },
}

fn main() {
    let opt = Opt::from_args();

    let level = if opt.verbose {
        log::Level::Trace
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(level).unwrap();

    let opts = compiler::Options {
        std_root: opt.std_root,
        ..Default::default()
    };

    let code = match opt.command {
        Command::Run { source } | Command::Interp { source } => {
            match compiler::run_file(&source, &opts) {
                Ok(code) => code,
                Err(_) => 1,
            }
        }
        Command::Ast { source } => match compiler::dump_ast(&source, &opts) {
            Ok(text) => {
                print!("{}", text);
                0
            }
            Err(_) => 1,
        },
    };
    std::process::exit(code as i32);
}
