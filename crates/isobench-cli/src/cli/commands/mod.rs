pub mod sweep;

use crate::cli::args::{Cli, Command};

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::N1Sweep(args) => sweep::cmd_n1_sweep(args),
        Command::N2Sweep(args) => sweep::cmd_n2_sweep(args),
    }
}
