/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the HFRP mailbox emulator.

--*/

use clap::Parser;
use emulator::{run, EmulatorArgs};
use simple_logger::SimpleLogger;

fn main() -> anyhow::Result<()> {
    let cli = EmulatorArgs::parse();
    SimpleLogger::new().with_level(cli.log_level).init()?;

    let summary = run(&cli)?;
    println!(
        "HFRP emulator: {} requests, {} succeeded, {} failed",
        summary.requests, summary.succeeded, summary.failed
    );
    if summary.failed > 0 {
        anyhow::bail!("{} requests failed", summary.failed);
    }
    Ok(())
}
