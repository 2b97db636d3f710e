// Licensed under the Apache-2.0 license

use crate::config::HfrpFileConfig;
use anyhow::Context;
use clap::Parser;
use clap_num::maybe_hex;
use emulator_hfrp_host::{HfrpConfig, HfrpMailbox};
use emulator_periph::{HfrpFirmware, HfrpFirmwareThread, HfrpMailboxWindow};
use hfrp_common::commands::{CommandIndex, FwVersionResp, HFRP_RSP_STATUS_SUCCESS};
use hfrp_common::HFRP_MAX_PAYLOAD_SIZE;
use log::{error, info, LevelFilter};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use zerocopy::FromBytes;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, name = "HFRP Mailbox Emulator")]
pub struct EmulatorArgs {
    /// TOML file with mailbox settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Command mailbox index, overrides the config file
    #[arg(long, value_parser=maybe_hex::<u32>)]
    pub command_mailbox: Option<u32>,

    /// Response mailbox index, overrides the config file
    #[arg(long, value_parser=maybe_hex::<u32>)]
    pub response_mailbox: Option<u32>,

    /// Requests sent by each host thread
    #[arg(short, long, default_value_t = 16)]
    pub requests: usize,

    /// Host threads posting commands concurrently
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// Response doorbell timeout, overrides the config file
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Firmware polling interval
    #[arg(long, default_value_t = 50)]
    pub fw_poll_us: u64,

    #[arg(short, long, default_value = "info")]
    pub log_level: LevelFilter,
}

impl EmulatorArgs {
    /// Defaults, then the config file, then command line overrides.
    ///
    /// Fails when the merged mailbox indices do not select a layout.
    pub fn hfrp_config(&self) -> anyhow::Result<HfrpConfig> {
        let mut config = HfrpConfig::default();
        if let Some(path) = &self.config {
            HfrpFileConfig::load(path)?.apply(&mut config);
        }
        if let Some(mailbox) = self.command_mailbox {
            config.command_mailbox = mailbox;
        }
        if let Some(mailbox) = self.response_mailbox {
            config.response_mailbox = mailbox;
        }
        if let Some(ms) = self.timeout_ms {
            config.doorbell_timeout = Duration::from_millis(ms);
        }
        config.io_info().context("invalid mailbox configuration")?;
        Ok(config)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Sends one request and checks the response. Returns false on any mismatch.
fn exchange(mbox: &HfrpMailbox<HfrpMailboxWindow>, thread_id: usize, request: usize) -> bool {
    if request % 4 == 3 {
        return match mbox.post_command_blocking(CommandIndex::GET_FW_VERSION.0, &[], 8) {
            Ok(rsp) if rsp.response_status == HFRP_RSP_STATUS_SUCCESS => {
                match FwVersionResp::read_from_bytes(&rsp.payload) {
                    Ok(version) => {
                        info!(
                            "[{thread_id}] firmware version {}.{}.{}",
                            version.major, version.minor, version.build
                        );
                        true
                    }
                    Err(_) => {
                        error!("[{thread_id}] malformed version of {} bytes", rsp.payload.len());
                        false
                    }
                }
            }
            Ok(rsp) => {
                error!("[{thread_id}] version failed with status {:#x}", rsp.response_status);
                false
            }
            Err(err) => {
                error!("[{thread_id}] version failed: {} ({})", err, err.nv_status());
                false
            }
        };
    }

    let mut rng = rand::thread_rng();
    let len = rng.gen_range(0..=HFRP_MAX_PAYLOAD_SIZE);
    let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    match mbox.post_command_blocking(CommandIndex::ECHO.0, &payload, HFRP_MAX_PAYLOAD_SIZE) {
        Ok(rsp) if rsp.response_status == HFRP_RSP_STATUS_SUCCESS && rsp.payload == payload => true,
        Ok(rsp) => {
            error!(
                "[{thread_id}] echo mismatch: status {:#x}, {} of {} bytes",
                rsp.response_status,
                rsp.payload.len(),
                payload.len()
            );
            false
        }
        Err(err) => {
            error!("[{thread_id}] echo failed: {} ({})", err, err.nv_status());
            false
        }
    }
}

/// Runs the host engine against the simulated firmware.
pub fn run(args: &EmulatorArgs) -> anyhow::Result<RunSummary> {
    let config = args.hfrp_config()?;
    info!(
        "Starting HFRP emulator: mailboxes {}/{}, {} threads x {} requests",
        config.command_mailbox, config.response_mailbox, args.threads, args.requests
    );

    let window = HfrpMailboxWindow::new(config.io_info()?);
    let mut firmware = HfrpFirmwareThread::start(
        HfrpFirmware::with_default_handler(window.clone()),
        Duration::from_micros(args.fw_poll_us),
    );
    let mbox = Arc::new(HfrpMailbox::new(window, config)?);

    let workers: Vec<_> = (0..args.threads)
        .map(|thread_id| {
            let mbox = mbox.clone();
            let requests = args.requests;
            thread::spawn(move || {
                (0..requests)
                    .filter(|&request| exchange(&mbox, thread_id, request))
                    .count()
            })
        })
        .collect();

    let mut summary = RunSummary {
        requests: args.threads * args.requests,
        ..Default::default()
    };
    for worker in workers {
        summary.succeeded += worker
            .join()
            .map_err(|_| anyhow::anyhow!("host thread panicked"))?;
    }
    summary.failed = summary.requests - summary.succeeded;

    firmware.stop();
    if mbox.outstanding_requests() != 0 {
        error!(
            "{} sequence IDs still allocated",
            mbox.outstanding_requests()
        );
    }
    Ok(summary)
}
