// Licensed under the Apache-2.0 license

mod test_concurrency;
mod test_end_to_end;
mod test_error_paths;

#[cfg(test)]
mod test {
    use emulator_hfrp_host::{HfrpConfig, HfrpMailbox};
    use emulator_periph::{
        CommandHandler, DefaultCommandHandler, HfrpFirmware, HfrpFirmwareThread,
        HfrpMailboxWindow,
    };
    use log::LevelFilter;
    use simple_logger::SimpleLogger;
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) const FW_POLL_INTERVAL: Duration = Duration::from_micros(20);

    pub(crate) fn init_logger() {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    /// Host engine wired to a firmware thread over a shared window.
    pub(crate) struct Harness<H: CommandHandler + 'static = DefaultCommandHandler> {
        pub mbox: Arc<HfrpMailbox<HfrpMailboxWindow>>,
        pub firmware: HfrpFirmwareThread<H>,
    }

    pub(crate) fn start(config: HfrpConfig) -> Harness {
        start_with_handler(config, DefaultCommandHandler::default())
    }

    pub(crate) fn start_with_handler<H: CommandHandler + 'static>(
        config: HfrpConfig,
        handler: H,
    ) -> Harness<H> {
        init_logger();
        let window = HfrpMailboxWindow::new(config.io_info().unwrap());
        let firmware =
            HfrpFirmwareThread::start(HfrpFirmware::new(window.clone(), handler), FW_POLL_INTERVAL);
        Harness {
            mbox: Arc::new(HfrpMailbox::new(window, config).unwrap()),
            firmware,
        }
    }

    pub(crate) fn one_mailbox() -> HfrpConfig {
        HfrpConfig {
            command_mailbox: 0,
            response_mailbox: 0,
            ..Default::default()
        }
    }
}
