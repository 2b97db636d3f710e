// Licensed under the Apache-2.0 license

//! Stale, oversized and unsolicited responses, timeouts and resets.

#[cfg(test)]
mod test {
    use crate::test::{init_logger, start, start_with_handler, FW_POLL_INTERVAL};
    use emulator_hfrp_host::{AsyncNotificationHandler, HfrpConfig, HfrpError, HfrpMailbox};
    use emulator_periph::{
        CommandHandler, HfrpFirmware, HfrpFirmwareThread, HfrpMailboxWindow,
    };
    use hfrp_common::commands::CommandIndex;
    use hfrp_common::{HfrpHeader, HFRP_MAX_PAYLOAD_SIZE};
    use poll_common::poll_until;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    /// Answers every command with `len` bytes, after `delay`.
    struct SizedResponder {
        len: usize,
        delay: Duration,
    }

    impl CommandHandler for SizedResponder {
        fn handle(&mut self, _command_index: u16, _payload: &[u8]) -> (u16, Vec<u8>) {
            thread::sleep(self.delay);
            (0, vec![0x42; self.len])
        }
    }

    #[test]
    fn test_stale_response_ignored() {
        let harness = start(HfrpConfig::default());
        harness.firmware.with_firmware(|fw| {
            fw.inject_response(HfrpHeader::with_payload(900, 0, 3), &[1, 2, 3]);
        });
        let rsp = harness
            .mbox
            .post_command_blocking(CommandIndex::ECHO.0, &[9], 4)
            .unwrap();
        assert_eq!(rsp.payload, vec![9]);
        assert_eq!(harness.mbox.outstanding_requests(), 0);
    }

    #[test]
    fn test_response_too_large_for_caller() {
        let harness = start_with_handler(
            HfrpConfig::default(),
            SizedResponder {
                len: 40,
                delay: Duration::ZERO,
            },
        );
        let mbox = &harness.mbox;
        assert_eq!(
            mbox.post_command_blocking(1, &[], 8),
            Err(HfrpError::BufferTooSmall {
                needed: 40,
                capacity: 8
            })
        );
        // The ring stayed consistent.
        let rsp = mbox.post_command_blocking(1, &[], 40).unwrap();
        assert_eq!(rsp.payload.len(), 40);
        assert_eq!(mbox.outstanding_requests(), 0);
    }

    #[test]
    fn test_oversized_injected_response() {
        init_logger();
        let config = HfrpConfig {
            doorbell_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let window = HfrpMailboxWindow::new(config.io_info().unwrap());
        let mbox = HfrpMailbox::new(window.clone(), config).unwrap();
        let mut fw = HfrpFirmware::with_default_handler(window);

        // The first post gets sequence ID 0 and finds this waiting for it.
        let oversized = [0u8; HFRP_MAX_PAYLOAD_SIZE + 4];
        fw.inject_response(HfrpHeader::with_payload(0, 0, oversized.len()), &oversized);
        assert_eq!(
            mbox.post_command_blocking(CommandIndex::ECHO.0, &[1], 8),
            Err(HfrpError::InsufficientResources {
                size: HFRP_MAX_PAYLOAD_SIZE + 4
            })
        );
        assert_eq!(mbox.outstanding_requests(), 0);

        // The real echo is now stale.
        assert_eq!(fw.service(), 1);
        assert_eq!(mbox.process_response(), 1);
        assert_eq!(mbox.outstanding_requests(), 0);

        let _firmware = HfrpFirmwareThread::start(fw, FW_POLL_INTERVAL);
        let rsp = mbox
            .post_command_blocking(CommandIndex::ECHO.0, &[2], 8)
            .unwrap();
        assert_eq!(rsp.payload, vec![2]);
    }

    #[derive(Default)]
    struct Notifications(Mutex<Vec<(u16, Vec<u8>)>>);

    impl AsyncNotificationHandler for Notifications {
        fn notification_received(&self, header: HfrpHeader, payload: &[u8]) {
            self.0
                .lock()
                .unwrap()
                .push((header.index_or_status(), payload.to_vec()));
        }
    }

    #[test]
    fn test_async_notification_delivered() {
        let harness = start(HfrpConfig::default());
        let notifications = Arc::new(Notifications::default());
        harness
            .mbox
            .set_async_notification_handler(Some(notifications.clone()));

        harness
            .firmware
            .with_firmware(|fw| fw.send_async_notification(0x3A, &[7, 7]));
        harness
            .mbox
            .post_command_blocking(CommandIndex::ECHO.0, &[], 0)
            .unwrap();

        assert_eq!(*notifications.0.lock().unwrap(), vec![(0x3A, vec![7, 7])]);
    }

    #[test]
    fn test_late_response_reclaims_kept_id() {
        let harness = start_with_handler(
            HfrpConfig {
                doorbell_timeout: Duration::from_millis(10),
                free_sequence_id_on_timeout: false,
                ..Default::default()
            },
            SizedResponder {
                len: 2,
                delay: Duration::from_millis(100),
            },
        );
        let mbox = &harness.mbox;
        assert_eq!(mbox.post_command_blocking(1, &[], 2), Err(HfrpError::Timeout));
        assert_eq!(mbox.outstanding_requests(), 1);

        poll_until(Duration::from_secs(5), Duration::from_millis(5), || {
            mbox.service_event();
            Ok(mbox.outstanding_requests() == 0)
        })
        .unwrap();
    }

    #[test]
    fn test_interface_reset_recovers() {
        init_logger();
        let config = HfrpConfig {
            doorbell_timeout: Duration::from_secs(30),
            ..Default::default()
        };
        let window = HfrpMailboxWindow::new(config.io_info().unwrap());
        let mbox = Arc::new(HfrpMailbox::new(window.clone(), config).unwrap());

        // No firmware yet, so the command is stuck.
        let waiter = {
            let mbox = mbox.clone();
            thread::spawn(move || mbox.post_command_blocking(CommandIndex::ECHO.0, &[5], 4))
        };
        poll_until(Duration::from_secs(5), Duration::from_millis(1), || {
            Ok(mbox.outstanding_requests() == 1)
        })
        .unwrap();
        mbox.interface_reset();
        assert_eq!(waiter.join().unwrap(), Err(HfrpError::InterfaceReset));

        let _firmware = HfrpFirmwareThread::start(
            HfrpFirmware::with_default_handler(window),
            FW_POLL_INTERVAL,
        );
        let rsp = mbox
            .post_command_blocking(CommandIndex::ECHO.0, &[6], 4)
            .unwrap();
        assert_eq!(rsp.payload, vec![6]);
    }

    #[test]
    fn test_disabled_engine() {
        let harness = start(HfrpConfig {
            enabled: false,
            ..Default::default()
        });
        let err = harness
            .mbox
            .post_command_blocking(CommandIndex::ECHO.0, &[], 0)
            .unwrap_err();
        assert_eq!(err, HfrpError::FeatureNotEnabled);
        assert_eq!(err.nv_status(), "NV_ERR_FEATURE_NOT_ENABLED");
    }
}
