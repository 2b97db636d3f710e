// Licensed under the Apache-2.0 license

//! Single command exchanges between the host engine and simulated firmware.

#[cfg(test)]
mod test {
    use crate::test::{one_mailbox, start, start_with_handler};
    use emulator_hfrp_host::{CommandResponse, HfrpConfig};
    use emulator_periph::CommandHandler;
    use hfrp_common::commands::{CommandIndex, FwVersionResp, HFRP_RSP_STATUS_UNSUPPORTED};
    use hfrp_common::{HfrpHeader, MailboxAperture, MailboxRing, Ring, HFRP_MAX_PAYLOAD_SIZE};
    use std::sync::{Arc, Mutex};
    use zerocopy::FromBytes;

    /// Answers command 7 with status 1 and a fixed 4 byte payload.
    struct FixedResponder {
        seen: Arc<Mutex<Vec<(u16, Vec<u8>)>>>,
    }

    impl CommandHandler for FixedResponder {
        fn handle(&mut self, command_index: u16, payload: &[u8]) -> (u16, Vec<u8>) {
            self.seen
                .lock()
                .unwrap()
                .push((command_index, payload.to_vec()));
            (1, vec![0xDE, 0xAD, 0xBE, 0xEF])
        }
    }

    #[test]
    fn test_command_7_round_trip() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let harness = start_with_handler(
            HfrpConfig::default(),
            FixedResponder { seen: seen.clone() },
        );
        let mbox = &harness.mbox;
        let io = *mbox.io_info();
        assert_eq!(io.command.capacity(), 256);
        assert_eq!(io.response.capacity(), 256);

        let payload: Vec<u8> = (0..10).collect();
        let response = mbox.post_command_blocking(7, &payload, 16).unwrap();
        assert_eq!(
            response,
            CommandResponse {
                response_status: 1,
                payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }
        );
        assert_eq!(*seen.lock().unwrap(), vec![(7, payload.clone())]);

        // Sequence ID 0 was used and released.
        assert_eq!(mbox.outstanding_requests(), 0);
        let command = Ring::new(mbox.aperture(), &io, MailboxRing::Command);
        assert_eq!(command.head(), 14);
        let word = mbox.aperture().read_word(io.command.start_addr);
        let header = HfrpHeader::from_le_bytes(word.to_le_bytes());
        assert_eq!(header.size(), 14);
        assert_eq!(header.sequence_id(), 0);
        assert_eq!(header.command_index(), 7);

        let response_ring = Ring::new(mbox.aperture(), &io, MailboxRing::Response);
        assert_eq!(response_ring.head(), 8);
        assert!(response_ring.is_empty());
    }

    #[test]
    fn test_default_commands() {
        let harness = start(HfrpConfig::default());
        let mbox = &harness.mbox;

        let echo = mbox
            .post_command_blocking(CommandIndex::ECHO.0, b"ping", HFRP_MAX_PAYLOAD_SIZE)
            .unwrap();
        assert_eq!(echo.payload, b"ping");

        let version = mbox
            .post_command_blocking(CommandIndex::GET_FW_VERSION.0, &[], 8)
            .unwrap();
        let version = FwVersionResp::read_from_bytes(&version.payload).unwrap();
        assert_eq!((version.major, version.minor), (1, 0));

        let unknown = mbox.post_command_blocking(0x155, &[], 0).unwrap();
        assert_eq!(unknown.response_status, HFRP_RSP_STATUS_UNSUPPORTED);
        assert!(unknown.payload.is_empty());
    }

    #[test]
    fn test_one_mailbox_wraps_many_times() {
        let harness = start(one_mailbox());
        let mbox = &harness.mbox;
        assert_eq!(mbox.io_info().command.capacity(), 116);

        for i in 0..200u32 {
            let len = (i as usize * 7) % (HFRP_MAX_PAYLOAD_SIZE + 1);
            let payload: Vec<u8> = (0..len).map(|b| (b as u32 ^ i) as u8).collect();
            let rsp = mbox
                .post_command_blocking(CommandIndex::ECHO.0, &payload, HFRP_MAX_PAYLOAD_SIZE)
                .unwrap();
            assert_eq!(rsp.payload, payload, "iteration {i}");
        }
        assert_eq!(mbox.outstanding_requests(), 0);
    }
}
