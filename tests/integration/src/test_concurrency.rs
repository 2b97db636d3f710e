// Licensed under the Apache-2.0 license

//! Many host threads sharing one engine.

#[cfg(test)]
mod test {
    use crate::test::{one_mailbox, start};
    use emulator_hfrp_host::HfrpConfig;
    use hfrp_common::commands::CommandIndex;
    use hfrp_common::{MailboxRing, Ring, HFRP_MAX_PAYLOAD_SIZE};
    use rand::Rng;
    use std::thread;

    fn hammer(config: HfrpConfig, threads: usize, requests: usize, max_len: usize) {
        let harness = start(config);
        let workers: Vec<_> = (0..threads)
            .map(|t| {
                let mbox = harness.mbox.clone();
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for i in 0..requests {
                        let len = rng.gen_range(1..=max_len);
                        let mut payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
                        // Tag with the sender so a crossed response is caught.
                        payload[0] = t as u8;
                        let rsp = mbox
                            .post_command_blocking(
                                CommandIndex::ECHO.0,
                                &payload,
                                HFRP_MAX_PAYLOAD_SIZE,
                            )
                            .unwrap_or_else(|e| panic!("thread {t} request {i}: {e}"));
                        assert_eq!(rsp.payload, payload, "thread {t} request {i}");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mbox = &harness.mbox;
        assert_eq!(mbox.outstanding_requests(), 0);
        let io = mbox.io_info();
        let command = Ring::new(mbox.aperture(), io, MailboxRing::Command);
        let response = Ring::new(mbox.aperture(), io, MailboxRing::Response);
        // Every response was produced after its command was consumed.
        assert!(command.is_empty());
        assert!(response.is_empty());
    }

    #[test]
    fn test_concurrent_posts_two_mailbox() {
        hammer(HfrpConfig::default(), 4, 100, HFRP_MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_concurrent_posts_one_mailbox() {
        // Four small messages always fit in the 116 byte rings.
        hammer(one_mailbox(), 4, 100, 20);
    }
}
