use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{StoreError, StoreResult};

/// Pending answer to a single store request.
#[derive(Debug)]
pub struct Reply<T> {
    rx: Receiver<StoreResult<T>>,
}

/// Sending half of a [`Reply`]. Dropping it without sending makes the waiter
/// observe [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct Replier<T> {
    tx: Sender<StoreResult<T>>,
}

impl<T> Reply<T> {
    pub fn channel() -> (Replier<T>, Reply<T>) {
        let (tx, rx) = channel::bounded(1);
        (Replier { tx }, Reply { rx })
    }

    pub fn ready(res: StoreResult<T>) -> Self {
        let (replier, reply) = Self::channel();
        replier.send(res);
        reply
    }

    pub fn wait(self) -> StoreResult<T> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(StoreError::Unavailable("reply dropped".into())))
    }

    pub fn wait_timeout(self, timeout: Duration) -> StoreResult<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => Err(StoreError::Unavailable(format!(
                "no reply within {:?}",
                timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(StoreError::Unavailable("reply dropped".into()))
            }
        }
    }
}

impl<T> Replier<T> {
    pub fn send(self, res: StoreResult<T>) {
        // The waiter may have given up already.
        if self.tx.send(res).is_err() {
            tracing::debug!("reply receiver gone, dropping answer");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Reply;
    use crate::error::StoreError;

    #[test]
    fn ready_reply() {
        let reply = Reply::ready(Ok(3u32));
        assert_eq!(reply.wait(), Ok(3));
    }

    #[test]
    fn dropped_replier_is_unavailable() {
        let (replier, reply) = Reply::<u32>::channel();
        drop(replier);
        assert!(matches!(reply.wait(), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn reply_from_other_thread() {
        let (replier, reply) = Reply::channel();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            replier.send(Ok("done".to_string()));
        });
        assert_eq!(reply.wait_timeout(Duration::from_secs(5)), Ok("done".to_string()));
        handle.join().unwrap();
    }

    #[test]
    fn timeout_is_unavailable() {
        let (replier, reply) = Reply::<u32>::channel();
        let res = reply.wait_timeout(Duration::from_millis(5));
        assert!(matches!(res, Err(StoreError::Unavailable(msg)) if msg.contains("no reply")));
        // Late answers are discarded without panicking.
        replier.send(Ok(1));
    }
}
