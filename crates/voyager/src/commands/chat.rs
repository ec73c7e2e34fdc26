//! Chat commands, including the streamed `send`.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use voyager_api::chat::MessagePage;
use voyager_api::{Error, ServiceClient, SseHandler};

use crate::cli::{ChatArgs, ChatCommand};
use crate::commands::Session;
use crate::error::CliError;
use crate::output;

/// Writes each delta to `out` as it arrives and keeps the first error.
///
/// A failed write (e.g. a closed pipe) shuts the client down, which
/// cancels the stream instead of reading it for nothing.
struct StreamSink<W> {
    out: W,
    client: ServiceClient,
    failure: Arc<Mutex<Option<CliError>>>,
}

impl<W: Write> StreamSink<W> {
    fn record(&self, err: CliError) {
        let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.client.is_shut_down() {
            return;
        }
        if let Err(e) = self.out.write_all(bytes).and_then(|()| self.out.flush()) {
            debug!(error = %e, "output closed, cancelling stream");
            self.client.shutdown();
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                self.record(e.into());
            }
        }
    }
}

impl<W: Write + Send> SseHandler for StreamSink<W> {
    fn on_message(&mut self, chunk: String) {
        self.write(chunk.as_bytes());
    }

    fn on_done(&mut self) {
        self.write(b"\n");
    }

    fn on_error(&mut self, error: Error) {
        self.record(error.into());
    }
}

pub async fn handle(session: &Session, args: ChatArgs) -> Result<(), CliError> {
    let chat = session.chat()?;

    match args.command {
        ChatCommand::Send {
            session_id,
            content,
        } => {
            let failure = Arc::new(Mutex::new(None));
            let sink = StreamSink {
                out: std::io::stdout(),
                client: chat.client().clone(),
                failure: Arc::clone(&failure),
            };
            let handle = chat.stream_message(&session_id, &content, sink)?;

            tokio::select! {
                () = handle.join() => {}
                _ = tokio::signal::ctrl_c() => {
                    chat.client().shutdown();
                    eprintln!();
                    return Ok(());
                }
            }

            let err = failure.lock().unwrap_or_else(PoisonError::into_inner).take();
            match err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        ChatCommand::New {
            user_id,
            name,
            role_id,
            bot_id,
        } => {
            let created = chat.create_session(user_id, &name, &role_id, &bot_id).await?;
            output::render(
                session.output,
                &created,
                &[
                    ("session_id", created.session_id.clone().unwrap_or_default()),
                    ("name", created.name.clone().unwrap_or_default()),
                ],
            )
        }

        ChatCommand::Sessions {
            user_id,
            page,
            page_size,
        } => {
            let list = chat.user_sessions(user_id, page, page_size).await?;
            let rows: Vec<(&str, String)> = list
                .sessions
                .iter()
                .map(|s| ("session", format!("{}  {} ({} messages)", s.session_id, s.name, s.msg_count)))
                .collect();
            output::render(session.output, &list, &rows)
        }

        ChatCommand::History {
            session_id,
            page,
            page_size,
        } => {
            let query = MessagePage {
                page,
                page_size,
                message_id: None,
            };
            let list = chat.session_messages(&session_id, &query).await?;
            let rows: Vec<(&str, String)> = list
                .msgs
                .iter()
                .map(|m| ("message", format!("{}  {}", m.message_id, m.content)))
                .collect();
            output::render(session.output, &list, &rows)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io;

    use voyager_api::CredentialStore;
    use voyager_config::{Backend, Config};

    use super::*;

    /// Accepts `budget` writes, then fails with `kind`.
    struct FailingWriter {
        budget: usize,
        kind: io::ErrorKind,
        written: Vec<u8>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::from(self.kind));
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sink(budget: usize, kind: io::ErrorKind) -> StreamSink<FailingWriter> {
        let config = Config::default().backend_config(Backend::Chat).unwrap();
        let client = ServiceClient::new(&config, Arc::new(CredentialStore::new())).unwrap();
        StreamSink {
            out: FailingWriter {
                budget,
                kind,
                written: Vec::new(),
            },
            client,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    #[test]
    fn broken_pipe_cancels_stream_quietly() {
        let mut sink = sink(1, io::ErrorKind::BrokenPipe);
        sink.on_message("Hel".into());
        assert!(!sink.client.is_shut_down());

        sink.on_message("lo".into());
        assert!(sink.client.is_shut_down());
        assert!(sink.failure.lock().unwrap().is_none());

        sink.on_message("ignored".into());
        assert_eq!(sink.out.written, b"Hel");
    }

    #[test]
    fn other_write_errors_are_reported() {
        let mut sink = sink(0, io::ErrorKind::Other);
        sink.on_message("x".into());
        assert!(sink.client.is_shut_down());
        assert!(matches!(*sink.failure.lock().unwrap(), Some(CliError::Io(_))));
    }
}
