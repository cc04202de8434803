//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single chat submission: open the turn, consume the provider's
//! increment stream, and publish transcript updates as protocol events.
//!
//! The session lock is held only for the brief, synchronous state-machine
//! calls; the socket loop never touches the transcript and only forwards the
//! published events.

use crate::web::protocol::ServerMessage;
use quiz_review_core::ports::{CompletionService, CompletionStream, PortError};
use quiz_review_core::session::{ChatSession, Submission, APOLOGY};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Represents the outcome of one chat exchange.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The submission was empty or a stream was already in flight; nothing
    /// happened and the client was not told anything.
    Rejected,
    /// The reply streamed to completion.
    Answered,
    /// The provider failed or stalled; the transcript now ends in the apology.
    Failed,
    /// The connection is being torn down; the turn was closed quietly.
    Cancelled,
}

/// One increment-or-terminal event pulled off the provider stream.
enum Increment {
    Delta(String),
    Done,
    Failed(PortError),
    Cancelled,
}

/// The main asynchronous task for handling a single chat submission.
pub async fn chat_exchange(
    session_lock: Arc<Mutex<ChatSession>>,
    completion: Arc<dyn CompletionService>,
    input: String,
    events: mpsc::Sender<ServerMessage>,
    cancellation_token: CancellationToken,
    reply_timeout: Option<Duration>,
) -> ChatOutcome {
    let prompt = {
        let mut session = session_lock.lock().await;
        match session.begin(&input) {
            Submission::Accepted { prompt } => prompt,
            Submission::Rejected(reason) => {
                debug!("Submission rejected: {:?}", reason);
                return ChatOutcome::Rejected;
            }
        }
    };

    let _ = events.send(ServerMessage::AnswerStarted).await;

    let mut stream = match completion.stream_completion(&prompt).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to open completion stream: {}", e);
            return fail_exchange(&session_lock, &events).await;
        }
    };

    loop {
        let next = match bounded_next(&mut stream, &cancellation_token, reply_timeout).await {
            Some(next) => next,
            None => {
                warn!("Completion stream stalled past the reply timeout.");
                return fail_exchange(&session_lock, &events).await;
            }
        };

        match next {
            Increment::Delta(text) => {
                session_lock.lock().await.apply_delta(&text);
                let _ = events.send(ServerMessage::AnswerDelta { text }).await;
            }
            Increment::Done => break,
            Increment::Failed(e) => {
                error!("Completion stream failed mid-reply: {}", e);
                return fail_exchange(&session_lock, &events).await;
            }
            Increment::Cancelled => {
                info!("Chat exchange cancelled during teardown.");
                session_lock.lock().await.finish();
                return ChatOutcome::Cancelled;
            }
        }
    }

    session_lock.lock().await.finish();
    let _ = events.send(ServerMessage::AnswerEnded).await;
    ChatOutcome::Answered
}

/// Waits for the next stream item, bounded by the cancellation token and the
/// optional per-increment timeout. `None` means the timeout elapsed.
async fn bounded_next(
    stream: &mut CompletionStream,
    cancellation_token: &CancellationToken,
    reply_timeout: Option<Duration>,
) -> Option<Increment> {
    let next = next_increment(stream, cancellation_token);
    match reply_timeout {
        Some(limit) => tokio::time::timeout(limit, next).await.ok(),
        None => Some(next.await),
    }
}

async fn next_increment(
    stream: &mut CompletionStream,
    cancellation_token: &CancellationToken,
) -> Increment {
    use futures::StreamExt;

    tokio::select! {
        _ = cancellation_token.cancelled() => Increment::Cancelled,
        item = stream.next() => match item {
            Some(Ok(text)) => Increment::Delta(text),
            Some(Err(e)) => Increment::Failed(e),
            None => Increment::Done,
        },
    }
}

/// Absorbs a provider failure: the trailing assistant message becomes the
/// fixed apology and the session returns to idle.
async fn fail_exchange(
    session_lock: &Arc<Mutex<ChatSession>>,
    events: &mpsc::Sender<ServerMessage>,
) -> ChatOutcome {
    session_lock.lock().await.fail();
    let _ = events
        .send(ServerMessage::AnswerFailed {
            message: APOLOGY.to_string(),
        })
        .await;
    ChatOutcome::Failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use futures::stream;
    use quiz_review_core::domain::{Attempt, Question, Quiz, Role};
    use quiz_review_core::ports::{CompletionService, PortResult};
    use quiz_review_core::session::Phase;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// How a scripted provider behaves when called.
    enum Script {
        Chunks(Vec<&'static str>),
        FailAfter(Vec<&'static str>),
        Stalls,
        RefusesCall,
    }

    struct ScriptedCompletion {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedCompletion {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn stream_completion(&self, _prompt: &str) -> PortResult<CompletionStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Chunks(chunks) => {
                    let items: Vec<Result<String, PortError>> =
                        chunks.iter().map(|c| Ok(c.to_string())).collect();
                    Ok(Box::pin(stream::iter(items)))
                }
                Script::FailAfter(chunks) => {
                    let mut items: Vec<Result<String, PortError>> =
                        chunks.iter().map(|c| Ok(c.to_string())).collect();
                    items.push(Err(PortError::Unexpected("connection reset".to_string())));
                    Ok(Box::pin(stream::iter(items)))
                }
                Script::Stalls => Ok(Box::pin(stream::pending::<Result<String, PortError>>())),
                Script::RefusesCall => {
                    Err(PortError::Unexpected("connection refused".to_string()))
                }
            }
        }
    }

    fn sample_session() -> Arc<Mutex<ChatSession>> {
        let quiz = Quiz {
            id: "quiz-1".to_string(),
            title: "Rust Basics".to_string(),
            description: "Ownership and borrowing".to_string(),
            tags: vec![],
            questions: vec![Question {
                id: "q1".to_string(),
                prompt: "What does `let` do?".to_string(),
                options: vec!["Binds a value".to_string(), "Loops forever".to_string()],
                correct_index: 0,
            }],
        };
        let attempt = Attempt {
            quiz_id: "quiz-1".to_string(),
            score: 1,
            total_questions: 1,
            completed_at: Utc::now(),
            time_elapsed_secs: 10,
            answers: HashMap::from([("q1".to_string(), 0)]),
        };
        Arc::new(Mutex::new(ChatSession::new(quiz, attempt)))
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn streams_a_reply_to_completion() {
        let session = sample_session();
        let provider = ScriptedCompletion::new(Script::Chunks(vec!["Hel", "lo!"]));
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = chat_exchange(
            session.clone(),
            provider.clone(),
            "Why was q1 right?".to_string(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;

        assert_eq!(outcome, ChatOutcome::Answered);
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ServerMessage::AnswerStarted,
                ServerMessage::AnswerDelta {
                    text: "Hel".to_string()
                },
                ServerMessage::AnswerDelta {
                    text: "lo!".to_string()
                },
                ServerMessage::AnswerEnded,
            ]
        );

        let session = session.lock().await;
        assert_eq!(session.phase(), Phase::Idle);
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].content, "Hello!");
    }

    #[tokio::test]
    async fn whitespace_submission_never_reaches_the_provider() {
        let session = sample_session();
        let provider = ScriptedCompletion::new(Script::Chunks(vec!["unused"]));
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = chat_exchange(
            session.clone(),
            provider.clone(),
            "   ".to_string(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;

        assert_eq!(outcome, ChatOutcome::Rejected);
        assert_eq!(provider.call_count(), 0);
        assert!(drain(&mut rx).is_empty());
        assert!(session.lock().await.transcript().is_empty());
    }

    #[tokio::test]
    async fn mid_stream_failure_leaves_the_apology_and_recovers() {
        let session = sample_session();
        let provider = ScriptedCompletion::new(Script::FailAfter(vec!["partial "]));
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = chat_exchange(
            session.clone(),
            provider,
            "first question".to_string(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;

        assert_eq!(outcome, ChatOutcome::Failed);
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&ServerMessage::AnswerFailed {
                message: APOLOGY.to_string()
            })
        );
        {
            let session = session.lock().await;
            assert_eq!(session.transcript().last().unwrap().content, APOLOGY);
            assert_eq!(session.phase(), Phase::Idle);
        }

        // The session accepts a subsequent submission and answers it.
        let provider = ScriptedCompletion::new(Script::Chunks(vec!["All good."]));
        let (tx, _rx) = mpsc::channel(16);
        let outcome = chat_exchange(
            session.clone(),
            provider,
            "second question".to_string(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;
        assert_eq!(outcome, ChatOutcome::Answered);
        assert_eq!(
            session.lock().await.transcript().last().unwrap().content,
            "All good."
        );
    }

    #[tokio::test]
    async fn setup_failure_is_absorbed_the_same_way() {
        let session = sample_session();
        let provider = ScriptedCompletion::new(Script::RefusesCall);
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = chat_exchange(
            session.clone(),
            provider,
            "question".to_string(),
            tx,
            CancellationToken::new(),
            None,
        )
        .await;

        assert_eq!(outcome, ChatOutcome::Failed);
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ServerMessage::AnswerStarted,
                ServerMessage::AnswerFailed {
                    message: APOLOGY.to_string()
                },
            ]
        );
        assert_eq!(
            session.lock().await.transcript().last().unwrap().content,
            APOLOGY
        );
    }

    #[tokio::test]
    async fn stalled_stream_times_out_into_the_apology() {
        let session = sample_session();
        let provider = ScriptedCompletion::new(Script::Stalls);
        let (tx, _rx) = mpsc::channel(16);

        let outcome = chat_exchange(
            session.clone(),
            provider,
            "question".to_string(),
            tx,
            CancellationToken::new(),
            Some(Duration::from_millis(20)),
        )
        .await;

        assert_eq!(outcome, ChatOutcome::Failed);
        let session = session.lock().await;
        assert_eq!(session.transcript().last().unwrap().content, APOLOGY);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn teardown_cancellation_closes_the_turn_quietly() {
        let session = sample_session();
        let provider = ScriptedCompletion::new(Script::Stalls);
        let (tx, mut rx) = mpsc::channel(16);
        let token = CancellationToken::new();
        token.cancel();

        let outcome = chat_exchange(
            session.clone(),
            provider,
            "question".to_string(),
            tx,
            token,
            None,
        )
        .await;

        assert_eq!(outcome, ChatOutcome::Cancelled);
        let events = drain(&mut rx);
        assert_eq!(events, vec![ServerMessage::AnswerStarted]);
        // No apology on teardown; the turn just closes.
        let session = session.lock().await;
        assert_eq!(session.transcript().last().unwrap().content, "");
        assert_eq!(session.phase(), Phase::Idle);
    }
}
