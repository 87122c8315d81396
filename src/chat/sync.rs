//! Polling loop that keeps the chat view fresh.
//!
//! While the chat view is open two tasks run: a heartbeat that marks our
//! session alive and a refresh of the partner list. Opening a conversation
//! adds a third task that fetches messages newer than the last confirmed one.
//! Poll failures are logged and the next tick simply tries again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, MessageQuery};
use crate::chat::state::{ChatState, Ticket};
use crate::context::Context;
use crate::error::ClientError;
use crate::i18n::Text;
use crate::models::{ChatUser, User};

/// Run `tick` every `period` until `cancel` fires. The first tick waits a
/// full period. Cancelling also drops a tick that is in flight.
fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        debug!(task = name, period_ms = period.as_millis() as u64, "Starting poller");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tick() => {}
            }
        }
        debug!(task = name, "Poller stopped");
    })
}

/// The parts of the sync loop that the spawned tasks share.
#[derive(Clone)]
struct Worker {
    api: ApiClient,
    token: String,
    state: Arc<RwLock<ChatState>>,
    poll_limit: u32,
}

impl Worker {
    async fn heartbeat(&self) -> Result<(), ApiError> {
        self.api.heartbeat(&self.token).await
    }

    /// Fetch the first page of partners for the current search and replace
    /// the list with it.
    async fn refresh_users(&self) -> Result<usize, ApiError> {
        let (search, limit) = {
            let state = self.state.read().await;
            (state.search().to_string(), state.users_pager().limit())
        };
        let users = self.api.chat_users(&self.token, &search, limit, 0).await?;
        let count = users.len();

        let mut state = self.state.write().await;
        // A newer search was typed while this request was in flight.
        if state.search() == search {
            state.replace_users(users);
        }
        Ok(count)
    }

    async fn load_more_users(&self) -> Result<usize, ApiError> {
        let (search, limit, offset) = {
            let state = self.state.read().await;
            let pager = state.users_pager();
            (state.search().to_string(), pager.limit(), pager.next_offset())
        };
        let users = self
            .api
            .chat_users(&self.token, &search, limit, offset)
            .await?;

        let mut state = self.state.write().await;
        if state.search() != search {
            return Ok(0);
        }
        Ok(state.append_users(offset, users))
    }

    async fn load_messages(&self, ticket: Ticket, offset: u32) -> Result<usize, ApiError> {
        let limit = self.state.read().await.messages_pager().limit();
        let messages = self
            .api
            .chat_messages(
                &self.token,
                MessageQuery {
                    partner_id: ticket.partner_id,
                    limit,
                    offset,
                    since: None,
                },
            )
            .await?;

        let mut state = self.state.write().await;
        if !state.is_current(ticket) {
            return Ok(0);
        }
        if offset == 0 {
            let count = messages.len();
            state.replace_messages(messages);
            Ok(count)
        } else {
            Ok(state.append_messages(offset, messages))
        }
    }

    /// One delta check: messages newer than the cursor, merged by id.
    async fn poll_messages(&self, ticket: Ticket) -> Result<usize, ApiError> {
        let since = {
            let state = self.state.read().await;
            if !state.is_current(ticket) {
                return Ok(0);
            }
            state.since_cursor().map(ToString::to_string)
        };

        let messages = self
            .api
            .chat_messages(
                &self.token,
                MessageQuery {
                    partner_id: ticket.partner_id,
                    limit: self.poll_limit,
                    offset: 0,
                    since: since.as_deref(),
                },
            )
            .await?;

        let mut state = self.state.write().await;
        if !state.is_current(ticket) {
            debug!(partner_id = ticket.partner_id, "Dropping poll for a closed conversation");
            return Ok(0);
        }
        let added = state.merge_new(messages);
        if added > 0 {
            debug!(partner_id = ticket.partner_id, added, "New messages");
        }
        Ok(added)
    }
}

/// The chat view's sync loop. Needs a logged-in session.
///
/// Failed user actions queue one error notice; background polls only log.
/// Dropping it stops every task.
pub struct ChatSync {
    ctx: Context,
    worker: Worker,
    me: User,
    started: bool,
    heartbeat_interval: Duration,
    users_interval: Duration,
    messages_interval: Duration,
    shutdown: CancellationToken,
    conversation: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChatSync {
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] when nobody is logged in.
    pub fn new(ctx: &Context) -> Result<Self, ClientError> {
        let session = ctx.session.require()?;
        let config = &ctx.config;
        Ok(Self {
            ctx: ctx.clone(),
            worker: Worker {
                api: ctx.api.clone(),
                token: session.token,
                state: Arc::new(RwLock::new(ChatState::new(config.chat_page_size))),
                poll_limit: config.chat_poll_limit,
            },
            me: session.user,
            started: false,
            heartbeat_interval: config.heartbeat_interval,
            users_interval: config.chat_users_interval,
            messages_interval: config.chat_messages_interval,
            shutdown: CancellationToken::new(),
            conversation: None,
            tasks: Vec::new(),
        })
    }

    /// Shared handle to the view state, for rendering.
    #[must_use]
    pub fn state(&self) -> Arc<RwLock<ChatState>> {
        Arc::clone(&self.worker.state)
    }

    #[must_use]
    pub fn me(&self) -> &User {
        &self.me
    }

    fn report(&self, action: &str, err: ApiError, fallback: Text) -> ClientError {
        let err = ClientError::from(err);
        self.ctx.report(action, &err, fallback);
        err
    }

    /// Load the partner list and start the heartbeat and list refresh tasks.
    /// Calling it again while they run does nothing.
    pub async fn start(&mut self) {
        if self.started {
            debug!("Chat sync already running");
            return;
        }
        self.started = true;
        info!(user_id = self.me.id, "Chat sync starting");
        if let Err(e) = self.worker.refresh_users().await {
            warn!("Failed to load chat users: {e}");
        }

        let worker = self.worker.clone();
        self.tasks.push(spawn_periodic(
            "heartbeat",
            self.heartbeat_interval,
            self.shutdown.child_token(),
            move || {
                let worker = worker.clone();
                async move {
                    if let Err(e) = worker.heartbeat().await {
                        warn!("Heartbeat failed: {e}");
                    }
                }
            },
        ));

        let worker = self.worker.clone();
        self.tasks.push(spawn_periodic(
            "chat-users",
            self.users_interval,
            self.shutdown.child_token(),
            move || {
                let worker = worker.clone();
                async move {
                    if let Err(e) = worker.refresh_users().await {
                        warn!("Chat user refresh failed: {e}");
                    }
                }
            },
        ));
    }

    /// Set the partner search and reload the first page.
    ///
    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn search(&self, query: &str) -> Result<usize, ClientError> {
        self.worker.state.write().await.set_search(query);
        self.worker
            .refresh_users()
            .await
            .map_err(|e| self.report("search chat users", e, Text::LoadChatUsersFailed))
    }

    /// # Errors
    ///
    /// Returns the API failure.
    pub async fn load_more_users(&self) -> Result<usize, ClientError> {
        self.worker
            .load_more_users()
            .await
            .map_err(|e| self.report("load chat users", e, Text::LoadChatUsersFailed))
    }

    /// Open a conversation: load its latest page and start the delta poll.
    ///
    /// The poll starts even if the first load fails.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first load.
    pub async fn select(&mut self, partner: ChatUser) -> Result<usize, ClientError> {
        self.stop_conversation();
        let partner_id = partner.id;
        let ticket = self.worker.state.write().await.select(partner);
        info!(partner_id, "Conversation opened");

        let loaded = self.worker.load_messages(ticket, 0).await;

        let cancel = self.shutdown.child_token();
        self.conversation = Some(cancel.clone());
        let worker = self.worker.clone();
        self.tasks.push(spawn_periodic(
            "chat-messages",
            self.messages_interval,
            cancel,
            move || {
                let worker = worker.clone();
                async move {
                    if let Err(e) = worker.poll_messages(ticket).await {
                        warn!(partner_id = ticket.partner_id, "Message poll failed: {e}");
                    }
                }
            },
        ));

        loaded.map_err(|e| self.report("load messages", e, Text::LoadMessagesFailed))
    }

    /// Open the conversation with a listed partner, by username or id.
    ///
    /// Returns `Ok(false)` when no listed partner matches.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first load.
    pub async fn select_by_name(&mut self, name: &str) -> Result<bool, ClientError> {
        let name = name.trim();
        let partner = {
            let state = self.worker.state.read().await;
            state
                .users()
                .iter()
                .find(|u| u.username.eq_ignore_ascii_case(name) || u.id.to_string() == name)
                .cloned()
        };
        match partner {
            Some(partner) => self.select(partner).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Close the conversation; heartbeat and list refresh keep running.
    pub async fn deselect(&mut self) {
        self.stop_conversation();
        self.worker.state.write().await.deselect();
        info!("Conversation closed");
    }

    fn stop_conversation(&mut self) {
        if let Some(cancel) = self.conversation.take() {
            cancel.cancel();
        }
        self.tasks.retain(|task| !task.is_finished());
    }

    /// Append the next older page of the open conversation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoConversation`] or the API failure.
    pub async fn load_more_messages(&self) -> Result<usize, ClientError> {
        let (ticket, offset) = {
            let state = self.worker.state.read().await;
            let ticket = state.ticket().ok_or(ClientError::NoConversation)?;
            (ticket, state.messages_pager().next_offset())
        };
        self.worker
            .load_messages(ticket, offset)
            .await
            .map_err(|e| self.report("load messages", e, Text::LoadMessagesFailed))
    }

    /// Run one delta check now instead of waiting for the timer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoConversation`] or the API failure.
    pub async fn poll_now(&self) -> Result<usize, ClientError> {
        let ticket = self
            .worker
            .state
            .read()
            .await
            .ticket()
            .ok_or(ClientError::NoConversation)?;
        self.worker
            .poll_messages(ticket)
            .await
            .map_err(|e| self.report("poll messages", e, Text::LoadMessagesFailed))
    }

    /// Send a message to the open conversation and show it at once under a
    /// temporary id, which is returned. Blank text sends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoConversation`] or the API failure; a failed
    /// send adds nothing to the list and queues one error notice.
    pub async fn send(&self, text: &str) -> Result<Option<i64>, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let ticket = self
            .worker
            .state
            .read()
            .await
            .ticket()
            .ok_or(ClientError::NoConversation)?;

        if let Err(e) = self
            .worker
            .api
            .send_message(&self.worker.token, ticket.partner_id, text)
            .await
        {
            return Err(self.report("send message", e, Text::SendMessageFailed));
        }

        let mut state = self.worker.state.write().await;
        if !state.is_current(ticket) {
            return Ok(None);
        }
        Ok(state.push_optimistic(&self.me, text, Utc::now()))
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("Chat sync stopped");
    }
}

impl Drop for ChatSync {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
