use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::auth;
use crate::backend::chats;
use crate::backend::config::PortalConfig;
use crate::backend::database::Database;
use crate::backend::live::{self, ChangeBus, Collection};
use crate::common::error::Result;
use crate::common::models::{Chat, ChatKind, Message, Role, User, UserInfo, AI_ASSISTANT};

/// Canned assistant replies, drawn uniformly at random.
pub const AI_REPLIES: [&str; 10] = [
    "I'd be happy to help with that!",
    "Let me find that information for you.",
    "That's a great question. Here's what I found...",
    "According to your class material, you should focus on...",
    "Don't forget your assignment is due soon!",
    "I've analyzed your question and think that...",
    "Have you considered approaching this from a different angle?",
    "Based on your course content, I'd suggest...",
    "I've checked your schedule, and you have time for this on Thursday.",
    "Your professor has covered this topic in last week's lecture.",
];

#[derive(Default)]
struct SyncState {
    /// All conversations for the current user, newest activity first.
    chats: Vec<Chat>,
    /// Message history per chat. Only the active chat's entry is live;
    /// entries for chats switched away from go stale on purpose.
    messages: HashMap<String, Vec<Message>>,
    /// Display metadata, populated once per participant id.
    user_info: HashMap<String, UserInfo>,
    active_chat: Option<Chat>,
}

/// Per-session chat synchronization: a standing subscription keeps the
/// chat list current, and exactly one message subscription follows the
/// active chat. State is only ever written by the owning pump tasks;
/// the presentation edge reads snapshots and listens on `updates()`.
pub struct ChatSync {
    db: Arc<Database>,
    bus: ChangeBus,
    config: PortalConfig,
    user: User,
    state: Arc<Mutex<SyncState>>,
    updates: Arc<watch::Sender<u64>>,
    chats_task: Mutex<Option<JoinHandle<()>>>,
    messages_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSync {
    /// Open the standing chats subscription for `user` and return the
    /// sync handle. Dropping it (or calling `stop`) releases every
    /// subscription.
    pub fn start(db: Arc<Database>, bus: ChangeBus, config: PortalConfig, user: User) -> Self {
        let mut user_info = HashMap::new();
        user_info.insert(AI_ASSISTANT.to_string(), UserInfo::assistant());
        user_info.insert(user.id.clone(), UserInfo::from_user(&user));

        let state = Arc::new(Mutex::new(SyncState {
            user_info,
            ..SyncState::default()
        }));
        let (updates, _) = watch::channel(0u64);
        let updates = Arc::new(updates);

        let chats_task = spawn_chats_pump(
            db.clone(),
            bus.clone(),
            state.clone(),
            updates.clone(),
            user.id.clone(),
        );

        Self {
            db,
            bus,
            config,
            user,
            state,
            updates,
            chats_task: Mutex::new(Some(chats_task)),
            messages_task: Mutex::new(None),
        }
    }

    /// Bumped after every state change; the presentation layer awaits
    /// `changed()` instead of polling.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    pub fn chats(&self) -> Vec<Chat> {
        self.state.lock().unwrap().chats.clone()
    }

    pub fn active_chat(&self) -> Option<Chat> {
        self.state.lock().unwrap().active_chat.clone()
    }

    pub fn messages_for(&self, chat_id: &str) -> Vec<Message> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn active_messages(&self) -> Vec<Message> {
        let st = self.state.lock().unwrap();
        match st.active_chat.as_ref() {
            Some(chat) => st.messages.get(&chat.id).cloned().unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub fn user_info(&self, user_id: &str) -> Option<UserInfo> {
        self.state.lock().unwrap().user_info.get(user_id).cloned()
    }

    /// Switch the active conversation. The previous message subscription
    /// is torn down before the new one is opened, so at most one is live
    /// and no stale push can land in the wrong chat. `None` just
    /// releases the subscription.
    pub fn set_active_chat(&self, chat: Option<Chat>) {
        if let Some(task) = self.messages_task.lock().unwrap().take() {
            task.abort();
        }
        {
            let mut st = self.state.lock().unwrap();
            st.active_chat = chat.clone();
        }
        self.updates.send_modify(|v| *v += 1);

        let Some(chat) = chat else { return };
        let handle = spawn_messages_pump(
            self.db.clone(),
            self.bus.clone(),
            self.state.clone(),
            self.updates.clone(),
            chat.id,
            self.user.id.clone(),
        );
        *self.messages_task.lock().unwrap() = Some(handle);
    }

    /// Send a message into a conversation. Empty or whitespace-only text
    /// is a silent no-op, matching the form-input contract. For an AI
    /// conversation the user's message is born read (the sender is the
    /// only human viewer) and the assistant's reply arrives later from a
    /// detached task.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }

        let chat = {
            self.state
                .lock()
                .unwrap()
                .chats
                .iter()
                .find(|c| c.id == chat_id)
                .cloned()
        };
        let chat = match chat {
            Some(chat) => chat,
            None => chats::get_chat(&self.db, chat_id).await?,
        };

        if chat.kind == ChatKind::Ai {
            chats::append_message(
                &self.db,
                &self.bus,
                &self.config,
                chat_id,
                &self.user.id,
                &text,
                true,
            )
            .await?;
            self.spawn_assistant_reply(chat_id.to_string());
            return Ok(());
        }

        let msg = chats::append_message(
            &self.db,
            &self.bus,
            &self.config,
            chat_id,
            &self.user.id,
            &text,
            false,
        )
        .await?;
        // Second half of the non-transactional pair; a failure here
        // leaves the preview stale until the next successful send.
        chats::update_last_message(&self.db, &self.bus, chat_id, &self.user.id, &msg.text, msg.timestamp)
            .await?;
        Ok(())
    }

    /// The delayed reply is intentionally NOT cancelled when the user
    /// navigates away: it still lands and shows up unread on the next
    /// visit. Failures are logged and swallowed.
    fn spawn_assistant_reply(&self, chat_id: String) {
        let db = self.db.clone();
        let bus = self.bus.clone();
        let config = self.config.clone();
        let delay = Duration::from_millis(self.config.ai_reply_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let reply = {
                let mut rng = rand::thread_rng();
                AI_REPLIES.choose(&mut rng).copied().unwrap_or(AI_REPLIES[0])
            };
            match chats::append_message(&db, &bus, &config, &chat_id, AI_ASSISTANT, reply, false)
                .await
            {
                Ok(msg) => {
                    if let Err(e) = chats::update_last_message(
                        &db,
                        &bus,
                        &chat_id,
                        AI_ASSISTANT,
                        &msg.text,
                        msg.timestamp,
                    )
                    .await
                    {
                        log::warn!(
                            "[SYNC] Assistant preview update failed for chat {}: {}",
                            chat_id,
                            e
                        );
                    }
                }
                Err(e) => log::warn!("[SYNC] Assistant reply failed for chat {}: {}", chat_id, e),
            }
        });
    }

    /// Open (or find) a conversation. The caller is always included in
    /// the participant set. Direct pairs are deduplicated against the
    /// locally cached list; this is best effort, not a transactional
    /// guarantee, so two participants creating "the same" chat
    /// concurrently can still race to two records.
    pub async fn create_chat(
        &self,
        participants: Vec<String>,
        kind: ChatKind,
        group_name: Option<&str>,
    ) -> Result<String> {
        let mut participants = participants;
        if !participants.iter().any(|p| p == &self.user.id) {
            participants.push(self.user.id.clone());
        }

        if kind == ChatKind::Direct && participants.len() == 2 {
            let existing = {
                self.state
                    .lock()
                    .unwrap()
                    .chats
                    .iter()
                    .find(|c| c.is_direct_between(&participants[0], &participants[1]))
                    .map(|c| c.id.clone())
            };
            if let Some(id) = existing {
                return Ok(id);
            }
        }

        let chat =
            chats::create_chat(&self.db, &self.bus, &participants, kind, group_name, None).await?;
        Ok(chat.id)
    }

    /// Flip the read flag on every unread message from other senders in
    /// the active chat. Returns the number of actual flips, so a second
    /// call right after yields 0. The message pump invokes the same flip
    /// whenever a snapshot arrives, so reading a chat marks it read
    /// without any user action.
    pub async fn mark_active_read(&self) -> Result<usize> {
        let unread: Vec<String> = {
            let st = self.state.lock().unwrap();
            let Some(chat) = st.active_chat.as_ref() else {
                return Ok(0);
            };
            st.messages
                .get(&chat.id)
                .map(|msgs| {
                    msgs.iter()
                        .filter(|m| !m.read && m.sender_id != self.user.id)
                        .map(|m| m.id.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut flipped = 0;
        for id in &unread {
            if chats::mark_message_read(&self.db, &self.bus, id).await? {
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    /// Presence is a simulation, not a protocol: the assistant is always
    /// online, everyone else gets a 70% random draw. Kept as an explicit
    /// stub.
    pub fn is_online(&self, user_id: &str) -> bool {
        if user_id == AI_ASSISTANT {
            return true;
        }
        rand::thread_rng().gen_bool(0.7)
    }

    /// Release every subscription. Also happens on drop.
    pub fn stop(&self) {
        if let Some(task) = self.chats_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(task) = self.messages_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for ChatSync {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_chats_pump(
    db: Arc<Database>,
    bus: ChangeBus,
    state: Arc<Mutex<SyncState>>,
    updates: Arc<watch::Sender<u64>>,
    user_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let q_db = db.clone();
        let q_uid = user_id.clone();
        let mut lq = live::watch(&bus, vec![Collection::Chats], move || {
            let db = q_db.clone();
            let uid = q_uid.clone();
            async move { chats::chats_for_user(&db, &uid).await }
        });

        while let Some(mut list) = lq.recv().await {
            // Newest activity first; chats that never got a message sink
            // to the bottom.
            list.sort_by_key(|c| {
                std::cmp::Reverse(
                    c.last_message
                        .as_ref()
                        .map(|m| m.timestamp)
                        .unwrap_or(i64::MIN),
                )
            });

            let missing: Vec<String> = {
                let st = state.lock().unwrap();
                let mut missing = Vec::new();
                for chat in &list {
                    for participant in &chat.participants {
                        if !st.user_info.contains_key(participant)
                            && !missing.contains(participant)
                        {
                            missing.push(participant.clone());
                        }
                    }
                }
                missing
            };

            let mut fetched = Vec::new();
            for id in missing {
                match auth::fetch_profile(&db, &id).await {
                    Ok(Some(user)) => fetched.push(UserInfo::from_user(&user)),
                    // Dangling participant id: cache an explicit unknown
                    // entry so it renders as "Unknown User" and is not
                    // re-fetched on every push.
                    Ok(None) => fetched.push(UserInfo {
                        id: id.clone(),
                        display_name: "Unknown User".to_string(),
                        email: String::new(),
                        role: Role::Unknown,
                        photo_url: None,
                    }),
                    Err(e) => log::warn!("[SYNC] Failed to fetch user {}: {}", id, e),
                }
            }

            {
                let mut st = state.lock().unwrap();
                for info in fetched {
                    st.user_info.insert(info.id.clone(), info);
                }
                st.chats = list;
            }
            updates.send_modify(|v| *v += 1);
        }
    })
}

fn spawn_messages_pump(
    db: Arc<Database>,
    bus: ChangeBus,
    state: Arc<Mutex<SyncState>>,
    updates: Arc<watch::Sender<u64>>,
    chat_id: String,
    viewer_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let q_db = db.clone();
        let q_cid = chat_id.clone();
        let mut lq = live::watch(&bus, vec![Collection::Messages], move || {
            let db = q_db.clone();
            let cid = q_cid.clone();
            async move { chats::messages_for_chat(&db, &cid).await }
        });

        while let Some(msgs) = lq.recv().await {
            let unread: Vec<String> = msgs
                .iter()
                .filter(|m| !m.read && m.sender_id != viewer_id)
                .map(|m| m.id.clone())
                .collect();

            {
                let mut st = state.lock().unwrap();
                st.messages.insert(chat_id.clone(), msgs);
            }
            updates.send_modify(|v| *v += 1);

            // Viewing marks as read. Best effort: a dropped flip is
            // non-fatal and retried on the next push.
            for id in unread {
                if let Err(e) = chats::mark_message_read(&db, &bus, &id).await {
                    log::warn!("[SYNC] Failed to mark message {} read: {}", id, e);
                }
            }
        }
    })
}
