use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend::auth::AuthService;
use crate::common::error::Result;
use crate::common::models::User;

#[derive(Default)]
struct SessionState {
    current: Option<User>,
    token: Option<String>,
    loading: bool,
}

/// Holds the authenticated identity for one client. A background task
/// follows the identity provider's session-change pushes and re-checks
/// this store's token on every one, so a login elsewhere or a logout is
/// picked up without polling.
pub struct SessionStore {
    auth: Arc<AuthService>,
    state: Arc<Mutex<SessionState>>,
    watcher: JoinHandle<()>,
}

impl SessionStore {
    pub fn new(auth: Arc<AuthService>) -> Self {
        let state = Arc::new(Mutex::new(SessionState::default()));
        let watcher = spawn_session_watcher(auth.clone(), state.clone());
        Self {
            auth,
            state,
            watcher,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        {
            let mut st = self.state.lock().unwrap();
            st.loading = true;
        }
        let result = self.auth.sign_in(email, password).await;
        let mut st = self.state.lock().unwrap();
        st.loading = false;
        match result {
            Ok((user, token)) => {
                st.current = Some(user.clone());
                st.token = Some(token);
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        let token = { self.state.lock().unwrap().token.clone() };
        let Some(token) = token else {
            return Ok(());
        };
        self.auth.sign_out(&token).await?;
        let mut st = self.state.lock().unwrap();
        st.current = None;
        st.token = None;
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.lock().unwrap().current.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

fn spawn_session_watcher(
    auth: Arc<AuthService>,
    state: Arc<Mutex<SessionState>>,
) -> JoinHandle<()> {
    let mut events = auth.session_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    revalidate(&auth, &state).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Re-evaluate this store's identity against its token. A login
/// elsewhere deletes the old session, so the token stops validating and
/// the identity is dropped here.
async fn revalidate(auth: &AuthService, state: &Mutex<SessionState>) {
    let token = { state.lock().unwrap().token.clone() };
    let Some(token) = token else { return };

    {
        let mut st = state.lock().unwrap();
        st.loading = true;
    }
    let outcome = auth.current_user(&token).await;
    let mut st = state.lock().unwrap();
    st.loading = false;
    match outcome {
        Ok(Some(user)) => st.current = Some(user),
        Ok(None) => {
            log::info!("[SESSION] Session no longer valid, clearing identity");
            st.current = None;
            st.token = None;
        }
        Err(e) => {
            // Leave the identity as-is; the next push will retry.
            log::warn!("[SESSION] Failed to re-evaluate session: {}", e);
        }
    }
}
