use sketchparty_common::gamestate_common::Player;

use crate::store::Store;

/// The client's observable session state.
///
/// One instance lives for the whole session and is shared with whatever
/// parts of the UI need to react to login and identity changes.
pub struct ClientState {
    /// session id assigned by the server, None until one was received
    pub session_id: Store<Option<String>>,
    /// the player record of this client, None until logged in
    pub user_data: Store<Option<Player>>,
}

impl Default for ClientState {
    fn default() -> Self {
        ClientState {
            session_id: Store::new(None),
            user_data: Store::new(None),
        }
    }
}
