use std::path::PathBuf;
use std::sync::Arc;

use mediaviewer_db::Database;
use mediaviewer_db::shortcut_id::ShortcutMinter;

use crate::homeserver::HomeserverResolver;

/// Shared application state for all route handlers.
pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub minter: ShortcutMinter,
    pub resolver: HomeserverResolver,
    /// Take the client address from `X-Forwarded-For` in log lines.
    pub trust_forward_headers: bool,
    /// Directory holding the viewer frontend (`index.html` and assets).
    pub frontend_dir: PathBuf,
}
