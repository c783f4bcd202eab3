use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::control_interface::HubSession;
use crate::util::auth::{FileTokenStore, TokenStore};

/// Hub address used when neither the command line nor the `bridge` file names one.
pub const DEFAULT_HUB_ADDRESS: &str = "Philips-hue.local";
/// File holding the hub address.
pub const BRIDGE_FILE: &str = "bridge";
/// File holding the access token.
pub const ACCESS_CODE_FILE: &str = "accesscode";

/// Address and token, resolved from explicit values first, then files in `dir`, then defaults.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub hub_address: String,
    pub access_token: Option<String>,
    pub token_path: PathBuf,
}

impl HubConfig {
    pub fn resolve(
        dir: &Path,
        hub_address: Option<String>,
        access_token: Option<String>,
    ) -> io::Result<Self> {
        let hub_address = match hub_address {
            Some(address) => address,
            None => read_trimmed(&dir.join(BRIDGE_FILE))?
                .unwrap_or_else(|| DEFAULT_HUB_ADDRESS.to_string()),
        };
        let token_path = dir.join(ACCESS_CODE_FILE);
        let access_token = match access_token {
            Some(token) => Some(token),
            None => FileTokenStore::new(&token_path).load()?,
        };
        debug!("hub address {}", hub_address);
        Ok(HubConfig {
            hub_address,
            access_token,
            token_path,
        })
    }

    pub fn session(&self) -> HubSession {
        match &self.access_token {
            Some(token) => HubSession::new(self.hub_address.clone(), token.clone()),
            None => HubSession::unpaired(self.hub_address.clone()),
        }
    }

    pub fn token_store(&self) -> FileTokenStore {
        FileTokenStore::new(&self.token_path)
    }
}

/// Reads a single trimmed value. A missing or blank file yields `None`.
pub fn read_trimmed(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let value = content.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
