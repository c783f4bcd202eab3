use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::{json, Value};

use crate::control_interface::HubClient;
use crate::util::config::read_trimmed;
use crate::util::error::HubError;

/// Where the access token lives between runs.
pub trait TokenStore {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&mut self, token: &str) -> io::Result<()>;
}

/// Asked before an existing token is replaced.
pub trait ConfirmOverwrite {
    fn confirm_overwrite(&mut self, existing: &str, replacement: &str) -> bool;
}

impl<F> ConfirmOverwrite for F
where
    F: FnMut(&str, &str) -> bool,
{
    fn confirm_overwrite(&mut self, existing: &str, replacement: &str) -> bool {
        self(existing, replacement)
    }
}

/// Token kept as a single trimmed line in a text file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        read_trimmed(&self.path)
    }

    fn save(&mut self, token: &str) -> io::Result<()> {
        fs::write(&self.path, token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// The new token was written to the store.
    Stored { name: String, token: String },
    /// The hub issued a token but the operator kept the existing one.
    Declined { name: String, token: String },
}

impl PairingOutcome {
    pub fn token(&self) -> &str {
        match self {
            PairingOutcome::Stored { token, .. } | PairingOutcome::Declined { token, .. } => token,
        }
    }
}

/// One-time registration of this client with the hub.
pub struct PairingFlow<'a> {
    client: &'a HubClient,
}

impl<'a> PairingFlow<'a> {
    pub fn new(client: &'a HubClient) -> Self {
        PairingFlow { client }
    }

    /// Registers `device_name` and persists the issued token.
    ///
    /// [`HubError::LinkButtonPending`] means the operator has to press the hub's link button
    /// and call this again; no retry happens here. The store is only touched after the hub
    /// issued a token and, if one was already stored, after `confirm` agreed.
    pub async fn pair<S, C>(
        &self,
        device_name: &str,
        store: &mut S,
        confirm: &mut C,
    ) -> Result<PairingOutcome, HubError>
    where
        S: TokenStore,
        C: ConfirmOverwrite,
    {
        let body = json!({ "devicetype": format!("[{}]", device_name) });
        let entries = self.client.register(&body).await?.into_success()?;
        let (name, token) = single_credential(&entries)?;
        info!("hub issued an access code for name {}", name);

        if let Some(existing) = store.load()? {
            if !confirm.confirm_overwrite(&existing, &token) {
                warn!("keeping the existing access code");
                return Ok(PairingOutcome::Declined { name, token });
            }
        }

        store.save(&token)?;
        Ok(PairingOutcome::Stored { name, token })
    }
}

fn single_credential(entries: &[Value]) -> Result<(String, String), HubError> {
    let [entry] = entries else {
        return Err(HubError::MalformedResponse(format!(
            "expected one pairing result, got {}",
            entries.len()
        )));
    };
    let credential = entry
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.iter().next())
        .and_then(|(name, token)| Some((name.clone(), token.as_str()?.to_string())));
    credential.ok_or_else(|| {
        HubError::MalformedResponse(format!("pairing result is not a single name/token pair: {}", entry))
    })
}
