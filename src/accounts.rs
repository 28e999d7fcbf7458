use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub const PRIVATE_KEYS_FILE: &str = "private_keys.txt";
pub const PROXIES_FILE: &str = "proxies.txt";
pub const CREDENTIALS_FILE: &str = "tokens.txt";

/// Raw parallel input lists, one line per account. Proxies and credentials
/// are optional per line; missing credentials fall back to the primary.
#[derive(Debug, Default)]
pub struct AccountInputs {
    pub private_keys: Vec<String>,
    pub proxies: Vec<String>,
    pub credentials: Vec<String>,
}

impl AccountInputs {
    pub fn load_from_dir(dir: &Path) -> std::io::Result<Self> {
        Ok(Self {
            private_keys: read_lines(&dir.join(PRIVATE_KEYS_FILE))?,
            proxies: read_lines(&dir.join(PROXIES_FILE)).unwrap_or_default(),
            credentials: read_lines(&dir.join(CREDENTIALS_FILE)).unwrap_or_default(),
        })
    }
}

/// Read a line-oriented list, trimming whitespace and dropping empty lines.
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn normalize_private_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") {
        trimmed.to_string()
    } else {
        format!("0x{trimmed}")
    }
}

/// Ordered queue of spare identity credentials, backed by the credentials
/// file. The file holds the primary credential on the first line and spares
/// below it; every rotation rewrites the file so the pool state survives
/// process restarts.
#[derive(Debug)]
pub struct CredentialPool {
    path: PathBuf,
    spares: VecDeque<String>,
}

impl CredentialPool {
    /// `lines` is the full credentials file content; the first line is the
    /// primary credential and does not enter the spare pool.
    pub fn from_lines(path: PathBuf, lines: &[String]) -> Self {
        Self {
            path,
            spares: lines.iter().skip(1).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.spares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spares.is_empty()
    }

    /// Pop the next spare to replace `retired`, persisting the swap to the
    /// backing file: the retired credential is removed, the replacement is
    /// kept, and no duplicates are introduced. Returns `None` when the pool
    /// is exhausted.
    pub fn rotate(&mut self, retired: &str) -> anyhow::Result<Option<String>> {
        let Some(replacement) = self.spares.pop_front() else {
            return Ok(None);
        };

        let mut lines = read_lines(&self.path).unwrap_or_default();
        lines.retain(|line| line != retired);
        if !lines.iter().any(|line| line == &replacement) {
            lines.push(replacement.clone());
        }
        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(&self.path, contents)?;
        tracing::info!(
            "[POOL] rotated a rejected credential out of {} ({} spares left)",
            self.path.display(),
            self.spares.len()
        );
        Ok(Some(replacement))
    }
}
