//! Textual requests for session mode, and the dispatcher shared with the
//! one-shot subcommands.
//!
//! One request per line:
//!
//! ```text
//! single <hash> <length>
//! file <name> <length>
//! assignment
//! status
//! exit
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.
use crate::campaign::{Campaign, CampaignError};
use crate::digest::{DigestError, HashDigest, PasswordLength};
use crate::events::EventSink;
use crate::report::{render_assignment, render_file, render_single, render_status};
use crate::store::{ResultStore, StoreLayout};
use crate::tools::ToolRunner;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("unknown request {0:?} (expected single, file, assignment, status or exit)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Invalid(#[from] DigestError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Single {
        hash: HashDigest,
        length: PasswordLength,
    },
    File {
        name: String,
        length: PasswordLength,
    },
    Assignment,
    Status,
    Exit,
}

/// Parse one session line. `Ok(None)` for blank and comment lines.
pub fn parse_request(line: &str) -> Result<Option<Request>, RequestError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    let request = match words.as_slice() {
        ["single", hash, length] => Request::Single {
            hash: HashDigest::parse(hash)?,
            length: length.parse()?,
        },
        ["single", ..] => return Err(RequestError::Usage("single <hash> <length>")),
        ["file", name, length] => Request::File {
            name: name.to_string(),
            length: length.parse()?,
        },
        ["file", ..] => return Err(RequestError::Usage("file <name> <length>")),
        ["assignment"] => Request::Assignment,
        ["status"] => Request::Status,
        ["exit"] | ["quit"] => Request::Exit,
        [other, ..] => return Err(RequestError::Unknown(other.to_string())),
        [] => return Ok(None),
    };
    Ok(Some(request))
}

/// Run `request` and return its rendered report. `Exit` renders nothing.
pub fn execute<R: ToolRunner, S: EventSink>(
    campaign: &mut Campaign<'_, R, S>,
    request: Request,
) -> Result<Option<String>, CampaignError> {
    let rendered = match request {
        Request::Single { hash, length } => render_single(&campaign.crack_single(hash, length)?),
        Request::File { name, length } => render_file(&campaign.crack_file(&name, length)?),
        Request::Assignment => render_assignment(&campaign.crack_assignment()?),
        Request::Status => {
            let config = campaign.config();
            let store =
                ResultStore::load(config.assignment_store_path(), StoreLayout::Assignment)?;
            render_status(&config.assignment, &store)
        }
        Request::Exit => return Ok(None),
    };
    Ok(Some(rendered))
}
