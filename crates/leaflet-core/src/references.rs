//! Block-reference rewriting.
//!
//! Content may embed references of the form `((<block-id>))` or
//! `((<block-id> "display text"))` (single quotes also accepted). At view
//! time each reference becomes either a markdown link to the child share
//! published for that block, or plain text when no child share is live.
//!
//! [`rewrite`] is a pure text transform; [`resolve_links`] performs the only
//! reads (child-share lookups) and never writes.

use std::{
  collections::{HashMap, HashSet},
  sync::LazyLock,
};

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use uuid::Uuid;

use crate::{share::BlockReference, store::PublicationStore};

/// Emitted for a reference that cannot be resolved to any text.
pub const UNRESOLVED_PLACEHOLDER: &str = "[ref]";
/// Link text of last resort.
pub const GENERIC_LINK_LABEL: &str = "link";
/// Title of last resort for an auto-created child share.
pub const GENERIC_TITLE: &str = "Referenced block";

const LINK_TEXT_LIMIT: usize = 30;
const TITLE_LIMIT: usize = 50;

/// A 14+ digit timestamp, a hyphen, then 7+ lowercase alphanumerics.
static BLOCK_REF: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"\(\(([0-9]{14,}-[0-9a-z]{7,})(?:\s+["']([^"']+)["'])?\)\)"#)
    .expect("block reference pattern is valid")
});

/// Block ids referenced by `body`, in order of first appearance.
pub fn referenced_block_ids(body: &str) -> Vec<&str> {
  let mut seen = HashSet::new();
  BLOCK_REF
    .captures_iter(body)
    .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    .filter(|id| seen.insert(*id))
    .collect()
}

/// Look up the live child share for every reference in `body` that also has
/// a descriptor. Lookup failures are logged and treated as "no child".
pub async fn resolve_links<S>(
  store: &S,
  owner_id: Uuid,
  body: &str,
  references: &[BlockReference],
  now: DateTime<Utc>,
) -> HashMap<String, Uuid>
where
  S: PublicationStore,
{
  let known: HashSet<&str> = references.iter().map(|r| r.block_id.as_str()).collect();
  let mut links = HashMap::new();

  for block_id in referenced_block_ids(body) {
    if !known.contains(block_id) {
      continue;
    }
    match store.latest_share_for_document(owner_id, block_id).await {
      Ok(Some(child)) if !child.is_expired(now) => {
        links.insert(block_id.to_owned(), child.share_id);
      }
      Ok(_) => {}
      Err(e) => {
        tracing::warn!(%block_id, error = %e, "child share lookup failed");
      }
    }
  }

  links
}

/// Replace every block reference in `body`.
///
/// `links` maps block ids to the child share that should be linked;
/// `base_url` has no trailing slash.
pub fn rewrite(
  body: &str,
  references: &[BlockReference],
  links: &HashMap<String, Uuid>,
  base_url: &str,
) -> String {
  let descriptors: HashMap<&str, &BlockReference> = references
    .iter()
    .map(|r| (r.block_id.as_str(), r))
    .collect();

  BLOCK_REF
    .replace_all(body, |caps: &Captures<'_>| {
      let block_id = &caps[1];
      let quoted = caps.get(2).map(|m| m.as_str());

      let Some(reference) = descriptors.get(block_id) else {
        return quoted.unwrap_or(UNRESOLVED_PLACEHOLDER).to_owned();
      };

      match links.get(block_id) {
        Some(child_id) => {
          let text = link_text(quoted, reference).unwrap_or_else(|| GENERIC_LINK_LABEL.to_owned());
          format!("[{text}]({base_url}/s/{child_id})")
        }
        None => link_text(quoted, reference).unwrap_or_else(|| UNRESOLVED_PLACEHOLDER.to_owned()),
      }
    })
    .into_owned()
}

/// Quoted text, then descriptor display text, then truncated raw content.
fn link_text(quoted: Option<&str>, reference: &BlockReference) -> Option<String> {
  quoted
    .or_else(|| reference.display_text())
    .map(str::to_owned)
    .or_else(|| {
      (!reference.content.is_empty()).then(|| truncate(&reference.content, LINK_TEXT_LIMIT))
    })
}

/// Title for a child share derived from a referenced block.
///
/// Prefers explicit display text, then the first non-blank line that is not
/// a heading, then the first non-blank line with heading markers stripped.
pub fn derive_title(reference: &BlockReference) -> String {
  if let Some(text) = reference.display_text() {
    return text.to_owned();
  }

  let lines = reference.content.lines().map(str::trim).filter(|l| !l.is_empty());

  if let Some(line) = lines.clone().find(|l| !l.starts_with('#')) {
    return truncate(line, TITLE_LIMIT);
  }

  lines
    .map(|l| l.trim_start_matches(['#', ' ']))
    .find(|l| !l.is_empty())
    .map(|l| truncate(l, TITLE_LIMIT))
    .unwrap_or_else(|| GENERIC_TITLE.to_owned())
}

/// Keep at most `limit` characters, appending `...` when anything was cut.
fn truncate(s: &str, limit: usize) -> String {
  match s.char_indices().nth(limit) {
    Some((cut, _)) => format!("{}...", &s[..cut]),
    None => s.to_owned(),
  }
}
