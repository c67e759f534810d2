//! ID resolver module
//!
//! Handles resolution of job ID prefixes to full UUIDs by querying the API.
//! This allows users to specify short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::types::IdOrPrefix;

/// Resolve a job ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches the jobs of `queue` and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_id(
    client: &ApiClient,
    queue: &str,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    // If it's already a full UUID, return it
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let jobs = client
        .list_jobs(queue, None)
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    select_unique(jobs.iter().map(|j| j.id), id_or_prefix, queue)
}

fn select_unique(
    ids: impl Iterator<Item = Uuid>,
    id_or_prefix: &IdOrPrefix,
    queue: &str,
) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids.filter(|id| id_or_prefix.matches(*id)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No job found in queue {} with ID starting with '{}'",
            queue,
            id_or_prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                id_or_prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        [
            "aa11aaaa-0000-4000-8000-000000000000",
            "aa22aaaa-0000-4000-8000-000000000000",
            "bb11bbbb-0000-4000-8000-000000000000",
        ]
        .iter()
        .map(|s| Uuid::parse_str(s).unwrap())
        .collect()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let id = select_unique(ids().into_iter(), &IdOrPrefix::parse("bb"), "orderQueue").unwrap();
        assert_eq!(id, ids()[2]);
    }

    #[test]
    fn test_ambiguous_prefix_is_error() {
        let err = select_unique(ids().into_iter(), &IdOrPrefix::parse("aa"), "orderQueue")
            .unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));
    }

    #[test]
    fn test_unknown_prefix_is_error() {
        let err = select_unique(ids().into_iter(), &IdOrPrefix::parse("cc"), "orderQueue")
            .unwrap_err();
        assert!(err.to_string().contains("No job found"));
    }
}
