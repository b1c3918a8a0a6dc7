use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::config::PaginationSettings;
use crate::error::SugarError;

/// How a paginated listing is walked.
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    /// Page size requested when the source is healthy.
    pub limit: usize,
    pub start_offset: usize,
    /// Consecutive failed attempts on one page before giving up.
    pub max_retries: u32,
    /// Stop once this many items were collected.
    pub max_items: Option<usize>,
    /// Backoff base, doubled after each consecutive failure.
    pub retry_delay: Duration,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            limit: 500,
            start_offset: 0,
            max_retries: 3,
            max_items: None,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl From<&PaginationSettings> for PaginationOptions {
    fn from(settings: &PaginationSettings) -> Self {
        Self {
            limit: settings.limit,
            max_retries: settings.max_retries,
            ..Default::default()
        }
    }
}

/// Drain an offset/limit listing until it returns an empty page.
///
/// The offset advances by the number of items actually returned, so a source
/// that caps its page size below `limit` is still read in full. A failed page
/// is retried with half the previous limit (never below 1), after an exponential
/// backoff; the limit returns to `options.limit` after the next success. Once
/// `max_retries` consecutive attempts fail the walk stops with
/// [`SugarError::Pagination`] carrying the offset that could not be read.
pub async fn collect_paginated<T, F, Fut>(
    method: &str,
    options: &PaginationOptions,
    mut fetch_page: F,
) -> Result<Vec<T>, SugarError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    let full_limit = options.limit.max(1);
    let mut items = Vec::new();
    let mut offset = options.start_offset;
    let mut limit = full_limit;
    let mut retries = 0u32;

    loop {
        if let Some(max_items) = options.max_items {
            if items.len() >= max_items {
                items.truncate(max_items);
                break;
            }
        }

        match fetch_page(limit, offset).await {
            Ok(page) if page.is_empty() => break,
            Ok(page) => {
                debug!("{}: {} item(s) at offset {}", method, page.len(), offset);
                offset += page.len();
                items.extend(page);
                limit = full_limit;
                retries = 0;
            },
            Err(e) => {
                retries += 1;
                if retries >= options.max_retries {
                    return Err(SugarError::Pagination {
                        method: method.to_string(),
                        offset,
                        reason: format!("{:#}", e),
                    });
                }

                limit = (limit / 2).max(1);
                warn!(
                    "{}: page at offset {} failed (retry {}/{}, limit now {}): {:#}",
                    method, offset, retries, options.max_retries, limit, e
                );

                let delay = options
                    .retry_delay
                    .saturating_mul(2u32.saturating_pow(retries - 1));
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }

    Ok(items)
}
